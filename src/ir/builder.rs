use super::{
    BinaryOp, Block, BlockId, Body, FuncId, Function, Global, GlobalId, Incoming, Instruction,
    Join, JoinId, Linkage, Module, Terminator, Type, ValueDef, ValueId, ValueKind, DATA_NAME,
    DATA_SIZE, GET_NAME, MAIN_NAME, PUT_NAME,
};

/// Owns the module while the entry point's body is being emitted
///
/// Every declaration happens once in `new`, afterwards only `brainfuck_main`
/// grows.  Emitting into a sealed block, declaring a name twice or giving a
/// join a third input are bugs in the caller and panic.
pub struct ModuleBuilder {
    module: Module,
    body: Body,

    put: FuncId,
    get: FuncId,
    data: GlobalId,

    entry: BlockId,
    initial_pointer: ValueId,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> ModuleBuilder {
        let mut builder = ModuleBuilder {
            module: Module {
                name: name.to_string(),
                globals: vec![],
                functions: vec![],
                entry_point: FuncId(0),
            },
            body: Body::default(),
            put: FuncId(0),
            get: FuncId(0),
            data: GlobalId(0),
            entry: BlockId(0),
            initial_pointer: ValueId(0),
        };

        builder.put = builder.declare_function(PUT_NAME, vec![Type::Cell], Type::Void, Linkage::External);
        builder.get = builder.declare_function(GET_NAME, vec![], Type::Cell, Linkage::External);
        builder.data = builder.declare_global(DATA_NAME, DATA_SIZE, Linkage::Internal);
        builder.module.entry_point =
            builder.declare_function(MAIN_NAME, vec![], Type::Void, Linkage::External);

        builder.entry = builder.create_block("entry".to_string());
        // &data[0], folded down to a constant
        builder.initial_pointer = builder.new_value(
            Type::Pointer,
            "ptr",
            ValueKind::GlobalAddress(builder.data),
        );

        builder
    }

    fn declare_function(&mut self, name: &str, params: Vec<Type>, ret: Type, linkage: Linkage) -> FuncId {
        self.assert_undeclared(name);
        self.module.functions.push(Function {
            name: name.to_string(),
            params,
            ret,
            linkage,
            body: None,
        });
        FuncId(self.module.functions.len() - 1)
    }

    fn declare_global(&mut self, name: &str, len: u64, linkage: Linkage) -> GlobalId {
        self.assert_undeclared(name);
        self.module.globals.push(Global {
            name: name.to_string(),
            len,
            linkage,
        });
        GlobalId(self.module.globals.len() - 1)
    }

    fn assert_undeclared(&self, name: &str) {
        let taken = self.module.functions.iter().any(|f| f.name == name)
            || self.module.globals.iter().any(|g| g.name == name);
        if taken {
            panic!("Symbol @{} declared twice", name);
        }
    }

    pub fn put_function(&self) -> FuncId {
        self.put
    }

    pub fn get_function(&self) -> FuncId {
        self.get
    }

    pub fn entry_block(&self) -> BlockId {
        self.entry
    }

    /// Address of the first cell
    pub fn initial_pointer(&self) -> ValueId {
        self.initial_pointer
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    fn create_block(&mut self, label: String) -> BlockId {
        let id = BlockId(self.body.blocks.len());
        self.body.blocks.push(Block {
            label,
            instructions: vec![],
            terminator: None,
        });
        self.body.layout.push_back(id);
        id
    }

    /// New unsealed block at the end of the layout, labelled `{prefix}{n}`
    pub fn append_block(&mut self, prefix: &str) -> BlockId {
        let label = format!("{}{}", prefix, self.body.blocks.len());
        self.create_block(label)
    }

    /// Only changes the output order, control flow is untouched
    pub fn move_block_after(&mut self, block: BlockId, after: BlockId) {
        self.body.layout.move_after(block, after);
    }

    fn new_value(&mut self, ty: Type, prefix: &str, kind: ValueKind) -> ValueId {
        let id = ValueId(self.body.values.len());
        self.body.values.push(ValueDef {
            ty,
            name: format!("{}{}", prefix, id.0),
            kind,
        });
        id
    }

    fn push(&mut self, block: BlockId, instruction: Instruction) {
        let target = &mut self.body.blocks[block.0];
        if target.is_sealed() {
            panic!("Can't append to sealed block {}", target.label);
        }
        target.instructions.push(instruction);
    }

    fn seal(&mut self, block: BlockId, terminator: Terminator) {
        let target = &mut self.body.blocks[block.0];
        if target.is_sealed() {
            panic!("Block {} is already sealed", target.label);
        }
        target.terminator = Some(terminator);
    }

    /// `base` moved by `by` cells, no bounds check
    pub fn offset(&mut self, block: BlockId, base: ValueId, by: i64) -> ValueId {
        let result = self.new_value(Type::Pointer, "ptr", ValueKind::Instruction(block));
        self.push(block, Instruction::Offset { result, base, by });
        result
    }

    pub fn load(&mut self, block: BlockId, pointer: ValueId) -> ValueId {
        let result = self.new_value(Type::Cell, "cell", ValueKind::Instruction(block));
        self.push(block, Instruction::Load { result, pointer });
        result
    }

    pub fn store(&mut self, block: BlockId, value: ValueId, pointer: ValueId) {
        self.push(block, Instruction::Store { value, pointer });
    }

    pub fn binary(&mut self, block: BlockId, op: BinaryOp, lhs: ValueId, rhs: u8) -> ValueId {
        let result = self.new_value(Type::Cell, "cell", ValueKind::Instruction(block));
        self.push(block, Instruction::Binary { result, op, lhs, rhs });
        result
    }

    pub fn is_not_zero(&mut self, block: BlockId, value: ValueId) -> ValueId {
        let result = self.new_value(Type::Bool, "cond", ValueKind::Instruction(block));
        self.push(block, Instruction::IsNotZero { result, value });
        result
    }

    /// Returns the call's value unless the callee returns void
    pub fn call(&mut self, block: BlockId, callee: FuncId, args: Vec<ValueId>) -> Option<ValueId> {
        let result = match self.module.function(callee).ret {
            Type::Void => None,
            ty => Some(self.new_value(ty, "cell", ValueKind::Instruction(block))),
        };
        self.push(block, Instruction::Call { result, callee, args });
        result
    }

    pub fn cond_branch(&mut self, block: BlockId, condition: ValueId, if_true: BlockId, if_false: BlockId) {
        self.seal(
            block,
            Terminator::CondBranch {
                condition,
                if_true,
                if_false,
            },
        );
    }

    pub fn ret(&mut self, block: BlockId) {
        self.seal(block, Terminator::Return);
    }

    /// Places a join at the head of `block` with only its first input known
    pub fn join(&mut self, block: BlockId, ty: Type, first: Incoming) -> (JoinId, ValueId) {
        if let Some(other) = self.body.blocks[block.0]
            .instructions
            .iter()
            .find(|inst| !matches!(inst, Instruction::Join(_)))
        {
            panic!("Joins must come before {:?} in {}", other, self.body.blocks[block.0].label);
        }

        let id = JoinId(self.body.joins.len());
        let result = self.new_value(ty, "ptr", ValueKind::Join(id));
        self.body.joins.push(Join {
            block,
            result,
            incoming: [Some(first), None],
        });
        self.push(block, Instruction::Join(id));
        (id, result)
    }

    /// Fills in the second input of a join
    pub fn complete_join(&mut self, join: JoinId, second: Incoming) {
        let target = &mut self.body.joins[join.0];
        match target.incoming[1] {
            Some(_) => panic!("Join {} already has both inputs", join.0),
            None => target.incoming[1] = Some(second),
        }
    }

    pub fn finish(mut self) -> Module {
        let main = self.module.entry_point;
        self.module.functions[main.0].body = Some(self.body);
        self.module
    }
}
