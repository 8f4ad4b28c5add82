pub mod builder;
pub mod printer;
pub mod verify;

use std::fmt;

/// How many cells the program gets
pub const DATA_SIZE: u64 = 30_000;
pub const DATA_NAME: &str = "data";
/// Module name used when the caller doesn't pick one
pub const DEFAULT_MODULE_NAME: &str = "brainfuck program";

/// Runtime shim, writes the cell out
pub const PUT_NAME: &str = "brainfuck_put";
/// Runtime shim, returns 0 once input runs dry
pub const GET_NAME: &str = "brainfuck_get";
/// What the shim's `main` calls into
pub const MAIN_NAME: &str = "brainfuck_main";

macro_rules! arena_id {
    ($name: ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(BlockId);
arena_id!(ValueId);
arena_id!(JoinId);
arena_id!(FuncId);
arena_id!(GlobalId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Void,
    /// Result of a comparison
    Bool,
    /// A single cell
    Cell,
    Pointer,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Type::Void => "void",
            Type::Bool => "i1",
            Type::Cell => "i8",
            Type::Pointer => "ptr",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Visible to (or provided by) the linker
    External,
    /// Private to this module
    Internal,
}

/// A zero initialized array of cells
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub len: u64,
    pub linkage: Linkage,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub linkage: Linkage,
    /// `None` for functions the runtime provides
    pub body: Option<Body>,
}

/// Everything a defined function owns, each kind of thing lives in its own arena
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub blocks: Vec<Block>,
    /// Output order of the blocks, the first one is the entry
    pub layout: Layout,
    pub values: Vec<ValueDef>,
    pub joins: Vec<Join>,
}

impl Body {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn value(&self, id: ValueId) -> &ValueDef {
        &self.values[id.0]
    }

    pub fn join(&self, id: JoinId) -> &Join {
        &self.joins[id.0]
    }

    pub fn entry(&self) -> BlockId {
        match self.layout.first() {
            Some(id) => id,
            None => panic!("Body has no blocks"),
        }
    }

    /// Blocks in the order they get printed
    pub fn blocks_in_order(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.layout.iter().map(move |id| (id, self.block(id)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Link {
    prev: Option<BlockId>,
    next: Option<BlockId>,
}

/// Doubly linked block order, indexed by `BlockId`.
///
/// Moving a block is O(1) so closing a loop costs the same however many
/// blocks came before it.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    links: Vec<Link>,
    first: Option<BlockId>,
    last: Option<BlockId>,
}

impl Layout {
    pub fn first(&self) -> Option<BlockId> {
        self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Blocks must be pushed in arena order
    pub fn push_back(&mut self, id: BlockId) {
        assert_eq!(id.0, self.links.len(), "Block {} pushed out of order", id.0);
        self.links.push(Link {
            prev: self.last,
            next: None,
        });
        match self.last {
            Some(last) => self.links[last.0].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
    }

    /// Moves `id` so it comes directly after `after`
    pub fn move_after(&mut self, id: BlockId, after: BlockId) {
        assert!(after.0 < self.links.len(), "Block {} isn't in the layout", after.0);
        if id == after {
            return;
        }
        self.unlink(id);

        let next = self.links[after.0].next;
        self.links[id.0] = Link {
            prev: Some(after),
            next,
        };
        self.links[after.0].next = Some(id);
        match next {
            Some(next) => self.links[next.0].prev = Some(id),
            None => self.last = Some(id),
        }
    }

    fn unlink(&mut self, id: BlockId) {
        let Link { prev, next } = self.links[id.0];
        match prev {
            Some(prev) => self.links[prev.0].next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => self.links[next.0].prev = prev,
            None => self.last = prev,
        }
        self.links[id.0] = Link::default();
    }

    /// Walks from the first block, stopping after as many steps as there
    /// are blocks so a broken chain can't spin forever
    pub fn iter(&self) -> LayoutIter<'_> {
        LayoutIter {
            layout: self,
            next: self.first,
            remaining: self.links.len(),
        }
    }
}

pub struct LayoutIter<'a> {
    layout: &'a Layout,
    next: Option<BlockId>,
    remaining: usize,
}

impl<'a> Iterator for LayoutIter<'a> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        self.remaining -= 1;
        self.next = self.layout.links.get(id.0).and_then(|link| link.next);
        Some(id)
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub label: String,
    pub instructions: Vec<Instruction>,
    /// Once set the block is sealed and nothing else can be appended
    pub terminator: Option<Terminator>,
}

impl Block {
    pub fn is_sealed(&self) -> bool {
        self.terminator.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ValueDef {
    pub ty: Type,
    pub name: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Address of the first element of a global, it's a constant
    GlobalAddress(GlobalId),
    /// Produced by an instruction in the given block
    Instruction(BlockId),
    /// Merge of the values flowing in from two predecessors
    Join(JoinId),
}

/// One predecessor's contribution to a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incoming {
    pub block: BlockId,
    pub value: ValueId,
}

/// A value that is known before either of its inputs are (phi node)
///
/// Always has exactly two slots, the first is filled on creation and the
/// second once the other predecessor has been emitted.
#[derive(Debug, Clone)]
pub struct Join {
    pub block: BlockId,
    pub result: ValueId,
    pub incoming: [Option<Incoming>; 2],
}

impl Join {
    pub fn is_complete(&self) -> bool {
        self.incoming.iter().all(Option::is_some)
    }

    pub fn contributors(&self) -> impl Iterator<Item = Incoming> + '_ {
        self.incoming.iter().flatten().copied()
    }

    /// The value that flows in when control arrives from `predecessor`
    pub fn value_from(&self, predecessor: BlockId) -> Option<ValueId> {
        self.contributors()
            .find(|incoming| incoming.block == predecessor)
            .map(|incoming| incoming.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Wrapping add
    Add,
    /// Wrapping sub
    Sub,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Must sit at the head of its block
    Join(JoinId),
    /// `result = base + by` in cells, unchecked
    Offset { result: ValueId, base: ValueId, by: i64 },
    Load { result: ValueId, pointer: ValueId },
    Store { value: ValueId, pointer: ValueId },
    Binary { result: ValueId, op: BinaryOp, lhs: ValueId, rhs: u8 },
    IsNotZero { result: ValueId, value: ValueId },
    Call { result: Option<ValueId>, callee: FuncId, args: Vec<ValueId> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    CondBranch {
        condition: ValueId,
        if_true: BlockId,
        if_false: BlockId,
    },
    Return,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::CondBranch { if_true, if_false, .. } => vec![*if_true, *if_false],
            Terminator::Return => vec![],
        }
    }
}

/// A finished translation unit
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    /// The exported function the runtime calls
    pub entry_point: FuncId,
}

impl Module {
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0]
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.0]
    }

    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|function| function.name == name)
            .map(FuncId)
    }

    /// Body of the entry point, the only function this module defines
    pub fn entry_body(&self) -> &Body {
        match &self.function(self.entry_point).body {
            Some(body) => body,
            None => panic!("Entry point {} has no body", self.function(self.entry_point).name),
        }
    }

    pub fn verify(&self) -> Result<(), verify::VerifyError> {
        verify::verify(self)
    }
}
