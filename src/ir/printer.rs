use std::fmt::{self, Display, Formatter};

use super::{
    BinaryOp, Body, Function, Instruction, Linkage, Module, Terminator, ValueId, ValueKind,
};

/*
    Prints the module as LLVM textual IR (opaque pointers) so that `llc`/`clang`
    can pick it up and link it against the runtime shim.

    https://llvm.org/docs/LangRef.html
*/

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", Escaped(&self.name))?;
        writeln!(f, "source_filename = \"{}\"", Escaped(&self.name))?;

        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for global in self.globals.iter() {
            writeln!(
                f,
                "@{} = {}global [{} x i8] zeroinitializer",
                global.name,
                linkage_prefix(global.linkage),
                global.len
            )?;
        }

        for function in self.functions.iter() {
            writeln!(f)?;
            FunctionPrinter { module: self, function }.fmt(f)?;
        }

        Ok(())
    }
}

/// String contents as LLVM quotes them: `"`, `\` and anything that isn't
/// printable ASCII become `\XX`
struct Escaped<'a>(&'a str);

impl<'a> Display for Escaped<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.bytes() {
            match byte {
                b'"' | b'\\' => write!(f, "\\{:02X}", byte)?,
                b' '..=b'~' => write!(f, "{}", byte as char)?,
                _ => write!(f, "\\{:02X}", byte)?,
            }
        }
        Ok(())
    }
}

fn linkage_prefix(linkage: Linkage) -> &'static str {
    match linkage {
        Linkage::External => "",
        Linkage::Internal => "internal ",
    }
}

struct FunctionPrinter<'a> {
    module: &'a Module,
    function: &'a Function,
}

impl<'a> FunctionPrinter<'a> {
    fn operand(&self, body: &Body, value: ValueId) -> String {
        let def = body.value(value);
        match def.kind {
            ValueKind::GlobalAddress(global) => format!("@{}", self.module.global(global).name),
            _ => format!("%{}", def.name),
        }
    }

    fn typed_operand(&self, body: &Body, value: ValueId) -> String {
        format!("{} {}", body.value(value).ty, self.operand(body, value))
    }

    fn instruction(&self, f: &mut Formatter<'_>, body: &Body, instruction: &Instruction) -> fmt::Result {
        let name = |value: ValueId| self.operand(body, value);
        match instruction {
            Instruction::Join(join) => {
                let join = body.join(*join);
                let incoming = join
                    .contributors()
                    .map(|incoming| {
                        format!("[ {}, %{} ]", name(incoming.value), body.block(incoming.block).label)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(f, "  {} = phi {} {}", name(join.result), body.value(join.result).ty, incoming)
            }
            Instruction::Offset { result, base, by } => writeln!(
                f,
                "  {} = getelementptr i8, ptr {}, i64 {}",
                name(*result),
                name(*base),
                by
            ),
            Instruction::Load { result, pointer } => {
                writeln!(f, "  {} = load i8, ptr {}", name(*result), name(*pointer))
            }
            Instruction::Store { value, pointer } => {
                writeln!(f, "  store i8 {}, ptr {}", name(*value), name(*pointer))
            }
            Instruction::Binary { result, op, lhs, rhs } => {
                let op = match op {
                    BinaryOp::Add => "add",
                    BinaryOp::Sub => "sub",
                };
                writeln!(f, "  {} = {} i8 {}, {}", name(*result), op, name(*lhs), rhs)
            }
            Instruction::IsNotZero { result, value } => {
                writeln!(f, "  {} = icmp ne i8 {}, 0", name(*result), name(*value))
            }
            Instruction::Call { result, callee, args } => {
                let callee = self.module.function(*callee);
                let args = args
                    .iter()
                    .map(|arg| self.typed_operand(body, *arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                match result {
                    Some(result) => writeln!(
                        f,
                        "  {} = call {} @{}({})",
                        name(*result),
                        callee.ret,
                        callee.name,
                        args
                    ),
                    None => writeln!(f, "  call {} @{}({})", callee.ret, callee.name, args),
                }
            }
        }
    }

    fn terminator(&self, f: &mut Formatter<'_>, body: &Body, terminator: &Terminator) -> fmt::Result {
        match terminator {
            Terminator::CondBranch {
                condition,
                if_true,
                if_false,
            } => writeln!(
                f,
                "  br i1 {}, label %{}, label %{}",
                self.operand(body, *condition),
                body.block(*if_true).label,
                body.block(*if_false).label
            ),
            Terminator::Return => writeln!(f, "  ret void"),
        }
    }
}

impl<'a> Display for FunctionPrinter<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let params = self
            .function
            .params
            .iter()
            .map(|ty| ty.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let body = match &self.function.body {
            // provided by the runtime
            None => return writeln!(f, "declare {} @{}({})", self.function.ret, self.function.name, params),
            Some(body) => body,
        };

        let linkage = linkage_prefix(self.function.linkage);
        writeln!(f, "define {}{} @{}({}) {{", linkage, self.function.ret, self.function.name, params)?;
        for (index, (_, block)) in body.blocks_in_order().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for instruction in block.instructions.iter() {
                self.instruction(f, body, instruction)?;
            }
            if let Some(terminator) = &block.terminator {
                self.terminator(f, body, terminator)?;
            }
        }
        writeln!(f, "}}")
    }
}
