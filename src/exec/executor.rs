use crate::ir::{BinaryOp, Body, Instruction, Module, Terminator, ValueId, ValueKind};

use super::{ExecError, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeValue {
    Cell(u8),
    Bool(bool),
    /// Index of the global and how many cells in from its start
    Pointer { global: usize, offset: i64 },
}

pub struct Executor<'m> {
    module: &'m Module,
    /// Max number of blocks to enter, `None` runs until `ret`
    fuel: Option<u64>,
}

impl<'m> Executor<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module, fuel: None }
    }

    pub fn with_fuel(mut self, fuel: Option<u64>) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn run(&self, runtime: &mut Runtime<'_>) -> Result<(), ExecError> {
        let body = self.module.entry_body();
        let mut values: Vec<Option<RuntimeValue>> = body
            .values
            .iter()
            .map(|def| match def.kind {
                ValueKind::GlobalAddress(global) => Some(RuntimeValue::Pointer {
                    global: global.index(),
                    offset: 0,
                }),
                _ => None,
            })
            .collect();

        let mut previous = None;
        let mut current = body.entry();
        let mut steps = 0;
        loop {
            if let Some(limit) = self.fuel {
                if steps >= limit {
                    return Err(ExecError::OutOfFuel(limit));
                }
            }
            steps += 1;

            let block = body.block(current);

            // every join reads its input before any of them is written
            let mut merged = vec![];
            for instruction in block.instructions.iter() {
                let Instruction::Join(join) = instruction else {
                    break;
                };
                let join = body.join(*join);
                let incoming = previous.and_then(|from| join.value_from(from)).ok_or_else(|| {
                    ExecError::Malformed(format!(
                        "%{} has no input for the edge into {}",
                        body.value(join.result).name,
                        block.label
                    ))
                })?;
                merged.push((join.result, read(body, &values, incoming)?));
            }
            for (result, value) in merged {
                values[result.index()] = Some(value);
            }

            for instruction in block.instructions.iter() {
                self.step(runtime, body, &mut values, instruction)?;
            }

            match &block.terminator {
                Some(Terminator::Return) => return runtime.flush(),
                Some(Terminator::CondBranch {
                    condition,
                    if_true,
                    if_false,
                }) => {
                    let taken = match read(body, &values, *condition)? {
                        RuntimeValue::Bool(taken) => taken,
                        other => return Err(mismatch(body, *condition, "a bool", other)),
                    };
                    previous = Some(current);
                    current = if taken { *if_true } else { *if_false };
                }
                None => {
                    return Err(ExecError::Malformed(format!(
                        "{} falls off the end",
                        block.label
                    )))
                }
            }
        }
    }

    fn step(
        &self,
        runtime: &mut Runtime<'_>,
        body: &Body,
        values: &mut [Option<RuntimeValue>],
        instruction: &Instruction,
    ) -> Result<(), ExecError> {
        match instruction {
            // already merged on the way in
            Instruction::Join(_) => {}
            Instruction::Offset { result, base, by } => {
                let (global, offset) = pointer(body, values, *base)?;
                values[result.index()] = Some(RuntimeValue::Pointer {
                    global,
                    offset: offset.wrapping_add(*by),
                });
            }
            Instruction::Load { result, pointer: address } => {
                let (global, offset) = pointer(body, values, *address)?;
                values[result.index()] = Some(RuntimeValue::Cell(runtime.load(global, offset)?));
            }
            Instruction::Store { value, pointer: address } => {
                let value = cell(body, values, *value)?;
                let (global, offset) = pointer(body, values, *address)?;
                runtime.store(global, offset, value)?;
            }
            Instruction::Binary { result, op, lhs, rhs } => {
                let lhs = cell(body, values, *lhs)?;
                let value = match op {
                    BinaryOp::Add => lhs.wrapping_add(*rhs),
                    BinaryOp::Sub => lhs.wrapping_sub(*rhs),
                };
                values[result.index()] = Some(RuntimeValue::Cell(value));
            }
            Instruction::IsNotZero { result, value } => {
                let value = cell(body, values, *value)?;
                values[result.index()] = Some(RuntimeValue::Bool(value != 0));
            }
            Instruction::Call { result, callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| cell(body, values, *arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let returned = runtime.call(&self.module.function(*callee).name, &args)?;
                if let (Some(result), Some(returned)) = (result, returned) {
                    values[result.index()] = Some(RuntimeValue::Cell(returned));
                }
            }
        }
        Ok(())
    }
}

fn read(body: &Body, values: &[Option<RuntimeValue>], id: ValueId) -> Result<RuntimeValue, ExecError> {
    values[id.index()].ok_or_else(|| {
        ExecError::Malformed(format!("%{} used before it's defined", body.value(id).name))
    })
}

fn cell(body: &Body, values: &[Option<RuntimeValue>], id: ValueId) -> Result<u8, ExecError> {
    match read(body, values, id)? {
        RuntimeValue::Cell(value) => Ok(value),
        other => Err(mismatch(body, id, "a cell", other)),
    }
}

fn pointer(body: &Body, values: &[Option<RuntimeValue>], id: ValueId) -> Result<(usize, i64), ExecError> {
    match read(body, values, id)? {
        RuntimeValue::Pointer { global, offset } => Ok((global, offset)),
        other => Err(mismatch(body, id, "a pointer", other)),
    }
}

fn mismatch(body: &Body, id: ValueId, expected: &str, got: RuntimeValue) -> ExecError {
    ExecError::Malformed(format!(
        "%{} should be {} but is {:?}",
        body.value(id).name,
        expected,
        got
    ))
}

/// Runs the module's entry point with `input` as stdin and hands back stdout
pub fn execute(module: &Module, input: &[u8], fuel: Option<u64>) -> Result<Vec<u8>, ExecError> {
    let mut output = vec![];
    {
        let mut runtime = Runtime::new(&module.globals, Box::new(input), Box::new(&mut output));
        Executor::new(module).with_fuel(fuel).run(&mut runtime)?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::ModuleBuilder;

    #[test]
    fn echoes_one_byte() {
        let mut builder = ModuleBuilder::new("m");
        let entry = builder.entry_block();
        let get = builder.get_function();
        let put = builder.put_function();
        let byte = builder.call(entry, get, vec![]).unwrap();
        builder.call(entry, put, vec![byte]);
        builder.ret(entry);

        assert_eq!(execute(&builder.finish(), b"Q", None).unwrap(), b"Q");
    }

    #[test]
    fn dereferencing_before_the_array_fails() {
        let mut builder = ModuleBuilder::new("m");
        let entry = builder.entry_block();
        let start = builder.initial_pointer();
        let before = builder.offset(entry, start, -1);
        builder.load(entry, before);
        builder.ret(entry);

        let result = execute(&builder.finish(), b"", None);
        assert!(matches!(
            result,
            Err(ExecError::OutOfBounds { offset: -1, len: 30_000, .. })
        ));
    }

    #[test]
    fn get_reads_zero_at_end_of_input() {
        let mut builder = ModuleBuilder::new("m");
        let entry = builder.entry_block();
        let get = builder.get_function();
        let put = builder.put_function();
        let byte = builder.call(entry, get, vec![]).unwrap();
        builder.call(entry, put, vec![byte]);
        builder.ret(entry);

        assert_eq!(execute(&builder.finish(), b"", None).unwrap(), vec![0]);
    }
}
