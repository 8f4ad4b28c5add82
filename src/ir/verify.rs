use std::collections::HashMap;

use thiserror::Error;

use super::{BlockId, Body, Instruction, Module};

/// Structural problems in a finished module, any of these means the builder was misused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Function @{0} has no blocks")]
    EmptyFunction(String),

    #[error("Block {0} has no terminator")]
    UnsealedBlock(String),

    #[error("Block {block} appears {count} times in the layout")]
    BadLayout { block: String, count: usize },

    #[error("Join %{0} is missing an input")]
    IncompleteJoin(String),

    #[error("Join %{0} isn't at the head of its block")]
    MisplacedJoin(String),

    #[error("Join %{join} takes a value from {block} which never branches to it")]
    NotAPredecessor { join: String, block: String },

    #[error("Entry block {0} is branched to")]
    EntryHasPredecessors(String),
}

pub fn verify(module: &Module) -> Result<(), VerifyError> {
    for function in module.functions.iter() {
        if let Some(body) = &function.body {
            if body.layout.is_empty() {
                return Err(VerifyError::EmptyFunction(function.name.clone()));
            }
            verify_body(body)?;
        }
    }
    Ok(())
}

fn verify_body(body: &Body) -> Result<(), VerifyError> {
    let mut seen: HashMap<BlockId, usize> = HashMap::new();
    for id in body.layout.iter() {
        *seen.entry(id).or_default() += 1;
    }
    for (index, block) in body.blocks.iter().enumerate() {
        let count = seen.get(&BlockId(index)).copied().unwrap_or(0);
        if count != 1 {
            return Err(VerifyError::BadLayout {
                block: block.label.clone(),
                count,
            });
        }
    }

    let mut predecessors: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
    for (index, block) in body.blocks.iter().enumerate() {
        let terminator = block
            .terminator
            .as_ref()
            .ok_or_else(|| VerifyError::UnsealedBlock(block.label.clone()))?;
        for successor in terminator.successors() {
            predecessors.entry(successor).or_default().push(BlockId(index));
        }
    }

    let entry = body.entry();
    if predecessors.contains_key(&entry) {
        return Err(VerifyError::EntryHasPredecessors(body.block(entry).label.clone()));
    }

    for block in body.blocks.iter() {
        // joins first, then everything else
        let head = block
            .instructions
            .iter()
            .take_while(|inst| matches!(inst, Instruction::Join(_)))
            .count();
        for instruction in block.instructions[head..].iter() {
            if let Instruction::Join(join) = instruction {
                let result = body.join(*join).result;
                return Err(VerifyError::MisplacedJoin(body.value(result).name.clone()));
            }
        }
    }

    for join in body.joins.iter() {
        let name = &body.value(join.result).name;
        if !join.is_complete() {
            return Err(VerifyError::IncompleteJoin(name.clone()));
        }
        let preds = predecessors.get(&join.block).map(Vec::as_slice).unwrap_or(&[]);
        for incoming in join.contributors() {
            if !preds.contains(&incoming.block) {
                return Err(VerifyError::NotAPredecessor {
                    join: name.clone(),
                    block: body.block(incoming.block).label.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::ModuleBuilder;
    use crate::ir::{Incoming, Type};

    #[test]
    fn empty_program_is_valid() {
        let mut builder = ModuleBuilder::new("m");
        let entry = builder.entry_block();
        builder.ret(entry);
        assert_eq!(builder.finish().verify(), Ok(()));
    }

    #[test]
    fn unsealed_block_is_reported() {
        let builder = ModuleBuilder::new("m");
        assert_eq!(
            builder.finish().verify(),
            Err(VerifyError::UnsealedBlock("entry".to_string()))
        );
    }

    #[test]
    fn half_finished_join_is_reported() {
        let mut builder = ModuleBuilder::new("m");
        let entry = builder.entry_block();
        let start = builder.initial_pointer();
        let body = builder.append_block("loop");
        builder.join(body, Type::Pointer, Incoming { block: entry, value: start });
        let cell = builder.load(entry, start);
        let condition = builder.is_not_zero(entry, cell);
        builder.cond_branch(entry, condition, body, body);
        builder.ret(body);

        assert!(matches!(
            builder.finish().verify(),
            Err(VerifyError::IncompleteJoin(_))
        ));
    }

    #[test]
    fn join_from_unrelated_block_is_reported() {
        let mut builder = ModuleBuilder::new("m");
        let entry = builder.entry_block();
        let start = builder.initial_pointer();
        let body = builder.append_block("loop");
        let stray = builder.append_block("stray");
        let (join, _) = builder.join(body, Type::Pointer, Incoming { block: entry, value: start });
        builder.complete_join(join, Incoming { block: stray, value: start });
        let cell = builder.load(entry, start);
        let condition = builder.is_not_zero(entry, cell);
        builder.cond_branch(entry, condition, body, body);
        builder.ret(body);
        builder.ret(stray);

        assert_eq!(
            builder.finish().verify(),
            Err(VerifyError::NotAPredecessor {
                join: "ptr1".to_string(),
                block: "stray2".to_string(),
            })
        );
    }
}
