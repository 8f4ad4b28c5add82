use std::io::Read;

use crate::{
    ir::{builder::ModuleBuilder, BinaryOp, BlockId, Incoming, Type, ValueId},
    lexer::{lexer::Lexer, Symbol},
};

use super::{
    loops::{LoopFrame, LoopStack},
    Cursor, TranslateError, Translation, TranslationStats, TranslatorOptions,
};

/// Single pass from brainfuck to SSA, one symbol at a time
///
/// The pointer is the only thing that needs to be an SSA value, cells are
/// always loaded and stored through it.  Loops make this awkward since the
/// pointer on entry to a body depends on the tail of the body which hasn't
/// been read yet, so each `[` leaves half-filled joins on the `LoopStack`
/// that its `]` finishes off.
pub struct Translator<R: Read> {
    lexer: Lexer<R>,
    builder: ModuleBuilder,
    cursor: Cursor,
    loops: LoopStack,
}

impl<R: Read> Translator<R> {
    pub fn new(reader: R, options: &TranslatorOptions) -> Translator<R> {
        let builder = ModuleBuilder::new(&options.module_name);
        let cursor = Cursor {
            block: builder.entry_block(),
            pointer: builder.initial_pointer(),
        };

        Translator {
            lexer: Lexer::new(reader),
            builder,
            cursor,
            loops: LoopStack::new(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.depth()
    }

    /// Handles the next byte, `Ok(false)` once the stream is exhausted
    pub fn step(&mut self) -> Result<bool, TranslateError> {
        let byte = match self.lexer.next_byte()? {
            Some(byte) => byte,
            None => return Ok(false),
        };

        match Symbol::from_byte(byte) {
            Some(Symbol::Increment) => self.shift(1),
            Some(Symbol::Decrement) => self.shift(-1),
            Some(Symbol::DerefIncrement) => self.modify_cell(BinaryOp::Add),
            Some(Symbol::DerefDecrement) => self.modify_cell(BinaryOp::Sub),
            Some(Symbol::Write) => {
                let value = self.load_cell();
                let put = self.builder.put_function();
                self.builder.call(self.cursor.block, put, vec![value]);
            }
            Some(Symbol::Read) => {
                let get = self.builder.get_function();
                if let Some(value) = self.builder.call(self.cursor.block, get, vec![]) {
                    self.builder.store(self.cursor.block, value, self.cursor.pointer);
                }
            }
            Some(Symbol::JumpStart) => self.open_loop(),
            Some(Symbol::JumpEnd) => self.close_loop()?,
            // comment
            None => {}
        }

        Ok(true)
    }

    /// Consumes the rest of the stream and finishes the module
    pub fn translate(mut self) -> Result<Translation, TranslateError> {
        while self.step()? {}

        if let Some(frame) = self.loops.innermost() {
            return Err(TranslateError::UnmatchedOpen {
                line: frame.opened_at.line,
                column: frame.opened_at.column,
            });
        }

        self.builder.ret(self.cursor.block);

        let body = self.builder.body();
        let stats = TranslationStats {
            blocks: body.blocks.len(),
            instructions: body.blocks.iter().map(|block| block.instructions.len()).sum(),
            joins: body.joins.len(),
            max_loop_depth: self.loops.max_depth(),
        };
        tracing::debug!(
            blocks = stats.blocks,
            instructions = stats.instructions,
            joins = stats.joins,
            max_loop_depth = stats.max_loop_depth,
            "finished translation"
        );

        let module = self.builder.finish();
        debug_assert_eq!(module.verify(), Ok(()));

        Ok(Translation { module, stats })
    }

    fn shift(&mut self, by: i64) {
        self.cursor.pointer = self.builder.offset(self.cursor.block, self.cursor.pointer, by);
    }

    fn load_cell(&mut self) -> ValueId {
        self.builder.load(self.cursor.block, self.cursor.pointer)
    }

    fn modify_cell(&mut self, op: BinaryOp) {
        let value = self.load_cell();
        let value = self.builder.binary(self.cursor.block, op, value, 1);
        self.builder.store(self.cursor.block, value, self.cursor.pointer);
    }

    /// Seals the current block with `if (*ptr != 0) goto body else goto exit`
    fn branch_on_cell(&mut self, body: BlockId, exit: BlockId) {
        let value = self.load_cell();
        let condition = self.builder.is_not_zero(self.cursor.block, value);
        self.builder.cond_branch(self.cursor.block, condition, body, exit);
    }

    fn open_loop(&mut self) {
        let entry = self.cursor.block;
        let body = self.builder.append_block("loop");
        let exit = self.builder.append_block("exit");

        self.branch_on_cell(body, exit);

        // only the edge from `entry` is known so far, `]` adds the other
        let from_entry = Incoming {
            block: entry,
            value: self.cursor.pointer,
        };
        let (exit_pointer, _) = self.builder.join(exit, Type::Pointer, from_entry);
        let (body_pointer, pointer) = self.builder.join(body, Type::Pointer, from_entry);

        self.cursor = Cursor {
            block: body,
            pointer,
        };
        self.loops.push(LoopFrame {
            entry,
            body,
            exit,
            body_pointer,
            exit_pointer,
            opened_at: self.lexer.position(),
        });

        tracing::debug!(depth = self.loops.depth(), at = %self.lexer.position(), "opened loop");
    }

    fn close_loop(&mut self) -> Result<(), TranslateError> {
        let frame = match self.loops.pop() {
            Some(frame) => frame,
            None => {
                let at = self.lexer.position();
                return Err(TranslateError::UnmatchedClose {
                    line: at.line,
                    column: at.column,
                });
            }
        };

        let from_tail = Incoming {
            block: self.cursor.block,
            value: self.cursor.pointer,
        };
        self.builder.complete_join(frame.body_pointer, from_tail);
        self.builder.complete_join(frame.exit_pointer, from_tail);

        let tail = self.cursor.block;
        self.branch_on_cell(frame.body, frame.exit);
        self.builder.move_block_after(frame.exit, tail);

        let exit_pointer = self.builder.body().join(frame.exit_pointer).result;
        self.cursor = Cursor {
            block: frame.exit,
            pointer: exit_pointer,
        };

        tracing::debug!(depth = self.loops.depth(), opened_at = %frame.opened_at, "closed loop");
        Ok(())
    }
}

/// Translates a whole program in one go
pub fn translate<R: Read>(reader: R, options: &TranslatorOptions) -> Result<Translation, TranslateError> {
    Translator::new(reader, options).translate()
}
