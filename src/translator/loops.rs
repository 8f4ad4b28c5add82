use crate::{
    ir::{BlockId, JoinId},
    lexer::Position,
};

/// Everything needed to close a `[` once its `]` turns up
#[derive(Debug, Clone, Copy)]
pub struct LoopFrame {
    /// Block that was current when the `[` was read
    pub entry: BlockId,
    pub body: BlockId,
    pub exit: BlockId,

    /// Pointer on entry to the body, either from `entry` or from the tail of the last iteration
    pub body_pointer: JoinId,
    /// Pointer once the loop is skipped or finished
    pub exit_pointer: JoinId,

    /// Where the `[` is, for error reporting
    pub opened_at: Position,
}

/// Open loops, innermost last
///
/// Heap backed so nesting is only limited by memory.
#[derive(Debug, Default)]
pub struct LoopStack {
    frames: Vec<LoopFrame>,
    max_depth: usize,
}

impl LoopStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: LoopFrame) {
        self.frames.push(frame);
        self.max_depth = self.max_depth.max(self.frames.len());
    }

    pub fn pop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    pub fn innermost(&self) -> Option<&LoopFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> LoopFrame {
        LoopFrame {
            entry: BlockId(n),
            body: BlockId(n + 1),
            exit: BlockId(n + 2),
            body_pointer: JoinId(n),
            exit_pointer: JoinId(n + 1),
            opened_at: Position::default(),
        }
    }

    #[test]
    fn pops_innermost_first_and_remembers_depth() {
        let mut stack = LoopStack::new();
        stack.push(frame(0));
        stack.push(frame(3));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.innermost().map(|f| f.entry), Some(BlockId(3)));

        assert_eq!(stack.pop().map(|f| f.entry), Some(BlockId(3)));
        assert_eq!(stack.pop().map(|f| f.entry), Some(BlockId(0)));
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
        assert_eq!(stack.max_depth(), 2);
    }
}
