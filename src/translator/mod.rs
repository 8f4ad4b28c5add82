pub mod loops;
pub mod translator;

use thiserror::Error;

use crate::{
    ir::{BlockId, Module, ValueId, DEFAULT_MODULE_NAME},
    lexer::LexerError,
};

pub use translator::{translate, Translator};

/// Where the next instruction goes and which cell it works on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub block: BlockId,
    pub pointer: ValueId,
}

#[derive(Debug, Clone)]
pub struct TranslatorOptions {
    /// Goes into the `ModuleID` header
    pub module_name: String,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub blocks: usize,
    pub instructions: usize,
    pub joins: usize,
    pub max_loop_depth: usize,
}

#[derive(Debug)]
pub struct Translation {
    pub module: Module,
    pub stats: TranslationStats,
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("] at {line}:{column} requires matching [")]
    UnmatchedClose { line: usize, column: usize },

    #[error("[ at {line}:{column} requires matching ]")]
    UnmatchedOpen { line: usize, column: usize },

    #[error("Failed to read program: {0}")]
    Lexer(
        #[from]
        LexerError,
    ),
}
