//! Single pass translator from brainfuck to SSA form IR, printed as LLVM
//! textual IR for an external backend to compile and link against a small
//! runtime providing `brainfuck_put`/`brainfuck_get`.

extern crate thiserror;

pub mod exec;
pub mod ir;
pub mod lexer;
pub mod translator;

pub use ir::Module;
pub use translator::{translate, TranslateError, Translation, TranslationStats, TranslatorOptions};
