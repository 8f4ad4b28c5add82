use std::fmt;

use thiserror::Error;

pub mod lexer;

/// The eight instructions, every other byte is a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    // `>`: Increment the `data pointer` by one
    Increment,
    // `<`: Decrement the `data pointer` by one
    Decrement,

    // `+`: Increment the byte at the `data pointer` by one
    DerefIncrement,
    // `-`: Decrement the byte at the `data pointer` by one
    DerefDecrement,

    // `.`: Write the byte at the `data pointer` to the `output device`
    Write,
    // `,`: Read the next byte from the `input device` and write it to the `data pointer`
    Read,

    // `[`: If the byte at the `data pointer` is zero, then jump the `instruction pointer` forward to the instruction after the matching `]`
    JumpStart,
    // `]`: If the byte at the `data pointer` is non-zero then jump the `instruction pointer` back to the instruction after the matching `[`
    JumpEnd,
}

impl Symbol {
    pub fn from_byte(byte: u8) -> Option<Symbol> {
        match byte {
            b'>' => Some(Symbol::Increment),
            b'<' => Some(Symbol::Decrement),
            b'+' => Some(Symbol::DerefIncrement),
            b'-' => Some(Symbol::DerefDecrement),
            b'.' => Some(Symbol::Write),
            b',' => Some(Symbol::Read),
            b'[' => Some(Symbol::JumpStart),
            b']' => Some(Symbol::JumpEnd),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Symbol::Increment => '>',
            Symbol::Decrement => '<',
            Symbol::DerefIncrement => '+',
            Symbol::DerefDecrement => '-',
            Symbol::Write => '.',
            Symbol::Read => ',',
            Symbol::JumpStart => '[',
            Symbol::JumpEnd => ']',
        }
    }
}

/// Human readable location of a byte in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    /// 'raw' offset within the stream in bytes
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Error, Debug)]
pub enum LexerError {
    #[error("IO Error: {0}")]
    FileIO(
        #[from]
        std::io::Error,
    ),
}
