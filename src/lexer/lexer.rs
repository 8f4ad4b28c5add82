use std::io::{BufReader, Bytes, Read};

use super::{LexerError, Position};

/// Pulls the source one byte at a time, it never looks further ahead than that
pub struct Lexer<R: Read> {
    /** Human Readable position of the next byte */
    pub cur_line: usize,
    pub cur_col: usize,

    /** 'raw' format / offset within the stream (in terms of bytes) */
    pub byte_offset: usize,

    /// Where the byte most recently returned by `next_byte` lives
    last: Position,

    bytes: Bytes<BufReader<R>>,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Lexer<R> {
        Lexer {
            cur_col: 1,
            cur_line: 1,

            byte_offset: 0,
            last: Position::default(),

            bytes: BufReader::new(reader).bytes(),
        }
    }

    /// The next byte of the stream or `None` once it's exhausted
    pub fn next_byte(&mut self) -> Result<Option<u8>, LexerError> {
        let byte = match self.bytes.next() {
            Some(byte) => byte?,
            None => return Ok(None),
        };

        self.last = Position {
            line: self.cur_line,
            column: self.cur_col,
            offset: self.byte_offset,
        };

        self.cur_col += 1;
        if byte == b'\n' {
            self.cur_line += 1;
            self.cur_col = 1;
        }
        self.byte_offset += 1;

        Ok(Some(byte))
    }

    /// Position of the last byte handed out
    pub fn position(&self) -> Position {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Symbol;

    #[test]
    fn yields_every_byte_then_none() {
        let mut lexer = Lexer::new("+a]".as_bytes());
        assert_eq!(lexer.next_byte().unwrap(), Some(b'+'));
        assert_eq!(lexer.next_byte().unwrap(), Some(b'a'));
        assert_eq!(lexer.next_byte().unwrap(), Some(b']'));
        assert_eq!(lexer.next_byte().unwrap(), None);
        assert_eq!(lexer.next_byte().unwrap(), None);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let mut lexer = Lexer::new("+\n +".as_bytes());
        lexer.next_byte().unwrap();
        assert_eq!(lexer.position(), Position { line: 1, column: 1, offset: 0 });
        // newline, space
        lexer.next_byte().unwrap();
        lexer.next_byte().unwrap();
        lexer.next_byte().unwrap();
        assert_eq!(lexer.position(), Position { line: 2, column: 2, offset: 3 });
    }

    #[test]
    fn classifies_only_the_eight_symbols() {
        let symbols: Vec<_> = b"><+-.,[]x #"
            .iter()
            .map(|b| Symbol::from_byte(*b))
            .collect();
        assert_eq!(symbols.iter().filter(|s| s.is_some()).count(), 8);
        assert_eq!(Symbol::from_byte(b'x'), None);
        assert_eq!(Symbol::from_byte(b'[').map(|s| s.as_char()), Some('['));
    }
}
