//! Reference evaluator for finished IR modules.
//!
//! This runs the translated *module*, wiring the two runtime functions to
//! in-process streams, so the IR can be checked without an external backend.

pub mod executor;

use std::io::{Read, Write};

use thiserror::Error;

use crate::ir::{Global, GET_NAME, PUT_NAME};

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("IO Error: {0}")]
    StreamIO(
        #[from]
        std::io::Error,
    ),

    #[error("Access to @{global}[{offset}] is out of bounds (max length {len})")]
    OutOfBounds { global: String, offset: i64, len: u64 },

    #[error("Call to @{0} which nothing provides")]
    UnknownFunction(String),

    #[error("Gave up after {0} steps")]
    OutOfFuel(u64),

    #[error("Malformed module: {0}")]
    Malformed(String),
}

struct Allocation {
    name: String,
    cells: Vec<u8>,
}

/// Memory and I/O the module runs against, mirrors what the C shim links in
pub struct Runtime<'a> {
    /// One zeroed allocation per global, indexed by `GlobalId`
    memory: Vec<Allocation>,

    in_stream: Box<dyn Read + 'a>,
    out_stream: Box<dyn Write + 'a>,
}

impl<'a> Runtime<'a> {
    pub fn new(globals: &[Global], in_stream: Box<dyn Read + 'a>, out_stream: Box<dyn Write + 'a>) -> Self {
        Self {
            memory: globals
                .iter()
                .map(|global| Allocation {
                    name: global.name.clone(),
                    cells: vec![0; global.len as usize],
                })
                .collect(),
            in_stream,
            out_stream,
        }
    }

    /// Dispatches a call to one of the runtime functions
    pub fn call(&mut self, name: &str, args: &[u8]) -> Result<Option<u8>, ExecError> {
        match (name, args) {
            (PUT_NAME, [byte]) => {
                self.out_stream.write_all(&[*byte])?;
                Ok(None)
            }
            (GET_NAME, []) => {
                let mut buf = [0u8; 1];
                // end of input reads as 0
                match self.in_stream.read(&mut buf)? {
                    0 => Ok(Some(0)),
                    _ => Ok(Some(buf[0])),
                }
            }
            _ => Err(ExecError::UnknownFunction(name.to_string())),
        }
    }

    pub fn load(&self, global: usize, offset: i64) -> Result<u8, ExecError> {
        let index = self.check_address(global, offset)?;
        Ok(self.memory[global].cells[index])
    }

    pub fn store(&mut self, global: usize, offset: i64, value: u8) -> Result<(), ExecError> {
        let index = self.check_address(global, offset)?;
        self.memory[global].cells[index] = value;
        Ok(())
    }

    pub fn memory(&self, global: usize) -> &[u8] {
        &self.memory[global].cells
    }

    pub fn flush(&mut self) -> Result<(), ExecError> {
        self.out_stream.flush()?;
        Ok(())
    }

    /// Pointers are allowed to wander anywhere, it's only dereferencing them that's checked
    fn check_address(&self, global: usize, offset: i64) -> Result<usize, ExecError> {
        let allocation = &self.memory[global];
        let len = allocation.cells.len();
        if offset < 0 || offset as usize >= len {
            return Err(ExecError::OutOfBounds {
                global: allocation.name.clone(),
                offset,
                len: len as u64,
            });
        }
        Ok(offset as usize)
    }
}
