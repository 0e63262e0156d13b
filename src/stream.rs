//! Source-agnostic read/write capabilities the core uses to emit/consume
//! bytes (spec §4.6), plus the concrete in-memory variant the rest of the
//! crate builds on. Compressed and buffered-file variants live in
//! [`crate::format`], layered on top of `std::io::{Read, Write}` rather
//! than reinventing I/O.

use crate::error::{BsdiffError, Result};
use std::io::Write;

/// A byte sink the diff engine writes control triples and diff/extra
/// bytes into, in scan order. Any `std::io::Write` implementor works:
/// buffered files, in-memory buffers, and the compressed adapters in
/// [`crate::format`] all qualify.
pub trait Sink: Write {}
impl<W: Write + ?Sized> Sink for W {}

/// A growable in-memory sink, used by callers that want the patch bytes
/// back as a `Vec<u8>` rather than streamed straight to a file.
#[derive(Default)]
pub struct MemorySink {
    buf: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Reads exactly `buf.len()` bytes from `source`, turning a short read
/// into [`BsdiffError::Io`] (an `UnexpectedEof`), per spec §4.6: the core
/// always requests an exact length and treats a short read as fatal.
pub fn read_exact(source: &mut impl std::io::Read, buf: &mut [u8]) -> Result<()> {
    source.read_exact(buf).map_err(BsdiffError::Io)
}
