//! [ByteSource] over a file or string held completely in memory.

use crate::parser::byte_source::ByteSource;
use std::fs;
use std::path::Path;

// =#========================================================================#=
// IN MEMORY BYTE SOURCE
// =#========================================================================$=
/// Owns all bytes of its input; rewinding is a plain index reset.
///
/// Preferred for tree files that comfortably fit into memory,
/// since every pipeline stage re-reads the whole sample.
pub struct InMemoryByteSource {
    input: Vec<u8>,
    pos: usize,
}

impl InMemoryByteSource {
    /// Wraps the given bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            input: bytes,
            pos: 0,
        }
    }

    /// Reads the whole file at `path` into memory.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::from_vec(fs::read(path)?))
    }

    /// Number of bytes held by this source.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Whether the source holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}

impl ByteSource for InMemoryByteSource {
    #[inline(always)]
    fn peek(&mut self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.input.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    #[inline(always)]
    fn peek_slice(&mut self, k: usize) -> &[u8] {
        let start = self.pos.min(self.input.len());
        let end = (start + k).min(self.input.len());
        &self.input[start..end]
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn is_eof(&mut self) -> bool {
        self.pos >= self.input.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_slice_is_clamped_at_eof() {
        let mut source = InMemoryByteSource::from_vec(b"(A,B);".to_vec());
        source.set_position(4);
        assert_eq!(source.peek_slice(10), b");");
        source.set_position(42);
        assert!(source.peek_slice(3).is_empty());
        assert!(source.is_eof());
    }

    #[test]
    fn rewind_returns_to_start() {
        let mut source = InMemoryByteSource::from_vec(b"tree".to_vec());
        while source.next_byte().is_some() {}
        assert!(source.is_eof());
        source.rewind();
        assert_eq!(source.peek(), Some(b't'));
        assert_eq!(source.len(), 4);
    }
}
