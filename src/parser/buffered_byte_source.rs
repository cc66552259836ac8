//! [ByteSource] streaming a file through a [BufReader].
//!
//! Used for tree samples too large to hold in memory. Rewinding between
//! pipeline stages seeks the underlying file.

use crate::parser::byte_source::ByteSource;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

// =#========================================================================#=
// BUFFERED BYTE SOURCE
// =#========================================================================$=
/// Streams a file with constant memory.
///
/// Keeps a small scratch buffer so that [peek_slice](ByteSource::peek_slice)
/// can look across the boundary of the reader's internal buffer.
pub struct BufferedByteSource {
    reader: BufReader<File>,
    /// Scratch space for look-ahead across buffer boundaries
    peek_buffer: Vec<u8>,
    /// Absolute position in the file
    pos: usize,
}

impl BufferedByteSource {
    /// Enough for the longest keyword looked ahead for (`TRANSLATE`, `Taxlabels`).
    const PEEK_BUFFER_CAPACITY: usize = 16;

    /// Opens the file at `path` for buffered reading.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            peek_buffer: Vec::with_capacity(Self::PEEK_BUFFER_CAPACITY),
            pos: 0,
        })
    }
}

impl ByteSource for BufferedByteSource {
    fn peek(&mut self) -> Option<u8> {
        self.reader.fill_buf().ok()?.first().copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.reader.consume(1);
        self.pos += 1;
        Some(byte)
    }

    fn peek_slice(&mut self, k: usize) -> &[u8] {
        self.peek_buffer.clear();

        let available = match self.reader.fill_buf() {
            Ok(buf) => buf,
            Err(_) => return &self.peek_buffer,
        };

        if available.len() >= k {
            self.peek_buffer.extend_from_slice(&available[..k]);
            return &self.peek_buffer;
        }

        // Look-ahead spans the end of the internal buffer:
        // read on, then seek back to where we started
        self.peek_buffer.extend_from_slice(available);
        let mut consumed = available.len();
        self.reader.consume(consumed);

        while self.peek_buffer.len() < k {
            let buf = match self.reader.fill_buf() {
                Ok([]) | Err(_) => break,
                Ok(buf) => buf,
            };
            let take = (k - self.peek_buffer.len()).min(buf.len());
            self.peek_buffer.extend_from_slice(&buf[..take]);
            self.reader.consume(take);
            consumed += take;
        }

        let _ = self.reader.seek(SeekFrom::Current(-(consumed as i64)));
        &self.peek_buffer
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn set_position(&mut self, pos: usize) {
        let _ = self.reader.seek(SeekFrom::Start(pos as u64));
        self.pos = pos;
    }

    fn is_eof(&mut self) -> bool {
        self.reader.fill_buf().map(|buf| buf.is_empty()).unwrap_or(true)
    }
}

// =#========================================================================#=
// TESTS - BUFFERED BYTE SOURCE
// =#========================================================================$=
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn peek_slice_does_not_advance() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#NEXUS\nBegin trees;").unwrap();

        let mut source = BufferedByteSource::from_file(file.path()).unwrap();
        assert_eq!(source.peek_slice(6), b"#NEXUS");
        assert_eq!(source.position(), 0);
        assert_eq!(source.next_byte(), Some(b'#'));
        assert_eq!(source.position(), 1);
    }

    #[test]
    fn set_position_seeks_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(A,B);(B,A);").unwrap();

        let mut source = BufferedByteSource::from_file(file.path()).unwrap();
        while source.next_byte().is_some() {}
        assert!(source.is_eof());

        source.set_position(6);
        assert_eq!(source.peek_slice(6), b"(B,A);");
        source.rewind();
        assert_eq!(source.peek(), Some(b'('));
        assert_eq!(source.position(), 0);
    }
}
