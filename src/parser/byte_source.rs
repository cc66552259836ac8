//! Byte source abstraction underneath [ByteParser](crate::parser::ByteParser).
//!
//! Tree samples are read several times (once per pipeline stage), so every
//! source must support jumping back to an earlier byte offset.

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================T=
/// Sequential, rewindable access to the bytes of a tree file.
///
/// Two implementations exist:
/// - [InMemoryByteSource](crate::parser::in_memory_byte_source::InMemoryByteSource)
///   holds the whole file in a `Vec<u8>`
/// - [BufferedByteSource](crate::parser::buffered_byte_source::BufferedByteSource)
///   streams the file through a `BufReader` and seeks to rewind
pub trait ByteSource {
    /// Returns the current byte without consuming it, `None` at EOF.
    fn peek(&mut self) -> Option<u8>;

    /// Consumes and returns the current byte, `None` at EOF.
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns up to `k` bytes starting at the current position,
    /// without consuming them. Fewer bytes are returned near EOF.
    fn peek_slice(&mut self, k: usize) -> &[u8];

    /// Absolute byte offset of the current position.
    fn position(&self) -> usize;

    /// Moves to an absolute byte offset, e.g. one returned earlier by
    /// [position()](Self::position).
    fn set_position(&mut self, pos: usize);

    /// Whether all bytes have been consumed.
    fn is_eof(&mut self) -> bool;

    /// Moves back to the first byte of the source.
    fn rewind(&mut self) {
        self.set_position(0);
    }
}
