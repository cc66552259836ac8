//! Low-level byte-by-byte parser for ASCII text.
//!
//! [ByteParser] offers peeking, consuming, pattern matching and quote-aware
//! label parsing on top of a [ByteSource]. The Newick and NEXUS parsers are
//! written against it.

use crate::parser::buffered_byte_source::BufferedByteSource;
use crate::parser::byte_source::ByteSource;
use crate::parser::in_memory_byte_source::InMemoryByteSource;
use crate::parser::parsing_error::ParsingError;
use std::path::Path;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================$=
/// A byte-by-byte parser for ASCII text.
///
/// All keyword matching is case-insensitive (NEXUS keywords are), while
/// labels are returned verbatim. Square-bracket comments can be skipped
/// wholesale, or, if they start with `[&`, be left for annotation parsing.
///
/// # Example
/// ```
/// use treeannotator::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("  BEGIN trees;");
/// parser.skip_whitespace();
/// assert!(parser.consume_if_sequence(b"begin"));
/// parser.skip_whitespace();
/// assert_eq!(parser.parse_unquoted_label(b";").unwrap(), "trees");
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl ByteParser<InMemoryByteSource> {
    /// Creates a parser over a copy of the given string.
    pub fn for_str(input: &str) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.as_bytes().to_vec()))
    }

    /// Creates a parser over a file read completely into memory.
    pub fn from_file_in_memory<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(InMemoryByteSource::from_file(path)?))
    }
}

impl ByteParser<BufferedByteSource> {
    /// Creates a parser streaming the given file.
    pub fn from_file_buffered<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(BufferedByteSource::from_file(path)?))
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a parser over any byte source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

// ============================================================================
// Peeking, consuming and position (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Current byte without consuming it, `None` at EOF.
    #[inline(always)]
    pub fn peek(&mut self) -> Option<u8> {
        self.source.peek()
    }

    /// Consumes and returns the current byte, `None` at EOF.
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Whether the current byte equals `ch`, ignoring ASCII case.
    pub fn peek_is(&mut self, ch: u8) -> bool {
        self.peek().is_some_and(|b| b.eq_ignore_ascii_case(&ch))
    }

    /// Whether the next bytes equal `sequence`, ignoring ASCII case.
    #[inline]
    pub fn peek_is_sequence(&mut self, sequence: &[u8]) -> bool {
        let ahead = self.source.peek_slice(sequence.len());
        ahead.len() == sequence.len() && ahead.eq_ignore_ascii_case(sequence)
    }

    /// Whether an annotation block (`[&`) starts at the current position.
    pub fn peek_is_annotation(&mut self) -> bool {
        self.source.peek_slice(2) == b"[&"
    }

    /// Consumes the current byte if it equals `ch` (ignoring case).
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes the next bytes if they equal `sequence` (ignoring case).
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if !self.peek_is_sequence(sequence) {
            return false;
        }
        for _ in 0..sequence.len() {
            self.next_byte();
        }
        true
    }

    /// Consumes bytes until `target` is found.
    ///
    /// # Returns
    /// `true` if `target` was found, `false` if EOF was reached first
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Consumes bytes until `sequence` (ignoring case) is found.
    ///
    /// # Returns
    /// `true` if `sequence` was found, `false` if EOF was reached first
    pub fn consume_until_sequence(&mut self, sequence: &[u8], mode: ConsumeMode) -> bool {
        while !self.is_eof() {
            if self.peek_is_sequence(sequence) {
                if mode == ConsumeMode::Inclusive {
                    for _ in 0..sequence.len() {
                        self.next_byte();
                    }
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Consumes a complete Newick string up to and including its `;`,
    /// stepping over comments and quoted labels, which may contain `;`.
    ///
    /// # Returns
    /// `Ok(true)` if a terminating `;` was consumed, `Ok(false)` at EOF
    pub fn skip_past_tree_end(&mut self) -> Result<bool, ParsingError> {
        while let Some(b) = self.peek() {
            match b {
                b'[' => {
                    self.skip_comment()?;
                }
                b'\'' => {
                    self.parse_quoted_label()?;
                }
                b';' => {
                    self.next_byte();
                    return Ok(true);
                }
                _ => {
                    self.next_byte();
                }
            }
        }
        Ok(false)
    }

    /// Whether all input has been consumed.
    pub fn is_eof(&mut self) -> bool {
        self.source.is_eof()
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Moves to the given byte offset.
    pub fn set_position(&mut self, pos: usize) {
        self.source.set_position(pos);
    }

    /// Moves back to the start of the input.
    pub fn rewind(&mut self) {
        self.source.rewind();
    }

    /// Up to `k` upcoming bytes as (lossy) string, for error messages.
    pub fn get_context_as_string(&mut self, k: usize) -> String {
        String::from_utf8_lossy(self.source.peek_slice(k)).into_owned()
    }
}

// ============================================================================
// Whitespace & comments (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Skips spaces, tabs and line breaks.
    pub fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.next_byte();
        }
    }

    /// Skips a `[...]` comment if one starts at the current position.
    ///
    /// # Returns
    /// * `Ok(true)` - a comment was consumed
    /// * `Ok(false)` - no comment at current position
    /// * `Err(ParsingError)` - comment never closed
    pub fn skip_comment(&mut self) -> Result<bool, ParsingError> {
        if !self.consume_if(b'[') {
            return Ok(false);
        }
        if !self.consume_until(b']', ConsumeMode::Inclusive) {
            return Err(ParsingError::unclosed_comment(self));
        }
        Ok(true)
    }

    /// Skips whitespace and comments, including annotation blocks.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();
        while self.skip_comment()? {
            self.skip_whitespace();
        }
        Ok(())
    }

    /// Skips whitespace and plain comments, but stops in front of an
    /// annotation block (`[&`).
    pub fn skip_plain_comments_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();
        while !self.peek_is_annotation() && self.skip_comment()? {
            self.skip_whitespace();
        }
        Ok(())
    }
}

// ============================================================================
// Labels (pub)
// ============================================================================
impl<S: ByteSource> ByteParser<S> {
    /// Parses a label, quoted (`'...'`) or unquoted, after skipping
    /// whitespace and comments.
    ///
    /// # Arguments
    /// * `delimiters` - Bytes that end an unquoted label
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        self.skip_comment_and_whitespace()?;

        if self.peek() == Some(b'\'') {
            self.parse_quoted_label()
        } else {
            self.parse_unquoted_label(delimiters)
        }
    }

    /// Parses a label in single quotes, where `''` stands for one quote
    /// (e.g. `'Wilson''s_Storm-petrel'`).
    ///
    /// Expects the parser at the opening quote.
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        self.next_byte();

        let mut bytes = Vec::new();
        loop {
            match self.next_byte() {
                Some(b'\'') => {
                    if self.peek() == Some(b'\'') {
                        bytes.push(b'\'');
                        self.next_byte();
                    } else {
                        break;
                    }
                }
                Some(b) => bytes.push(b),
                None => return Err(ParsingError::unexpected_eof(self)),
            }
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parses a string in double quotes, as used for annotation values
    /// (e.g. `state="Auckland"`). A backslash escapes the next byte.
    ///
    /// Expects the parser at the opening quote.
    pub fn parse_double_quoted(&mut self) -> Result<String, ParsingError> {
        self.next_byte();

        let mut bytes = Vec::new();
        loop {
            match self.next_byte() {
                Some(b'"') => break,
                Some(b'\\') => match self.next_byte() {
                    Some(b) => bytes.push(b),
                    None => return Err(ParsingError::unexpected_eof(self)),
                },
                Some(b) => bytes.push(b),
                None => return Err(ParsingError::unexpected_eof(self)),
            }
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parses bytes up to (excluding) the first of `delimiters` or EOF.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        let mut bytes = Vec::new();
        while let Some(b) = self.peek() {
            if delimiters.contains(&b) {
                break;
            }
            bytes.push(b);
            self.next_byte();
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Whether `consume_until` methods also consume the target itself.
///
/// # Examples
/// ```
/// use treeannotator::parser::byte_parser::{ByteParser, ConsumeMode};
///
/// let mut parser = ByteParser::for_str("tree STATE_0 = (A:1,B:1);");
/// parser.consume_until(b'=', ConsumeMode::Inclusive);
/// assert_eq!(parser.peek(), Some(b' '));
///
/// let mut parser = ByteParser::for_str("tree STATE_0 = (A:1,B:1);");
/// parser.consume_until(b'(', ConsumeMode::Exclusive);
/// assert_eq!(parser.peek(), Some(b'('));
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConsumeMode {
    /// Consume the target along with everything before it.
    Inclusive,
    /// Stop right before the target.
    Exclusive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_match_case_insensitively() {
        let mut parser = ByteParser::for_str("Begin TREES;");
        assert!(parser.consume_if_sequence(b"BEGIN"));
        parser.skip_whitespace();
        assert!(parser.peek_is_sequence(b"trees;"));
    }

    #[test]
    fn comments_are_skipped_but_annotations_can_be_kept() {
        let mut parser = ByteParser::for_str("  [plain] [&rate=1.0]A");
        parser.skip_plain_comments_and_whitespace().unwrap();
        assert!(parser.peek_is_annotation());
        parser.skip_comment_and_whitespace().unwrap();
        assert_eq!(parser.peek(), Some(b'A'));
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        let mut parser = ByteParser::for_str("[never closed");
        assert!(parser.skip_comment_and_whitespace().is_err());
    }

    #[test]
    fn quoted_labels_unescape_doubled_quotes() {
        let mut parser = ByteParser::for_str("'Wilson''s Storm-petrel':1.0");
        assert_eq!(parser.parse_label(b",:;").unwrap(), "Wilson's Storm-petrel");
        assert_eq!(parser.peek(), Some(b':'));
    }

    #[test]
    fn double_quoted_strings_end_at_quote() {
        let mut parser = ByteParser::for_str("\"North \\\"Island\\\"\",x");
        assert_eq!(parser.parse_double_quoted().unwrap(), "North \"Island\"");
        assert_eq!(parser.peek(), Some(b','));
    }

    #[test]
    fn skip_past_tree_end_ignores_semicolons_in_comments_and_quotes() {
        let mut parser = ByteParser::for_str("('a;b':1[;],C);(D,E);");
        assert!(parser.skip_past_tree_end().unwrap());
        assert_eq!(parser.peek(), Some(b'('));
        assert!(parser.skip_past_tree_end().unwrap());
        assert!(!parser.skip_past_tree_end().unwrap());
    }
}
