//! Error types for NEXUS and Newick parsing.
//!
//! [ParsingError] carries the byte position and a short excerpt of the input
//! where parsing failed. At the pipeline level it is wrapped into
//! [AnnotatorError](crate::error::AnnotatorError).

use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use std::error::Error;
use std::fmt;

/// Number of bytes of input shown as context in error messages
const DEFAULT_CONTEXT_LENGTH: usize = 50;

// =#========================================================================#=
// PARSING ERROR TYPE
// =#========================================================================€=
/// Kinds of failures while reading tree files.
#[derive(PartialEq, Debug, Clone)]
pub enum ParsingErrorType {
    IoError(String),
    UnexpectedEOF,
    MissingNexusHeader,
    InvalidTaxaBlock(String),
    InvalidTreesBlock(String),
    InvalidTranslateCommand(String),
    UnclosedComment,
    InvalidNewickString(String),
    InvalidAnnotation(String),
    InvalidFormatting,
    UnresolvedLabel(String),
}

// =#========================================================================#=
// PARSING ERROR
// =#========================================================================$=
/// Parsing error with the position and surrounding bytes where it occurred.
#[derive(Debug)]
pub struct ParsingError {
    kind: ParsingErrorType,
    position: usize,
    context: String,
}

impl ParsingError {
    /// Creates an error of the given kind at the parser's current position.
    pub fn from_parser<S: ByteSource>(kind: ParsingErrorType, parser: &mut ByteParser<S>) -> Self {
        Self {
            kind,
            position: parser.position(),
            context: parser.get_context_as_string(DEFAULT_CONTEXT_LENGTH),
        }
    }

    /// Creates an error that is not tied to a parser position.
    pub fn without_context(kind: ParsingErrorType) -> Self {
        Self {
            kind,
            position: 0,
            context: String::new(),
        }
    }

    pub fn unexpected_eof<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::UnexpectedEOF, parser)
    }

    pub fn missing_nexus_header<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::MissingNexusHeader, parser)
    }

    pub fn invalid_taxa_block<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidTaxaBlock(msg), parser)
    }

    pub fn invalid_trees_block<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidTreesBlock(msg), parser)
    }

    pub fn invalid_translate_command<S: ByteSource>(
        parser: &mut ByteParser<S>,
        msg: String,
    ) -> Self {
        Self::from_parser(ParsingErrorType::InvalidTranslateCommand(msg), parser)
    }

    pub fn unclosed_comment<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::UnclosedComment, parser)
    }

    pub fn invalid_newick_string<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidNewickString(msg), parser)
    }

    pub fn invalid_annotation<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::InvalidAnnotation(msg), parser)
    }

    pub fn invalid_formatting<S: ByteSource>(parser: &mut ByteParser<S>) -> Self {
        Self::from_parser(ParsingErrorType::InvalidFormatting, parser)
    }

    pub fn unresolved_label<S: ByteSource>(parser: &mut ByteParser<S>, msg: String) -> Self {
        Self::from_parser(ParsingErrorType::UnresolvedLabel(msg), parser)
    }

    /// The kind of failure.
    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Byte offset at which the failure was detected.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ParsingErrorType::MissingNexusHeader => {
                write!(f, "File does not start with #NEXUS header")?
            }
            ParsingErrorType::InvalidTaxaBlock(msg) => {
                write!(f, "Invalid TAXA block format - {msg}")?
            }
            ParsingErrorType::InvalidTreesBlock(msg) => {
                write!(f, "Invalid TREES block format - {msg}")?
            }
            ParsingErrorType::InvalidTranslateCommand(msg) => {
                write!(f, "Invalid TRANSLATE command - {msg}")?
            }
            ParsingErrorType::UnclosedComment => write!(f, "Unclosed comment")?,
            ParsingErrorType::InvalidNewickString(msg) => {
                write!(f, "Invalid newick string: {msg}")?
            }
            ParsingErrorType::InvalidAnnotation(msg) => write!(f, "Invalid annotation: {msg}")?,
            ParsingErrorType::UnexpectedEOF => write!(f, "Unexpected end of file")?,
            ParsingErrorType::InvalidFormatting => write!(f, "Invalid formatting")?,
            ParsingErrorType::UnresolvedLabel(msg) => write!(f, "Could not resolve label - {msg}")?,
            ParsingErrorType::IoError(msg) => write!(f, "IO error - {msg}")?,
        }

        write!(f, " at position {}", self.position)?;

        if !self.context.is_empty() {
            write!(f, "\n  Context (next {} bytes): {}", self.context.len(), self.context)?;
        }

        Ok(())
    }
}

impl Error for ParsingError {}

impl From<std::io::Error> for ParsingError {
    fn from(err: std::io::Error) -> Self {
        ParsingError::without_context(ParsingErrorType::IoError(err.to_string()))
    }
}
