//! Basic low-level byte parser functionality shared by the Newick and NEXUS
//! parsers.
pub(crate) mod buffered_byte_source;
pub mod byte_parser;
pub mod byte_source;
pub(crate) mod in_memory_byte_source;
pub mod parsing_error;
pub mod utils;

pub use buffered_byte_source::BufferedByteSource;
pub use byte_parser::ByteParser;
pub use byte_source::ByteSource;
pub use in_memory_byte_source::InMemoryByteSource;
pub use parsing_error::{ParsingError, ParsingErrorType};
