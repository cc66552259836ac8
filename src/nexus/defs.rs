//! Keywords and constants for the NEXUS parser and writer.

/// NEXUS label delimiters: comma, semicolon, equals, comment start, whitespace
pub(crate) const NEXUS_LABEL_DELIMITERS: &[u8] = b" ,;=[\t\n\r";

pub(crate) const NEXUS_HEADER: &[u8] = b"#NEXUS";

pub(crate) const BLOCK_BEGIN: &[u8] = b"Begin";

pub(crate) const BLOCK_END: &[u8] = b"End;";

// Taxa block
pub(crate) const TAXA: &[u8] = b"taxa";

pub(crate) const DIMENSIONS: &[u8] = b"Dimensions";

pub(crate) const NTAX: &[u8] = b"ntax";

pub(crate) const TAXLABELS: &[u8] = b"Taxlabels";

// Trees block
pub(crate) const TREES: &[u8] = b"trees";

pub(crate) const TRANSLATE: &[u8] = b"Translate";

pub(crate) const TREE: &[u8] = b"tree";

/// Files at least this large are streamed instead of read into memory
pub(crate) const AUTO_IN_MEMORY_THRESHOLD: u64 = 100 * 1024 * 1024;

/// NEXUS blocks the parser distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NexusBlock {
    Taxa,
    Trees,
    Other,
}

impl NexusBlock {
    /// Block type for a (case-insensitive) block name.
    pub(crate) fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("taxa") {
            NexusBlock::Taxa
        } else if name.eq_ignore_ascii_case("trees") {
            NexusBlock::Trees
        } else {
            NexusBlock::Other
        }
    }
}
