//! Fixed-width bitsets over the taxon index space, identifying clades.
//!
//! For taxa `[A, B, C, D]` with indices `[0, 1, 2, 3]`, the clade `{A, C}`
//! is the bitset `0b0101`.

use crate::model::LabelIndex;
use std::fmt;

/// Number of taxa per storage word
const WORD_BITS: usize = 64;

/// Taxon set of a clade as a fixed-width word array.
///
/// Equality, hashing and ordering are structural, so a [BitsetClade] serves
/// as hash map key for clade counting. It is immutable once built: create
/// singletons with [singleton](Self::singleton) (or start from
/// [empty](Self::empty)) and combine them with [union](Self::union).
///
/// # Example
/// ```
/// use treeannotator::clade::BitsetClade;
///
/// let a = BitsetClade::singleton(4, 0);
/// let c = BitsetClade::singleton(4, 2);
/// let ac = a.union(&c);
/// assert_eq!(ac.count_taxa(), 2);
/// assert!(ac.contains(2));
/// assert_eq!(ac.to_string(), "{0,2}");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BitsetClade {
    words: Box<[u64]>,
}

impl BitsetClade {
    /// Number of `u64` words needed for `num_taxa` taxa.
    pub fn num_words(num_taxa: usize) -> usize {
        num_taxa.div_ceil(WORD_BITS).max(1)
    }

    /// Clade without taxa in a universe of `num_taxa` taxa.
    pub fn empty(num_taxa: usize) -> Self {
        BitsetClade {
            words: vec![0u64; Self::num_words(num_taxa)].into_boxed_slice(),
        }
    }

    /// Clade of the single taxon `taxon` in a universe of `num_taxa` taxa.
    ///
    /// # Panics
    /// If `taxon >= num_taxa`; callers validate label indices first.
    pub fn singleton(num_taxa: usize, taxon: LabelIndex) -> Self {
        assert!(taxon < num_taxa, "taxon {taxon} outside universe of {num_taxa}");
        let mut words = vec![0u64; Self::num_words(num_taxa)].into_boxed_slice();
        words[taxon / WORD_BITS] |= 1u64 << (taxon % WORD_BITS);
        BitsetClade { words }
    }

    /// Clade containing the taxa of both `self` and `other`.
    pub fn union(&self, other: &BitsetClade) -> Self {
        debug_assert_eq!(self.words.len(), other.words.len());
        let words = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| a | b)
            .collect();
        BitsetClade { words }
    }

    /// Whether `other` shares at least one taxon with `self`.
    pub fn intersects(&self, other: &BitsetClade) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Whether every taxon of `other` is in `self`.
    pub fn is_superset(&self, other: &BitsetClade) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == *b)
    }

    /// Whether `taxon` is in this clade.
    pub fn contains(&self, taxon: LabelIndex) -> bool {
        self.words
            .get(taxon / WORD_BITS)
            .is_some_and(|word| word & (1u64 << (taxon % WORD_BITS)) != 0)
    }

    /// Number of taxa in this clade.
    pub fn count_taxa(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates the taxon indices of this clade in ascending order.
    pub fn taxa(&self) -> impl Iterator<Item = LabelIndex> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| w * WORD_BITS + bit)
        })
    }
}

impl fmt::Display for BitsetClade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, taxon) in self.taxa().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{taxon}")?;
        }
        write!(f, "}}")
    }
}
