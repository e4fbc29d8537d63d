//! Common settings in Kiriwake.

use bincode::config::{self, Fixint, LittleEndian};

/// The maximum length of an input sentence in characters.
///
/// Positions in a lattice are stored as 16-bit integers.
pub const MAX_SENTENCE_LENGTH: usize = 0xFFFF;

/// The connection id of BOS/EOS.
pub const BOS_EOS_CONNECTION_ID: u16 = 0;

/// The word id assigned to BOS/EOS.
pub const SENTINEL_WORD_ID: u32 = u32::MAX;

/// The reserved word id of a single-character token split from an unknown word
/// in [`SearchMode::Extended`](crate::tokenizer::SearchMode::Extended).
pub const UNIGRAM_WORD_ID: u32 = u32::MAX - 1;

/// The feature string of [`UNIGRAM_WORD_ID`].
pub const UNIGRAM_FEATURE: &str = "*";

pub(crate) fn bincode_config() -> config::Configuration<LittleEndian, Fixint> {
    config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}
