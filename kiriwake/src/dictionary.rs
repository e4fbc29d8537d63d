//! Dictionary for tokenization.
pub mod automaton;
mod builder;
pub(crate) mod character;
pub(crate) mod connector;
pub(crate) mod lexicon;
pub(crate) mod unknown;
pub(crate) mod user;
pub(crate) mod word_idx;

use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::common::{self, SENTINEL_WORD_ID, UNIGRAM_FEATURE, UNIGRAM_WORD_ID};
use crate::errors::{KiriwakeError, Result};
use character::CharProperty;
use connector::MatrixConnector;
use lexicon::Lexicon;
use unknown::UnkHandler;
use user::UserLexicon;

pub use lexicon::WordParam;
pub use word_idx::WordIdx;

/// Magic bytes identifying a serialized dictionary.
pub const MODEL_MAGIC: &[u8] = b"KiriwakeDict 0.1\n";

/// Type of a lexicon that contains the word.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Default, Decode, Encode)]
#[repr(u8)]
pub enum LexType {
    /// System lexicon.
    #[default]
    System,
    /// User lexicon.
    User,
    /// Unknown words.
    Unknown,
}

/// Inner data of [`Dictionary`].
#[derive(Decode, Encode)]
struct DictionaryInner {
    system_lexicon: Lexicon,
    user_lexicon: Option<UserLexicon>,
    connector: MatrixConnector,
    char_prop: CharProperty,
    unk_handler: UnkHandler,
}

/// Dictionary for tokenization.
///
/// It is immutable once built and can be shared among threads.
pub struct Dictionary(DictionaryInner);

impl Dictionary {
    /// Gets the reference to the system lexicon.
    #[inline(always)]
    pub(crate) const fn system_lexicon(&self) -> &Lexicon {
        &self.0.system_lexicon
    }

    /// Gets the reference to the user lexicon.
    #[inline(always)]
    pub(crate) const fn user_lexicon(&self) -> Option<&UserLexicon> {
        self.0.user_lexicon.as_ref()
    }

    /// Gets the reference to the connection matrix.
    #[inline(always)]
    pub(crate) const fn connector(&self) -> &MatrixConnector {
        &self.0.connector
    }

    /// Gets the reference to the character property.
    #[inline(always)]
    pub(crate) const fn char_prop(&self) -> &CharProperty {
        &self.0.char_prop
    }

    /// Gets the reference to the handler of unknown words.
    #[inline(always)]
    pub(crate) const fn unk_handler(&self) -> &UnkHandler {
        &self.0.unk_handler
    }

    /// Gets the parameters of the word.
    ///
    /// BOS/EOS and single characters split from unknown words have
    /// [`WordParam::default()`].
    pub fn word_param(&self, word_idx: WordIdx) -> WordParam {
        if Self::is_reserved(word_idx) {
            return WordParam::default();
        }
        match word_idx.lex_type {
            LexType::System => self.system_lexicon().word_param(word_idx),
            LexType::User => self
                .user_lexicon()
                .map_or_else(WordParam::default, |lex| lex.word_param(word_idx)),
            LexType::Unknown => self.unk_handler().word_param(word_idx),
        }
    }

    /// Gets the left connection id of the word.
    #[inline(always)]
    pub fn left_id(&self, word_idx: WordIdx) -> u16 {
        self.word_param(word_idx).left_id
    }

    /// Gets the right connection id of the word.
    #[inline(always)]
    pub fn right_id(&self, word_idx: WordIdx) -> u16 {
        self.word_param(word_idx).right_id
    }

    /// Gets the cost of the word.
    #[inline(always)]
    pub fn word_cost(&self, word_idx: WordIdx) -> i16 {
        self.word_param(word_idx).word_cost
    }

    /// Gets the feature string of the word.
    ///
    /// Single characters split from unknown words have
    /// [`UNIGRAM_FEATURE`](crate::common::UNIGRAM_FEATURE), and BOS/EOS have
    /// the empty string.
    pub fn word_feature(&self, word_idx: WordIdx) -> &str {
        if word_idx.word_id == SENTINEL_WORD_ID {
            return "";
        }
        if word_idx.word_id == UNIGRAM_WORD_ID {
            return UNIGRAM_FEATURE;
        }
        match word_idx.lex_type {
            LexType::System => self.system_lexicon().word_feature(word_idx),
            LexType::User => self
                .user_lexicon()
                .map_or("", |lex| lex.word_feature(word_idx)),
            LexType::Unknown => self.unk_handler().word_feature(word_idx),
        }
    }

    /// Gets the feature fields of the word, i.e., the comma-separated items of
    /// [`Self::word_feature()`].
    pub fn word_features(&self, word_idx: WordIdx) -> Vec<String> {
        match word_idx.lex_type {
            LexType::System if !Self::is_reserved(word_idx) => {
                self.system_lexicon().word_features(word_idx)
            }
            LexType::User if !Self::is_reserved(word_idx) => self
                .user_lexicon()
                .map_or_else(Vec::new, |lex| lex.word_features(word_idx)),
            _ => {
                let feature = self.word_feature(word_idx);
                if feature.is_empty() {
                    vec![]
                } else {
                    crate::utils::parse_csv_row(feature)
                }
            }
        }
    }

    #[inline(always)]
    const fn is_reserved(word_idx: WordIdx) -> bool {
        word_idx.word_id == SENTINEL_WORD_ID || word_idx.word_id == UNIGRAM_WORD_ID
    }

    /// Exports the dictionary data, prefixed with [`MODEL_MAGIC`].
    ///
    /// # Errors
    ///
    /// When bincode generates an error, it will be returned as is.
    pub fn write<W>(&self, mut wtr: W) -> Result<usize>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        let num_bytes =
            bincode::encode_into_std_write(&self.0, &mut wtr, common::bincode_config())?;
        Ok(MODEL_MAGIC.len() + num_bytes)
    }

    /// Creates a dictionary from a reader of data exported by [`Dictionary::write()`].
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`] is returned when the magic bytes mismatch or
    /// bincode generates an error.
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; MODEL_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic.as_slice() != MODEL_MAGIC {
            return Err(KiriwakeError::invalid_argument(
                "rdr",
                "The magic number of the input model mismatches.",
            ));
        }
        let data = bincode::decode_from_std_read(&mut rdr, common::bincode_config())?;
        Ok(Self(data))
    }
}
