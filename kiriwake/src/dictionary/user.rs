//! Lexicon of user-defined words.
//!
//! User words are not matched while scanning a sentence. Instead, all their
//! occurrences are found at once and overlaid onto the lattice.
mod trie;

use std::collections::BTreeMap;
use std::io::Read;

use bincode::{Decode, Encode};

use crate::dictionary::connector::Connector;
use crate::dictionary::lexicon::{
    Lexicon, Postings, PostingsBuilder, WordFeatures, WordParam, WordParams,
};
use crate::dictionary::{LexType, WordIdx};
use crate::errors::Result;
use crate::utils::FromU32;
use trie::SurfaceTrie;

/// Occurrence of a user word in a sentence.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct UserMatch {
    pub word_idx: WordIdx,
    pub word_param: WordParam,
    pub start_char: usize,
    pub end_char: usize,
}

/// Lexicon of user-defined words.
#[derive(Decode, Encode)]
pub struct UserLexicon {
    trie: SurfaceTrie,
    postings: Postings,
    params: WordParams,
    features: WordFeatures,
}

impl UserLexicon {
    /// Creates a new instance from a lexicon file in the CSV format.
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let entries = Lexicon::parse_csv(rdr, "user.csv")?;

        let mut map: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for (i, e) in entries.iter().enumerate() {
            map.entry(e.surface.as_str()).or_default().push(u32::try_from(i)?);
        }
        let mut records = vec![];
        let mut builder = PostingsBuilder::new();
        for (surface, ids) in map {
            let offset = builder.push(&ids)?;
            records.push((surface, u32::try_from(offset)?));
        }

        Ok(Self {
            trie: SurfaceTrie::new(records)?,
            postings: builder.build(),
            params: WordParams::new(entries.iter().map(|e| e.param)),
            features: WordFeatures::new(entries.iter().map(|e| &e.feature)),
        })
    }

    /// Finds all occurrences of user words in `input`, ordered by start position.
    pub fn find_matches(&self, input: &[char]) -> Vec<UserMatch> {
        let mut matches = vec![];
        for occ in self.trie.occurrences(input) {
            for word_id in self.postings.ids(usize::from_u32(occ.value)) {
                matches.push(UserMatch {
                    word_idx: WordIdx::new(LexType::User, word_id),
                    word_param: self.params.get(usize::from_u32(word_id)),
                    start_char: occ.start_char,
                    end_char: occ.end_char,
                });
            }
        }
        matches
    }

    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        debug_assert_eq!(word_idx.lex_type, LexType::User);
        self.params.get(usize::from_u32(word_idx.word_id))
    }

    #[inline(always)]
    pub(crate) fn word_feature(&self, word_idx: WordIdx) -> &str {
        debug_assert_eq!(word_idx.lex_type, LexType::User);
        self.features.get(usize::from_u32(word_idx.word_id))
    }

    #[inline(always)]
    pub(crate) fn word_features(&self, word_idx: WordIdx) -> Vec<String> {
        debug_assert_eq!(word_idx.lex_type, LexType::User);
        self.features.get_fields(usize::from_u32(word_idx.word_id))
    }

    /// Gets the number of words.
    #[inline(always)]
    pub fn num_words(&self) -> usize {
        self.params.len()
    }

    pub(crate) fn verify<C>(&self, conn: &C) -> bool
    where
        C: Connector,
    {
        self.params.verify(conn)
    }
}
