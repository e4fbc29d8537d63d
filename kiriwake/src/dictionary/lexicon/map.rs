pub mod posting;

use std::collections::BTreeMap;

use bincode::{Decode, Encode};

use crate::dictionary::automaton::DoubleArray;
use crate::errors::Result;
use crate::utils::FromU32;
use posting::{Postings, PostingsBuilder};

/// Mapping from surface forms to word ids.
///
/// The automaton returns an offset into the postings, which lists
/// the ids of homographs.
#[derive(Decode, Encode)]
pub struct WordMap {
    trie: DoubleArray,
    postings: Postings,
}

impl WordMap {
    pub fn new<I, W>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<str>,
    {
        let mut b = WordMapBuilder::new();
        for (i, w) in words.into_iter().enumerate() {
            b.add_record(w.as_ref().to_owned(), u32::try_from(i)?);
        }
        b.build()
    }

    #[inline(always)]
    pub const fn automaton(&self) -> &DoubleArray {
        &self.trie
    }

    #[inline(always)]
    pub fn word_ids(&self, match_id: u32) -> impl Iterator<Item = u32> + '_ {
        self.postings.ids(usize::from_u32(match_id))
    }
}

#[derive(Default)]
pub struct WordMapBuilder {
    map: BTreeMap<String, Vec<u32>>,
}

impl WordMapBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn add_record(&mut self, word: String, id: u32) {
        self.map.entry(word).or_default().push(id);
    }

    pub fn build(self) -> Result<WordMap> {
        let mut entries = vec![];
        let mut builder = PostingsBuilder::new();
        // BTreeMap yields the surfaces in the ascending order required by the automaton.
        for (word, ids) in self.map {
            let offset = builder.push(&ids)?;
            entries.push((word, u32::try_from(offset)?));
        }
        Ok(WordMap {
            trie: DoubleArray::from_records(&entries)?,
            postings: builder.build(),
        })
    }
}
