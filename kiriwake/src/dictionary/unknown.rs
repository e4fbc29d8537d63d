use std::io::Read;

use bincode::{Decode, Encode};

use crate::dictionary::character::CharProperty;
use crate::dictionary::connector::Connector;
use crate::dictionary::lexicon::{Lexicon, WordParam};
use crate::dictionary::{LexType, WordIdx};
use crate::errors::{KiriwakeError, Result};
use crate::sentence::Sentence;
use crate::utils::FromU32;

#[derive(Default, Debug, Clone, Eq, PartialEq, Decode, Encode)]
pub struct UnkEntry {
    pub cate_id: u16,
    pub param: WordParam,
    pub feature: String,
}

/// Unknown word generated for a span of a sentence.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct UnkWord {
    start_char: usize,
    end_char: usize,
    param: WordParam,
    word_id: u32,
}

impl UnkWord {
    #[inline(always)]
    pub const fn start_char(&self) -> usize {
        self.start_char
    }

    #[inline(always)]
    pub const fn end_char(&self) -> usize {
        self.end_char
    }

    #[inline(always)]
    pub const fn word_param(&self) -> WordParam {
        self.param
    }

    #[inline(always)]
    pub const fn word_idx(&self) -> WordIdx {
        WordIdx::new(LexType::Unknown, self.word_id)
    }
}

/// Handler of unknown words.
///
/// Entries are grouped by category; those of category `i` are
/// `entries[offsets[i]..offsets[i + 1]]`.
#[derive(Decode, Encode)]
pub struct UnkHandler {
    offsets: Vec<usize>, // indexed by category id
    entries: Vec<UnkEntry>,
    default_cate: u32,
}

impl UnkHandler {
    /// Creates a new instance from `unk.def`, whose rows are
    /// `CATEGORY,left_id,right_id,word_cost[,feature..]`.
    pub fn from_reader<R>(rdr: R, char_prop: &CharProperty) -> Result<Self>
    where
        R: Read,
    {
        let default_cate = char_prop.cate_id("DEFAULT").ok_or_else(|| {
            KiriwakeError::invalid_format("char.def", "DEFAULT category is undefined.")
        })?;
        let parsed = Lexicon::parse_csv(rdr, "unk.def")?;
        let mut map = vec![vec![]; char_prop.num_categories()];
        for item in parsed {
            let cate_id = char_prop.cate_id(&item.surface).ok_or_else(|| {
                let msg = format!("Undefined category: {}", item.surface);
                KiriwakeError::invalid_format("unk.def", msg)
            })?;
            let e = UnkEntry {
                cate_id: u16::try_from(cate_id)?,
                param: item.param,
                feature: item.feature,
            };
            map[usize::from_u32(cate_id)].push(e);
        }

        if map[usize::from_u32(default_cate)].is_empty() {
            return Err(KiriwakeError::invalid_format(
                "unk.def",
                "DEFAULT must have at least one unknown word.",
            ));
        }

        let mut offsets = vec![];
        let mut entries = vec![];
        for (cate_id, mut v) in map.into_iter().enumerate() {
            if v.is_empty() {
                let name = char_prop.cate_str(u32::try_from(cate_id)?).unwrap_or_default();
                tracing::debug!(category = name, "no unknown word is defined for a category");
            }
            offsets.push(entries.len());
            entries.append(&mut v);
        }
        offsets.push(entries.len());
        if u32::try_from(entries.len()).is_err() {
            return Err(KiriwakeError::invalid_format(
                "unk.def",
                "The number of unknown words must fit in u32.",
            ));
        }
        Ok(Self {
            offsets,
            entries,
            default_cate,
        })
    }

    /// Gets the ids of unknown words defined for the category.
    pub fn word_ids_for_category(&self, cate_id: u32) -> impl Iterator<Item = WordIdx> {
        let cate_id = usize::from_u32(cate_id);
        let range = match (self.offsets.get(cate_id), self.offsets.get(cate_id + 1)) {
            (Some(&start), Some(&end)) => start..end,
            _ => 0..0,
        };
        // The number of entries fits in u32, as checked at construction.
        range.map(|word_id| WordIdx::new(LexType::Unknown, word_id as u32))
    }

    /// Generates unknown words starting at `start_char` and passes them to `f`.
    ///
    /// A run of groupable characters becomes one word unless it is longer than
    /// `max_grouping_len`. Prefixes up to the category's `length` are also
    /// generated. At least one single-character word is always generated,
    /// using the entries of DEFAULT if the category has none.
    ///
    /// Returns the end position of the longest generated word.
    pub(crate) fn gen_unk_words<F>(
        &self,
        sent: &Sentence,
        start_char: usize,
        max_grouping_len: Option<usize>,
        mut f: F,
    ) -> usize
    where
        F: FnMut(UnkWord),
    {
        let cinfo = sent.char_info(start_char);
        let cate_id = cinfo.base_id();
        let groupable = sent.groupable(start_char);

        let mut max_end = start_char;
        let mut grouped = false;

        if cinfo.group() && max_grouping_len.map_or(true, |max| groupable <= max) {
            grouped = true;
            if self.scan_entries(start_char, start_char + groupable, cate_id, &mut f) != 0 {
                max_end = start_char + groupable;
            }
        }

        for i in 1..=usize::from(cinfo.length()).min(groupable) {
            if grouped && i == groupable {
                continue;
            }
            if self.scan_entries(start_char, start_char + i, cate_id, &mut f) != 0 {
                max_end = max_end.max(start_char + i);
            }
        }

        if max_end == start_char {
            if self.scan_entries(start_char, start_char + 1, cate_id, &mut f) == 0 {
                self.scan_entries(start_char, start_char + 1, self.default_cate, &mut f);
            }
            max_end = start_char + 1;
        }
        max_end
    }

    #[inline(always)]
    fn scan_entries<F>(
        &self,
        start_char: usize,
        end_char: usize,
        cate_id: u32,
        f: &mut F,
    ) -> usize
    where
        F: FnMut(UnkWord),
    {
        let mut num_words = 0;
        for word_idx in self.word_ids_for_category(cate_id) {
            f(UnkWord {
                start_char,
                end_char,
                param: self.word_param(word_idx),
                word_id: word_idx.word_id,
            });
            num_words += 1;
        }
        num_words
    }

    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        debug_assert_eq!(word_idx.lex_type, LexType::Unknown);
        self.entries[usize::from_u32(word_idx.word_id)].param
    }

    #[inline(always)]
    pub(crate) fn word_feature(&self, word_idx: WordIdx) -> &str {
        debug_assert_eq!(word_idx.lex_type, LexType::Unknown);
        &self.entries[usize::from_u32(word_idx.word_id)].feature
    }

    /// Gets the number of unknown words.
    #[inline(always)]
    pub fn num_words(&self) -> usize {
        self.entries.len()
    }

    /// Checks if all connection ids are within the connector.
    pub(crate) fn verify<C>(&self, conn: &C) -> bool
    where
        C: Connector,
    {
        self.entries.iter().all(|e| {
            usize::from(e.param.left_id) < conn.num_left()
                && usize::from(e.param.right_id) < conn.num_right()
        })
    }
}
