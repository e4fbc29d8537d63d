use std::ops::Range;

use regex::Regex;

use crate::common::MAX_SENTENCE_LENGTH;
use crate::dictionary::character::{CharInfo, CharProperty};
use crate::errors::{KiriwakeError, Result};

/// Input text with per-character category information.
#[derive(Default, Clone, Debug)]
pub struct Sentence {
    input: String,
    chars: Vec<char>,
    c2b: Vec<usize>,
    cinfos: Vec<CharInfo>,
    groupable: Vec<usize>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn clear(&mut self) {
        self.input.clear();
        self.chars.clear();
        self.c2b.clear();
        self.cinfos.clear();
        self.groupable.clear();
    }

    pub fn set_sentence<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.clear();
        self.input.push_str(input.as_ref());
    }

    /// Computes characters and their categories.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`] is returned when the input is longer than
    /// [`MAX_SENTENCE_LENGTH`] characters.
    pub fn compile(&mut self, char_prop: &CharProperty) -> Result<()> {
        self.compute_basic();
        if self.chars.len() > MAX_SENTENCE_LENGTH {
            let msg = format!(
                "The length of the input must be no more than {MAX_SENTENCE_LENGTH}, but got {}.",
                self.chars.len()
            );
            return Err(KiriwakeError::invalid_argument("input", msg));
        }
        self.compute_categories(char_prop);
        self.compute_groupable();
        Ok(())
    }

    fn compute_basic(&mut self) {
        self.chars.clear();
        self.c2b.clear();
        for (bi, ch) in self.input.char_indices() {
            self.chars.push(ch);
            self.c2b.push(bi);
        }
        self.c2b.push(self.input.len());
    }

    fn compute_categories(&mut self, char_prop: &CharProperty) {
        self.cinfos.clear();
        self.cinfos.reserve(self.chars.len());
        for &c in &self.chars {
            self.cinfos.push(char_prop.char_info(c));
        }
    }

    // groupable[i] is the length of the longest run starting at i in which
    // adjacent characters share a category.
    fn compute_groupable(&mut self) {
        debug_assert_eq!(self.chars.len(), self.cinfos.len());

        self.groupable.clear();
        self.groupable.resize(self.chars.len(), 1);
        let Some(last) = self.cinfos.last() else {
            return;
        };
        let mut rhs = last.cate_idset();

        for i in (1..self.chars.len()).rev() {
            let lhs = self.cinfos[i - 1].cate_idset();
            if (lhs & rhs) != 0 {
                self.groupable[i - 1] = self.groupable[i] + 1;
            }
            rhs = lhs;
        }
    }

    #[inline(always)]
    pub fn raw(&self) -> &str {
        &self.input
    }

    #[inline(always)]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    #[inline(always)]
    pub fn len_char(&self) -> usize {
        self.chars.len()
    }

    #[inline(always)]
    pub fn byte_position(&self, pos_char: usize) -> usize {
        self.c2b[pos_char]
    }

    #[inline(always)]
    pub fn char_info(&self, pos_char: usize) -> CharInfo {
        self.cinfos[pos_char]
    }

    #[inline(always)]
    pub fn groupable(&self, pos_char: usize) -> usize {
        self.groupable[pos_char]
    }
}

/// Splits `input` into segments, each ending with a match of `delimiter`
/// except possibly the last one.
///
/// Returns character ranges of non-empty segments covering the whole input.
pub fn split_segments(input: &str, delimiter: &Regex) -> Vec<Range<usize>> {
    let mut segments = vec![];
    let mut start_byte = 0;
    let mut start_char = 0;
    for m in delimiter.find_iter(input) {
        if m.end() == start_byte {
            continue;
        }
        let end_char = start_char + input[start_byte..m.end()].chars().count();
        segments.push(start_char..end_char);
        start_byte = m.end();
        start_char = end_char;
    }
    if start_byte < input.len() {
        let end_char = start_char + input[start_byte..].chars().count();
        segments.push(start_char..end_char);
    }
    segments
}
