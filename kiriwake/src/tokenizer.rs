//! Lattice-based tokenizer.
pub(crate) mod lattice;
pub mod merger;
pub mod nbest;
pub mod penalty;
pub mod worker;

use regex::Regex;

use crate::dictionary::user::UserMatch;
use crate::dictionary::Dictionary;
use crate::errors::{KiriwakeError, Result};
use crate::sentence::Sentence;
use crate::tokenizer::lattice::Lattice;
use crate::tokenizer::worker::Worker;

pub use crate::tokenizer::lattice::{Node, NodeKind};
pub use crate::tokenizer::nbest::{MultiSearchResult, NbestPath};
pub use crate::tokenizer::penalty::{Penalty, SearchMode, UnkSuppression};

/// Tokenizer.
pub struct Tokenizer {
    dict: Dictionary,
    mode: SearchMode,
    penalty: Penalty,
    unk_suppression: UnkSuppression,
    max_grouping_len: Option<usize>,
    delimiters: Option<Regex>,
}

impl Tokenizer {
    /// Creates a new instance.
    ///
    /// # Arguments
    ///
    ///  - `dict`: Dictionary to be used.
    pub fn new(dict: Dictionary) -> Self {
        Self {
            dict,
            mode: SearchMode::default(),
            penalty: Penalty::default(),
            unk_suppression: UnkSuppression::default(),
            max_grouping_len: None,
            delimiters: None,
        }
    }

    /// Specifies the search mode. The default is [`SearchMode::Normal`].
    pub const fn mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Specifies the length penalties used in [`SearchMode::Search`] and
    /// [`SearchMode::Extended`].
    pub const fn penalty(mut self, penalty: Penalty) -> Self {
        self.penalty = penalty;
        self
    }

    /// Specifies when unknown words are not generated at a position already
    /// covered by another unknown word. The default is [`UnkSuppression::PerMode`].
    pub const fn unk_suppression(mut self, unk_suppression: UnkSuppression) -> Self {
        self.unk_suppression = unk_suppression;
        self
    }

    /// Specifies the maximum grouping length for unknown words.
    /// By default, the length is infinity.
    ///
    /// # Arguments
    ///
    ///  - `max_grouping_len`: The maximum grouping length for unknown words.
    ///    The value 0 indicates the infinity length.
    pub const fn max_grouping_len(mut self, max_grouping_len: usize) -> Self {
        if max_grouping_len != 0 {
            self.max_grouping_len = Some(max_grouping_len);
        } else {
            self.max_grouping_len = None;
        }
        self
    }

    /// Specifies characters that end a segment in
    /// [`Worker::tokenize_nbest()`]. Segments are searched independently and
    /// their results are merged.
    ///
    /// # Arguments
    ///
    ///  - `delimiters`: Delimiter characters, e.g., `"。！？"`.
    ///    If `None`, the input is searched as a whole.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`] is returned when `delimiters` is empty.
    pub fn sentence_delimiters(mut self, delimiters: Option<&str>) -> Result<Self> {
        self.delimiters = match delimiters {
            Some(delimiters) => {
                if delimiters.is_empty() {
                    return Err(KiriwakeError::invalid_argument(
                        "delimiters",
                        "delimiters must not be empty.",
                    ));
                }
                let alternatives: Vec<_> = delimiters
                    .chars()
                    .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
                    .collect();
                let pattern = format!("(?:{})+", alternatives.join("|"));
                let re = Regex::new(&pattern)
                    .map_err(|e| KiriwakeError::invalid_argument("delimiters", e.to_string()))?;
                Some(re)
            }
            None => None,
        };
        Ok(self)
    }

    /// Gets the reference to the dictionary.
    pub const fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Creates a new worker.
    pub fn new_worker(&self) -> Worker<'_> {
        Worker::new(self)
    }

    /// Builds the lattice of the sentence.
    ///
    /// Every position reached by a word is scanned for known words and, when
    /// needed, unknown words. User words are overlaid after the scan at every
    /// position they match.
    pub(crate) fn build_lattice(&self, sent: &Sentence, lattice: &mut Lattice) -> Result<()> {
        lattice.reset(sent.len_char())?;

        let suppress_unk = self.unk_suppression.is_active(self.mode);
        let mut unk_covered = 0;

        for start in 0..sent.len_char() {
            if !lattice.has_previous_node(start) {
                continue;
            }

            let found = self.add_known_words(sent, lattice, start);

            let cinfo = sent.char_info(start);
            if (cinfo.invoke() || !found) && !(suppress_unk && start < unk_covered) {
                let end = self.dict.unk_handler().gen_unk_words(
                    sent,
                    start,
                    self.max_grouping_len,
                    |w| {
                        lattice.insert_node(
                            w.start_char(),
                            w.end_char(),
                            w.word_idx(),
                            w.word_param(),
                        );
                    },
                );
                unk_covered = unk_covered.max(end);
            }
        }

        if let Some(user_lexicon) = self.dict.user_lexicon() {
            let matches = user_lexicon.find_matches(sent.chars());
            if !matches.is_empty() {
                self.add_user_words(lattice, &matches);
            }
        }

        lattice.insert_eos();
        tracing::trace!(
            len_char = sent.len_char(),
            num_nodes = lattice.num_nodes(),
            "built a lattice"
        );
        Ok(())
    }

    fn add_known_words(&self, sent: &Sentence, lattice: &mut Lattice, start: usize) -> bool {
        let mut found = false;
        for m in self
            .dict
            .system_lexicon()
            .common_prefix_iterator(&sent.chars()[start..])
        {
            lattice.insert_node(start, start + m.end_char(), m.word_idx(), m.word_param());
            found = true;
        }
        found
    }

    // A user word is placed at its span whatever the scan produced there.
    // When no node ends at its start or no path leads from its end to EOS,
    // parts of the covering words are inserted to connect it.
    fn add_user_words(&self, lattice: &mut Lattice, matches: &[UserMatch]) {
        let mut to_end = lattice.reachable_to_end();
        for m in matches {
            if !lattice.has_previous_node(m.start_char) && !lattice.connect_before(m.start_char) {
                tracing::debug!(
                    start_char = m.start_char,
                    end_char = m.end_char,
                    "no word covers the start of a user word"
                );
                continue;
            }
            lattice.insert_node(m.start_char, m.end_char, m.word_idx, m.word_param);
            if !to_end[m.end_char] && lattice.connect_after(m.end_char, &to_end) {
                to_end[m.end_char] = true;
            }
        }
    }
}
