//! Provider of a routine for tokenization.
use crate::errors::Result;
use crate::sentence::{self, Sentence};
use crate::token::{Token, TokenIter};
use crate::tokenizer::lattice::{Lattice, Node};
use crate::tokenizer::merger;
use crate::tokenizer::nbest::{self, MultiSearchResult};
use crate::tokenizer::Tokenizer;

/// Provider of a routine for tokenization.
///
/// It holds the internal data structures used in tokenization,
/// which can be reused to avoid unnecessary memory reallocation.
pub struct Worker<'t> {
    tokenizer: &'t Tokenizer,
    sent: Sentence,
    seg_sent: Sentence,
    lattice: Lattice,
    top_nodes: Vec<Node>,
    nbest: MultiSearchResult,
}

impl<'t> Worker<'t> {
    pub(crate) fn new(tokenizer: &'t Tokenizer) -> Self {
        Self {
            tokenizer,
            sent: Sentence::new(),
            seg_sent: Sentence::new(),
            lattice: Lattice::default(),
            top_nodes: vec![],
            nbest: MultiSearchResult::default(),
        }
    }

    /// Resets the input sentence to be tokenized.
    ///
    /// # Errors
    ///
    /// When the input sentence includes characters more than
    /// [`MAX_SENTENCE_LENGTH`](crate::common::MAX_SENTENCE_LENGTH),
    /// an error will be returned.
    pub fn reset_sentence<S>(&mut self, input: S) -> Result<()>
    where
        S: AsRef<str>,
    {
        self.sent.clear();
        self.top_nodes.clear();
        self.nbest.paths.clear();
        let input = input.as_ref();
        if !input.is_empty() {
            self.sent.set_sentence(input);
            self.sent.compile(self.tokenizer.dictionary().char_prop())?;
        }
        Ok(())
    }

    /// Tokenizes the input sentence set in `reset_sentence()`,
    /// storing the tokens of the minimum-cost path.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`](crate::errors::KiriwakeError) is returned when the
    /// lattice is inconsistent.
    pub fn tokenize(&mut self) -> Result<()> {
        self.top_nodes.clear();
        if self.sent.len_char() == 0 {
            return Ok(());
        }
        let tokenizer = self.tokenizer;
        tokenizer.build_lattice(&self.sent, &mut self.lattice)?;
        self.lattice.score(
            self.sent.chars(),
            tokenizer.dict.connector(),
            tokenizer.mode,
            &tokenizer.penalty,
        )?;
        self.top_nodes = self.lattice.best_path()?;
        tracing::debug!(
            len_char = self.sent.len_char(),
            num_tokens = self.top_nodes.len(),
            cost = self.lattice.best_cost()?,
            "tokenized a sentence"
        );
        Ok(())
    }

    /// Tokenizes the input sentence set in `reset_sentence()`,
    /// storing up to `max_count` paths in ascending order of cost.
    ///
    /// Only paths whose costs are no more than the best cost plus
    /// `cost_slack` are stored. When sentence delimiters are configured,
    /// each segment is searched independently and the results are combined.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`](crate::errors::KiriwakeError) is returned when a
    /// lattice is inconsistent.
    pub fn tokenize_nbest(&mut self, max_count: usize, cost_slack: i64) -> Result<()> {
        self.nbest.paths.clear();
        if self.sent.len_char() == 0 {
            return Ok(());
        }
        let tokenizer = self.tokenizer;

        let segments = tokenizer
            .delimiters
            .as_ref()
            .map(|re| sentence::split_segments(self.sent.raw(), re))
            .unwrap_or_default();
        if segments.len() <= 1 {
            self.nbest = Self::search_segment(
                tokenizer,
                &self.sent,
                &mut self.lattice,
                max_count,
                cost_slack,
            )?;
        } else {
            let mut results = Vec::with_capacity(segments.len());
            for range in &segments {
                let start_byte = self.sent.byte_position(range.start);
                let end_byte = self.sent.byte_position(range.end);
                self.seg_sent
                    .set_sentence(&self.sent.raw()[start_byte..end_byte]);
                self.seg_sent.compile(tokenizer.dict.char_prop())?;
                let mut result = Self::search_segment(
                    tokenizer,
                    &self.seg_sent,
                    &mut self.lattice,
                    max_count,
                    cost_slack,
                )?;
                result.shift(range.start)?;
                tracing::debug!(
                    start_char = range.start,
                    end_char = range.end,
                    num_paths = result.len(),
                    "searched a segment"
                );
                results.push(result);
            }
            self.nbest = merger::merge(&results, max_count, cost_slack);
        }
        tracing::debug!(
            len_char = self.sent.len_char(),
            num_segments = segments.len().max(1),
            num_paths = self.nbest.len(),
            "tokenized a sentence into n-best paths"
        );
        Ok(())
    }

    fn search_segment(
        tokenizer: &Tokenizer,
        sent: &Sentence,
        lattice: &mut Lattice,
        max_count: usize,
        cost_slack: i64,
    ) -> Result<MultiSearchResult> {
        tokenizer.build_lattice(sent, lattice)?;
        let connector = tokenizer.dict.connector();
        lattice.score(sent.chars(), connector, tokenizer.mode, &tokenizer.penalty)?;
        nbest::k_best(lattice, connector, max_count, cost_slack)
    }

    /// Gets the number of resultant tokens.
    #[inline(always)]
    pub fn num_tokens(&self) -> usize {
        self.top_nodes.len()
    }

    /// Gets the `i`-th resultant token.
    #[inline(always)]
    pub fn token<'a>(&'a self, i: usize) -> Token<'a> {
        Token::new(&self.sent, self.tokenizer.dictionary(), &self.top_nodes[i])
    }

    /// Creates an iterator of resultant tokens.
    #[inline(always)]
    pub fn token_iter<'a>(&'a self) -> TokenIter<'a> {
        TokenIter::new(&self.sent, self.tokenizer.dictionary(), &self.top_nodes)
    }

    /// Gets the number of paths found by `tokenize_nbest()`.
    #[inline(always)]
    pub fn num_nbest_paths(&self) -> usize {
        self.nbest.len()
    }

    /// Gets the cost of the `path_idx`-th path, or `None` if out of range.
    #[inline(always)]
    pub fn nbest_cost(&self, path_idx: usize) -> Option<i64> {
        self.nbest.paths.get(path_idx).map(|p| p.cost)
    }

    /// Creates an iterator of the tokens on the `path_idx`-th path,
    /// or returns `None` if out of range.
    pub fn nbest_token_iter<'a>(&'a self, path_idx: usize) -> Option<TokenIter<'a>> {
        self.nbest
            .paths
            .get(path_idx)
            .map(|p| TokenIter::new(&self.sent, self.tokenizer.dictionary(), &p.nodes))
    }

    /// Gets the paths found by `tokenize_nbest()`.
    #[inline(always)]
    pub const fn nbest(&self) -> &MultiSearchResult {
        &self.nbest
    }
}
