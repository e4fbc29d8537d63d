//! Container of resultant tokens.
use std::ops::Range;

use crate::dictionary::{Dictionary, LexType};
use crate::sentence::Sentence;
use crate::tokenizer::{Node, NodeKind};

/// Resultant token.
pub struct Token<'a> {
    sent: &'a Sentence,
    dict: &'a Dictionary,
    node: &'a Node,
}

impl<'a> Token<'a> {
    #[inline(always)]
    pub(crate) const fn new(sent: &'a Sentence, dict: &'a Dictionary, node: &'a Node) -> Self {
        Self { sent, dict, node }
    }

    /// Gets the position range of the token in characters.
    #[inline(always)]
    pub fn range_char(&self) -> Range<usize> {
        self.node.start_char()..self.node.end_char()
    }

    /// Gets the position range of the token in bytes.
    #[inline(always)]
    pub fn range_byte(&self) -> Range<usize> {
        let start = self.sent.byte_position(self.node.start_char());
        let end = self.sent.byte_position(self.node.end_char());
        start..end
    }

    /// Gets the surface string of the token.
    #[inline(always)]
    pub fn surface(&self) -> &'a str {
        &self.sent.raw()[self.range_byte()]
    }

    /// Gets the feature string of the token.
    #[inline(always)]
    pub fn feature(&self) -> &'a str {
        self.dict.word_feature(self.node.word_idx())
    }

    /// Gets the comma-separated fields of the feature string.
    pub fn features(&self) -> Vec<String> {
        self.dict.word_features(self.node.word_idx())
    }

    /// Gets the lexicon type where the token is from.
    #[inline(always)]
    pub fn lex_type(&self) -> LexType {
        self.node.word_idx().lex_type
    }

    /// Checks if the token is a single character split from an unknown word
    /// in [`SearchMode::Extended`](crate::tokenizer::SearchMode::Extended).
    #[inline(always)]
    pub fn is_unigram(&self) -> bool {
        self.node.kind() == NodeKind::Unknown
            && self.node.word_idx().word_id == crate::common::UNIGRAM_WORD_ID
    }

    /// Checks if the token is a part of a word, inserted to connect a user
    /// word to its neighbors. Its features are those of the whole word.
    #[inline(always)]
    pub fn is_inserted(&self) -> bool {
        self.node.kind() == NodeKind::Inserted
    }

    /// Gets the left id of the token's node.
    #[inline(always)]
    pub fn left_id(&self) -> u16 {
        self.node.left_id()
    }

    /// Gets the right id of the token's node.
    #[inline(always)]
    pub fn right_id(&self) -> u16 {
        self.node.right_id()
    }

    /// Gets the word cost of the token's node.
    #[inline(always)]
    pub fn word_cost(&self) -> i16 {
        self.node.word_cost()
    }

    /// Gets the total cost of the best path from the beginning of its segment
    /// to the token's node.
    #[inline(always)]
    pub fn total_cost(&self) -> i64 {
        self.node.min_cost()
    }
}

/// Iterator of tokens.
pub struct TokenIter<'a> {
    sent: &'a Sentence,
    dict: &'a Dictionary,
    nodes: std::slice::Iter<'a, Node>,
}

impl<'a> TokenIter<'a> {
    #[inline(always)]
    pub(crate) fn new(sent: &'a Sentence, dict: &'a Dictionary, nodes: &'a [Node]) -> Self {
        Self {
            sent,
            dict,
            nodes: nodes.iter(),
        }
    }
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token<'a>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.nodes
            .next()
            .map(|node| Token::new(self.sent, self.dict, node))
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl ExactSizeIterator for TokenIter<'_> {}
