use std::fmt;

use crate::common::{BOS_EOS_CONNECTION_ID, SENTINEL_WORD_ID, UNIGRAM_WORD_ID};
use crate::dictionary::connector::ConnectorCost;
use crate::dictionary::{LexType, WordIdx, WordParam};
use crate::errors::{KiriwakeError, Result};
use crate::tokenizer::penalty::{Penalty, SearchMode};
use crate::utils::FromU32;

pub(crate) const MAX_COST: i64 = i64::MAX;
pub(crate) const INVALID_IDX: u32 = u32::MAX;

/// Kind of a node, determining the lexicon it is resolved with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// Word in the system lexicon.
    Known,
    /// Word generated by the unknown-word handler.
    Unknown,
    /// Word in the user lexicon.
    User,
    /// Part of another word, inserted so that a user word connects to its neighbors.
    Inserted,
    /// BOS or EOS.
    Sentinel,
}

/// Candidate word spanning `[start_char, end_char)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    word_id: u32,
    lex_type: LexType,
    start_char: u16,
    end_char: u16,
    left_id: u16,
    right_id: u16,
    word_cost: i16,
    inserted: bool,
    penalty: i32,
    min_idx: u32,
    min_cost: i64,
}

impl Node {
    fn sentinel(pos: u16) -> Self {
        Self {
            word_id: SENTINEL_WORD_ID,
            lex_type: LexType::default(),
            start_char: pos,
            end_char: pos,
            left_id: BOS_EOS_CONNECTION_ID,
            right_id: BOS_EOS_CONNECTION_ID,
            word_cost: 0,
            inserted: false,
            penalty: 0,
            min_idx: INVALID_IDX,
            min_cost: MAX_COST,
        }
    }

    /// Identifier of the word.
    #[inline(always)]
    pub const fn word_idx(&self) -> WordIdx {
        WordIdx::new(self.lex_type, self.word_id)
    }

    /// Kind of the node.
    #[inline(always)]
    pub const fn kind(&self) -> NodeKind {
        if self.word_id == SENTINEL_WORD_ID {
            return NodeKind::Sentinel;
        }
        if self.inserted {
            return NodeKind::Inserted;
        }
        match self.lex_type {
            LexType::System => NodeKind::Known,
            LexType::User => NodeKind::User,
            LexType::Unknown => NodeKind::Unknown,
        }
    }

    /// Start position in characters.
    #[inline(always)]
    pub const fn start_char(&self) -> usize {
        self.start_char as usize
    }

    /// End position in characters, exclusive.
    #[inline(always)]
    pub const fn end_char(&self) -> usize {
        self.end_char as usize
    }

    /// Left connection id.
    #[inline(always)]
    pub const fn left_id(&self) -> u16 {
        self.left_id
    }

    /// Right connection id.
    #[inline(always)]
    pub const fn right_id(&self) -> u16 {
        self.right_id
    }

    /// Word cost without penalty.
    #[inline(always)]
    pub const fn word_cost(&self) -> i16 {
        self.word_cost
    }

    /// Length penalty added at the last scoring.
    #[inline(always)]
    pub const fn penalty(&self) -> i32 {
        self.penalty
    }

    /// Arena index of the best predecessor.
    #[inline(always)]
    pub const fn min_idx(&self) -> u32 {
        self.min_idx
    }

    /// Cost of the best path from BOS to this node, inclusive.
    #[inline(always)]
    pub const fn min_cost(&self) -> i64 {
        self.min_cost
    }

    /// Checks if the node is reachable from BOS after scoring.
    #[inline(always)]
    pub const fn is_connected_to_bos(&self) -> bool {
        self.min_cost != MAX_COST
    }

    /// Moves the span by `offset` characters.
    pub(crate) fn shift(&mut self, offset: usize) -> Result<()> {
        self.start_char = u16::try_from(self.start_char() + offset)?;
        self.end_char = u16::try_from(self.end_char() + offset)?;
        Ok(())
    }
}

/// Splits unknown words into single characters tagged with
/// [`UNIGRAM_WORD_ID`](crate::common::UNIGRAM_WORD_ID).
pub fn expand_unigrams(nodes: Vec<Node>) -> Vec<Node> {
    let mut expanded = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.kind() != NodeKind::Unknown {
            expanded.push(node);
            continue;
        }
        for pos in node.start_char..node.end_char {
            expanded.push(Node {
                word_id: UNIGRAM_WORD_ID,
                lex_type: LexType::Unknown,
                start_char: pos,
                end_char: pos + 1,
                word_cost: 0,
                penalty: 0,
                ..node.clone()
            });
        }
    }
    expanded
}

/// Lattice of candidate words, stored as an arena of nodes.
///
/// Positions are character positions; BOS ends at 0 and EOS starts at `len_char`.
#[derive(Default)]
pub struct Lattice {
    nodes: Vec<Node>,
    starts: Vec<Vec<u32>>,
    ends: Vec<Vec<u32>>,
    eos: Option<u32>,
    len_char: usize,
    mode: SearchMode,
}

impl Lattice {
    /// Clears the lattice and inserts BOS for a sentence of `new_len_char` characters.
    pub fn reset(&mut self, new_len_char: usize) -> Result<()> {
        if u16::try_from(new_len_char).is_err() {
            return Err(KiriwakeError::invalid_argument(
                "new_len_char",
                "The length of a lattice must fit in u16.",
            ));
        }
        Self::reset_vec(&mut self.starts, new_len_char + 1);
        Self::reset_vec(&mut self.ends, new_len_char + 1);
        self.nodes.clear();
        self.len_char = new_len_char;
        self.eos = None;
        self.mode = SearchMode::default();

        let mut bos = Node::sentinel(0);
        bos.min_cost = 0;
        self.nodes.push(bos);
        self.ends[0].push(0);
        Ok(())
    }

    fn reset_vec<T>(data: &mut Vec<Vec<T>>, new_len: usize) {
        for v in data.iter_mut() {
            v.clear();
        }
        let cur_len = data.len();
        if cur_len <= new_len {
            data.reserve(new_len - cur_len);
            for _ in cur_len..new_len {
                data.push(Vec::with_capacity(16))
            }
        }
    }

    /// Returns the number of characters of the set sentence.
    #[inline(always)]
    pub const fn len_char(&self) -> usize {
        self.len_char
    }

    /// Returns the number of nodes including BOS/EOS.
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn node(&self, idx: u32) -> &Node {
        &self.nodes[usize::from_u32(idx)]
    }

    #[inline(always)]
    pub const fn bos_idx(&self) -> u32 {
        0
    }

    #[inline(always)]
    pub fn eos_idx(&self) -> Result<u32> {
        self.eos
            .ok_or_else(|| KiriwakeError::invalid_state("EOS is not inserted", "lattice"))
    }

    /// Gets the arena indices of nodes starting at `pos`.
    #[inline(always)]
    pub fn starts_at(&self, pos: usize) -> &[u32] {
        &self.starts[pos]
    }

    /// Gets the arena indices of nodes ending at `pos`.
    #[inline(always)]
    pub fn ends_at(&self, pos: usize) -> &[u32] {
        &self.ends[pos]
    }

    /// Inserts a word over `[start_char, end_char)`.
    ///
    /// Positions fit in u16 as checked at [`Self::reset()`].
    pub fn insert_node(
        &mut self,
        start_char: usize,
        end_char: usize,
        word_idx: WordIdx,
        word_param: WordParam,
    ) {
        debug_assert!(start_char < end_char);
        debug_assert!(end_char <= self.len_char);
        debug_assert!(self.has_previous_node(start_char));

        self.push_node(Node {
            word_id: word_idx.word_id,
            lex_type: word_idx.lex_type,
            start_char: start_char as u16,
            end_char: end_char as u16,
            left_id: word_param.left_id,
            right_id: word_param.right_id,
            word_cost: word_param.word_cost,
            inserted: false,
            penalty: 0,
            min_idx: INVALID_IDX,
            min_cost: MAX_COST,
        });
    }

    fn push_node(&mut self, node: Node) {
        let idx = self.nodes.len() as u32;
        self.starts[node.start_char()].push(idx);
        self.ends[node.end_char()].push(idx);
        self.nodes.push(node);
    }

    // Inserts the part `[start_char, end_char)` of the node `base_idx`.
    fn insert_part(&mut self, start_char: usize, end_char: usize, base_idx: u32) {
        debug_assert!(self.has_previous_node(start_char));
        let base = self.node(base_idx).clone();
        debug_assert!(base.start_char() <= start_char && end_char <= base.end_char());
        self.push_node(Node {
            start_char: start_char as u16,
            end_char: end_char as u16,
            inserted: true,
            ..base
        });
    }

    /// Makes a node end at `pos` by inserting the head of the shortest word
    /// that covers `pos` and starts at the nearest position before it.
    ///
    /// Returns `false` if no word covers `pos`.
    pub fn connect_before(&mut self, pos: usize) -> bool {
        for start in (0..pos).rev() {
            let base = self.starts[start]
                .iter()
                .copied()
                .filter(|&idx| self.node(idx).end_char() > pos)
                .min_by_key(|&idx| self.node(idx).end_char());
            if let Some(base_idx) = base {
                self.insert_part(start, pos, base_idx);
                return true;
            }
        }
        false
    }

    /// Makes a node start at `pos` by inserting the tail of the shortest word
    /// that covers `pos` and ends at the nearest position after it from which
    /// the end of the sentence is reachable.
    ///
    /// `to_end` is the result of [`Self::reachable_to_end()`].
    /// Returns `false` if no such word exists.
    pub fn connect_after(&mut self, pos: usize, to_end: &[bool]) -> bool {
        for end in pos + 1..=self.len_char {
            if !to_end[end] {
                continue;
            }
            let base = self.ends[end]
                .iter()
                .copied()
                .filter(|&idx| self.node(idx).start_char() < pos)
                .min_by_key(|&idx| end - self.node(idx).start_char());
            if let Some(base_idx) = base {
                self.insert_part(pos, end, base_idx);
                return true;
            }
        }
        false
    }

    /// Computes for each position whether a sequence of nodes leads from it
    /// to the end of the sentence.
    pub fn reachable_to_end(&self) -> Vec<bool> {
        let mut to_end = vec![false; self.len_char + 1];
        to_end[self.len_char] = true;
        for pos in (0..self.len_char).rev() {
            to_end[pos] = self.starts[pos]
                .iter()
                .any(|&idx| to_end[self.node(idx).end_char()]);
        }
        to_end
    }

    /// Inserts EOS at the end of the sentence.
    pub fn insert_eos(&mut self) {
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node::sentinel(self.len_char as u16));
        self.starts[self.len_char].push(idx);
        self.eos = Some(idx);
    }

    /// Checks if there exist at least one at the word end boundary
    #[inline(always)]
    pub fn has_previous_node(&self, i: usize) -> bool {
        self.ends.get(i).map(|d| !d.is_empty()).unwrap_or(false)
    }

    /// Computes the best path to every node.
    ///
    /// Scoring is repeatable; all results of a previous scoring are discarded.
    /// When two predecessors give the same cost, the one inserted first wins.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError::InvalidState`] is returned when EOS is unreachable.
    pub fn score<C>(
        &mut self,
        chars: &[char],
        connector: &C,
        mode: SearchMode,
        penalty: &Penalty,
    ) -> Result<()>
    where
        C: ConnectorCost,
    {
        debug_assert_eq!(chars.len(), self.len_char);
        let eos_idx = self.eos_idx()?;

        for node in &mut self.nodes {
            node.min_idx = INVALID_IDX;
            node.min_cost = MAX_COST;
            node.penalty = 0;
        }
        self.nodes[0].min_cost = 0;
        self.mode = mode;

        for pos in 0..=self.len_char {
            for &r_idx in &self.starts[pos] {
                let r_node = &self.nodes[usize::from_u32(r_idx)];
                let pen = if mode.is_penalized() && r_node.kind() != NodeKind::Sentinel {
                    penalty.cost(&chars[r_node.start_char()..r_node.end_char()])
                } else {
                    0
                };
                let own_cost = i64::from(r_node.word_cost) + i64::from(pen);

                let mut min_idx = INVALID_IDX;
                let mut min_cost = MAX_COST;
                for &l_idx in &self.ends[pos] {
                    let l_node = &self.nodes[usize::from_u32(l_idx)];
                    if !l_node.is_connected_to_bos() {
                        continue;
                    }
                    let cost = l_node.min_cost
                        + i64::from(connector.cost(l_node.right_id, r_node.left_id))
                        + own_cost;
                    if cost < min_cost {
                        min_idx = l_idx;
                        min_cost = cost;
                    }
                }

                let r_node = &mut self.nodes[usize::from_u32(r_idx)];
                r_node.penalty = pen;
                r_node.min_idx = min_idx;
                r_node.min_cost = min_cost;
            }
        }

        let eos = self.node(eos_idx);
        if !eos.is_connected_to_bos() {
            return Err(KiriwakeError::invalid_state(
                "EOS has no predecessor connected to BOS",
                format!("len_char={}", self.len_char),
            ));
        }
        tracing::trace!(
            num_nodes = self.nodes.len(),
            best_cost = eos.min_cost,
            "scored a lattice"
        );
        Ok(())
    }

    /// Gets the cost of the best path.
    pub fn best_cost(&self) -> Result<i64> {
        Ok(self.node(self.eos_idx()?).min_cost)
    }

    /// Gets the arena indices of the best path, excluding BOS/EOS.
    pub fn best_path_indices(&self) -> Result<Vec<u32>> {
        let eos = self.node(self.eos_idx()?);
        if !eos.is_connected_to_bos() {
            return Err(KiriwakeError::invalid_state(
                "The lattice is not scored",
                "EOS has no predecessor",
            ));
        }
        let mut path = vec![];
        let mut idx = eos.min_idx;
        while idx != self.bos_idx() {
            if idx == INVALID_IDX {
                return Err(KiriwakeError::invalid_state(
                    "A node on the best path has no predecessor",
                    format!("path_len={}", path.len()),
                ));
            }
            path.push(idx);
            idx = self.node(idx).min_idx;
        }
        path.reverse();
        Ok(path)
    }

    /// Gets the nodes of the best path, excluding BOS/EOS.
    ///
    /// In [`SearchMode::Extended`], unknown words are split into single characters.
    pub fn best_path(&self) -> Result<Vec<Node>> {
        let nodes = self
            .best_path_indices()?
            .into_iter()
            .map(|idx| self.node(idx).clone())
            .collect();
        Ok(self.finish_path(nodes))
    }

    pub(crate) fn finish_path(&self, nodes: Vec<Node>) -> Vec<Node> {
        if self.mode == SearchMode::Extended {
            expand_unigrams(nodes)
        } else {
            nodes
        }
    }
}

impl fmt::Debug for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lattice {{ eos: {:?}, ends: [", &self.eos)?;
        for (i, e) in self.ends[..=self.len_char].iter().enumerate() {
            let nodes: Vec<_> = e.iter().map(|&idx| self.node(idx)).collect();
            writeln!(f, "{i} => {nodes:?}")?;
        }
        writeln!(f, "]}}")
    }
}
