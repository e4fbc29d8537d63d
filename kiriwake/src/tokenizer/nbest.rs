//! N-best search over a scored lattice.
//!
//! A path is described by the sidetracks it takes, where a sidetrack is a
//! non-best predecessor chosen at a node. Each node `v` owns a list of all
//! sidetracks on the best path from `v` back to BOS, sorted by extra cost and
//! sharing its tail with the list of the best predecessor of `v`. Paths are
//! then enumerated in ascending cost by walking a tree over these lists.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::dictionary::connector::ConnectorCost;
use crate::errors::{KiriwakeError, Result};
use crate::tokenizer::lattice::{Lattice, Node, INVALID_IDX};
use crate::utils::FromU32;

/// Path found by the n-best search.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NbestPath {
    /// Nodes from the beginning to the end, excluding BOS/EOS.
    pub nodes: Vec<Node>,
    /// Total cost of the path.
    pub cost: i64,
}

/// Paths in ascending order of cost.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultiSearchResult {
    /// Found paths.
    pub paths: Vec<NbestPath>,
}

impl MultiSearchResult {
    /// Number of paths.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Checks if no path was found.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Moves the spans of all nodes by `offset` characters.
    pub(crate) fn shift(&mut self, offset: usize) -> Result<()> {
        for path in &mut self.paths {
            for node in &mut path.nodes {
                node.shift(offset)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct Sidetrack {
    extra: i64,
    tail: u32,
    head: u32,
    next: u32,
}

#[derive(Clone, Copy, Debug)]
struct SearchState {
    sidetrack: u32,
    parent: u32,
}

#[derive(Debug, Eq, PartialEq)]
struct HeapEntry {
    cost: i64,
    seq: u32,
    state: u32,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed for a min-heap; ties are popped in push order.
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Sidetracks {
    cells: Vec<Sidetrack>,
    // heads[i] is the first cell of the list of node i.
    heads: Vec<u32>,
}

impl Sidetracks {
    fn build<C>(lattice: &Lattice, connector: &C) -> Result<Self>
    where
        C: ConnectorCost,
    {
        let mut sidetracks = Self {
            cells: vec![],
            heads: vec![INVALID_IDX; lattice.num_nodes()],
        };
        let mut own = vec![];
        for pos in 0..=lattice.len_char() {
            for &r_idx in lattice.starts_at(pos) {
                let r_node = lattice.node(r_idx);
                if !r_node.is_connected_to_bos() {
                    continue;
                }
                own.clear();
                for &l_idx in lattice.ends_at(pos) {
                    let l_node = lattice.node(l_idx);
                    if l_idx == r_node.min_idx() || !l_node.is_connected_to_bos() {
                        continue;
                    }
                    let extra = l_node.min_cost()
                        + i64::from(connector.cost(l_node.right_id(), r_node.left_id()))
                        + i64::from(r_node.word_cost())
                        + i64::from(r_node.penalty())
                        - r_node.min_cost();
                    if extra < 0 {
                        return Err(KiriwakeError::invalid_state(
                            "A sidetrack has a negative cost",
                            format!("pos={pos}, extra={extra}"),
                        ));
                    }
                    own.push((extra, l_idx));
                }
                own.sort_by_key(|&(extra, _)| extra);
                let inherited = sidetracks.heads[usize::from_u32(r_node.min_idx())];
                let head = sidetracks.push_list(&own, r_idx, inherited)?;
                sidetracks.heads[usize::from_u32(r_idx)] = head;
            }
        }
        Ok(sidetracks)
    }

    // Merges the sorted `own` options of node `head` into the list starting at
    // `inherited`, copying only the inherited cells placed before the last own option.
    fn push_list(&mut self, own: &[(i64, u32)], head: u32, inherited: u32) -> Result<u32> {
        if own.is_empty() {
            return Ok(inherited);
        }
        let mut merged = Vec::with_capacity(own.len());
        let mut rest = inherited;
        let mut own_it = own.iter().peekable();
        while let Some(&&(extra, tail)) = own_it.peek() {
            if rest != INVALID_IDX && self.cells[usize::from_u32(rest)].extra < extra {
                let cell = self.cells[usize::from_u32(rest)];
                merged.push(cell);
                rest = cell.next;
            } else {
                merged.push(Sidetrack {
                    extra,
                    tail,
                    head,
                    next: INVALID_IDX,
                });
                own_it.next();
            }
        }
        let mut next = rest;
        for mut cell in merged.into_iter().rev() {
            cell.next = next;
            next = u32::try_from(self.cells.len())?;
            self.cells.push(cell);
        }
        Ok(next)
    }

    #[inline(always)]
    fn cell(&self, idx: u32) -> &Sidetrack {
        &self.cells[usize::from_u32(idx)]
    }

    #[inline(always)]
    fn head_of(&self, node_idx: u32) -> u32 {
        self.heads[usize::from_u32(node_idx)]
    }
}

/// Finds at most `max_count` paths whose costs are no more than the best cost
/// plus `cost_slack`, in ascending order of cost.
///
/// The first path is always the best path found by [`Lattice::score()`],
/// which must have been called beforehand.
///
/// # Errors
///
/// [`KiriwakeError::InvalidState`] is returned when the lattice is not scored
/// or the scores are inconsistent.
pub(crate) fn k_best<C>(
    lattice: &Lattice,
    connector: &C,
    max_count: usize,
    cost_slack: i64,
) -> Result<MultiSearchResult>
where
    C: ConnectorCost,
{
    let mut result = MultiSearchResult::default();
    if max_count == 0 {
        return Ok(result);
    }

    let eos_idx = lattice.eos_idx()?;
    let best_cost = lattice.best_cost()?;
    let best_path = lattice.best_path_indices()?;
    let cost_bound = best_cost.saturating_add(cost_slack.max(0));

    let sidetracks = Sidetracks::build(lattice, connector)?;
    tracing::trace!(
        num_sidetracks = sidetracks.cells.len(),
        best_cost,
        "built sidetracks"
    );

    let mut states = vec![SearchState {
        sidetrack: INVALID_IDX,
        parent: INVALID_IDX,
    }];
    let mut heap = BinaryHeap::new();
    let mut seq = 0;
    heap.push(HeapEntry {
        cost: best_cost,
        seq,
        state: 0,
    });

    while let Some(entry) = heap.pop() {
        if entry.cost > cost_bound {
            break;
        }
        let state = states[usize::from_u32(entry.state)];

        let indices = if state.sidetrack == INVALID_IDX {
            best_path.clone()
        } else {
            reconstruct(lattice, &sidetracks, &states, entry.state, eos_idx)?
        };
        let nodes = indices
            .into_iter()
            .map(|idx| lattice.node(idx).clone())
            .collect();
        result.paths.push(NbestPath {
            nodes: lattice.finish_path(nodes),
            cost: entry.cost,
        });
        if result.paths.len() >= max_count {
            break;
        }

        let mut push = |sidetrack: u32, parent: u32, cost: i64| -> Result<()> {
            seq += 1;
            let state = u32::try_from(states.len())?;
            states.push(SearchState { sidetrack, parent });
            heap.push(HeapEntry { cost, seq, state });
            Ok(())
        };

        let descend_from = if state.sidetrack == INVALID_IDX {
            eos_idx
        } else {
            let cell = sidetracks.cell(state.sidetrack);
            if cell.next != INVALID_IDX {
                let next = sidetracks.cell(cell.next);
                push(
                    cell.next,
                    state.parent,
                    entry.cost - cell.extra + next.extra,
                )?;
            }
            cell.tail
        };
        let first = sidetracks.head_of(descend_from);
        if first != INVALID_IDX {
            push(
                first,
                entry.state,
                entry.cost + sidetracks.cell(first).extra,
            )?;
        }
    }

    tracing::trace!(num_paths = result.len(), "finished an n-best search");
    Ok(result)
}

// Rebuilds the arena indices of a path, excluding BOS/EOS, from its sidetracks.
fn reconstruct(
    lattice: &Lattice,
    sidetracks: &Sidetracks,
    states: &[SearchState],
    state_idx: u32,
    eos_idx: u32,
) -> Result<Vec<u32>> {
    let mut taken = vec![];
    let mut cur = state_idx;
    while cur != INVALID_IDX {
        let state = states[usize::from_u32(cur)];
        if state.sidetrack != INVALID_IDX {
            taken.push(sidetracks.cell(state.sidetrack));
        }
        cur = state.parent;
    }
    // The sidetrack nearest to EOS comes first.
    taken.reverse();

    let mut taken = taken.into_iter().peekable();
    let mut path = vec![];
    let mut cur = eos_idx;
    loop {
        let pred = match taken.peek() {
            Some(cell) if cell.head == cur => {
                let tail = cell.tail;
                taken.next();
                tail
            }
            _ => lattice.node(cur).min_idx(),
        };
        if pred == INVALID_IDX {
            return Err(KiriwakeError::invalid_state(
                "A node on an n-best path has no predecessor",
                format!("node={cur}"),
            ));
        }
        if pred == lattice.bos_idx() {
            break;
        }
        path.push(pred);
        cur = pred;
    }
    if taken.peek().is_some() {
        return Err(KiriwakeError::invalid_state(
            "A sidetrack is not on the reconstructed path",
            format!("state={state_idx}"),
        ));
    }
    path.reverse();
    Ok(path)
}
