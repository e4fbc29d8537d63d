use crate::dictionary::connector::{ConnectorCost, MatrixConnector};
use crate::dictionary::{LexType, WordIdx, WordParam};
use crate::tokenizer::lattice::Lattice;

macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = hashbrown::HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

pub(crate) use hashmap;

/// Linear congruential generator for reproducible test inputs.
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) const fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub(crate) fn range(&mut self, lo: i32, hi: i32) -> i32 {
        lo + (self.next_u32() % (hi - lo) as u32) as i32
    }
}

/// Enumerates every BOS-to-EOS path of a scored lattice with its cost,
/// using the penalties recorded at the scoring.
pub(crate) fn enumerate_paths<C>(lattice: &Lattice, connector: &C) -> Vec<(Vec<u32>, i64)>
where
    C: ConnectorCost,
{
    let eos_idx = lattice.eos_idx().unwrap();
    let mut paths = vec![];
    let mut stack = vec![(lattice.bos_idx(), vec![], 0i64)];
    while let Some((l_idx, path, cost)) = stack.pop() {
        let l_node = lattice.node(l_idx);
        for &r_idx in lattice.starts_at(l_node.end_char()) {
            let r_node = lattice.node(r_idx);
            let cost = cost
                + i64::from(connector.cost(l_node.right_id(), r_node.left_id()))
                + i64::from(r_node.word_cost())
                + i64::from(r_node.penalty());
            if r_idx == eos_idx {
                paths.push((path.clone(), cost));
            } else {
                let mut path = path.clone();
                path.push(r_idx);
                stack.push((r_idx, path, cost));
            }
        }
    }
    paths.sort_by_key(|(_, cost)| *cost);
    paths
}

/// Builds a random connected lattice over `len_char` positions with a
/// random `num_ids` x `num_ids` connection matrix.
pub(crate) fn random_lattice(
    rng: &mut Lcg,
    len_char: usize,
    num_ids: u16,
) -> (Lattice, MatrixConnector) {
    let n = usize::from(num_ids);
    let data = (0..n * n).map(|_| rng.range(-30, 30) as i16).collect();
    let connector = MatrixConnector::new(data, n, n);

    let mut lattice = Lattice::default();
    lattice.reset(len_char).unwrap();
    let mut word_id = 0;
    for start in 0..len_char {
        if !lattice.has_previous_node(start) {
            continue;
        }
        let num_words = rng.range(1, 4);
        for i in 0..num_words {
            let max_len = (len_char - start).min(3) as i32;
            let len = if i == 0 { 1 } else { rng.range(1, max_len + 1) as usize };
            let param = WordParam::new(
                rng.range(0, i32::from(num_ids)) as u16,
                rng.range(0, i32::from(num_ids)) as u16,
                rng.range(0, 100) as i16,
            );
            let lex_type = if rng.range(0, 4) == 0 {
                LexType::Unknown
            } else {
                LexType::System
            };
            let word_idx = WordIdx::new(lex_type, word_id);
            lattice.insert_node(start, start + len, word_idx, param);
            word_id += 1;
        }
    }
    lattice.insert_eos();
    (lattice, connector)
}
