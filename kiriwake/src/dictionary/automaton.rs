//! Double-array trie used to match surface forms of the lexicon.
//!
//! Each state of the trie is a fixed-size [`Unit`] in a flat vector. A
//! transition from unit `i` by a character with code `k` goes to unit
//! `base[i] + k`, and is valid iff `check[base[i] + k] == i`. A state whose
//! remaining suffix is a single chain of characters ending in one entry is
//! not expanded into units; the chain is stored once in the tail buffer as
//! `[len, code_1, .., code_len, value]`.
use bincode::{Decode, Encode};

use crate::errors::{KiriwakeError, Result};
use crate::utils::FromU32;

const VACANT: u32 = u32::MAX;
const ROOT_CHECK: u32 = u32::MAX - 1;
const NO_VALUE: u32 = u32::MAX;
const TAIL_FLAG: u32 = 1 << 31;
const ROOT_IDX: u32 = 0;

/// Result of a lookup in [`DoubleArray`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AutomatonMatch {
    /// No entry starts with the queried string. Extending it never matches.
    NoMatch,

    /// The queried string is a proper prefix of some entry.
    PrefixOnly,

    /// The queried string is an entry associated with the value.
    /// It may also be a prefix of longer entries.
    Complete(u32),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Node(u32),
    Tail { pos: u32, matched: u32 },
    Dead,
}

/// Position in a [`DoubleArray`] reached by consuming characters one by one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cursor(State);

impl Cursor {
    /// Checks if no further character can match.
    #[inline(always)]
    pub fn is_dead(&self) -> bool {
        self.0 == State::Dead
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Decode, Encode)]
struct Unit {
    base: u32,
    check: u32,
    value: u32,
}

impl Unit {
    const fn vacant() -> Self {
        Self {
            base: 0,
            check: VACANT,
            value: NO_VALUE,
        }
    }

    #[inline(always)]
    const fn is_tail(&self) -> bool {
        self.base & TAIL_FLAG != 0
    }

    #[inline(always)]
    const fn tail_pos(&self) -> u32 {
        self.base & !TAIL_FLAG
    }
}

/// Mapping from characters to dense codes, ranked by frequency.
///
/// Code 0 means that the character never appears in the keys.
#[derive(Default, Decode, Encode)]
struct CodeMapper {
    table: Vec<u32>,
    alphabet_size: u32,
}

impl CodeMapper {
    fn new<K>(keys: &[K]) -> Result<Self>
    where
        K: AsRef<str>,
    {
        let mut freqs = vec![];
        for key in keys {
            for c in key.as_ref().chars() {
                let c = usize::from_u32(u32::from(c));
                if freqs.len() <= c {
                    freqs.resize(c + 1, 0usize);
                }
                freqs[c] += 1;
            }
        }
        let mut sorted: Vec<_> = freqs
            .iter()
            .enumerate()
            .filter(|(_, f)| **f != 0)
            .map(|(c, f)| (c, *f))
            .collect();
        // Frequent characters get small codes so that bases are packed densely.
        sorted.sort_unstable_by(|(c1, f1), (c2, f2)| f2.cmp(f1).then(c1.cmp(c2)));

        let mut table = vec![0; freqs.len()];
        for (i, &(c, _)) in sorted.iter().enumerate() {
            table[c] = u32::try_from(i + 1)?;
        }
        Ok(Self {
            table,
            alphabet_size: u32::try_from(sorted.len())?,
        })
    }

    #[inline(always)]
    fn get(&self, c: char) -> Option<u32> {
        self.table
            .get(usize::from_u32(u32::from(c)))
            .copied()
            .filter(|&code| code != 0)
    }
}

/// Double-array trie mapping strings to 32-bit values.
#[derive(Default, Decode, Encode)]
pub struct DoubleArray {
    units: Vec<Unit>,
    tail: Vec<u32>,
    mapper: CodeMapper,
}

impl DoubleArray {
    /// Builds a new trie from records of keys and values.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`] is returned when
    ///  - the keys are not sorted in strictly ascending order,
    ///  - a key is empty,
    ///  - a value is `u32::MAX`, or
    ///  - the trie outgrows the addressable range.
    pub fn from_records<K>(records: &[(K, u32)]) -> Result<Self>
    where
        K: AsRef<str>,
    {
        let keys: Vec<&str> = records.iter().map(|(k, _)| k.as_ref()).collect();
        let mapper = CodeMapper::new(&keys)?;
        let nodes = BuildNode::build_trie(records, &mapper)?;
        let mut builder = DoubleArrayBuilder::new();
        builder.arrange(&nodes)?;
        Ok(Self {
            units: builder.units,
            tail: builder.tail,
            mapper,
        })
    }

    /// Returns a cursor at the root, i.e., the empty string.
    #[inline(always)]
    pub const fn cursor(&self) -> Cursor {
        Cursor(State::Node(ROOT_IDX))
    }

    /// Extends the string read by the cursor with `c`.
    #[inline(always)]
    pub fn step(&self, cursor: &mut Cursor, c: char) -> AutomatonMatch {
        let Some(code) = self.mapper.get(c) else {
            cursor.0 = State::Dead;
            return AutomatonMatch::NoMatch;
        };
        match cursor.0 {
            State::Dead => AutomatonMatch::NoMatch,
            State::Node(idx) => {
                let unit = &self.units[usize::from_u32(idx)];
                debug_assert!(!unit.is_tail());
                let next = usize::from_u32(unit.base) + usize::from_u32(code);
                match self.units.get(next) {
                    Some(child) if child.check == idx => {
                        if child.is_tail() {
                            cursor.0 = State::Tail {
                                pos: child.tail_pos(),
                                matched: 0,
                            };
                            AutomatonMatch::PrefixOnly
                        } else {
                            // next < TAIL_FLAG holds by construction.
                            cursor.0 = State::Node(next as u32);
                            if child.value == NO_VALUE {
                                AutomatonMatch::PrefixOnly
                            } else {
                                AutomatonMatch::Complete(child.value)
                            }
                        }
                    }
                    _ => {
                        cursor.0 = State::Dead;
                        AutomatonMatch::NoMatch
                    }
                }
            }
            State::Tail { pos, matched } => {
                let pos = usize::from_u32(pos);
                let len = self.tail[pos];
                if matched < len && self.tail[pos + 1 + usize::from_u32(matched)] == code {
                    let matched = matched + 1;
                    cursor.0 = State::Tail {
                        pos: pos as u32,
                        matched,
                    };
                    if matched == len {
                        AutomatonMatch::Complete(self.tail[pos + 1 + usize::from_u32(len)])
                    } else {
                        AutomatonMatch::PrefixOnly
                    }
                } else {
                    cursor.0 = State::Dead;
                    AutomatonMatch::NoMatch
                }
            }
        }
    }

    /// Looks up the whole key.
    ///
    /// The empty key is reported as [`AutomatonMatch::PrefixOnly`].
    pub fn lookup(&self, key: &[char]) -> AutomatonMatch {
        let mut cursor = self.cursor();
        let mut m = AutomatonMatch::PrefixOnly;
        for &c in key {
            m = self.step(&mut cursor, c);
            if m == AutomatonMatch::NoMatch {
                break;
            }
        }
        m
    }

    /// Returns an iterator of `(value, end_char)` for every entry that is a prefix of `input`.
    #[inline(always)]
    pub fn common_prefix_iterator<'a>(&'a self, input: &'a [char]) -> CommonPrefixIter<'a> {
        CommonPrefixIter {
            da: self,
            input,
            cursor: self.cursor(),
            pos: 0,
        }
    }

    /// Gets the number of units, including vacant ones.
    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    /// Gets the number of distinct characters in the keys.
    pub fn alphabet_size(&self) -> usize {
        usize::from_u32(self.mapper.alphabet_size)
    }
}

/// Iterator created by [`DoubleArray::common_prefix_iterator()`].
pub struct CommonPrefixIter<'a> {
    da: &'a DoubleArray,
    input: &'a [char],
    cursor: Cursor,
    pos: usize,
}

impl Iterator for CommonPrefixIter<'_> {
    type Item = (u32, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.input.len() {
            let c = self.input[self.pos];
            self.pos += 1;
            match self.da.step(&mut self.cursor, c) {
                AutomatonMatch::NoMatch => {
                    self.pos = self.input.len();
                    return None;
                }
                AutomatonMatch::PrefixOnly => {}
                AutomatonMatch::Complete(value) => return Some((value, self.pos)),
            }
        }
        None
    }
}

/// Node of a conventional trie, used only while building.
struct BuildNode {
    children: Vec<(u32, usize)>,
    value: u32,
}

impl BuildNode {
    const fn new() -> Self {
        Self {
            children: vec![],
            value: NO_VALUE,
        }
    }

    fn build_trie<K>(records: &[(K, u32)], mapper: &CodeMapper) -> Result<Vec<Self>>
    where
        K: AsRef<str>,
    {
        let mut nodes = vec![Self::new()];
        let mut prev: Option<&str> = None;
        for (key, value) in records {
            let key = key.as_ref();
            if key.is_empty() {
                return Err(KiriwakeError::invalid_argument(
                    "records",
                    "keys must not be empty.",
                ));
            }
            if let Some(prev) = prev {
                if prev >= key {
                    let msg = format!(
                        "keys must be sorted in strictly ascending order, {prev:?} >= {key:?}"
                    );
                    return Err(KiriwakeError::invalid_argument("records", msg));
                }
            }
            if *value == NO_VALUE {
                return Err(KiriwakeError::invalid_argument(
                    "records",
                    "u32::MAX is reserved and cannot be a value.",
                ));
            }
            prev = Some(key);

            let mut node = 0;
            for c in key.chars() {
                let code = mapper.get(c).ok_or_else(|| {
                    KiriwakeError::invalid_state("code mapper", format!("unmapped {c:?}"))
                })?;
                // Since the keys are sorted, a shared prefix can only continue
                // through the most recently added child.
                match nodes[node].children.last() {
                    Some(&(k, child)) if k == code => node = child,
                    _ => {
                        let child = nodes.len();
                        nodes.push(Self::new());
                        nodes[node].children.push((code, child));
                        node = child;
                    }
                }
            }
            nodes[node].value = *value;
        }
        Ok(nodes)
    }

    /// Returns the codes and the value if the subtree rooted at `idx` is a
    /// single chain ending in exactly one entry.
    fn tail_chain(nodes: &[Self], idx: usize) -> Option<(Vec<u32>, u32)> {
        if nodes[idx].value != NO_VALUE {
            return None;
        }
        let mut codes = vec![];
        let mut cur = idx;
        loop {
            let node = &nodes[cur];
            if node.children.len() != 1 {
                return None;
            }
            let (code, child) = node.children[0];
            codes.push(code);
            let child_node = &nodes[child];
            if child_node.value != NO_VALUE {
                return child_node
                    .children
                    .is_empty()
                    .then_some((codes, child_node.value));
            }
            cur = child;
        }
    }
}

struct DoubleArrayBuilder {
    units: Vec<Unit>,
    tail: Vec<u32>,
    first_vacant: usize,
}

impl DoubleArrayBuilder {
    fn new() -> Self {
        let mut root = Unit::vacant();
        root.check = ROOT_CHECK;
        Self {
            units: vec![root],
            tail: vec![],
            first_vacant: 1,
        }
    }

    fn arrange(&mut self, nodes: &[BuildNode]) -> Result<()> {
        let mut stack = vec![(0, usize::from_u32(ROOT_IDX))];
        while let Some((node_idx, unit_idx)) = stack.pop() {
            let node = &nodes[node_idx];
            self.units[unit_idx].value = node.value;

            if unit_idx != usize::from_u32(ROOT_IDX) {
                if let Some((codes, value)) = BuildNode::tail_chain(nodes, node_idx) {
                    let pos = u32::try_from(self.tail.len())?;
                    if pos & TAIL_FLAG != 0 {
                        return Err(KiriwakeError::invalid_argument(
                            "records",
                            "the tail buffer outgrows the addressable range.",
                        ));
                    }
                    self.units[unit_idx].base = TAIL_FLAG | pos;
                    self.tail.push(u32::try_from(codes.len())?);
                    self.tail.extend_from_slice(&codes);
                    self.tail.push(value);
                    continue;
                }
            }
            if node.children.is_empty() {
                continue;
            }

            let mut children = node.children.clone();
            children.sort_unstable_by_key(|&(code, _)| code);
            let base = self.find_base(&children)?;
            self.units[unit_idx].base = u32::try_from(base)?;
            let parent = u32::try_from(unit_idx)?;
            for &(code, _) in &children {
                let child_idx = base + usize::from_u32(code);
                self.units[child_idx].check = parent;
            }
            while self.first_vacant < self.units.len()
                && self.units[self.first_vacant].check != VACANT
            {
                self.first_vacant += 1;
            }
            // Pushed in reverse so that children are visited in code order.
            for &(code, child) in children.iter().rev() {
                stack.push((child, base + usize::from_u32(code)));
            }
        }
        Ok(())
    }

    /// Finds the smallest base at which every child lands on a vacant unit,
    /// and extends the units to cover them.
    fn find_base(&mut self, children: &[(u32, usize)]) -> Result<usize> {
        let first = usize::from_u32(children[0].0);
        let last = usize::from_u32(children[children.len() - 1].0);
        let mut idx = self.first_vacant.max(first);
        loop {
            if self.is_vacant(idx) {
                let base = idx - first;
                if children
                    .iter()
                    .all(|&(code, _)| self.is_vacant(base + usize::from_u32(code)))
                {
                    let end = base + last + 1;
                    if end > usize::from_u32(TAIL_FLAG) {
                        return Err(KiriwakeError::invalid_argument(
                            "records",
                            "the double array outgrows the addressable range.",
                        ));
                    }
                    if self.units.len() < end {
                        self.units.resize(end, Unit::vacant());
                    }
                    return Ok(base);
                }
            }
            idx += 1;
        }
    }

    #[inline(always)]
    fn is_vacant(&self, idx: usize) -> bool {
        idx != 0 && self.units.get(idx).map_or(true, |u| u.check == VACANT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_cat_dog() {
        let da = DoubleArray::from_records(&[("cat", 1), ("cats", 2), ("dog", 3)]).unwrap();
        assert_eq!(da.lookup(&chars("cat")), AutomatonMatch::Complete(1));
        assert_eq!(da.lookup(&chars("cats")), AutomatonMatch::Complete(2));
        assert_eq!(da.lookup(&chars("ca")), AutomatonMatch::PrefixOnly);
        assert_eq!(da.lookup(&chars("caz")), AutomatonMatch::NoMatch);
        assert_eq!(da.lookup(&chars("do")), AutomatonMatch::PrefixOnly);
        assert_eq!(da.lookup(&chars("dog")), AutomatonMatch::Complete(3));
        assert_eq!(da.lookup(&chars("dogs")), AutomatonMatch::NoMatch);
        assert_eq!(da.lookup(&chars("x")), AutomatonMatch::NoMatch);
    }

    #[test]
    fn test_incremental_steps() {
        let da = DoubleArray::from_records(&[("cat", 1), ("cats", 2), ("dog", 3)]).unwrap();
        let mut cursor = da.cursor();
        assert_eq!(da.step(&mut cursor, 'd'), AutomatonMatch::PrefixOnly);
        assert_eq!(da.step(&mut cursor, 'o'), AutomatonMatch::PrefixOnly);
        assert_eq!(da.step(&mut cursor, 'g'), AutomatonMatch::Complete(3));
        assert_eq!(da.step(&mut cursor, 's'), AutomatonMatch::NoMatch);
        assert!(cursor.is_dead());
        assert_eq!(da.step(&mut cursor, 'c'), AutomatonMatch::NoMatch);
    }

    #[test]
    fn test_tail_is_used() {
        let da = DoubleArray::from_records(&[("cat", 1), ("cats", 2), ("dog", 3)]).unwrap();
        // "og" after "d" is a single chain ending in one entry.
        assert!(!da.tail.is_empty());
        assert_eq!(da.alphabet_size(), 7);
    }

    #[test]
    fn test_common_prefix_iterator() {
        let result = DoubleArray::from_records(&[("東京", 0), ("東京都", 1), ("東", 2)]);
        assert!(matches!(result, Err(KiriwakeError::InvalidArgument(_))));

        let da = DoubleArray::from_records(&[("東", 2), ("東京", 0), ("東京都", 1)]).unwrap();
        let input = chars("東京都に");
        let matches: Vec<_> = da.common_prefix_iterator(&input).collect();
        assert_eq!(matches, vec![(2, 1), (0, 2), (1, 3)]);
    }

    #[test]
    fn test_unsorted() {
        let result = DoubleArray::from_records(&[("b", 0), ("a", 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicated() {
        let result = DoubleArray::from_records(&[("a", 0), ("a", 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_key() {
        let result = DoubleArray::from_records(&[("", 0), ("a", 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_reserved_value() {
        let result = DoubleArray::from_records(&[("a", u32::MAX)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_no_records() {
        let records: &[(&str, u32)] = &[];
        let da = DoubleArray::from_records(records).unwrap();
        assert_eq!(da.lookup(&chars("a")), AutomatonMatch::NoMatch);
        assert_eq!(da.lookup(&[]), AutomatonMatch::PrefixOnly);
    }

    fn expected(map: &BTreeMap<String, u32>, key: &str) -> AutomatonMatch {
        if let Some(&v) = map.get(key) {
            AutomatonMatch::Complete(v)
        } else if map
            .range(key.to_string()..)
            .next()
            .map_or(false, |(k, _)| k.starts_with(key))
        {
            AutomatonMatch::PrefixOnly
        } else {
            AutomatonMatch::NoMatch
        }
    }

    #[test]
    fn test_exhaustive_small_alphabet() {
        let map: BTreeMap<_, _> = [("cat", 1), ("cats", 2), ("dog", 3), ("do", 4), ("s", 5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let records: Vec<_> = map.iter().map(|(k, &v)| (k.clone(), v)).collect();
        let da = DoubleArray::from_records(&records).unwrap();

        let alphabet = ['c', 'a', 't', 's', 'd', 'o', 'g', 'z'];
        let mut queue = vec![String::new()];
        while let Some(key) = queue.pop() {
            let m = da.lookup(&chars(&key));
            if !key.is_empty() {
                assert_eq!(m, expected(&map, &key), "key={key}");
            }
            if key.chars().count() == 4 {
                continue;
            }
            for &c in &alphabet {
                let mut ext = key.clone();
                ext.push(c);
                if m == AutomatonMatch::NoMatch {
                    assert_eq!(da.lookup(&chars(&ext)), AutomatonMatch::NoMatch);
                }
                queue.push(ext);
            }
        }
    }

    #[test]
    fn test_many_keys() {
        let alphabet: Vec<_> = "あいうえおかきくけこ東京都".chars().collect();
        let mut seed = 12345u64;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };
        let mut map = BTreeMap::new();
        for i in 0..500 {
            let len = 1 + next() % 6;
            let key: String = (0..len).map(|_| alphabet[next() % alphabet.len()]).collect();
            map.entry(key).or_insert(i);
        }
        let records: Vec<_> = map.iter().map(|(k, &v)| (k.clone(), v)).collect();
        let da = DoubleArray::from_records(&records).unwrap();

        for (key, &value) in &map {
            assert_eq!(da.lookup(&chars(key)), AutomatonMatch::Complete(value));
            let prefix: Vec<_> = key.chars().take(key.chars().count() - 1).collect();
            if !prefix.is_empty() {
                let prefix_str: String = prefix.iter().collect();
                assert_eq!(da.lookup(&prefix), expected(&map, &prefix_str));
            }
        }
        for _ in 0..500 {
            let len = 1 + next() % 7;
            let key: String = (0..len).map(|_| alphabet[next() % alphabet.len()]).collect();
            assert_eq!(da.lookup(&chars(&key)), expected(&map, &key), "key={key}");
        }
    }
}
