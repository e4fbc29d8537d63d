mod builder;
mod feature;
mod map;
mod param;

use bincode::{Decode, Encode};

use crate::dictionary::automaton::DoubleArray;
use crate::dictionary::connector::Connector;
use crate::dictionary::{LexType, WordIdx};
use crate::utils::FromU32;

pub(crate) use feature::WordFeatures;
pub(crate) use map::posting::{Postings, PostingsBuilder};
pub(crate) use map::WordMap;
pub use param::WordParam;
pub(crate) use param::WordParams;

/// Lexicon of known words.
#[derive(Decode, Encode)]
pub struct Lexicon {
    map: WordMap,
    params: WordParams,
    features: WordFeatures,
    lex_type: LexType,
}

impl Lexicon {
    /// Gets the automaton matching the surface forms.
    #[inline(always)]
    pub(crate) const fn automaton(&self) -> &DoubleArray {
        self.map.automaton()
    }

    /// Resolves a value of the automaton into the ids of homographs.
    #[inline(always)]
    pub(crate) fn word_ids_for(&self, match_id: u32) -> impl Iterator<Item = WordIdx> + '_ {
        self.map
            .word_ids(match_id)
            .map(move |word_id| WordIdx::new(self.lex_type, word_id))
    }

    /// Returns an iterator of all words whose surfaces are prefixes of `input`,
    /// in ascending order of length.
    #[inline(always)]
    pub(crate) fn common_prefix_iterator<'a>(
        &'a self,
        input: &'a [char],
    ) -> impl Iterator<Item = LexMatch> + 'a {
        self.automaton()
            .common_prefix_iterator(input)
            .flat_map(move |(match_id, end_char)| {
                self.word_ids_for(match_id).map(move |word_idx| {
                    LexMatch::new(word_idx, self.word_param(word_idx), end_char)
                })
            })
    }

    #[inline(always)]
    pub(crate) fn word_param(&self, word_idx: WordIdx) -> WordParam {
        debug_assert_eq!(word_idx.lex_type, self.lex_type);
        self.params.get(usize::from_u32(word_idx.word_id))
    }

    #[inline(always)]
    pub(crate) fn word_feature(&self, word_idx: WordIdx) -> &str {
        debug_assert_eq!(word_idx.lex_type, self.lex_type);
        self.features.get(usize::from_u32(word_idx.word_id))
    }

    #[inline(always)]
    pub(crate) fn word_features(&self, word_idx: WordIdx) -> Vec<String> {
        debug_assert_eq!(word_idx.lex_type, self.lex_type);
        self.features.get_fields(usize::from_u32(word_idx.word_id))
    }

    /// Gets the number of words.
    #[inline(always)]
    pub fn num_words(&self) -> usize {
        self.params.len()
    }

    /// Checks if all connection ids are within the connector.
    pub(crate) fn verify<C>(&self, conn: &C) -> bool
    where
        C: Connector,
    {
        self.params.verify(conn)
    }
}

#[derive(Eq, PartialEq, Debug)]
pub struct LexMatch {
    word_idx: WordIdx,
    word_param: WordParam,
    end_char: usize,
}

impl LexMatch {
    #[inline(always)]
    pub const fn new(word_idx: WordIdx, word_param: WordParam, end_char: usize) -> Self {
        Self {
            word_idx,
            word_param,
            end_char,
        }
    }

    #[inline(always)]
    pub const fn end_char(&self) -> usize {
        self.end_char
    }

    #[inline(always)]
    pub const fn word_idx(&self) -> WordIdx {
        self.word_idx
    }

    #[inline(always)]
    pub const fn word_param(&self) -> WordParam {
        self.word_param
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RawWordEntry {
    pub surface: String,
    pub param: WordParam,
    pub feature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_iterator() {
        let lexicon = Lexicon {
            map: WordMap::new(["東京", "東京都", "東京", "京都"]).unwrap(),
            params: WordParams::new([
                WordParam::new(1, 2, 3),
                WordParam::new(4, 5, 6),
                WordParam::new(7, 8, 9),
                WordParam::new(10, 11, 12),
            ]),
            features: WordFeatures::default(),
            lex_type: LexType::System,
        };
        let input: Vec<_> = "東京都".chars().collect();
        let mut it = lexicon.common_prefix_iterator(&input);
        assert_eq!(
            it.next().unwrap(),
            LexMatch {
                end_char: 2,
                word_idx: WordIdx::new(LexType::System, 0),
                word_param: WordParam::new(1, 2, 3),
            }
        );
        assert_eq!(
            it.next().unwrap(),
            LexMatch {
                end_char: 2,
                word_idx: WordIdx::new(LexType::System, 2),
                word_param: WordParam::new(7, 8, 9),
            }
        );
        assert_eq!(
            it.next().unwrap(),
            LexMatch {
                end_char: 3,
                word_idx: WordIdx::new(LexType::System, 1),
                word_param: WordParam::new(4, 5, 6),
            }
        );
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_word_ids_for() {
        let lexicon = Lexicon::from_reader(
            "東京,0,0,1,a\n京都,0,0,2,b\n東京,0,0,3,c".as_bytes(),
            LexType::System,
        )
        .unwrap();
        let input: Vec<_> = "東京".chars().collect();
        let mut cursor = lexicon.automaton().cursor();
        let automaton = lexicon.automaton();
        automaton.step(&mut cursor, input[0]);
        let m = automaton.step(&mut cursor, input[1]);
        let crate::dictionary::automaton::AutomatonMatch::Complete(match_id) = m else {
            panic!("東京 must be matched");
        };
        let ids: Vec<_> = lexicon.word_ids_for(match_id).collect();
        assert_eq!(
            ids,
            vec![
                WordIdx::new(LexType::System, 0),
                WordIdx::new(LexType::System, 2)
            ]
        );
        assert_eq!(lexicon.word_feature(ids[1]), "c");
        assert_eq!(lexicon.word_features(ids[0]), vec!["a"]);
    }
}
