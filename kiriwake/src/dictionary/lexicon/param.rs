use bincode::{Decode, Encode};

use crate::dictionary::connector::Connector;

/// Parameters of a word: connection ids and word cost.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Decode, Encode)]
pub struct WordParam {
    /// Left connection id.
    pub left_id: u16,
    /// Right connection id.
    pub right_id: u16,
    /// Word cost.
    pub word_cost: i16,
}

impl WordParam {
    /// Creates a new instance.
    #[inline(always)]
    pub const fn new(left_id: u16, right_id: u16, word_cost: i16) -> Self {
        Self {
            left_id,
            right_id,
            word_cost,
        }
    }
}

#[derive(Default, Decode, Encode)]
pub struct WordParams {
    params: Vec<WordParam>,
}

impl WordParams {
    pub fn new<I>(params: I) -> Self
    where
        I: IntoIterator<Item = WordParam>,
    {
        Self {
            params: params.into_iter().collect(),
        }
    }

    #[inline(always)]
    pub fn get(&self, word_id: usize) -> WordParam {
        self.params[word_id]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn verify<C>(&self, conn: &C) -> bool
    where
        C: Connector,
    {
        self.params.iter().all(|p| {
            usize::from(p.left_id) < conn.num_left() && usize::from(p.right_id) < conn.num_right()
        })
    }
}
