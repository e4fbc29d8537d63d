//! Search modes and length penalties.
use crate::utils;

/// Mode of the search.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SearchMode {
    /// Plain minimum-cost segmentation.
    #[default]
    Normal,

    /// Long words are penalized to prefer finer segmentation.
    Search,

    /// Same as [`SearchMode::Search`], and unknown words in the best path are
    /// split into single characters.
    Extended,
}

impl SearchMode {
    /// Checks if length penalties apply in the mode.
    #[inline(always)]
    pub const fn is_penalized(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Length penalties applied in [`SearchMode::Search`] and [`SearchMode::Extended`].
///
/// A word consisting only of kanji and longer than `kanji_len_threshold`
/// costs `(len - kanji_len_threshold) * kanji_penalty` extra. Any other word
/// longer than `other_len_threshold` costs `(len - other_len_threshold) * other_penalty`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Penalty {
    /// Length above which kanji words are penalized.
    pub kanji_len_threshold: usize,
    /// Penalty per extra kanji.
    pub kanji_penalty: i32,
    /// Length above which other words are penalized.
    pub other_len_threshold: usize,
    /// Penalty per extra character.
    pub other_penalty: i32,
}

impl Default for Penalty {
    fn default() -> Self {
        Self {
            kanji_len_threshold: 2,
            kanji_penalty: 3000,
            other_len_threshold: 7,
            other_penalty: 1700,
        }
    }
}

impl Penalty {
    /// Computes the penalty of a word with the surface.
    pub fn cost(&self, surface: &[char]) -> i32 {
        let len = surface.len();
        if len > self.kanji_len_threshold && surface.iter().all(|&c| utils::is_kanji(c)) {
            Self::scale(len - self.kanji_len_threshold, self.kanji_penalty)
        } else if len > self.other_len_threshold {
            Self::scale(len - self.other_len_threshold, self.other_penalty)
        } else {
            0
        }
    }

    #[inline(always)]
    fn scale(excess: usize, unit: i32) -> i32 {
        i32::try_from(excess)
            .unwrap_or(i32::MAX)
            .saturating_mul(unit)
    }
}

/// Policy to suppress unknown words starting inside an already generated
/// unknown word.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum UnkSuppression {
    /// Suppresses only in [`SearchMode::Normal`].
    #[default]
    PerMode,

    /// Always suppresses.
    Always,

    /// Never suppresses.
    Never,
}

impl UnkSuppression {
    /// Checks if the suppression is active in the mode.
    #[inline(always)]
    pub const fn is_active(self, mode: SearchMode) -> bool {
        match self {
            Self::PerMode => matches!(mode, SearchMode::Normal),
            Self::Always => true,
            Self::Never => false,
        }
    }
}
