use bincode::{Decode, Encode};

use crate::utils;

#[derive(Default, Decode, Encode)]
pub struct WordFeatures {
    features: Vec<String>,
}

impl WordFeatures {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            features: features
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
        }
    }

    #[inline(always)]
    pub fn get(&self, word_id: usize) -> &str {
        &self.features[word_id]
    }

    /// Splits the feature string into its comma-separated fields.
    pub fn get_fields(&self, word_id: usize) -> Vec<String> {
        let feature = self.get(word_id);
        if feature.is_empty() {
            vec![]
        } else {
            utils::parse_csv_row(feature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_fields() {
        let features = WordFeatures::new(["名詞,\"1,2\",*", ""]);
        assert_eq!(features.get(0), "名詞,\"1,2\",*");
        assert_eq!(features.get_fields(0), vec!["名詞", "1,2", "*"]);
        assert!(features.get_fields(1).is_empty());
    }
}
