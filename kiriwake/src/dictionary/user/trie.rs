use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::errors::{KiriwakeError, Result};

/// Occurrence of a surface in a text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Occurrence {
    pub start_char: usize,
    pub end_char: usize,
    /// Value associated with the surface.
    pub value: u32,
}

/// Trie of user surfaces, scanned over a whole text at once.
pub struct SurfaceTrie {
    da: crawdad::Trie,
}

impl Encode for SurfaceTrie {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.da.serialize_to_vec(), encoder)
    }
}

impl Decode for SurfaceTrie {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let bytes: Vec<u8> = Decode::decode(decoder)?;
        let (da, _) = crawdad::Trie::deserialize_from_slice(&bytes);
        Ok(Self { da })
    }
}
bincode::impl_borrow_decode!(SurfaceTrie);

impl SurfaceTrie {
    /// Builds the trie from distinct surfaces and their values.
    pub fn new<'a, I>(surfaces: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let da = crawdad::Trie::from_records(surfaces).map_err(|e| {
            KiriwakeError::invalid_argument("user.csv", format!("Unable to index surfaces: {e}"))
        })?;
        Ok(Self { da })
    }

    /// Finds the occurrences of all surfaces in `text`, ordered by start
    /// position and then by length.
    pub fn occurrences(&self, text: &[char]) -> Vec<Occurrence> {
        let mut found = vec![];
        for start_char in 0..text.len() {
            let suffix = text[start_char..].iter().copied();
            for (value, len) in self.da.common_prefix_search(suffix) {
                found.push(Occurrence {
                    start_char,
                    end_char: start_char + len,
                    value,
                });
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurrences() {
        let trie = SurfaceTrie::new([("ab", 0), ("abc", 1), ("b", 2)]).unwrap();
        let text: Vec<_> = "abcb".chars().collect();
        let spans: Vec<_> = trie
            .occurrences(&text)
            .into_iter()
            .map(|o| (o.start_char, o.end_char, o.value))
            .collect();
        assert_eq!(spans, vec![(0, 2, 0), (0, 3, 1), (1, 2, 2), (3, 4, 2)]);
        assert!(trie.occurrences(&[]).is_empty());
    }

    #[test]
    fn test_empty_surface() {
        assert!(SurfaceTrie::new([("", 0)]).is_err());
    }
}
