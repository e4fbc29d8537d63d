use std::io::Read;

use crate::dictionary::{
    CharProperty, Dictionary, DictionaryInner, LexType, Lexicon, MatrixConnector, UnkHandler,
    UserLexicon,
};
use crate::errors::{KiriwakeError, Result};

impl Dictionary {
    /// Creates a new instance from readers in the MeCab format.
    ///
    /// # Arguments
    ///
    ///  - `system_lexicon_rdr`: A reader of a lexicon file `*.csv`.
    ///  - `connector_rdr`: A reader of matrix file `matrix.def`.
    ///  - `char_prop_rdr`: A reader of character definition file `char.def`.
    ///  - `unk_handler_rdr`: A reader of unknown definition file `unk.def`.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`] is returned when an input format is invalid.
    pub fn from_readers<S, C, P, U>(
        system_lexicon_rdr: S,
        connector_rdr: C,
        char_prop_rdr: P,
        unk_handler_rdr: U,
    ) -> Result<Self>
    where
        S: Read,
        C: Read,
        P: Read,
        U: Read,
    {
        let system_lexicon = Lexicon::from_reader(system_lexicon_rdr, LexType::System)?;
        let connector = MatrixConnector::from_reader(connector_rdr)?;
        let char_prop = CharProperty::from_reader(char_prop_rdr)?;
        let unk_handler = UnkHandler::from_reader(unk_handler_rdr, &char_prop)?;

        if !system_lexicon.verify(&connector) {
            return Err(KiriwakeError::invalid_argument(
                "system_lexicon_rdr",
                "system_lexicon_rdr includes invalid connection ids.",
            ));
        }
        if !unk_handler.verify(&connector) {
            return Err(KiriwakeError::invalid_argument(
                "unk_handler_rdr",
                "unk_handler_rdr includes invalid connection ids.",
            ));
        }

        tracing::debug!(
            system_words = system_lexicon.num_words(),
            unknown_words = unk_handler.num_words(),
            categories = char_prop.num_categories(),
            "loaded a dictionary"
        );

        Ok(Self(DictionaryInner {
            system_lexicon,
            user_lexicon: None,
            connector,
            char_prop,
            unk_handler,
        }))
    }

    /// Resets the user lexicon from a reader.
    ///
    /// # Arguments
    ///
    ///  - `user_lexicon_rdr`: A reader of a lexicon file `*.csv` in the MeCab format.
    ///    If `None`, clear the current user lexicon.
    ///
    /// # Errors
    ///
    /// [`KiriwakeError`] is returned when an input format is invalid.
    pub fn user_lexicon_from_reader<R>(mut self, user_lexicon_rdr: Option<R>) -> Result<Self>
    where
        R: Read,
    {
        if let Some(user_lexicon_rdr) = user_lexicon_rdr {
            let user_lexicon = UserLexicon::from_reader(user_lexicon_rdr)?;
            if !user_lexicon.verify(self.connector()) {
                return Err(KiriwakeError::invalid_argument(
                    "user_lexicon_rdr",
                    "user_lexicon_rdr includes invalid connection ids.",
                ));
            }
            tracing::debug!(user_words = user_lexicon.num_words(), "set a user lexicon");
            self.0.user_lexicon = Some(user_lexicon);
        } else {
            self.0.user_lexicon = None;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::UNIGRAM_WORD_ID;
    use crate::dictionary::{WordIdx, WordParam};

    fn from_strs(lexicon_csv: &str, unk_def: &str) -> Result<Dictionary> {
        let matrix_def = "1 1\n0 0 0";
        let char_def = "DEFAULT 0 1 0";
        Dictionary::from_readers(
            lexicon_csv.as_bytes(),
            matrix_def.as_bytes(),
            char_def.as_bytes(),
            unk_def.as_bytes(),
        )
    }

    #[test]
    fn test_oor_lex() {
        let result = from_strs("自然,1,1,0", "DEFAULT,0,0,100,*");
        assert!(matches!(result, Err(KiriwakeError::InvalidArgument(_))));
    }

    #[test]
    fn test_oor_unk() {
        let result = from_strs("自然,0,0,0", "DEFAULT,1,1,100,*");
        assert!(matches!(result, Err(KiriwakeError::InvalidArgument(_))));
    }

    #[test]
    fn test_oor_user() {
        let dict = from_strs("自然,0,0,0", "DEFAULT,0,0,100,*").unwrap();
        let result = dict.user_lexicon_from_reader(Some("言語,0,1,0".as_bytes()));
        assert!(matches!(result, Err(KiriwakeError::InvalidArgument(_))));
    }

    #[test]
    fn test_word_accessors() {
        let dict = from_strs("自然,0,0,7,名詞,\"1,2\"", "DEFAULT,0,0,100,記号")
            .unwrap()
            .user_lexicon_from_reader(Some("言語,0,0,-3,user".as_bytes()))
            .unwrap();

        let system = WordIdx::new(LexType::System, 0);
        assert_eq!(dict.word_param(system), WordParam::new(0, 0, 7));
        assert_eq!(dict.word_cost(system), 7);
        assert_eq!(dict.word_feature(system), "名詞,\"1,2\"");
        assert_eq!(dict.word_features(system), vec!["名詞", "1,2"]);

        let user = WordIdx::new(LexType::User, 0);
        assert_eq!(dict.word_cost(user), -3);
        assert_eq!(dict.word_features(user), vec!["user"]);

        let unk = WordIdx::new(LexType::Unknown, 0);
        assert_eq!(dict.left_id(unk), 0);
        assert_eq!(dict.right_id(unk), 0);
        assert_eq!(dict.word_cost(unk), 100);
        assert_eq!(dict.word_feature(unk), "記号");

        let unigram = WordIdx::new(LexType::Unknown, UNIGRAM_WORD_ID);
        assert_eq!(dict.word_feature(unigram), "*");
        assert_eq!(dict.word_features(unigram), vec!["*"]);
        assert_eq!(dict.word_param(unigram), WordParam::default());

        let sentinel = WordIdx::default();
        assert_eq!(dict.word_feature(sentinel), "");
        assert!(dict.word_features(sentinel).is_empty());
    }

    #[test]
    fn test_clear_user_lexicon() {
        let dict = from_strs("自然,0,0,0", "DEFAULT,0,0,100,*")
            .unwrap()
            .user_lexicon_from_reader(Some("言語,0,0,-3,user".as_bytes()))
            .unwrap();
        assert!(dict.user_lexicon().is_some());
        let dict = dict.user_lexicon_from_reader::<&[u8]>(None).unwrap();
        assert!(dict.user_lexicon().is_none());
    }

    #[test]
    fn test_write_read() {
        let dict = from_strs("自然,0,0,7,sizen\n言語,0,0,4,gengo", "DEFAULT,0,0,100,*").unwrap();
        let mut data = vec![];
        let num_bytes = dict.write(&mut data).unwrap();
        assert_eq!(num_bytes, data.len());

        let other = Dictionary::read(data.as_slice()).unwrap();
        let idx = WordIdx::new(LexType::System, 1);
        assert_eq!(other.word_feature(idx), "gengo");
        assert_eq!(other.word_cost(idx), 4);
    }

    #[test]
    fn test_read_broken_magic() {
        let dict = from_strs("自然,0,0,7,sizen", "DEFAULT,0,0,100,*").unwrap();
        let mut data = vec![];
        dict.write(&mut data).unwrap();
        data[0] ^= 0xFF;
        let result = Dictionary::read(data.as_slice());
        assert!(matches!(result, Err(KiriwakeError::InvalidArgument(_))));
    }
}
