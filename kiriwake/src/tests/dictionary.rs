use crate::dictionary::{LexType, WordIdx};
use crate::tests::{system_dictionary, user_dictionary};
use crate::{Dictionary, Tokenizer};

fn tokenize(dict: Dictionary, input: &str) -> Vec<(String, String)> {
    let tokenizer = Tokenizer::new(dict);
    let mut worker = tokenizer.new_worker();
    worker.reset_sentence(input).unwrap();
    worker.tokenize().unwrap();
    worker
        .token_iter()
        .map(|t| (t.surface().to_string(), t.feature().to_string()))
        .collect()
}

#[test]
fn test_write_read() {
    let mut data = vec![];
    let size = user_dictionary().write(&mut data).unwrap();
    assert_eq!(size, data.len());

    let dict = Dictionary::read(data.as_slice()).unwrap();
    let input = "東京都に行く。ABCテスト";
    assert_eq!(tokenize(dict, input), tokenize(user_dictionary(), input));
}

#[test]
fn test_word_lookup() {
    let dict = system_dictionary();
    let word_idx = WordIdx::new(LexType::System, 2);
    assert_eq!(dict.word_feature(word_idx), "名詞,固有名詞,地名,トウキョウト");
    assert_eq!(dict.left_id(word_idx), 1);
    assert_eq!(dict.right_id(word_idx), 1);
    assert_eq!(dict.word_cost(word_idx), 5000);

    let word_idx = WordIdx::new(LexType::Unknown, 0);
    assert_eq!(dict.word_features(word_idx), vec!["記号", "一般"]);
}

#[test]
fn test_connection_ids_out_of_range() {
    let lex_csv = "東京,4,1,3000,名詞";
    let result = Dictionary::from_readers(
        lex_csv.as_bytes(),
        crate::tests::MATRIX_DEF.as_bytes(),
        crate::tests::CHAR_DEF.as_bytes(),
        crate::tests::UNK_DEF.as_bytes(),
    );
    assert!(result.is_err());
}
