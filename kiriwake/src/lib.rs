//! # Kiriwake
//!
//! Kiriwake is a lattice-based morphological segmenter. It splits a sentence
//! into the sequence of dictionary words with the minimum total cost, and can
//! also enumerate the next best segmentations.
//!
//! ## Examples
//!
//! ```
//! use kiriwake::{Dictionary, Tokenizer};
//!
//! let lexicon_csv = "京都,1,1,3000,名詞,キョウト
//! 東京,1,1,3000,名詞,トウキョウ
//! 東京都,1,1,5000,名詞,トウキョウト
//! 都,1,1,4000,名詞,ト";
//! let matrix_def = "2 2\n0 0 0\n0 1 0\n1 0 0\n1 1 200";
//! let char_def = "DEFAULT 0 1 0";
//! let unk_def = "DEFAULT,1,1,10000,名詞";
//!
//! let dict = Dictionary::from_readers(
//!     lexicon_csv.as_bytes(),
//!     matrix_def.as_bytes(),
//!     char_def.as_bytes(),
//!     unk_def.as_bytes(),
//! )
//! .unwrap();
//!
//! let tokenizer = Tokenizer::new(dict);
//! let mut worker = tokenizer.new_worker();
//!
//! worker.reset_sentence("東京都").unwrap();
//! worker.tokenize().unwrap();
//! assert_eq!(worker.num_tokens(), 1);
//! assert_eq!(worker.token(0).surface(), "東京都");
//!
//! worker.tokenize_nbest(2, 5000).unwrap();
//! assert_eq!(worker.num_nbest_paths(), 2);
//! assert_eq!(worker.nbest_cost(0), Some(5000));
//! assert_eq!(worker.nbest_cost(1), Some(7200));
//! ```
#![deny(missing_docs)]

#[cfg(target_pointer_width = "16")]
compile_error!("`target_pointer_width` must be larger than or equal to 32");

pub mod common;
pub mod dictionary;
pub mod errors;
mod sentence;
pub mod token;
pub mod tokenizer;
mod utils;

#[cfg(test)]
mod test_utils;

pub use dictionary::Dictionary;
pub use errors::KiriwakeError;
pub use tokenizer::Tokenizer;
