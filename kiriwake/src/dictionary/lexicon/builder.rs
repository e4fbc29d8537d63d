use std::io::{prelude::*, BufReader, Read};

use crate::dictionary::lexicon::{
    Lexicon, RawWordEntry, WordFeatures, WordMap, WordParam, WordParams,
};
use crate::dictionary::LexType;
use crate::errors::{KiriwakeError, Result};
use crate::utils;

impl Lexicon {
    /// Builds a new instance from a lexicon file in the CSV format.
    pub fn from_reader<R>(rdr: R, lex_type: LexType) -> Result<Self>
    where
        R: Read,
    {
        let entries = Self::parse_csv(rdr, "lex.csv")?;
        let map = WordMap::new(entries.iter().map(|e| &e.surface))?;
        let params = WordParams::new(entries.iter().map(|e| e.param));
        let features = WordFeatures::new(entries.iter().map(|e| &e.feature));

        Ok(Self {
            map,
            params,
            features,
            lex_type,
        })
    }

    /// Parses rows of `surface,left_id,right_id,word_cost[,feature..]`.
    ///
    /// Rows with an empty surface are skipped.
    pub(crate) fn parse_csv<R>(rdr: R, name: &'static str) -> Result<Vec<RawWordEntry>>
    where
        R: Read,
    {
        let mut entries = vec![];
        let reader = BufReader::new(rdr);
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let e = Self::parse_csv_row(&line, name)?;
            if e.surface.is_empty() {
                tracing::warn!(line = i, "skipped an empty surface in {name}");
            } else {
                entries.push(e);
            }
        }
        Ok(entries)
    }

    fn parse_csv_row(line: &str, name: &'static str) -> Result<RawWordEntry> {
        let cols = utils::parse_csv_row(line);
        if cols.len() < 4 {
            let msg = format!("A csv row of lexicon must have four items at least, {line}");
            return Err(KiriwakeError::invalid_format(name, msg));
        }

        let surface = cols[0].to_string();
        let left_id = cols[1].parse()?;
        let right_id = cols[2].parse()?;
        let word_cost = cols[3].parse()?;
        let feature = utils::join_csv_row(&cols[4..])?;

        Ok(RawWordEntry {
            surface,
            param: WordParam::new(left_id, right_id, word_cost),
            feature,
        })
    }
}
