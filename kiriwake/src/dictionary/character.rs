use std::collections::BTreeMap;
use std::fmt;
use std::io::{prelude::*, BufReader, Read};

use bincode::{Decode, Encode};

use crate::errors::{KiriwakeError, Result};
use crate::utils::FromU32;

const CATE_IDSET_BITS: usize = 18;
const CATE_IDSET_MASK: u32 = (1 << CATE_IDSET_BITS) - 1;
const BASE_ID_BITS: usize = 8;
const BASE_ID_MASK: u32 = (1 << BASE_ID_BITS) - 1;
const LENGTH_BITS: usize = 4;

/// Category information of a character defined in `char.def`.
///
/// The memory layout is
///   cate_idset = 18 bits
///      base_id =  8 bits
///       invoke =  1 bit
///        group =  1 bit
///       length =  4 bits
#[derive(Default, Clone, Copy, Decode, Encode)]
pub struct CharInfo(u32);

impl fmt::Debug for CharInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharInfo")
            .field("cate_idset", &self.cate_idset())
            .field("base_id", &self.base_id())
            .field("invoke", &self.invoke())
            .field("group", &self.group())
            .field("length", &self.length())
            .finish()
    }
}

impl CharInfo {
    pub fn new(
        cate_idset: u32,
        base_id: u32,
        invoke: bool,
        group: bool,
        length: u16,
    ) -> Option<Self> {
        if cate_idset >> CATE_IDSET_BITS != 0 {
            return None;
        }
        if base_id >> BASE_ID_BITS != 0 {
            return None;
        }
        if length >> LENGTH_BITS != 0 {
            return None;
        }
        Some(Self(
            cate_idset
                | (base_id << CATE_IDSET_BITS)
                | (u32::from(invoke) << (CATE_IDSET_BITS + BASE_ID_BITS))
                | (u32::from(group) << (CATE_IDSET_BITS + BASE_ID_BITS + 1))
                | ((u32::from(length)) << (CATE_IDSET_BITS + BASE_ID_BITS + 2)),
        ))
    }

    #[inline(always)]
    pub fn reset_cate_idset(&mut self, cate_idset: u32) {
        self.0 &= !CATE_IDSET_MASK;
        self.0 |= cate_idset;
    }

    #[inline(always)]
    pub const fn cate_idset(&self) -> u32 {
        self.0 & CATE_IDSET_MASK
    }

    #[inline(always)]
    pub const fn base_id(&self) -> u32 {
        (self.0 >> CATE_IDSET_BITS) & BASE_ID_MASK
    }

    #[inline(always)]
    pub const fn invoke(&self) -> bool {
        (self.0 >> (CATE_IDSET_BITS + BASE_ID_BITS)) & 1 != 0
    }

    #[inline(always)]
    pub const fn group(&self) -> bool {
        (self.0 >> (CATE_IDSET_BITS + BASE_ID_BITS + 1)) & 1 != 0
    }

    #[inline(always)]
    pub const fn length(&self) -> u16 {
        (self.0 >> (CATE_IDSET_BITS + BASE_ID_BITS + 2)) as u16
    }
}

struct CharRange {
    start: usize,
    end: usize,
    categories: Vec<String>,
}

/// Mapping from characters to their category information.
///
/// Characters outside the basic multilingual plane fall into `DEFAULT`.
#[derive(Decode, Encode)]
pub struct CharProperty {
    chr2inf: Vec<CharInfo>,
    default_info: CharInfo,
    categories: Vec<String>, // indexed by category id
}

impl CharProperty {
    /// Gets the information of the character.
    #[inline(always)]
    pub fn char_info(&self, c: char) -> CharInfo {
        self.chr2inf
            .get(usize::from_u32(u32::from(c)))
            .copied()
            .unwrap_or(self.default_info)
    }

    /// Gets the id of the category name.
    #[inline(always)]
    pub fn cate_id(&self, category: &str) -> Option<u32> {
        self.categories
            .iter()
            .position(|cate| cate == category)
            .and_then(|id| u32::try_from(id).ok())
    }

    /// Gets the name of the category id.
    #[inline(always)]
    pub fn cate_str(&self, cate_id: u32) -> Option<&str> {
        self.categories
            .get(usize::from_u32(cate_id))
            .map(|c| c.as_str())
    }

    /// Gets the number of categories.
    #[inline(always)]
    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    /// Creates a new instance from `char.def`.
    ///
    /// A category line is `NAME INVOKE GROUP LENGTH`, and a range line is
    /// `0xSTART[..0xEND] NAME [NAME..]` where the first name is the base category.
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut cate2info = BTreeMap::new();
        let mut cate_map = BTreeMap::new(); // Name -> Id
        let mut char_ranges = vec![];

        let reader = BufReader::new(rdr);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with("0x") {
                char_ranges.push(Self::parse_char_range(line)?);
                continue;
            }

            let (category, invoke, group, length) = Self::parse_char_category(line)?;
            let new_cate_id = u32::try_from(cate_map.len())?;
            let cate_id = *cate_map.entry(category).or_insert(new_cate_id);
            let cinfo = CharInfo::new(0, cate_id, invoke, group, length).ok_or_else(|| {
                let msg = format!("LENGTH or the number of categories is too large, `{line}`");
                KiriwakeError::invalid_format("char.def", msg)
            })?;
            cate2info.insert(cate_id, cinfo);
        }

        if cate2info.len() > CATE_IDSET_BITS {
            let msg = format!("At most {CATE_IDSET_BITS} categories can be defined");
            return Err(KiriwakeError::invalid_format("char.def", msg));
        }

        let default_info = Self::encode_cate_info(&["DEFAULT"], &cate2info, &cate_map)?;
        let mut chr2inf = vec![default_info; 1 << 16];

        for r in &char_ranges {
            let cinfo = Self::encode_cate_info(&r.categories, &cate2info, &cate_map)?;
            for e in chr2inf.iter_mut().take(r.end).skip(r.start) {
                *e = cinfo;
            }
        }

        let mut categories = vec![String::new(); cate_map.len()];
        for (k, &v) in cate_map.iter() {
            categories[usize::from_u32(v)] = k.clone();
        }

        Ok(Self {
            chr2inf,
            default_info,
            categories,
        })
    }

    fn encode_cate_info<S>(
        targets: &[S],
        cate2info: &BTreeMap<u32, CharInfo>,
        cate_map: &BTreeMap<String, u32>,
    ) -> Result<CharInfo>
    where
        S: AsRef<str>,
    {
        let lookup = |target: &str| {
            cate_map
                .get(target)
                .and_then(|id| cate2info.get(id))
                .copied()
                .ok_or_else(|| {
                    let msg = format!("The category {target} is not defined");
                    KiriwakeError::invalid_format("char.def", msg)
                })
        };
        let Some(first) = targets.first() else {
            return Err(KiriwakeError::invalid_format("char.def", "No category is given"));
        };
        let mut base_cinfo = lookup(first.as_ref())?;
        let mut cate_idset = base_cinfo.cate_idset();
        for target in targets {
            cate_idset |= 1 << lookup(target.as_ref())?.base_id();
        }
        base_cinfo.reset_cate_idset(cate_idset);
        Ok(base_cinfo)
    }

    // NAME INVOKE GROUP LENGTH
    fn parse_char_category(line: &str) -> Result<(String, bool, bool, u16)> {
        let mut cols = line.split_whitespace();
        let (Some(name), Some(invoke), Some(group), Some(length)) =
            (cols.next(), cols.next(), cols.next(), cols.next())
        else {
            let msg = format!("Expected `NAME INVOKE GROUP LENGTH`, got `{line}`");
            return Err(KiriwakeError::invalid_format("char.def", msg));
        };
        let invoke = Self::parse_flag("INVOKE", invoke)?;
        let group = Self::parse_flag("GROUP", group)?;
        let length = length.parse()?;
        Ok((name.to_string(), invoke, group, length))
    }

    fn parse_flag(name: &str, col: &str) -> Result<bool> {
        match col {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => {
                let msg = format!("{name} is a flag of 0 or 1, got `{col}`");
                Err(KiriwakeError::invalid_format("char.def", msg))
            }
        }
    }

    fn parse_code_point(col: &str) -> Result<usize> {
        let hex = col.strip_prefix("0x").unwrap_or(col);
        Ok(usize::from_str_radix(hex, 16)?)
    }

    // 0xSTART[..0xEND] NAME [NAME..] [# comment]
    fn parse_char_range(line: &str) -> Result<CharRange> {
        let mut cols = line.split_whitespace();
        let span = cols.next().unwrap_or_default();
        let categories: Vec<_> = cols
            .take_while(|col| !col.starts_with('#'))
            .map(|cate| cate.to_string())
            .collect();
        if categories.is_empty() {
            let msg = format!("No category is given to the range `{line}`");
            return Err(KiriwakeError::invalid_format("char.def", msg));
        }

        let (start, last) = match span.split_once("..") {
            Some((first, last)) => (Self::parse_code_point(first)?, Self::parse_code_point(last)?),
            None => {
                let c = Self::parse_code_point(span)?;
                (c, c)
            }
        };
        if start > last {
            let msg = format!("The range `{span}` is reversed");
            return Err(KiriwakeError::invalid_format("char.def", msg));
        }
        if last > 0xFFFF {
            let msg = format!("The range `{span}` goes beyond U+FFFF");
            return Err(KiriwakeError::invalid_format("char.def", msg));
        }

        Ok(CharRange {
            start,
            end: last + 1,
            categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic() {
        let data = "DEFAULT 0 1 0\nSPACE 0 1 0\n0x0020 SPACE";
        let prop = CharProperty::from_reader(data.as_bytes()).unwrap();
        assert_eq!(prop.chr2inf[0x0020].cate_idset(), 0b10);
        assert_eq!(prop.chr2inf[0x0020].base_id(), 1);
        assert_eq!(prop.chr2inf[0x0020].invoke(), false);
        assert_eq!(prop.chr2inf[0x0020].group(), true);
        assert_eq!(prop.chr2inf[0x0020].length(), 0);
    }

    #[test]
    fn test_compound_categories() {
        let data = "DEFAULT 0 1 0\nKANJI 0 0 2\nKANJINUMERIC 1 1 0\n\
                    0x4E00..0x9FFF KANJI\n0x4E00 KANJINUMERIC KANJI # 一";
        let prop = CharProperty::from_reader(data.as_bytes()).unwrap();
        let kanji = prop.cate_id("KANJI").unwrap();
        let numeric = prop.cate_id("KANJINUMERIC").unwrap();

        let cinfo = prop.char_info('一');
        assert_eq!(cinfo.base_id(), numeric);
        assert_eq!(cinfo.cate_idset(), (1 << kanji) | (1 << numeric));
        assert!(cinfo.invoke());
        assert!(cinfo.group());

        let cinfo = prop.char_info('語');
        assert_eq!(cinfo.base_id(), kanji);
        assert_eq!(cinfo.length(), 2);
        assert_eq!(prop.cate_str(kanji), Some("KANJI"));
        assert_eq!(prop.num_categories(), 3);
    }

    #[test]
    fn test_out_of_bmp() {
        let data = "DEFAULT 1 0 3\nSPACE 0 1 0\n0x0000..0xFFFF SPACE";
        let prop = CharProperty::from_reader(data.as_bytes()).unwrap();
        let cinfo = prop.char_info('\u{20B9F}');
        assert_eq!(cinfo.base_id(), prop.cate_id("DEFAULT").unwrap());
        assert!(cinfo.invoke());
        assert_eq!(cinfo.length(), 3);
    }

    #[test]
    fn test_invalid_cate() {
        let data = "DEFAULT 0 1 0\n0x0..0xFFFF INVALID";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_no_default_cate() {
        let data = "USER_DEFINED 0 1 0";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_invoke() {
        let data = "DEFAULT 2 1 0";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_group() {
        let data = "DEFAULT 0 2 0";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_length() {
        let data = "DEFAULT 0 2 -1";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_few_cols() {
        let data = "DEFAULT 0 2";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_char_range_1() {
        let data = "DEFAULT 0 1 0\n0x10000 DEFAULT";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_char_range_2() {
        let data = "DEFAULT 0 1 0\n0x0..0xFFFF DEFAULT";
        CharProperty::from_reader(data.as_bytes()).unwrap();
    }

    #[test]
    fn test_char_range_3() {
        let data = "DEFAULT 0 1 0\n0x0..0x10000 DEFAULT";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_char_range_4() {
        let data = "DEFAULT 0 1 0\n0x0020..0x0019 DEFAULT";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_char_range_without_category() {
        let data = "DEFAULT 0 1 0\n0x0020 # SPACE";
        let result = CharProperty::from_reader(data.as_bytes());
        assert!(matches!(result, Err(KiriwakeError::InvalidFormat(_))));
    }

    #[test]
    fn test_single_char_range() {
        let data = "DEFAULT 0 1 0\nSPACE 0 1 0\n0x0020 SPACE # space";
        let prop = CharProperty::from_reader(data.as_bytes()).unwrap();
        let space = prop.cate_id("SPACE").unwrap();
        assert_eq!(prop.char_info(' ').base_id(), space);
        assert_eq!(prop.char_info('!').base_id(), prop.cate_id("DEFAULT").unwrap());
    }
}
