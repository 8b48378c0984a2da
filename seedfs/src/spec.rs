//! Parsing of the `name,size,seed[/name,size,seed...]` file list.
//!
//! Numbers follow C `strtoul` base detection: `0x` prefix for hex, a leading `0` for octal,
//! decimal otherwise. Sizes may end in `k`, `m` or `g` (binary multiples).

use std::str::FromStr;

use crate::error::SpecError;
use crate::registry::{FileSpec, is_valid_name};

const LIST_SEPARATOR: char = '/';
const FIELD_SEPARATOR: char = ',';

/// Parsed file list, usable directly as a clap argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSpecList(pub Vec<FileSpec>);

impl FromStr for FileSpecList {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_file_specs(s).map(FileSpecList)
    }
}

impl FromStr for FileSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_file_spec(s)
    }
}

/// Parse a `/`-separated list. Empty entries (`a,1,1//b,1,1`, a trailing `/`) are skipped.
pub fn parse_file_specs(input: &str) -> Result<Vec<FileSpec>, SpecError> {
    let specs = input
        .split(LIST_SEPARATOR)
        .filter(|entry| !entry.is_empty())
        .map(parse_file_spec)
        .collect::<Result<Vec<_>, _>>()?;
    if specs.is_empty() {
        return Err(SpecError::Empty);
    }
    Ok(specs)
}

pub fn parse_file_spec(entry: &str) -> Result<FileSpec, SpecError> {
    let mut fields = entry.split(FIELD_SEPARATOR);
    let (Some(name), Some(size), Some(seed)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(SpecError::MissingField(entry.to_string()));
    };
    if fields.next().is_some() {
        return Err(SpecError::TooManyFields(entry.to_string()));
    }
    if !is_valid_name(name) {
        return Err(SpecError::InvalidName(name.to_string()));
    }
    let size = parse_size(size)?;
    let seed = parse_seed(seed)?;
    FileSpec::new(name, size, seed).map_err(|_| SpecError::InvalidName(name.to_string()))
}

/// Parse a non-zero byte count with an optional `k`/`m`/`g` suffix.
pub fn parse_size(text: &str) -> Result<u64, SpecError> {
    let invalid = || SpecError::InvalidSize(text.to_string());
    let (value, rest) = parse_number(text).ok_or_else(invalid)?;
    let multiplier: u64 = match rest {
        "" => 1,
        "k" | "K" => 1 << 10,
        "m" | "M" => 1 << 20,
        "g" | "G" => 1 << 30,
        _ => return Err(invalid()),
    };
    match value.checked_mul(multiplier) {
        Some(size) if size > 0 => Ok(size),
        _ => Err(invalid()),
    }
}

/// Parse a non-zero 32-bit seed.
pub fn parse_seed(text: &str) -> Result<u32, SpecError> {
    let invalid = || SpecError::InvalidSeed(text.to_string());
    match parse_number(text) {
        Some((value, "")) => match u32::try_from(value) {
            Ok(seed) if seed != 0 => Ok(seed),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

/// Parse the leading unsigned number of `text` and return it with the unparsed rest.
fn parse_number(text: &str) -> Option<(u64, &str)> {
    let (radix, digits) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => (16, hex),
        _ if text.starts_with('0') => (8, text),
        _ => (10, text),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = u64::from_str_radix(&digits[..end], radix).ok()?;
    Some((value, &digits[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let specs = parse_file_specs("testfile_1M,1M,1/testfile_1G,1G,0x02").unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name(), "testfile_1M");
        assert_eq!(specs[0].size(), 1 << 20);
        assert_eq!(specs[0].seed(), 1);
        assert_eq!(specs[1].size(), 1 << 30);
        assert_eq!(specs[1].seed(), 2);
    }

    #[test]
    fn test_skips_empty_entries() {
        let specs = parse_file_specs("/a,1,1//b,2k,3/").unwrap();
        let names: Vec<&str> = specs.iter().map(FileSpec::name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(parse_file_specs("//"), Err(SpecError::Empty));
        assert_eq!(parse_file_specs(""), Err(SpecError::Empty));
    }

    #[test]
    fn test_sizes() {
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("4k"), Ok(4096));
        assert_eq!(parse_size("4K"), Ok(4096));
        assert_eq!(parse_size("3m"), Ok(3 << 20));
        assert_eq!(parse_size("2G"), Ok(2 << 30));
        assert_eq!(parse_size("0x10"), Ok(16));
        assert_eq!(parse_size("010"), Ok(8));
        assert_eq!(parse_size("0x1k"), Ok(1024));
    }

    #[test]
    fn test_invalid_sizes() {
        for bad in ["", "0", "0k", "k", "12q", "1kk", "-1", "0x", "99999999999999999999"] {
            assert_eq!(
                parse_size(bad),
                Err(SpecError::InvalidSize(bad.to_string())),
                "{bad:?}"
            );
        }
        assert!(parse_size("18446744073709551615g").is_err());
    }

    #[test]
    fn test_seeds() {
        assert_eq!(parse_seed("1"), Ok(1));
        assert_eq!(parse_seed("0x02"), Ok(2));
        assert_eq!(parse_seed("0xFFFFFFFF"), Ok(u32::MAX));
        assert_eq!(parse_seed("017"), Ok(15));
        for bad in ["0", "", "1k", "0x100000000", "09", "x1"] {
            assert_eq!(
                parse_seed(bad),
                Err(SpecError::InvalidSeed(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_field_errors() {
        assert_eq!(
            parse_file_spec("a,1"),
            Err(SpecError::MissingField("a,1".into()))
        );
        assert_eq!(
            parse_file_spec("a,1,1,1"),
            Err(SpecError::TooManyFields("a,1,1,1".into()))
        );
        assert_eq!(
            parse_file_spec(",1,1"),
            Err(SpecError::InvalidName(String::new()))
        );
        assert_eq!(
            parse_file_spec("a,0,1"),
            Err(SpecError::InvalidSize("0".into()))
        );
        assert_eq!(
            parse_file_spec("a,1,0"),
            Err(SpecError::InvalidSeed("0".into()))
        );
    }

    #[test]
    fn test_from_str() {
        let list: FileSpecList = "x,1k,5".parse().unwrap();
        assert_eq!(list.0, vec![FileSpec::new("x", 1024, 5).unwrap()]);
        let one: FileSpec = "y,2,3".parse().unwrap();
        assert_eq!(one.size(), 2);
    }
}
