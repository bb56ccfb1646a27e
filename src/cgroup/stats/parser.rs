//! Generic parsers for the counter files exposed by cgroup controllers.
//!
//! Cgroup counter files come in two shapes:
//!
//! - **Key-value files** such as `cpu.stat`, `memory.stat`, `io.stat` or
//!   `blkio.throttle.io_service_bytes`. They are parsed through the [`KeyValueStat`] trait, whose
//!   [`LineFormat`] describes how keys and values are laid out on a line.
//! - **Single-value files** such as `memory.current`, `pids.current` or `memory.max`. They are
//!   parsed with [`parse_u64_value`] and [`parse_limit_value`].
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::OnceLock;
//! use cgroup_stats::cgroup::stats::{KeyValueStat, LineFormat};
//!
//! #[derive(Default)]
//! struct MyStat {
//!     foo: u64,
//!     bar: u64,
//! }
//!
//! static FIELDS: OnceLock<HashMap<&'static str, fn(&mut MyStat) -> &mut u64>> = OnceLock::new();
//!
//! impl KeyValueStat for MyStat {
//!     const FORMAT: LineFormat = LineFormat::WHITESPACE_PAIRS;
//!
//!     fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
//!         FIELDS.get_or_init(|| {
//!             let mut map: HashMap<&'static str, fn(&mut MyStat) -> &mut u64> = HashMap::new();
//!             map.insert("foo", |s| &mut s.foo);
//!             map.insert("bar", |s| &mut s.bar);
//!             map
//!         })
//!     }
//! }
//!
//! let stat = MyStat::from_reader(&mut "foo 1\nbar 2\n".as_bytes()).unwrap();
//! assert_eq!((stat.foo, stat.bar), (1, 2));
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// How a key is joined to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Keys and values are separate whitespace-delimited tokens: `key 123`.
    Whitespace,
    /// Keys and values form a single token joined by the given character: `key=123`.
    Char(char),
}

/// What to do when a known key occurs more than once in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    /// Reject the file with [`StatParseError::DuplicateField`].
    Reject,
    /// Add every occurrence to the field (per-device files sum their lines).
    Accumulate,
}

/// Layout of a key-value counter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFormat {
    /// How a key is joined to its value.
    pub separator: Separator,
    /// Number of whitespace-separated tokens to skip at the start of every line
    /// (e.g. the `8:0` device number in `io.stat`).
    pub skip_values: usize,
    /// Handling of repeated keys.
    pub duplicates: Duplicates,
    /// Whether a line can hold more than one key-value pair.
    pub multiple_pairs_per_line: bool,
}

impl LineFormat {
    /// One `key value` pair per line, every key at most once (`cpu.stat`, `memory.stat`).
    pub const WHITESPACE_PAIRS: LineFormat = LineFormat {
        separator: Separator::Whitespace,
        skip_values: 0,
        duplicates: Duplicates::Reject,
        multiple_pairs_per_line: false,
    };

    /// `<major:minor> key=value key=value ...` lines, summed across devices (`io.stat`).
    pub const DEVICE_EQUALS_PAIRS: LineFormat = LineFormat {
        separator: Separator::Char('='),
        skip_values: 1,
        duplicates: Duplicates::Accumulate,
        multiple_pairs_per_line: true,
    };

    /// `<major:minor> Key value` lines, summed across devices (`blkio.throttle.*`).
    pub const DEVICE_WHITESPACE_PAIRS: LineFormat = LineFormat {
        separator: Separator::Whitespace,
        skip_values: 1,
        duplicates: Duplicates::Accumulate,
        multiple_pairs_per_line: false,
    };
}

type Fields<S> = HashMap<&'static str, fn(&mut S) -> &mut u64>;

/// A counter file made of key-value pairs.
///
/// Implementors name the keys they understand and how each value is applied (set or added).
/// Unknown keys are ignored, known keys must carry a base-10 unsigned integer.
pub trait KeyValueStat: Default + 'static {
    /// Layout of the file.
    const FORMAT: LineFormat;

    /// Returns the known keys and the counter field each one fills.
    fn fields() -> &'static Fields<Self>;

    /// Parses a whole key-value file.
    ///
    /// # Errors
    ///
    /// - [`StatParseError::InvalidKeyValue`] if a known key has a non-numeric value.
    /// - [`StatParseError::MissingValue`] if a known key has no value at all.
    /// - [`StatParseError::DuplicateField`] if a key repeats while [`Duplicates::Reject`] is set.
    /// - [`StatParseError::Overflow`] if summing a key under [`Duplicates::Accumulate`] overflows.
    /// - [`StatParseError::Io`] if reading fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> Result<Self, StatParseError> {
        let mut stat = Self::default();
        let fields = Self::fields();
        let mut seen_keys = HashSet::with_capacity(fields.len());

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut tokens = line.split_whitespace().skip(Self::FORMAT.skip_values);

            match Self::FORMAT.separator {
                Separator::Whitespace => {
                    while let Some(key) = tokens.next() {
                        match tokens.next() {
                            Some(val) => apply(&mut stat, key, val, lineno, fields, &mut seen_keys)?,
                            None => check_unpaired(key, lineno, fields)?,
                        }
                        if !Self::FORMAT.multiple_pairs_per_line {
                            break;
                        }
                    }
                }
                Separator::Char(split_char) => {
                    for token in tokens {
                        match token.split_once(split_char) {
                            Some((key, val)) => {
                                apply(&mut stat, key, val, lineno, fields, &mut seen_keys)?
                            }
                            None => check_unpaired(token, lineno, fields)?,
                        }
                        if !Self::FORMAT.multiple_pairs_per_line {
                            break;
                        }
                    }
                }
            }

            line.clear();
        }

        Ok(stat)
    }
}

/// Parses `val` into the field registered for `key`, if any.
fn apply<S: KeyValueStat>(
    stat: &mut S,
    key: &str,
    val: &str,
    lineno: usize,
    fields: &Fields<S>,
    seen_keys: &mut HashSet<&'static str>,
) -> Result<(), StatParseError> {
    let Some((known_key, field)) = fields.get_key_value(key) else {
        return Ok(());
    };

    let parsed = val
        .parse::<u64>()
        .map_err(|source| StatParseError::InvalidKeyValue {
            key: key.to_string(),
            value: val.to_string(),
            line: lineno,
            source,
        })?;

    if S::FORMAT.duplicates == Duplicates::Reject && !seen_keys.insert(*known_key) {
        return Err(StatParseError::DuplicateField {
            field: key.to_string(),
            line: lineno,
        });
    }

    let slot = field(stat);
    match S::FORMAT.duplicates {
        Duplicates::Reject => *slot = parsed,
        Duplicates::Accumulate => {
            *slot = slot
                .checked_add(parsed)
                .ok_or_else(|| StatParseError::Overflow {
                    key: key.to_string(),
                    line: lineno,
                })?;
        }
    }
    Ok(())
}

/// A token that is not a key-value pair is only an error if it names a known key.
fn check_unpaired<S>(token: &str, lineno: usize, fields: &Fields<S>) -> Result<(), StatParseError> {
    if fields.contains_key(token) {
        return Err(StatParseError::MissingValue {
            key: token.to_string(),
            line: lineno,
        });
    }
    Ok(())
}

/// Reads a single-value file and returns the trimmed content of its first line.
///
/// Anything but whitespace after the first token, on the same line or a later one, is rejected.
fn read_single_token<R: BufRead>(buf: &mut R) -> Result<String, StatParseError> {
    let mut first = String::new();
    buf.read_line(&mut first)?;
    let token = first.trim();
    if token.split_whitespace().count() > 1 {
        return Err(StatParseError::TrailingContent {
            content: token.to_string(),
            line: 1,
        });
    }

    let mut line = String::new();
    let mut lineno = 1;
    while buf.read_line(&mut line)? != 0 {
        lineno += 1;
        if !line.trim().is_empty() {
            return Err(StatParseError::TrailingContent {
                content: line.trim().to_string(),
                line: lineno,
            });
        }
        line.clear();
    }

    Ok(token.to_string())
}

/// Parses a file holding exactly one unsigned integer (`memory.current`, `pids.current`, ...).
///
/// # Errors
///
/// Returns [`StatParseError::InvalidValue`] for empty or non-numeric content and
/// [`StatParseError::TrailingContent`] if the file holds more than one token.
pub fn parse_u64_value<R: BufRead>(buf: &mut R) -> Result<u64, StatParseError> {
    let token = read_single_token(buf)?;
    token
        .parse::<u64>()
        .map_err(|source| StatParseError::InvalidValue {
            value: token.clone(),
            line: 1,
            source,
        })
}

/// Parses a limit file that holds either an unsigned integer or `max` (`memory.max`,
/// `pids.max`). `max` yields `None`.
///
/// # Errors
///
/// Same as [`parse_u64_value`].
pub fn parse_limit_value<R: BufRead>(buf: &mut R) -> Result<Option<u64>, StatParseError> {
    let token = read_single_token(buf)?;
    if token == "max" {
        return Ok(None);
    }
    token
        .parse::<u64>()
        .map(Some)
        .map_err(|source| StatParseError::InvalidValue {
            value: token.clone(),
            line: 1,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64_value() {
        assert_eq!(parse_u64_value(&mut "8192\n".as_bytes()).unwrap(), 8192);
        assert_eq!(parse_u64_value(&mut "  7  ".as_bytes()).unwrap(), 7);
    }

    #[test]
    fn test_parse_u64_value_rejects_empty() {
        let err = parse_u64_value(&mut "".as_bytes()).unwrap_err();
        match err {
            StatParseError::InvalidValue { value, line, .. } => {
                assert_eq!(value, "");
                assert_eq!(line, 1);
            }
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_parse_u64_value_rejects_non_numeric() {
        let err = parse_u64_value(&mut "abcd\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::InvalidValue { ref value, .. } if value == "abcd"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_parse_u64_value_rejects_negative() {
        let err = parse_u64_value(&mut "-1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_u64_value_rejects_trailing_content() {
        let err = parse_u64_value(&mut "12 34\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::TrailingContent { .. }));
    }

    #[test]
    fn test_parse_u64_value_rejects_later_lines() {
        let err = parse_u64_value(&mut "12\ngarbage\n".as_bytes()).unwrap_err();
        match err {
            StatParseError::TrailingContent { content, line } => {
                assert_eq!(content, "garbage");
                assert_eq!(line, 2);
            }
            other => panic!("Expected TrailingContent error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_u64_value_allows_trailing_blank_lines() {
        assert_eq!(parse_u64_value(&mut "12\n\n  \n".as_bytes()).unwrap(), 12);
    }

    #[test]
    fn test_parse_limit_value() {
        assert_eq!(parse_limit_value(&mut "max\n".as_bytes()).unwrap(), None);
        assert_eq!(
            parse_limit_value(&mut "104857600\n".as_bytes()).unwrap(),
            Some(104_857_600)
        );
    }

    #[test]
    fn test_parse_limit_value_rejects_garbage() {
        let err = parse_limit_value(&mut "unlimited\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::InvalidValue { ref value, .. } if value == "unlimited"));
    }
}
