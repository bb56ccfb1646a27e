//! This module provides parsing utilities for block I/O statistics.
//!
//! - [`IoStat`] reads the unified-hierarchy `io.stat` file, where each line starts with a device
//!   identifier (e.g. `8:0`) followed by `key=value` pairs.
//! - [`BlkioStat`] reads the v1 `blkio.throttle.io_service_bytes` and
//!   `blkio.throttle.io_serviced` files, where each line is `<device> <Operation> <value>` and a
//!   trailing `Total <value>` line repeats the sum.
//!
//! Both sum their counters across all devices.
//!
//! # Example
//!
//! ```rust
//! use cgroup_stats::cgroup::stats::{IoStat, KeyValueStat};
//!
//! let data = "\
//! 8:0 rbytes=1024 wbytes=2048 rios=12 wios=24
//! 254:0 rbytes=1024 wbytes=2048 rios=12 wios=24
//! ";
//! let io_stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
//!
//! assert_eq!(io_stat.rbytes, 2048);
//! assert_eq!(io_stat.wbytes, 4096);
//! assert_eq!(io_stat.rios, 24);
//! assert_eq!(io_stat.wios, 48);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::parser::{KeyValueStat, LineFormat};

/// Aggregated I/O statistics from a cgroup v2 `io.stat` file, summed across devices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IoStat {
    /// Total number of bytes read across all devices.
    pub rbytes: u64,
    /// Total number of bytes written across all devices.
    pub wbytes: u64,
    /// Total number of read operations across all devices.
    pub rios: u64,
    /// Total number of write operations across all devices.
    pub wios: u64,
}

type Field<S> = fn(&mut S) -> &mut u64;

static IO_FIELDS: LazyLock<HashMap<&'static str, Field<IoStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, Field<IoStat>> = HashMap::with_capacity(4);

        m.insert("rbytes", |s| &mut s.rbytes);
        m.insert("wbytes", |s| &mut s.wbytes);
        m.insert("rios", |s| &mut s.rios);
        m.insert("wios", |s| &mut s.wios);

        m
    });

impl KeyValueStat for IoStat {
    const FORMAT: LineFormat = LineFormat::DEVICE_EQUALS_PAIRS;

    #[inline]
    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &IO_FIELDS
    }
}

/// Read/write totals from a cgroup v1 `blkio.throttle.*` file, summed across devices.
///
/// The unit depends on the file: bytes for `io_service_bytes`, operations for `io_serviced`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlkioStat {
    /// Sum of the `Read` lines.
    pub read: u64,
    /// Sum of the `Write` lines.
    pub write: u64,
}

static BLKIO_FIELDS: LazyLock<HashMap<&'static str, Field<BlkioStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, Field<BlkioStat>> = HashMap::with_capacity(2);

        m.insert("Read", |s| &mut s.read);
        m.insert("Write", |s| &mut s.write);

        m
    });

impl KeyValueStat for BlkioStat {
    const FORMAT: LineFormat = LineFormat::DEVICE_WHITESPACE_PAIRS;

    #[inline]
    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &BLKIO_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use crate::cgroup::stats::StatParseError;

    use super::*;

    #[test]
    fn test_parse_empty_io_stat() {
        let data = "";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat, IoStat::default());
    }

    #[test]
    fn test_parse_partial_io_stat() {
        let data = "\
8:0 rbytes=1024 wbytes=2048
254:0 rios=12 wios=24
";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.rbytes, 1024);
        assert_eq!(stat.wbytes, 2048);
        assert_eq!(stat.rios, 12);
        assert_eq!(stat.wios, 24);
    }

    #[test]
    fn test_parse_invalid_io_stat() {
        let data = "\
8:0 rbytes=abc wbytes=def
254:0 rios=12 wios=24
";
        let err = IoStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "rbytes");
                assert_eq!(value, "abc");
                assert_eq!(line, 1);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_ignore_unknown_keys_and_malformed_pairs() {
        let data = "\
8:0 foo=100 rbytes=1024 malformedpair dbytes=999 wios=24
";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.rbytes, 1024);
        assert_eq!(stat.wios, 24);
        assert_eq!(stat.wbytes, 0);
        assert_eq!(stat.rios, 0);
    }

    #[test]
    fn test_io_stat_sum_overflow() {
        let data = "8:0 rbytes=18446744073709551615\n8:16 rbytes=1\n";
        let err = IoStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::Overflow { key, line } => {
                assert_eq!(key, "rbytes");
                assert_eq!(line, 2);
            }
            other => panic!("Expected Overflow error, got {other:?}"),
        }
    }

    #[test]
    fn test_io_stat_sums_up_to_max() {
        let data = "8:0 wios=18446744073709551614\n8:16 wios=1\n";
        let stat = IoStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.wios, u64::MAX);
    }

    #[test]
    fn test_io_stat_known_key_without_value() {
        let err = IoStat::from_reader(&mut "8:0 rbytes wbytes=1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::MissingValue { ref key, line: 1 } if key == "rbytes"));
    }

    #[test]
    fn test_blkio_sum_overflow() {
        let data = "8:0 Write 18446744073709551615\n253:0 Write 5\n";
        let err = BlkioStat::from_reader(&mut data.as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::Overflow { ref key, .. } if key == "Write"));
    }

    #[test]
    fn test_parse_blkio_service_bytes() {
        let data = "\
8:0 Read 4096
8:0 Write 8192
8:0 Sync 12288
8:0 Async 0
8:0 Discard 0
8:0 Total 12288
253:0 Read 100
253:0 Write 200
253:0 Total 300
Total 12588
";
        let stat = BlkioStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.read, 4196);
        assert_eq!(stat.write, 8392);
    }

    #[test]
    fn test_parse_blkio_total_only() {
        let stat = BlkioStat::from_reader(&mut "Total 0\n".as_bytes()).unwrap();
        assert_eq!(stat, BlkioStat::default());
    }

    #[test]
    fn test_parse_blkio_invalid_value() {
        let err = BlkioStat::from_reader(&mut "8:0 Read lots\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::InvalidKeyValue { ref key, .. } if key == "Read"));
    }
}
