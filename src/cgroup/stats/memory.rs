//! This module provides parsing utilities for memory statistics as reported in Linux cgroup files.
//!
//! It supports both hierarchies:
//!
//! - **Unified (v2)** `memory.stat`, parsed into [`MemoryStat`]. The scalar files
//!   `memory.current`, `memory.peak` and `memory.max` are single values and are read with
//!   [`parse_u64_value`](super::parse_u64_value) / [`parse_limit_value`](super::parse_limit_value).
//! - **Legacy (v1)** `memory.stat`, parsed into [`LegacyMemoryStat`]. Its scalar companions
//!   (`memory.usage_in_bytes`, `memory.max_usage_in_bytes`, `memory.failcnt`,
//!   `memory.limit_in_bytes`) are plain integers.
//!
//! # Parsing assumptions
//!
//! - `memory.stat` holds one whitespace-separated key-value pair per line and no duplicate keys.
//! - Keys that are not tracked (there are dozens, varying by kernel version) are ignored.
//!
//! # Example
//!
//! ```rust
//! use cgroup_stats::cgroup::stats::{MemoryStat, KeyValueStat};
//!
//! let data = "anon 1000\nfile 2000\n";
//! let mem_stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(mem_stat.anon, 1000);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::{KeyValueStat, LineFormat};

/// Represents memory usage statistics from a cgroup v2 `memory.stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MemoryStat {
    /// Anonymous memory.
    pub anon: u64,
    /// File-backed memory.
    pub file: u64,
    /// Kernel stack memory.
    pub kernel_stack: u64,
    /// Slab memory (used for kernel object caches).
    pub slab: u64,
    /// Socket memory usage.
    pub sock: u64,
    /// Shared memory.
    pub shmem: u64,
    /// Mapped file memory.
    pub file_mapped: u64,
}

type Field<S> = fn(&mut S) -> &mut u64;

static FIELDS: LazyLock<HashMap<&'static str, Field<MemoryStat>>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Field<MemoryStat>> = HashMap::with_capacity(7);

    m.insert("anon", |s| &mut s.anon);
    m.insert("file", |s| &mut s.file);
    m.insert("kernel_stack", |s| &mut s.kernel_stack);
    m.insert("slab", |s| &mut s.slab);
    m.insert("sock", |s| &mut s.sock);
    m.insert("shmem", |s| &mut s.shmem);
    m.insert("file_mapped", |s| &mut s.file_mapped);

    m
});

impl KeyValueStat for MemoryStat {
    const FORMAT: LineFormat = LineFormat::WHITESPACE_PAIRS;

    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &FIELDS
    }
}

/// Represents memory usage statistics from a cgroup v1 `memory.stat`.
///
/// Only the local (non-`total_*`) counters are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LegacyMemoryStat {
    /// Page cache, including tmpfs.
    pub cache: u64,
    /// Anonymous and swap cache memory.
    pub rss: u64,
    /// Anonymous transparent hugepages.
    pub rss_huge: u64,
    /// Memory-mapped files, including tmpfs.
    pub mapped_file: u64,
    /// Swap usage (only present with swap accounting enabled).
    pub swap: u64,
}

static LEGACY_FIELDS: LazyLock<HashMap<&'static str, Field<LegacyMemoryStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, Field<LegacyMemoryStat>> = HashMap::with_capacity(5);

        m.insert("cache", |s| &mut s.cache);
        m.insert("rss", |s| &mut s.rss);
        m.insert("rss_huge", |s| &mut s.rss_huge);
        m.insert("mapped_file", |s| &mut s.mapped_file);
        m.insert("swap", |s| &mut s.swap);

        m
    });

impl KeyValueStat for LegacyMemoryStat {
    const FORMAT: LineFormat = LineFormat::WHITESPACE_PAIRS;

    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &LEGACY_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::StatParseError;

    #[test]
    fn test_parse_empty_memory_stat() {
        let data = "";
        let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat, MemoryStat::default());
    }

    #[test]
    fn test_parse_complete_memory_stat() {
        let data = "\
anon 1000
file 2000
kernel 2500
kernel_stack 300
pagetables 12
slab 400
sock 500
shmem 600
file_mapped 700
";
        let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.anon, 1000);
        assert_eq!(stat.file, 2000);
        assert_eq!(stat.kernel_stack, 300);
        assert_eq!(stat.slab, 400);
        assert_eq!(stat.sock, 500);
        assert_eq!(stat.shmem, 600);
        assert_eq!(stat.file_mapped, 700);
    }

    #[test]
    fn test_parse_invalid_memory_stat() {
        let data = "\
invalid line
anon abc
file 2000
";
        let err = MemoryStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "anon");
                assert_eq!(value, "abc");
                assert_eq!(line, 2);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_duplicate_memory_stat_field() {
        let data = "\
anon 1000
anon 2000
";
        let err = MemoryStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::DuplicateField { field, line } => {
                assert_eq!(field, "anon");
                assert_eq!(line, 2);
            }
            _ => panic!("Expected DuplicateField error"),
        }
    }

    #[test]
    fn test_extra_whitespace() {
        let data = "\
    anon     1000
file     2000
    kernel_stack     300
";
        let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.anon, 1000);
        assert_eq!(stat.file, 2000);
        assert_eq!(stat.kernel_stack, 300);
    }

    #[test]
    fn test_parse_legacy_memory_stat_ignores_totals() {
        let data = "\
cache 4096
rss 8192
rss_huge 0
shmem 0
mapped_file 1024
swap 0
total_cache 999999
total_rss 999999
";
        let stat = LegacyMemoryStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(
            stat,
            LegacyMemoryStat {
                cache: 4096,
                rss: 8192,
                rss_huge: 0,
                mapped_file: 1024,
                swap: 0,
            }
        );
    }

    #[test]
    fn test_parse_legacy_memory_stat_without_swap_accounting() {
        let stat = LegacyMemoryStat::from_reader(&mut "cache 1\nrss 2\n".as_bytes()).unwrap();
        assert_eq!(stat.swap, 0);
        assert_eq!(stat.rss, 2);
    }
}
