//! Parsers for CPU accounting files.
//!
//! - [`CpuStat`] reads the unified-hierarchy `cpu.stat` file, which carries usage split into user
//!   and system time (microseconds) plus throttling counters.
//! - [`LegacyCpuStat`] reads the v1 `cpu` controller's `cpu.stat`, which only carries
//!   throttling counters (`throttled_time` in nanoseconds).
//! - [`CpuAcctStat`] reads the v1 `cpuacct.stat` file (user/system time in `USER_HZ` ticks).
//!
//! # Example
//!
//! ```rust
//! use cgroup_stats::cgroup::stats::{CpuStat, KeyValueStat};
//!
//! let data = "\
//! usage_usec 1000000
//! user_usec 600000
//! system_usec 400000
//! nr_periods 10
//! nr_throttled 2
//! throttled_usec 50000
//! ";
//! let cpu_stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(cpu_stat.user_usec + cpu_stat.system_usec, cpu_stat.usage_usec);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use super::{KeyValueStat, LineFormat};

/// Represents parsed data from a cgroup v2 `cpu.stat` file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CpuStat {
    /// Total time (in microseconds) that the cgroup used CPU (user + system).
    pub usage_usec: u64,
    /// Time (in microseconds) spent in user space.
    pub user_usec: u64,
    /// Time (in microseconds) spent in kernel (system) space.
    pub system_usec: u64,
    /// Number of scheduling periods in which the cgroup was eligible to run.
    pub nr_periods: u64,
    /// Number of periods in which the cgroup was throttled.
    pub nr_throttled: u64,
    /// Total time (in microseconds) the cgroup was throttled.
    pub throttled_usec: u64,
}

type Field<S> = fn(&mut S) -> &mut u64;

static CPU_STAT_FIELDS: LazyLock<HashMap<&'static str, Field<CpuStat>>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Field<CpuStat>> = HashMap::with_capacity(6);

    m.insert("usage_usec", |s| &mut s.usage_usec);
    m.insert("user_usec", |s| &mut s.user_usec);
    m.insert("system_usec", |s| &mut s.system_usec);
    m.insert("nr_periods", |s| &mut s.nr_periods);
    m.insert("nr_throttled", |s| &mut s.nr_throttled);
    m.insert("throttled_usec", |s| &mut s.throttled_usec);

    m
});

impl KeyValueStat for CpuStat {
    const FORMAT: LineFormat = LineFormat::WHITESPACE_PAIRS;

    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &CPU_STAT_FIELDS
    }
}

/// Represents parsed data from a cgroup v1 `cpu.stat` file (CFS bandwidth throttling).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LegacyCpuStat {
    /// Number of enforcement periods that have elapsed.
    pub nr_periods: u64,
    /// Number of periods in which the cgroup was throttled.
    pub nr_throttled: u64,
    /// Total time (in nanoseconds) the cgroup was throttled.
    pub throttled_time: u64,
}

static LEGACY_CPU_STAT_FIELDS: LazyLock<HashMap<&'static str, Field<LegacyCpuStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, Field<LegacyCpuStat>> = HashMap::with_capacity(3);

        m.insert("nr_periods", |s| &mut s.nr_periods);
        m.insert("nr_throttled", |s| &mut s.nr_throttled);
        m.insert("throttled_time", |s| &mut s.throttled_time);

        m
    });

impl KeyValueStat for LegacyCpuStat {
    const FORMAT: LineFormat = LineFormat::WHITESPACE_PAIRS;

    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &LEGACY_CPU_STAT_FIELDS
    }
}

/// Represents parsed data from a cgroup v1 `cpuacct.stat` file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CpuAcctStat {
    /// Time spent in user mode, in `USER_HZ` ticks.
    pub user_ticks: u64,
    /// Time spent in kernel mode, in `USER_HZ` ticks.
    pub system_ticks: u64,
}

static CPUACCT_STAT_FIELDS: LazyLock<HashMap<&'static str, Field<CpuAcctStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, Field<CpuAcctStat>> = HashMap::with_capacity(2);

        m.insert("user", |s| &mut s.user_ticks);
        m.insert("system", |s| &mut s.system_ticks);

        m
    });

impl KeyValueStat for CpuAcctStat {
    const FORMAT: LineFormat = LineFormat::WHITESPACE_PAIRS;

    fn fields() -> &'static HashMap<&'static str, fn(&mut Self) -> &mut u64> {
        &CPUACCT_STAT_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::StatParseError;

    #[test]
    fn test_parse_empty_cpu_stat() {
        let data = "";
        let stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat, CpuStat::default());
    }

    #[test]
    fn test_parse_complete_cpu_stat() {
        let data = "\
usage_usec 623932088000
user_usec 421230248000
system_usec 202701840000
core_sched.force_idle_usec 0
nr_periods 0
nr_throttled 0
throttled_usec 0
nr_bursts 0
burst_usec 0
";
        let stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();

        assert_eq!(stat.usage_usec, 623_932_088_000);
        assert_eq!(stat.user_usec, 421_230_248_000);
        assert_eq!(stat.system_usec, 202_701_840_000);
        assert_eq!(stat.nr_periods, 0);
        assert_eq!(stat.nr_throttled, 0);
        assert_eq!(stat.throttled_usec, 0);
    }

    #[test]
    fn test_parse_invalid_cpu_stat() {
        let data = "\
invalid_line
usage_usec abc
user_usec 42
";
        let err = CpuStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "usage_usec");
                assert_eq!(value, "abc");
                assert_eq!(line, 2);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_known_key_without_value() {
        let data = "usage_usec 1500\nuser_usec\nsystem_usec 500\n";
        let err = CpuStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::MissingValue { key, line } => {
                assert_eq!(key, "user_usec");
                assert_eq!(line, 2);
            }
            other => panic!("Expected MissingValue error, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_field_errors() {
        let data = "\
usage_usec 100
usage_usec 200
";
        let err = CpuStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match err {
            StatParseError::DuplicateField { field, line } => {
                assert_eq!(field, "usage_usec");
                assert_eq!(line, 2);
            }
            _ => panic!("Expected DuplicateField error"),
        }
    }

    #[test]
    fn test_parse_legacy_cpu_stat() {
        let data = "\
nr_periods 120
nr_throttled 4
throttled_time 8123456
";
        let stat = LegacyCpuStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(
            stat,
            LegacyCpuStat {
                nr_periods: 120,
                nr_throttled: 4,
                throttled_time: 8_123_456,
            }
        );
    }

    #[test]
    fn test_parse_cpuacct_stat() {
        let data = "user 1520\nsystem 340\n";
        let stat = CpuAcctStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.user_ticks, 1520);
        assert_eq!(stat.system_ticks, 340);
    }

    #[test]
    fn test_parse_cpuacct_stat_rejects_garbage() {
        let err = CpuAcctStat::from_reader(&mut "user many\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StatParseError::InvalidKeyValue { .. }));
    }
}
