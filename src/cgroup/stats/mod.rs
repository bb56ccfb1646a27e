//! This module provides the types and parsers behind the Stats Reader.
//!
//! Every accounting subsystem found by the locator contributes one [`CounterGroup`] to a
//! [`ResourceSnapshot`]. The groups are built from the subsystem's counter files by the parsers
//! in this module:
//!
//! - [`KeyValueStat`] implementations for multi-line files ([`CpuStat`], [`LegacyCpuStat`],
//!   [`CpuAcctStat`], [`MemoryStat`], [`LegacyMemoryStat`], [`IoStat`], [`BlkioStat`]).
//! - [`parse_u64_value`] and [`parse_limit_value`] for single-value files.
//!
//! Parsing is strict: a counter that is not an unsigned integer fails the whole read.

mod cpu;
mod error;
mod groups;
mod io;
mod memory;
mod parser;

use std::collections::BTreeMap;

pub use cpu::{CpuAcctStat, CpuStat, LegacyCpuStat};
pub use error::{Error, StatParseError};
pub use groups::{BlkioGroup, CounterGroup, CpuAcctGroup, LegacyMemoryGroup, MemoryGroup, PidsGroup};
pub use io::{BlkioStat, IoStat};
pub use memory::{LegacyMemoryStat, MemoryStat};
pub use parser::{Duplicates, KeyValueStat, LineFormat, Separator, parse_limit_value, parse_u64_value};

/// Resource usage of the supervisor's cgroups, one [`CounterGroup`] per discovered subsystem.
///
/// Subsystems that were not discovered are absent, never zero-filled. Serializes as an object
/// keyed by subsystem name, sorted, so output order does not depend on discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ResourceSnapshot {
    groups: BTreeMap<String, CounterGroup>,
}

impl ResourceSnapshot {
    pub(crate) fn insert(&mut self, subsystem: impl Into<String>, group: CounterGroup) {
        self.groups.insert(subsystem.into(), group);
    }

    /// Returns the counters read for `subsystem`, if it was discovered.
    pub fn get(&self, subsystem: &str) -> Option<&CounterGroup> {
        self.groups.get(subsystem)
    }

    /// Iterates over `(subsystem, counters)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CounterGroup)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
