//! Per-subsystem counter groups as they appear in the report.

use serde::Serialize;

use super::{CpuStat, IoStat, LegacyCpuStat, LegacyMemoryStat, MemoryStat};

/// Counters of the v1 `cpuacct` controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CpuAcctGroup {
    /// Total CPU time consumed, from `cpuacct.usage`, in nanoseconds.
    pub usage_ns: u64,
    /// User time from `cpuacct.stat`, in `USER_HZ` ticks.
    pub user_ticks: u64,
    /// System time from `cpuacct.stat`, in `USER_HZ` ticks.
    pub system_ticks: u64,
}

/// Counters of the unified `memory` controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MemoryGroup {
    /// `memory.current`.
    pub current_bytes: u64,
    /// `memory.peak`; `None` on kernels that do not expose it.
    pub peak_bytes: Option<u64>,
    /// `memory.max`; `None` when unlimited.
    pub limit_bytes: Option<u64>,
    /// Selected `memory.stat` counters.
    pub stat: MemoryStat,
}

/// Counters of the v1 `memory` controller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LegacyMemoryGroup {
    /// `memory.usage_in_bytes`.
    pub usage_bytes: u64,
    /// `memory.max_usage_in_bytes`.
    pub max_usage_bytes: u64,
    /// `memory.failcnt`: how often the limit was hit.
    pub failcnt: u64,
    /// `memory.limit_in_bytes` (a very large number when unlimited).
    pub limit_bytes: u64,
    /// Selected `memory.stat` counters.
    pub stat: LegacyMemoryStat,
}

/// Counters of the v1 `blkio` controller, summed across devices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BlkioGroup {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ios: u64,
    pub write_ios: u64,
}

/// Counters of the `pids` controller (same files in both hierarchies).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PidsGroup {
    /// `pids.current`: number of tasks in the cgroup.
    pub current: u64,
    /// `pids.max`; `None` when unlimited.
    pub limit: Option<u64>,
}

/// The counters read for one subsystem.
///
/// Serialized without a tag: each variant renders as the plain object of its counters, keyed by
/// the subsystem name in [`ResourceSnapshot`](super::ResourceSnapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CounterGroup {
    Cpu(CpuStat),
    LegacyCpu(LegacyCpuStat),
    CpuAcct(CpuAcctGroup),
    Memory(MemoryGroup),
    LegacyMemory(LegacyMemoryGroup),
    Io(IoStat),
    Blkio(BlkioGroup),
    Pids(PidsGroup),
}
