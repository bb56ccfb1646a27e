use std::path::Path;

use super::stats::{
    BlkioGroup, BlkioStat, CounterGroup, CpuAcctGroup, CpuAcctStat, CpuStat, IoStat, KeyValueStat,
    LegacyCpuStat, LegacyMemoryGroup, LegacyMemoryStat, MemoryGroup, MemoryStat, PidsGroup,
    ResourceSnapshot, parse_limit_value, parse_u64_value,
};
use super::utils::{read_optional_stat, read_stat};
use super::{Layout, Result, Subsystem, SubsystemMap};

/// Reads the counters of every subsystem in `map`.
///
/// The snapshot holds exactly one group per mapped subsystem. Reading is all-or-nothing: the
/// first unreadable or malformed counter file fails the whole collection.
///
/// # Errors
///
/// Returns [`Error::Stats`](super::Error::Stats) naming the subsystem and file that failed.
pub fn collect(map: &SubsystemMap) -> Result<ResourceSnapshot> {
    let mut snapshot = ResourceSnapshot::default();

    for (subsystem, dir) in map.iter() {
        let group = read_group(subsystem, map.layout(), dir)?;
        log::debug!("Read `{subsystem}` counters from {}", dir.display());
        snapshot.insert(subsystem.name(), group);
    }

    Ok(snapshot)
}

fn read_group(subsystem: Subsystem, layout: Layout, dir: &Path) -> Result<CounterGroup> {
    let group = match (subsystem, layout) {
        (Subsystem::Cpu, Layout::Unified) => {
            CounterGroup::Cpu(read_stat(subsystem, dir, "cpu.stat", CpuStat::from_reader)?)
        }
        (Subsystem::Cpu, Layout::Legacy) => CounterGroup::LegacyCpu(read_stat(
            subsystem,
            dir,
            "cpu.stat",
            LegacyCpuStat::from_reader,
        )?),
        (Subsystem::CpuAcct, _) => {
            let stat = read_stat(subsystem, dir, "cpuacct.stat", CpuAcctStat::from_reader)?;
            CounterGroup::CpuAcct(CpuAcctGroup {
                usage_ns: read_stat(subsystem, dir, "cpuacct.usage", parse_u64_value)?,
                user_ticks: stat.user_ticks,
                system_ticks: stat.system_ticks,
            })
        }
        (Subsystem::Memory, Layout::Unified) => CounterGroup::Memory(MemoryGroup {
            current_bytes: read_stat(subsystem, dir, "memory.current", parse_u64_value)?,
            peak_bytes: read_optional_stat(subsystem, dir, "memory.peak", parse_u64_value)?,
            limit_bytes: read_stat(subsystem, dir, "memory.max", parse_limit_value)?,
            stat: read_stat(subsystem, dir, "memory.stat", MemoryStat::from_reader)?,
        }),
        (Subsystem::Memory, Layout::Legacy) => CounterGroup::LegacyMemory(LegacyMemoryGroup {
            usage_bytes: read_stat(subsystem, dir, "memory.usage_in_bytes", parse_u64_value)?,
            max_usage_bytes: read_stat(
                subsystem,
                dir,
                "memory.max_usage_in_bytes",
                parse_u64_value,
            )?,
            failcnt: read_stat(subsystem, dir, "memory.failcnt", parse_u64_value)?,
            limit_bytes: read_stat(subsystem, dir, "memory.limit_in_bytes", parse_u64_value)?,
            stat: read_stat(subsystem, dir, "memory.stat", LegacyMemoryStat::from_reader)?,
        }),
        (Subsystem::Io, _) => {
            CounterGroup::Io(read_stat(subsystem, dir, "io.stat", IoStat::from_reader)?)
        }
        (Subsystem::Blkio, _) => {
            let bytes = read_stat(
                subsystem,
                dir,
                "blkio.throttle.io_service_bytes",
                BlkioStat::from_reader,
            )?;
            let ios = read_stat(
                subsystem,
                dir,
                "blkio.throttle.io_serviced",
                BlkioStat::from_reader,
            )?;
            CounterGroup::Blkio(BlkioGroup {
                read_bytes: bytes.read,
                write_bytes: bytes.write,
                read_ios: ios.read,
                write_ios: ios.write,
            })
        }
        (Subsystem::Pids, _) => CounterGroup::Pids(PidsGroup {
            current: read_stat(subsystem, dir, "pids.current", parse_u64_value)?,
            limit: read_stat(subsystem, dir, "pids.max", parse_limit_value)?,
        }),
    };

    Ok(group)
}
