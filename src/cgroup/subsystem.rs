use std::fmt;

/// How the host's cgroup hierarchies are organised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// cgroup v1: one hierarchy per controller (or group of controllers). Hybrid hosts, which
    /// additionally mount a controller-less `cgroup2`, are treated as legacy.
    Legacy,
    /// cgroup v2: a single hierarchy carrying every controller.
    Unified,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Legacy => f.write_str("cgroup v1"),
            Layout::Unified => f.write_str("cgroup v2"),
        }
    }
}

/// An accounting subsystem whose counters end up in the report.
///
/// Ordered by name, which is also the order of the `cgroups` object in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subsystem {
    Blkio,
    Cpu,
    CpuAcct,
    Io,
    Memory,
    Pids,
}

impl Subsystem {
    pub const ALL: [Subsystem; 6] = [
        Subsystem::Blkio,
        Subsystem::Cpu,
        Subsystem::CpuAcct,
        Subsystem::Io,
        Subsystem::Memory,
        Subsystem::Pids,
    ];

    /// The kernel's name for the subsystem.
    pub const fn name(self) -> &'static str {
        match self {
            Subsystem::Blkio => "blkio",
            Subsystem::Cpu => "cpu",
            Subsystem::CpuAcct => "cpuacct",
            Subsystem::Io => "io",
            Subsystem::Memory => "memory",
            Subsystem::Pids => "pids",
        }
    }

    /// Looks up an accounting subsystem by its kernel name.
    ///
    /// Returns `None` for controllers without counters (`cpuset`, `devices`, `freezer`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Whether the subsystem exists in the given layout.
    ///
    /// `cpuacct` and `blkio` are v1-only; v2 folds them into `cpu` and `io`.
    pub const fn exists_in(self, layout: Layout) -> bool {
        match (self, layout) {
            (Subsystem::Cpu | Subsystem::Memory | Subsystem::Pids, _) => true,
            (Subsystem::CpuAcct | Subsystem::Blkio, Layout::Legacy) => true,
            (Subsystem::Io, Layout::Unified) => true,
            _ => false,
        }
    }

    /// The file whose absence makes the subsystem skipped instead of failing discovery.
    ///
    /// The root cgroup carries no `pids.current`, and no `memory.current` on v2.
    pub const fn probe_file(self, layout: Layout) -> Option<&'static str> {
        match (self, layout) {
            (Subsystem::Pids, _) => Some("pids.current"),
            (Subsystem::Memory, Layout::Unified) => Some("memory.current"),
            _ => None,
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_round_trips() {
        for subsystem in Subsystem::ALL {
            assert_eq!(Subsystem::from_name(subsystem.name()), Some(subsystem));
        }
    }

    #[test]
    fn test_from_name_rejects_non_accounting_controllers() {
        for name in ["cpuset", "devices", "freezer", "net_cls", "perf_event", "hugetlb", ""] {
            assert_eq!(Subsystem::from_name(name), None, "{name}");
        }
    }

    #[test]
    fn test_exists_in() {
        assert!(Subsystem::CpuAcct.exists_in(Layout::Legacy));
        assert!(!Subsystem::CpuAcct.exists_in(Layout::Unified));
        assert!(Subsystem::Blkio.exists_in(Layout::Legacy));
        assert!(!Subsystem::Blkio.exists_in(Layout::Unified));
        assert!(!Subsystem::Io.exists_in(Layout::Legacy));
        assert!(Subsystem::Io.exists_in(Layout::Unified));
        assert!(Subsystem::Pids.exists_in(Layout::Legacy));
        assert!(Subsystem::Pids.exists_in(Layout::Unified));
    }

    #[test]
    fn test_probe_files() {
        assert_eq!(Subsystem::Pids.probe_file(Layout::Legacy), Some("pids.current"));
        assert_eq!(Subsystem::Pids.probe_file(Layout::Unified), Some("pids.current"));
        assert_eq!(Subsystem::Memory.probe_file(Layout::Unified), Some("memory.current"));
        assert_eq!(Subsystem::Memory.probe_file(Layout::Legacy), None);
        assert_eq!(Subsystem::Cpu.probe_file(Layout::Unified), None);
    }
}
