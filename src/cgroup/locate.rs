use std::collections::BTreeMap;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use crate::fsutil;
use crate::mountinfo::{self, CgroupMount, CgroupMounts};

use super::membership::{Membership, read_membership};
use super::{Error, Layout, Result, Subsystem};

/// Effective cgroup directory of the current process for every accounting subsystem found on
/// the host.
///
/// Built once by [`locate`] and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemMap {
    layout: Layout,
    paths: BTreeMap<Subsystem, PathBuf>,
}

impl SubsystemMap {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            paths: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, subsystem: Subsystem, dir: PathBuf) {
        self.paths.insert(subsystem, dir);
    }

    /// Layout of the hierarchies the paths belong to.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn get(&self, subsystem: Subsystem) -> Option<&Path> {
        self.paths.get(&subsystem).map(PathBuf::as_path)
    }

    /// Iterates over the mapped subsystems in name order.
    pub fn iter(&self) -> impl Iterator<Item = (Subsystem, &Path)> {
        self.paths.iter().map(|(s, p)| (*s, p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Discovers the cgroup directory of the current process for every accounting subsystem.
///
/// `proc_root` is the mount point of the proc filesystem (normally `/proc`); the
/// `self/mountinfo`, `self/cgroup` and `cgroups` files below it are read.
///
/// Subsystems whose probe file is missing (see [`Subsystem::probe_file`]) are skipped, and so
/// are controllers without counters. Any other resolution failure aborts discovery.
///
/// # Errors
///
/// - [`Error::NoCgroupMounts`] if no cgroup hierarchy is mounted.
/// - [`Error::MissingMount`] / [`Error::MissingMembership`] if an enabled subsystem has no
///   hierarchy or the process is not in one of its cgroups.
/// - [`Error::MissingDirectory`] if a mapped subsystem's directory does not exist.
/// - I/O and parse errors for the files read.
pub fn locate(proc_root: impl AsRef<Path>) -> Result<SubsystemMap> {
    let proc_root = proc_root.as_ref();
    let mounts = mountinfo::find_cgroup_mounts(proc_root.join("self/mountinfo"))?;
    let membership = read_membership(proc_root.join("self/cgroup"))?;

    let has_legacy_controllers = Subsystem::ALL
        .iter()
        .any(|s| mounts.legacy_mount_for(s.name()).is_some());

    let map = if has_legacy_controllers {
        locate_legacy(proc_root, &mounts, &membership)?
    } else if let Some(unified) = &mounts.unified {
        locate_unified(unified, &membership)?
    } else {
        return Err(Error::NoCgroupMounts);
    };

    log::debug!(
        "Located {} cgroup subsystem(s) on a {} host",
        map.len(),
        map.layout()
    );
    Ok(map)
}

fn locate_legacy(
    proc_root: &Path,
    mounts: &CgroupMounts,
    membership: &Membership,
) -> Result<SubsystemMap> {
    let mut map = SubsystemMap::new(Layout::Legacy);

    for (name, hierarchy) in read_enabled_subsystems(proc_root.join("cgroups"))? {
        let Some(subsystem) = accounting_subsystem(&name, Layout::Legacy) else {
            continue;
        };
        if hierarchy == 0 {
            log::debug!("Skipping cgroup subsystem `{name}`: not bound to a v1 hierarchy");
            continue;
        }

        let mount = mounts
            .legacy_mount_for(&name)
            .ok_or(Error::MissingMount {
                subsystem: subsystem.name(),
            })?;
        let member = membership
            .legacy_path(&name)
            .ok_or(Error::MissingMembership {
                subsystem: subsystem.name(),
            })?;

        insert_probed(&mut map, subsystem, effective_dir(mount, member))?;
    }

    Ok(map)
}

fn locate_unified(unified: &CgroupMount, membership: &Membership) -> Result<SubsystemMap> {
    let mut map = SubsystemMap::new(Layout::Unified);

    let member = membership
        .unified_path()
        .ok_or(Error::MissingMembership {
            subsystem: "cgroup2",
        })?;
    let dir = effective_dir(unified, member);

    for name in read_controllers(dir.join("cgroup.controllers"))? {
        if let Some(subsystem) = accounting_subsystem(&name, Layout::Unified) {
            insert_probed(&mut map, subsystem, dir.clone())?;
        }
    }

    // cpu.stat is always present in v2, even with the cpu controller disabled.
    if map.get(Subsystem::Cpu).is_none() {
        insert_probed(&mut map, Subsystem::Cpu, dir)?;
    }

    Ok(map)
}

fn accounting_subsystem(name: &str, layout: Layout) -> Option<Subsystem> {
    let subsystem = Subsystem::from_name(name).filter(|s| s.exists_in(layout));
    if subsystem.is_none() {
        log::debug!("Skipping cgroup subsystem `{name}`: no accounting counters");
    }
    subsystem
}

/// Adds `subsystem` unless its probe file is missing; fails if its directory is missing.
fn insert_probed(map: &mut SubsystemMap, subsystem: Subsystem, dir: PathBuf) -> Result<()> {
    let exists = |path: &Path| {
        fsutil::path_exists(path).map_err(|source| Error::Probe {
            subsystem: subsystem.name(),
            source,
        })
    };

    if let Some(probe_file) = subsystem.probe_file(map.layout()) {
        if !exists(&dir.join(probe_file))? {
            log::debug!(
                "Skipping cgroup subsystem `{subsystem}`: `{probe_file}` not found in `{}`",
                dir.display()
            );
            return Ok(());
        }
    } else if !exists(&dir)? {
        return Err(Error::MissingDirectory {
            subsystem: subsystem.name(),
            path: dir,
        });
    }

    log::debug!("Found cgroup subsystem `{subsystem}`: {}", dir.display());
    map.insert(subsystem, dir);
    Ok(())
}

/// Joins the process's cgroup path onto the mount point, relative to the hierarchy root
/// visible there.
fn effective_dir(mount: &CgroupMount, member: &Path) -> PathBuf {
    let relative = member
        .strip_prefix(&mount.root)
        .or_else(|_| member.strip_prefix("/"))
        .unwrap_or(member);
    mount.mount_point.join(relative)
}

/// Reads `/proc/cgroups` and returns `(name, hierarchy id)` of every enabled subsystem.
fn read_enabled_subsystems(path: PathBuf) -> Result<Vec<(String, u32)>> {
    let mut reader = fsutil::open_file_reader(&path)?;
    let mut subsystems = Vec::new();
    let mut buf = Vec::new();
    let mut lineno = 0;

    while reader
        .read_until(b'\n', &mut buf)
        .map_err(|source| Error::ReadLine {
            path: path.clone(),
            source,
        })?
        != 0
    {
        lineno += 1;
        let Ok(line) = std::str::from_utf8(&buf) else {
            log::debug!(
                "Skipping non-UTF-8 row {lineno} of `{}`: {}",
                path.display(),
                String::from_utf8_lossy(&buf).trim_end()
            );
            buf.clear();
            continue;
        };
        let row = line.trim();
        if row.is_empty() || row.starts_with('#') {
            buf.clear();
            continue;
        }

        let fields: Vec<&str> = row.split_whitespace().collect();
        let parsed = match fields.as_slice() {
            [name, hierarchy, _num_cgroups, enabled] => hierarchy
                .parse::<u32>()
                .ok()
                .map(|hierarchy| (*name, hierarchy, *enabled == "1")),
            _ => None,
        };
        let Some((name, hierarchy, enabled)) = parsed else {
            return Err(Error::MalformedLine {
                path,
                line: lineno,
                content: row.to_string(),
            });
        };

        if enabled {
            subsystems.push((name.to_string(), hierarchy));
        } else {
            log::debug!("Skipping cgroup subsystem `{name}`: disabled");
        }

        buf.clear();
    }

    Ok(subsystems)
}

/// Reads a v2 `cgroup.controllers` file (a single whitespace-separated list).
fn read_controllers(path: PathBuf) -> Result<Vec<String>> {
    let mut reader = fsutil::open_file_reader(&path)?;
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|source| Error::ReadLine { path, source })?;

    Ok(contents.split_whitespace().map(str::to_owned).collect())
}
