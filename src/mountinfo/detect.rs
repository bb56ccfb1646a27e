use crate::fsutil;

use super::parser::{MountInfo, parse_mount_info_line};
use super::{Error, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// A mounted cgroup hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupMount {
    /// Where the hierarchy is mounted, e.g. `/sys/fs/cgroup/memory`.
    pub mount_point: PathBuf,
    /// Path inside the hierarchy that is visible at `mount_point` (usually `/`).
    pub root: PathBuf,
    /// Superblock options; for v1 mounts these contain the controller names.
    pub options: Vec<String>,
}

impl CgroupMount {
    /// Returns `true` if this (v1) mount carries the given controller.
    pub fn has_controller(&self, name: &str) -> bool {
        self.options.iter().any(|opt| opt == name)
    }
}

/// All cgroup hierarchies visible in a mountinfo file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CgroupMounts {
    /// `cgroup` (v1) mounts, in file order.
    pub legacy: Vec<CgroupMount>,
    /// The first `cgroup2` mount, if any.
    pub unified: Option<CgroupMount>,
}

impl CgroupMounts {
    /// Returns the first v1 mount that carries the given controller.
    pub fn legacy_mount_for(&self, controller: &str) -> Option<&CgroupMount> {
        self.legacy.iter().find(|m| m.has_controller(controller))
    }
}

/// Collects every cgroup v1 mount and the first cgroup v2 mount from a Linux `mountinfo` file.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::Parse`] if parsing any line fails.
/// - [`Error::NonUtf8CgroupMount`] if a cgroup mount is not valid UTF-8.
///
/// # Example
///
/// ```no_run
/// use cgroup_stats::mountinfo::find_cgroup_mounts;
///
/// let mounts = find_cgroup_mounts("/proc/self/mountinfo").unwrap();
/// if let Some(unified) = &mounts.unified {
///     println!("cgroup2 root: {}", unified.mount_point.display());
/// }
/// ```
pub fn find_cgroup_mounts(path: impl AsRef<Path>) -> Result<CgroupMounts> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    find_cgroup_mounts_from_reader(buf, path)
}

/// Reader-based implementation of [`find_cgroup_mounts`]; `origin` is only used in errors.
///
/// Mount points are arbitrary bytes, so lines are read raw. A line that is not UTF-8 is skipped
/// unless it describes a cgroup hierarchy.
fn find_cgroup_mounts_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<CgroupMounts> {
    let mut buf = Vec::with_capacity(256);
    let mut mounts = CgroupMounts::default();

    while reader
        .read_until(b'\n', &mut buf)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        match std::str::from_utf8(&buf) {
            Ok(line) => record_mount(line, origin, &mut mounts)?,
            Err(_) => check_non_utf8_line(&buf, origin)?,
        }
        buf.clear();
    }

    Ok(mounts)
}

fn parse_line<'a>(line: &'a str, origin: &Path) -> Result<MountInfo<'a>> {
    parse_mount_info_line(line).map_err(|source| Error::Parse {
        path: origin.to_path_buf(),
        source,
    })
}

fn record_mount(line: &str, origin: &Path, mounts: &mut CgroupMounts) -> Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }

    let mount_info = parse_line(line, origin)?;
    let is_legacy = match mount_info.fs_type {
        "cgroup" => true,
        "cgroup2" if mounts.unified.is_none() => false,
        _ => return Ok(()),
    };

    let mount = CgroupMount {
        mount_point: PathBuf::from(mount_info.mount_point.as_ref()),
        root: PathBuf::from(mount_info.root.as_ref()),
        options: mount_info.super_options().map(str::to_owned).collect(),
    };
    log::debug!(
        "Found `{}` mount with root `{}`: {}",
        mount_info.fs_type,
        mount.root.display(),
        mount.mount_point.display()
    );

    if is_legacy {
        mounts.legacy.push(mount);
    } else {
        mounts.unified = Some(mount);
    }
    Ok(())
}

fn check_non_utf8_line(raw: &[u8], origin: &Path) -> Result<()> {
    let lossy = String::from_utf8_lossy(raw);
    let mount_info = parse_line(&lossy, origin)?;
    if matches!(mount_info.fs_type, "cgroup" | "cgroup2") {
        return Err(Error::NonUtf8CgroupMount {
            path: origin.to_path_buf(),
            content: lossy.trim_end().to_owned(),
        });
    }

    log::debug!("Skipping non-UTF-8 `{}` mount: {}", mount_info.fs_type, lossy.trim_end());
    Ok(())
}
