use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::BufRead;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::fsutil;

use super::{Error, Result};

/// The cgroups a process belongs to, as listed in `/proc/<pid>/cgroup`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Membership {
    legacy: HashMap<String, PathBuf>,
    unified: Option<PathBuf>,
}

impl Membership {
    /// Path of the process's cgroup in the v1 hierarchy carrying `controller`.
    pub fn legacy_path(&self, controller: &str) -> Option<&Path> {
        self.legacy.get(controller).map(PathBuf::as_path)
    }

    /// Path of the process's cgroup in the v2 hierarchy.
    pub fn unified_path(&self) -> Option<&Path> {
        self.unified.as_deref()
    }
}

/// Reads a `/proc/<pid>/cgroup` file.
///
/// Each line has the form `hierarchy-id:controller-list:cgroup-path`. v1 lines list their
/// controllers (`4:cpu,cpuacct:/user.slice`), the v2 line is `0::/user.slice/...`.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the file can't be opened.
/// - [`Error::ReadLine`] if reading from the file fails.
/// - [`Error::MalformedLine`] if a line does not have three `:`-separated fields.
pub fn read_membership(path: impl AsRef<Path>) -> Result<Membership> {
    let path = path.as_ref();
    let buf = fsutil::open_file_reader(path)?;

    read_membership_from_reader(buf, path)
}

fn read_membership_from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<Membership> {
    let mut membership = Membership::default();
    let mut buf = Vec::new();
    let mut lineno = 0;

    while reader
        .read_until(b'\n', &mut buf)
        .map_err(|source| Error::ReadLine {
            path: origin.to_path_buf(),
            source,
        })?
        != 0
    {
        lineno += 1;
        let entry = buf.strip_suffix(b"\n").unwrap_or(&buf);
        if entry.is_empty() {
            buf.clear();
            continue;
        }

        // The cgroup path is raw bytes and may itself contain ':'.
        let mut fields = entry.splitn(3, |b| *b == b':');
        let (Some(id), Some(controllers), Some(cgroup_path)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed(origin, lineno, entry));
        };
        let Ok(controllers) = std::str::from_utf8(controllers) else {
            return Err(malformed(origin, lineno, entry));
        };
        let cgroup_path = PathBuf::from(OsStr::from_bytes(cgroup_path));

        if id == b"0" && controllers.is_empty() {
            if membership.unified.is_none() {
                membership.unified = Some(cgroup_path);
            }
        } else {
            for controller in controllers.split(',').filter(|c| !c.is_empty()) {
                membership
                    .legacy
                    .insert(controller.to_string(), cgroup_path.clone());
            }
        }

        buf.clear();
    }

    Ok(membership)
}

fn malformed(origin: &Path, line: usize, entry: &[u8]) -> Error {
    Error::MalformedLine {
        path: origin.to_path_buf(),
        line,
        content: String::from_utf8_lossy(entry).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(data: &str) -> Result<Membership> {
        read_membership_from_reader(data.as_bytes(), Path::new("/proc/self/cgroup"))
    }

    #[test]
    fn test_unified_membership() {
        let membership = parse("0::/user.slice/user-1000.slice/session-2.scope\n").unwrap();
        assert_eq!(
            membership.unified_path(),
            Some(Path::new("/user.slice/user-1000.slice/session-2.scope"))
        );
        assert_eq!(membership.legacy_path("cpu"), None);
    }

    #[test]
    fn test_legacy_membership_with_joined_controllers() {
        let data = "\
12:pids:/user.slice/user-1000.slice
11:cpu,cpuacct:/user.slice
10:memory:/user.slice/user-1000.slice/session-2.scope
9:blkio:/
1:name=systemd:/user.slice/user-1000.slice/session-2.scope
0::/user.slice/user-1000.slice/session-2.scope
";
        let membership = parse(data).unwrap();
        assert_eq!(membership.legacy_path("cpu"), Some(Path::new("/user.slice")));
        assert_eq!(membership.legacy_path("cpuacct"), Some(Path::new("/user.slice")));
        assert_eq!(
            membership.legacy_path("memory"),
            Some(Path::new("/user.slice/user-1000.slice/session-2.scope"))
        );
        assert_eq!(membership.legacy_path("blkio"), Some(Path::new("/")));
        assert_eq!(
            membership.legacy_path("name=systemd"),
            Some(Path::new("/user.slice/user-1000.slice/session-2.scope"))
        );
        assert!(membership.unified_path().is_some());
    }

    #[test]
    fn test_path_containing_colon() {
        let membership = parse("0::/weird:name\n").unwrap();
        assert_eq!(membership.unified_path(), Some(Path::new("/weird:name")));
    }

    #[test]
    fn test_non_utf8_cgroup_path() {
        let data: &[u8] = b"1:name=systemd:/caf\xe9.scope\n0::/bench\n";
        let membership =
            read_membership_from_reader(data, Path::new("/proc/self/cgroup")).unwrap();
        assert_eq!(
            membership.legacy_path("name=systemd"),
            Some(Path::new(OsStr::from_bytes(b"/caf\xe9.scope")))
        );
        assert_eq!(membership.unified_path(), Some(Path::new("/bench")));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let membership = parse("\n0::/\n\n").unwrap();
        assert_eq!(membership.unified_path(), Some(Path::new("/")));
    }

    #[test]
    fn test_malformed_line() {
        let err = parse("0::/\ngarbage\n").unwrap_err();
        match err {
            Error::MalformedLine { line, content, .. } => {
                assert_eq!(line, 2);
                assert_eq!(content, "garbage");
            }
            other => panic!("expected MalformedLine, got {other:?}"),
        }
    }

    #[test]
    fn test_read_membership_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3:memory:/bench").unwrap();
        let membership = read_membership(file.path()).unwrap();
        assert_eq!(membership.legacy_path("memory"), Some(Path::new("/bench")));
    }

    #[test]
    fn test_read_membership_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_membership(dir.path().join("cgroup")).unwrap_err();
        assert!(matches!(err, Error::FileOpen(ref e) if e.is_not_found()));
    }
}
