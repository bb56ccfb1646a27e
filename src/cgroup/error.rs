use std::path::PathBuf;

use crate::{fsutil, mountinfo};

use super::stats;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to discover cgroup mounts: {0}")]
    Mountinfo(#[from] mountinfo::Error),
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed line {line} in `{path}`: '{content}'")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },
    #[error("no cgroup hierarchy is mounted")]
    NoCgroupMounts,
    #[error("failed to get mount point for cgroup subsystem `{subsystem}`")]
    MissingMount { subsystem: &'static str },
    #[error("current process is not a member of a `{subsystem}` cgroup")]
    MissingMembership { subsystem: &'static str },
    #[error("cgroup directory `{path}` for subsystem `{subsystem}` does not exist")]
    MissingDirectory {
        subsystem: &'static str,
        path: PathBuf,
    },
    #[error("failed to probe cgroup subsystem `{subsystem}`: {source}")]
    Probe {
        subsystem: &'static str,
        #[source]
        source: fsutil::ExistenceCheckError,
    },
    #[error(transparent)]
    Stats(#[from] stats::Error),
}

impl Error {
    /// Name of the subsystem the error is about, if it concerns a single one.
    pub fn subsystem(&self) -> Option<&'static str> {
        match self {
            Error::MissingMount { subsystem }
            | Error::MissingMembership { subsystem }
            | Error::MissingDirectory { subsystem, .. }
            | Error::Probe { subsystem, .. } => Some(*subsystem),
            Error::Stats(err) => Some(err.subsystem()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
