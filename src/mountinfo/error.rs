use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse line in file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: super::parser::ParseError,
    },
    #[error("cgroup mount in file `{path}` is not valid UTF-8: '{content}'")]
    NonUtf8CgroupMount { path: PathBuf, content: String },
}

pub type Result<T> = std::result::Result<T, Error>;
