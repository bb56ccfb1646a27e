use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FileOpenError {
    /// Returns `true` if the file was missing, as opposed to unreadable.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == io::ErrorKind::NotFound
    }
}

/// Error that occurs when the existence of a path cannot be determined.
#[derive(Debug, thiserror::Error)]
#[error("failed to check if path `{path}` exists: {source}")]
pub struct ExistenceCheckError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use cgroup_stats::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/cgroup")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Like [`open_file_reader`], but maps a missing file to `Ok(None)`.
///
/// Cgroup files that only some kernels expose (e.g. `memory.peak`) are read through this.
pub fn open_optional_file_reader(
    path: impl AsRef<Path>,
) -> Result<Option<BufReader<File>>, FileOpenError> {
    match open_file_reader(path) {
        Ok(reader) => Ok(Some(reader)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Checks whether `path` exists, following symlinks.
///
/// # Errors
///
/// Returns an [`ExistenceCheckError`] if the check itself fails (e.g. permission denied on a
/// parent directory).
pub fn path_exists(path: impl AsRef<Path>) -> Result<bool, ExistenceCheckError> {
    let path = path.as_ref();
    path.try_exists().map_err(|source| ExistenceCheckError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_open_file_reader_success() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let path = tmp.path();
        let reader = open_file_reader(path).expect("should open test file");
        let metadata = reader.get_ref().metadata().unwrap();
        assert!(metadata.is_file());
    }

    #[test]
    fn test_open_file_reader_error() {
        let result = open_file_reader("/definitely/does/not/exist");
        let err = result.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_optional_file_reader_missing() {
        let dir = tempfile::tempdir().unwrap();
        let reader = open_optional_file_reader(dir.path().join("memory.peak")).unwrap();
        assert!(reader.is_none());
    }

    #[test]
    fn test_open_optional_file_reader_present() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pids.current");
        std::fs::write(&file, "3\n").unwrap();
        assert!(open_optional_file_reader(&file).unwrap().is_some());
    }

    #[test]
    fn test_path_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert!(path_exists(dir.path()).unwrap());
        assert!(!path_exists(dir.path().join("missing")).unwrap());
    }
}
