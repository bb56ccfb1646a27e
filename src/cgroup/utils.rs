use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::Subsystem;
use super::stats::{self, StatParseError};

/// Opens `dir/file` and applies the given parser to it.
pub fn read_stat<T>(
    subsystem: Subsystem,
    dir: &Path,
    file: &str,
    parser: impl FnOnce(&mut BufReader<File>) -> Result<T, StatParseError>,
) -> Result<T, stats::Error> {
    let path = dir.join(file);
    let mut reader =
        crate::fsutil::open_file_reader(&path).map_err(|source| stats::Error::Open {
            subsystem: subsystem.name(),
            source,
        })?;
    parse_with(subsystem, &path, &mut reader, parser)
}

/// Like [`read_stat`], but returns `Ok(None)` if the file does not exist.
pub fn read_optional_stat<T>(
    subsystem: Subsystem,
    dir: &Path,
    file: &str,
    parser: impl FnOnce(&mut BufReader<File>) -> Result<T, StatParseError>,
) -> Result<Option<T>, stats::Error> {
    let path = dir.join(file);
    let reader =
        crate::fsutil::open_optional_file_reader(&path).map_err(|source| stats::Error::Open {
            subsystem: subsystem.name(),
            source,
        })?;
    match reader {
        Some(mut reader) => parse_with(subsystem, &path, &mut reader, parser).map(Some),
        None => Ok(None),
    }
}

fn parse_with<T>(
    subsystem: Subsystem,
    path: &Path,
    reader: &mut BufReader<File>,
    parser: impl FnOnce(&mut BufReader<File>) -> Result<T, StatParseError>,
) -> Result<T, stats::Error> {
    parser(reader).map_err(|source| stats::Error::Parse {
        subsystem: subsystem.name(),
        path: path.to_path_buf(),
        source,
    })
}
