//! Runtime configuration, read from environment variables.
//!
//! | Variable                | Meaning                                     | Default         |
//! |-------------------------|---------------------------------------------|-----------------|
//! | `STATS_OUTPUT_FILE`     | file the report is written to               | standard output |
//! | `STATS_OUTPUT_MINIFIED` | write compact instead of indented JSON      | `false`         |
//! | `STATS_OUTPUT_PREFIX`   | literal text written before the report      | empty           |
//! | `STATS_PROC_ROOT`       | proc filesystem used for cgroup discovery   | `/proc`         |
//!
//! Empty variables count as unset.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

pub const OUTPUT_FILE_VAR: &str = "STATS_OUTPUT_FILE";
pub const OUTPUT_MINIFIED_VAR: &str = "STATS_OUTPUT_MINIFIED";
pub const OUTPUT_PREFIX_VAR: &str = "STATS_OUTPUT_PREFIX";
pub const PROC_ROOT_VAR: &str = "STATS_PROC_ROOT";

const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create stats file `{path}`: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where the report goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// Opens the destination, creating or truncating a file target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CreateOutput`] if the file cannot be created.
    pub fn open(&self) -> Result<Output, Error> {
        match self {
            OutputTarget::Stdout => Ok(Output::Stdout(io::stdout())),
            OutputTarget::File(path) => File::create(path)
                .map(|file| Output::File(BufWriter::new(file)))
                .map_err(|source| Error::CreateOutput {
                    path: path.clone(),
                    source,
                }),
        }
    }
}

/// An opened report destination.
#[derive(Debug)]
pub enum Output {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::File(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::File(out) => out.flush(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub output: OutputTarget,
    /// Compact JSON instead of two-space indentation.
    pub minified: bool,
    /// Written verbatim before the report.
    pub prefix: OsString,
    /// Mount point of the proc filesystem used for discovery.
    pub proc_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputTarget::Stdout,
            minified: false,
            prefix: OsString::new(),
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let minified = match get(OUTPUT_MINIFIED_VAR) {
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                log::warn!(
                    "Invalid boolean `{}` for {OUTPUT_MINIFIED_VAR}, using false",
                    value.to_string_lossy()
                );
                false
            }),
            None => false,
        };

        Self {
            output: get(OUTPUT_FILE_VAR)
                .map(|path| OutputTarget::File(PathBuf::from(path)))
                .unwrap_or_default(),
            minified,
            prefix: get(OUTPUT_PREFIX_VAR).unwrap_or_default(),
            proc_root: get(PROC_ROOT_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
        }
    }
}

/// Accepts the spellings `1 t T TRUE true True` and `0 f F FALSE false False`.
fn parse_bool(value: &OsStr) -> Option<bool> {
    match value.to_str()? {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Usage text printed when no command is given.
pub fn usage(program: &str) -> String {
    format!(
        "{program} <command> [arg...]\n\
         environment variables {OUTPUT_FILE_VAR}=/dev/stdout {OUTPUT_MINIFIED_VAR}=false {OUTPUT_PREFIX_VAR}=\n\
         Runs <command> and on termination outputs cgroup usage information\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config_from(&[]), Config::default());
    }

    #[test]
    fn test_all_variables() {
        let config = config_from(&[
            (OUTPUT_FILE_VAR, "/tmp/stats.json"),
            (OUTPUT_MINIFIED_VAR, "true"),
            (OUTPUT_PREFIX_VAR, "STATS:"),
            (PROC_ROOT_VAR, "/host/proc"),
        ]);
        assert_eq!(
            config.output,
            OutputTarget::File(PathBuf::from("/tmp/stats.json"))
        );
        assert!(config.minified);
        assert_eq!(config.prefix, OsString::from("STATS:"));
        assert_eq!(config.proc_root, PathBuf::from("/host/proc"));
    }

    #[test]
    fn test_empty_variables_are_unset() {
        let config = config_from(&[
            (OUTPUT_FILE_VAR, ""),
            (OUTPUT_MINIFIED_VAR, ""),
            (PROC_ROOT_VAR, ""),
        ]);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_bool_spellings() {
        for value in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(OsStr::new(value)), Some(true), "{value}");
        }
        for value in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(OsStr::new(value)), Some(false), "{value}");
        }
        for value in ["yes", "on", "tRUE", " true", "2"] {
            assert_eq!(parse_bool(OsStr::new(value)), None, "{value}");
        }
    }

    #[test]
    fn test_invalid_minified_means_false() {
        assert!(!config_from(&[(OUTPUT_MINIFIED_VAR, "yes")]).minified);
    }

    #[test]
    fn test_open_file_target_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "stale contents").unwrap();

        let mut out = OutputTarget::File(path.clone()).open().unwrap();
        out.write_all(b"{}").unwrap();
        out.flush().unwrap();
        drop(out);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_open_file_target_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/stats.json");
        let err = OutputTarget::File(path.clone()).open().unwrap_err();
        let Error::CreateOutput { path: err_path, .. } = err;
        assert_eq!(err_path, path);
    }

    #[test]
    fn test_usage_names_program_and_variables() {
        let text = usage("cgroup-stats");
        assert!(text.starts_with("cgroup-stats <command> [arg...]\n"));
        assert!(text.contains("STATS_OUTPUT_FILE=/dev/stdout"));
        assert!(text.contains("STATS_OUTPUT_MINIFIED=false"));
        assert!(text.ends_with("cgroup usage information\n"));
    }
}
