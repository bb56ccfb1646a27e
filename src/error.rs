use crate::{cgroup, config, report, supervisor};

/// Exit code for every internal failure, and for a missing command.
pub const FAIL_EXIT_CODE: u8 = 1;

/// A failure of one step of a measured run. Each one is fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Output(#[from] config::Error),
    #[error("failed to discover cgroup subsystems: {0}")]
    Discovery(#[source] cgroup::Error),
    #[error("failed to retrieve stats: {0}")]
    Stats(#[source] cgroup::Error),
    #[error(transparent)]
    Supervisor(#[from] supervisor::Error),
    #[error(transparent)]
    Report(#[from] report::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    /// Converts to an `Option`, logging the error at `level`.
    fn ok_log(self, level: log::Level) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self, level: log::Level) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::log!(level, "{err}");
                None
            }
        }
    }
}
