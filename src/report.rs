//! The measurement report and its JSON serialization.
//!
//! ```json
//! {
//!   "wall_time": 1503245,
//!   "user_cpu_time": 1000000,
//!   "sys_cpu_time": 0,
//!   "cgroups": {
//!     "pids": {
//!       "current": 1,
//!       "limit": null
//!     }
//!   }
//! }
//! ```
//!
//! All times are integer nanoseconds.

use std::io::{self, Write};
use std::time::Duration;

use serde::Serialize;

use crate::cgroup::stats::ResourceSnapshot;
use crate::supervisor::TimingRecord;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`{field}` of {value}ns does not fit in 64 bits")]
    Unrepresentable { field: &'static str, value: u128 },
    #[error("failed to serialize stats to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write stats: {0}")]
    Write(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub wall_time: u64,
    pub user_cpu_time: u64,
    pub sys_cpu_time: u64,
    pub cgroups: ResourceSnapshot,
}

impl Report {
    /// Merges the timing of a run with the counters read after it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unrepresentable`] if a duration exceeds `u64::MAX` nanoseconds.
    pub fn assemble(timing: &TimingRecord, cgroups: ResourceSnapshot) -> Result<Self> {
        Ok(Self {
            wall_time: nanos("wall_time", timing.wall_time)?,
            user_cpu_time: nanos("user_cpu_time", timing.user_cpu_time)?,
            sys_cpu_time: nanos("sys_cpu_time", timing.sys_cpu_time)?,
            cgroups,
        })
    }

    /// Serializes the report, compact or indented by two spaces.
    pub fn to_json(&self, minified: bool) -> Result<Vec<u8>> {
        let bytes = if minified {
            serde_json::to_vec(self)?
        } else {
            serde_json::to_vec_pretty(self)?
        };
        Ok(bytes)
    }

    /// Writes `prefix` followed by the serialized report to `out`, then flushes it.
    ///
    /// Nothing is written if serialization fails. No newline is appended.
    pub fn write_to<W: Write>(&self, out: &mut W, prefix: &[u8], minified: bool) -> Result<()> {
        let document = self.to_json(minified)?;
        out.write_all(prefix).map_err(Error::Write)?;
        out.write_all(&document).map_err(Error::Write)?;
        out.flush().map_err(Error::Write)
    }
}

fn nanos(field: &'static str, duration: Duration) -> Result<u64> {
    let value = duration.as_nanos();
    u64::try_from(value).map_err(|_| Error::Unrepresentable { field, value })
}
