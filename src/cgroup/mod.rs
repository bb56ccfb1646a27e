//! Cgroup discovery and counter collection for the current process.
//!
//! The supervisor measures whatever cgroups it already runs in. This module finds them and
//! reads their counters:
//!
//! - [`locate`] parses `/proc/self/mountinfo`, `/proc/self/cgroup` and the subsystem list of the
//!   host (`/proc/cgroups` on v1, `cgroup.controllers` on v2) into a [`SubsystemMap`].
//! - [`collect`] reads the counter files of every mapped subsystem into a
//!   [`stats::ResourceSnapshot`].
//!
//! # Supported Subsystems
//!
//! | Layout   | Subsystems                                  |
//! |----------|---------------------------------------------|
//! | v1       | `cpu`, `cpuacct`, `memory`, `blkio`, `pids` |
//! | v2       | `cpu`, `memory`, `io`, `pids`               |
//!
//! Hosts with both v1 controller mounts and a `cgroup2` mount (hybrid) are read as v1.
mod collector;
mod error;
mod locate;
mod membership;
pub mod stats;
mod subsystem;
mod utils;

pub use collector::collect;
pub use error::{Error, Result};
pub use locate::{SubsystemMap, locate};
pub use membership::{Membership, read_membership};
pub use subsystem::{Layout, Subsystem};
