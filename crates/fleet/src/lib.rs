//! Camera Fleet Engine — the multi-camera surveillance core (spec.md §2).
//!
//! Wires together `capture`, `frame-queue`, `motion-detector`, `recorder`
//! and `event-dispatcher` behind one `CameraFleet` supervisor. Config
//! loading and logging setup follow `smartscope-core::config`/`::logger`'s
//! TOML + layered `tracing-subscriber` conventions (see DESIGN.md).

pub mod config;
pub mod entry;
pub mod error;
pub mod fleet;
pub mod logger;
pub mod paths;
pub mod reader;

#[cfg(test)]
mod test_support;

pub use config::FleetConfig;
pub use entry::{CameraEntry, RecordingKind};
pub use error::{FleetError, Result};
pub use fleet::{CameraFleet, GetFrameOptions};
pub use logger::{init_logging, LogLevel, LogRotation, LoggerConfig};
