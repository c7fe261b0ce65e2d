//! scout-core: the repository-intelligence discovery pipeline and the
//! longitudinal watch/review subsystem.
//!
//! This crate depends only on the narrow traits that name its external
//! collaborators (`HostApiClient`, `ProcessRunner`, `CacheDirResolver`); it
//! never parses CLI flags, formats terminal output, or talks to a network
//! socket directly. `scout-collab` supplies the concrete implementations
//! and `scout-cli` wires everything together behind a `clap`-derived
//! command surface.

pub mod cachedir;
pub mod clone;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod focus;
pub mod hostapi;
pub mod lanes;
pub mod model;
pub mod modernity;
pub mod report;
pub mod schema;
pub mod target;
pub mod tier2;
pub mod timefmt;
pub mod validate;
pub mod vcs;
pub mod watch;

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
