//! Concrete implementations of scout-core's external-collaborator traits:
//! a `reqwest`-backed remote search API client, a `std::process::Command`
//! subprocess runner with watchdog-thread timeouts, a platform cache/config
//! directory resolver, and a secondary host-CLI token source.
//!
//! `scout-core` never depends on this crate; `scout-cli` wires the two
//! together behind the command surface.

pub mod cachedir;
pub mod github;
pub mod process;
pub mod token;
