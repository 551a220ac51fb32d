//! trellis-forge - build-from-source installer and updater for the Trellis
//! desktop application on Linux.
//!
//! The tool clones the Trellis repository, installs build dependencies
//! through the system package manager, compiles and packages the
//! application with its own build tooling, and installs the resulting
//! native package. Around that sequence it maintains the two pieces of
//! local state that make updates safe and repeatable:
//!
//! - rotated backups of the user's settings directory, verified against a
//!   fixed critical-file list ([`backup`])
//! - a `trellis-update` helper command on the PATH
//!   ([`installer::path_helper`])
//!
//! # Module map
//!
//! - [`backup`] - settings snapshots: create, rotate, list, restore, verify
//! - [`version`] - loose dotted-version comparison for release tags
//! - [`git`] - async wrapper over the system git binary
//! - [`installer`] - dependency, build, packaging and PATH-helper steps
//! - [`updater`] - is a newer trellis-forge release available
//! - [`config`] - TOML configuration with stock-Trellis defaults
//! - [`cli`] - clap command surface; all interactive prompts live here
//! - [`core`] - error taxonomy and user-facing error display
//! - [`utils`] - filesystem primitives (recursive overlay copy, sizes)
//!
//! The backup manager and version comparator carry no prompts and no
//! ambient state, so the CLI and the integration tests drive them the
//! same way.

pub mod backup;
pub mod cli;
pub mod config;
pub mod core;
pub mod git;
pub mod installer;
pub mod updater;
pub mod utils;
pub mod version;
