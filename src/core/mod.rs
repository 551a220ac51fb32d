//! Core types shared across trellis-forge.
//!
//! Currently this is the error taxonomy and its user-facing display
//! wrapper; see [`error`] for the full design.

pub mod error;

pub use error::{ErrorContext, ForgeError, user_friendly_error};
