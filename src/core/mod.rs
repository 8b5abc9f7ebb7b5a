//! Core types for relgen: the error architecture shared by every module.
//!
//! See [`error`] for the two-layer design ([`RelgenError`] for typed matching,
//! [`ErrorContext`] for user-facing display).

pub mod error;

pub use error::{ErrorContext, RelgenError, user_friendly_error};
