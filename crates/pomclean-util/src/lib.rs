//! Shared utilities for pomclean.
//!
//! This crate provides cross-cutting concerns used by the other pomclean
//! crates: the error type, filesystem helpers, status output and process
//! spawning for external analyzers.

pub mod errors;
pub mod fs;
pub mod process;
pub mod progress;
