//! Core data types for pomclean.
//!
//! This crate defines the types shared by the POM layer and the cleanup
//! operations: the `groupId:artifactId` identity key, Maven dependency
//! scopes, and the tool configuration loaded from `pomclean.toml`.
//!
//! This crate performs no XML parsing and no process spawning.

/// Default file name for the rewritten POM.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "clean.pom.xml";

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "pomclean.toml";

pub mod config;
pub mod dependency;
