//! Maven project model: POM parsing and rewriting, multi-module project
//! trees, and dependency usage analysis results.

pub mod analysis;
pub mod pom;
pub mod project;
pub mod render;
