//! Shared data-model types used across the manifest resolver, graph
//! engine, and builder.

pub mod dependency;
pub mod source;

pub use dependency::{Dependency, DependencyMetadata, ResolvedGraph, ResolvedNode};
pub use source::{BuildProfile, Source};
