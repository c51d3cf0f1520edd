//! # composure-project
//!
//! Immutable model of a resolved multi-service project and the operations
//! that derive new project states from it.
//!
//! Handles:
//! - **Types**: Services, shared resources, and environment mappings.
//! - **Graph**: Dependency-ordered traversal and startup ordering.
//! - **Profiles**: Profile filtering and service selection.
//! - **Pruning**: Dropping resources no enabled service references.
//! - **Environment**: Env file resolution into each service's environment.
//! - **Images**: Image reference parsing and digest pinning.
//! - **Serialization**: YAML and JSON views, and decoding them back.
//!
//! Every transformation takes `&self` and returns a new [`Project`].

pub mod dotenv;
pub mod environment;
pub mod graph;
pub mod images;
pub mod loader;
pub mod profiles;
pub mod project;
pub mod pruning;
pub mod reference;
pub mod serialize;
pub mod types;

pub use graph::{DependencyGraph, DependencyPolicy};
pub use images::{DigestResolver, PinnedDigests};
pub use project::{IncludeConfig, Project};
pub use reference::ImageReference;
