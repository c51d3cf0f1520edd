//! # composure-common
//!
//! Shared error definitions, settings, constants, and primitive types
//! used across the Composure workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
