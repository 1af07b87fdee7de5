//! # journaldb Configuration Module
//!
//! Numeric defaults live in [`constants`], grouped by functional area with
//! their interdependencies enforced through compile-time assertions. Runtime
//! sizing for arena-backed operators is carried by [`EngineConfig`].
//!
//! ## Module Organization
//!
//! - [`constants`]: all numeric configuration values with dependency documentation
//! - [`engine`]: `EngineConfig` and its builder

pub mod constants;
pub mod engine;

pub use constants::*;
pub use engine::{EngineConfig, EngineConfigBuilder};
