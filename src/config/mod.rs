//! Configuration module for bundle plan generation
//!
//! This module provides the `GenerationConfig` struct and its builder for
//! configuring a generation run with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::GenerationConfigBuilder;
pub use types::{Credentials, GenerationConfig, PageTarget, PageType};
