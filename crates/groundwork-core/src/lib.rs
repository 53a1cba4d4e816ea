//! Groundwork Core - Foundational types for terrain splat synthesis
//!
//! This crate provides the types the other Groundwork crates share:
//! - `WeightGrid` - Dense per-cell, per-layer blend weights
//! - `GridSize` - Validated grid dimensions
//! - `GridDigest` - SHA-256 fingerprint of a grid
//! - Error types and Result alias

mod digest;
mod error;
mod grid;

pub use digest::GridDigest;
pub use error::{GroundworkError, Result};
pub use grid::{GridSize, WeightGrid};
