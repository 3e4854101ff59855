//! axb-linalg: container layers for the axb solver engine.
//!
//! Provides the two parallel matrix representations the engine operates
//! on: dense flat buffers with a compile-time layout policy, and
//! row-indexed sparse matrices built from sorted sparse vectors.

pub mod dense;
pub mod scalar;
pub mod sparse;

pub use scalar::Real;
pub use sparse::{SparseMatrix, SparseVector};
