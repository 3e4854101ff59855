//! Scalar type policy.
//!
//! All numeric code in the engine is written against `Real`, which is
//! `f64` unless the `f32` feature selects single precision at build time.

/// The engine-wide floating point type.
#[cfg(not(feature = "f32"))]
pub type Real = f64;

/// The engine-wide floating point type.
#[cfg(feature = "f32")]
pub type Real = f32;

/// Guard threshold for pivots and divisors. Values whose magnitude falls
/// below this are treated as zero.
pub const TINY: Real = 1e-30;
