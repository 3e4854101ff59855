//! Error types for the solver engine.
//!
//! Invalid-input conditions (singular or non-SPD matrices) abort the
//! operation with an error; non-convergence is recoverable and travels
//! through `SolveReport` instead, so iterative solvers can still hand
//! back their best iterate.

use axb_linalg::Real;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("singular matrix: zero pivot at row {row}")]
    SingularMatrix { row: usize },

    #[error("matrix is not positive definite (pivot {pivot:.4e} at row {row})")]
    NotPositiveDefinite { row: usize, pivot: Real },

    #[error("rank deficient: only {rank} non-negligible singular values")]
    RankDeficient { rank: usize },
}
