//! Iterative solvers: CG, GMRES, SOR.
//!
//! All three are generic over a matrix-vector product closure (so
//! callers can supply operators that are never materialized), take an
//! optional preconditioner and initial guess, and return their best
//! iterate with a convergence flag rather than failing — hitting the
//! iteration cap is recoverable and reported through `tracing::warn!`.

pub mod cg;
pub mod gmres;
pub mod sor;

use axb_linalg::Real;

pub use cg::CgSolver;
pub use gmres::GmresSolver;
pub use sor::SorSolver;

/// Outcome of an iterative solve.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Solution iterate (best effort when not converged).
    pub x: Vec<Real>,
    /// Iterations actually used.
    pub iterations: usize,
    /// Final residual norm.
    pub residual: Real,
    /// Whether the tolerance was met within the iteration cap.
    pub converged: bool,
}

/// Absolute tolerance scaled against the right-hand side, matching the
/// convergence test used across all three solvers.
pub(crate) fn scaled_tolerance(tol: Real, b_norm: Real) -> Real {
    tol * b_norm.max(1.0)
}
