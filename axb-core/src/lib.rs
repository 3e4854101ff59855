//! axb-core: the solver and decomposition engine.
//!
//! Solves dense and sparse linear systems `Ax = b` by direct
//! factorization (LU, Cholesky, QR) with optional iterative refinement,
//! or by Krylov/relaxation iteration (CG, GMRES, SOR) with optional
//! preconditioning, and provides SVD, dominant-eigenvalue, and
//! condition-number computations on top.
//!
//! Every operation is synchronous and call-and-return: no internal
//! threads, no shared state, no cancellation. Iteration caps are hard
//! caps. Invalid input surfaces as `LinalgError`; non-convergence is
//! recoverable and reported through [`SolveReport`] plus a
//! `tracing::warn!`.

pub mod decompose;
pub mod error;
pub mod iterative;
pub mod precond;
pub mod spectral;
pub mod svd;

pub use decompose::cholesky::{CholeskyDecomp, SparseCholesky};
pub use decompose::lu::{LuDecomp, SparseLu};
pub use decompose::qr::{QrDecomp, QrMethod, SparseQr};
pub use error::LinalgError;
pub use iterative::{CgSolver, GmresSolver, SolveReport, SorSolver};
pub use precond::{PrecondKind, Preconditioner};
pub use svd::{SparseSvdTriple, SvdTriple};

pub use axb_linalg::{dense, sparse, Real, SparseMatrix, SparseVector};
