//! End-to-end tests on small systems with independently known answers.
//!
//! Each scenario pins the engine against a hand-checked or textbook
//! result, exercising several solver paths on the same input so the
//! direct, iterative, and spectral layers cross-check each other.

use axb_core::dense;
use axb_core::{Real, SparseMatrix};

/// Dense buffer from row-slices, honoring the global layout.
fn build(rows: &[&[Real]]) -> (Vec<Real>, usize, usize) {
    let m = rows.len();
    let n = rows[0].len();
    let mut a = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            dense::set(&mut a, m, n, i, j, rows[i][j]);
        }
    }
    (a, m, n)
}

fn assert_close(x: &[Real], expected: &[Real], eps: Real, label: &str) {
    assert_eq!(x.len(), expected.len(), "{}", label);
    for i in 0..x.len() {
        assert!(
            (x[i] - expected[i]).abs() < eps,
            "{}: x[{}] = {} vs {}",
            label,
            i,
            x[i],
            expected[i]
        );
    }
}

mod spd_system {
    use super::*;
    use axb_core::{CgSolver, CholeskyDecomp, LuDecomp, QrDecomp, QrMethod, SorSolver};

    fn system() -> (Vec<Real>, Vec<Real>, Vec<Real>) {
        let (a, _, _) = build(&[
            &[25.0, 15.0, -5.0],
            &[15.0, 18.0, 0.0],
            &[-5.0, 0.0, 11.0],
        ]);
        let b = vec![1.0, 3.0, 5.0];
        let expected = vec![17.0 / 225.0, 14.0 / 135.0, 22.0 / 45.0];
        (a, b, expected)
    }

    #[test]
    fn test_cg() {
        let (a, b, expected) = system();
        let report = CgSolver::default().solve_dense(&a, 3, &b, None, None);
        assert!(report.converged, "cg residual {}", report.residual);
        assert_close(&report.x, &expected, 1e-5, "cg");
    }

    #[test]
    fn test_sor() {
        let (a, b, expected) = system();
        let solver = SorSolver {
            omega: 1.2,
            ..SorSolver::default()
        };
        let report = solver.solve_dense(&a, 3, &b, None);
        assert!(report.converged, "sor residual {}", report.residual);
        assert_close(&report.x, &expected, 1e-5, "sor");
    }

    #[test]
    fn test_lu() {
        let (a, b, expected) = system();
        let lu = LuDecomp::new(&a, 3).unwrap();
        assert_close(&lu.solve(&b), &expected, 1e-5, "lu");
    }

    #[test]
    fn test_cholesky() {
        let (a, b, expected) = system();
        let chol = CholeskyDecomp::new(&a, 3).unwrap();
        assert_close(&chol.solve(&b), &expected, 1e-5, "cholesky");
    }

    #[test]
    fn test_qr_all_methods() {
        let (a, b, expected) = system();
        for method in [QrMethod::GramSchmidt, QrMethod::Householder, QrMethod::Givens] {
            let qr = QrDecomp::new(&a, 3, 3, method).unwrap();
            assert_close(&qr.solve(&b), &expected, 1e-5, &format!("{:?}", method));
        }
    }

    #[test]
    fn test_all_solvers_agree_sparse() {
        let (a, b, expected) = system();
        let sa = SparseMatrix::from_dense(&a, 3, 3);
        let cg = CgSolver::default().solve_sparse(&sa, &b, None, None);
        assert_close(&cg.x, &expected, 1e-5, "sparse cg");
        let sor = SorSolver::default().solve_sparse(&sa, &b, None);
        assert_close(&sor.x, &expected, 1e-5, "sparse sor");
    }
}

mod svd_known_values {
    use super::*;
    use axb_core::svd::{jacobi_svd, qr_lq_svd, sparse_jacobi_svd};

    fn matrix() -> (Vec<Real>, usize, usize) {
        build(&[
            &[2.0, 0.0, 8.0, 6.0, 0.0],
            &[1.0, 6.0, 0.0, 1.0, 7.0],
            &[5.0, 0.0, 7.0, 4.0, 0.0],
            &[7.0, 0.0, 8.0, 5.0, 0.0],
            &[0.0, 10.0, 0.0, 0.0, 7.0],
        ])
    }

    // reference values rounded to 4 decimals, so the comparisons below
    // stay a bit wider than the rounding error
    const SIGMAS: [Real; 5] = [17.9173, 15.1722, 3.5639, 1.9843, 0.3496];

    #[test]
    fn test_jacobi_singular_values() {
        let (a, m, n) = matrix();
        let triples = jacobi_svd(&a, m, n, 1e-12, 100);
        assert_eq!(triples.len(), 5);
        for (t, expected) in triples.iter().zip(SIGMAS.iter()) {
            assert!(
                (t.sigma - expected).abs() < 2e-3,
                "sigma {} vs {}",
                t.sigma,
                expected
            );
        }
        for w in triples.windows(2) {
            assert!(w[0].sigma >= w[1].sigma, "not descending");
        }
    }

    #[test]
    fn test_sparse_agrees() {
        let (a, m, n) = matrix();
        let sa = SparseMatrix::from_dense(&a, m, n);
        let triples = sparse_jacobi_svd(&sa, m, n, 1e-12, 100);
        assert_eq!(triples.len(), 5);
        for (t, expected) in triples.iter().zip(SIGMAS.iter()) {
            assert!((t.sigma - expected).abs() < 2e-3);
        }
    }

    #[test]
    fn test_qr_lq_agrees() {
        let (a, m, n) = matrix();
        let triples = qr_lq_svd(&a, m, n, 1e-10, 2000);
        assert_eq!(triples.len(), 5);
        for (t, expected) in triples.iter().zip(SIGMAS.iter()) {
            assert!(
                (t.sigma - expected).abs() < 1e-2,
                "sigma {} vs {}",
                t.sigma,
                expected
            );
        }
    }

    #[test]
    fn test_reconstruction() {
        let (a, m, n) = matrix();
        let triples = jacobi_svd(&a, m, n, 1e-12, 100);
        let mut rec = vec![0.0; m * n];
        for t in &triples {
            for i in 0..m {
                for j in 0..n {
                    let cur = dense::get(&rec, m, n, i, j);
                    dense::set(&mut rec, m, n, i, j, cur + t.sigma * t.u[i] * t.v[j]);
                }
            }
        }
        for k in 0..a.len() {
            assert!((rec[k] - a[k]).abs() < 1e-8, "rec[{}] = {}", k, rec[k]);
        }
    }
}

mod dominant_eigenvalue {
    use super::*;
    use axb_core::spectral::{dominant_eigenvalue_dense, dominant_eigenvalue_sparse};

    #[test]
    fn test_power_iteration() {
        let (a, n, _) = build(&[
            &[1.0, 2.0, 3.0, 4.0],
            &[2.0, 6.0, 7.0, 8.0],
            &[3.0, 7.0, 0.0, 0.0],
            &[4.0, 8.0, 0.0, 1.0],
        ]);
        let lambda = dominant_eigenvalue_dense(&a, n, 1e-10, 10_000);
        assert!((lambda - 15.7568).abs() < 1e-3, "lambda = {}", lambda);

        let sa = SparseMatrix::from_dense(&a, n, n);
        let ls = dominant_eigenvalue_sparse(&sa, n, 1e-10, 10_000);
        assert!((lambda - ls).abs() < 1e-8);
    }
}

mod rank_detection {
    use super::*;
    use axb_core::spectral::condition_number_dense;
    use axb_core::svd::jacobi_svd;

    #[test]
    fn test_rectangular_rank_deficient() {
        // 4 x 5 with three independent rows: numerical rank 3, not 4
        let (a, m, n) = build(&[
            &[3.0, 0.0, 0.0, 0.0, 0.0],
            &[0.0, 5.0, 0.0, 0.0, 0.0],
            &[0.0, 0.0, 0.0, 2.0, 0.0],
            &[0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        let triples = jacobi_svd(&a, m, n, 1e-9, 100);
        assert_eq!(triples.len(), 3);
    }

    #[test]
    fn test_condition_number() {
        let (a, n, _) = build(&[&[4.0, 0.0], &[0.0, 2.0]]);
        let kappa = condition_number_dense(&a, n, n, 1e-12, 100).unwrap();
        assert!((kappa - 2.0).abs() < 1e-9);
    }
}

mod cross_solver_consistency {
    use super::*;
    use axb_core::{
        CgSolver, CholeskyDecomp, GmresSolver, LuDecomp, PrecondKind, Preconditioner,
    };

    #[test]
    fn test_cg_matches_cholesky_on_spd() {
        // SPD by construction: M'M + n I
        let (m0, n, _) = build(&[
            &[1.0, -2.0, 0.5, 1.0],
            &[3.0, 0.0, -1.0, 2.0],
            &[0.0, 1.0, 4.0, -1.0],
            &[2.0, 2.0, 0.0, 1.0],
        ]);
        let mut a = dense::mat_mul(&dense::transpose(&m0, n, n), &m0, n, n, n);
        for i in 0..n {
            let d = dense::get(&a, n, n, i, i) + n as Real;
            dense::set(&mut a, n, n, i, i, d);
        }
        let b = vec![1.0, -2.0, 0.0, 3.0];

        let chol = CholeskyDecomp::new(&a, n).unwrap();
        let x_direct = chol.solve(&b);
        let report = CgSolver::new(1e-12, 1000).solve_dense(&a, n, &b, None, None);
        assert!(report.converged);
        assert_close(&report.x, &x_direct, 1e-6, "cg vs cholesky");
    }

    #[test]
    fn test_gmres_matches_lu_on_nonsymmetric() {
        let (a, n, _) = build(&[
            &[4.0, 1.0, 0.0, 2.0],
            &[-1.0, 5.0, 1.0, 0.0],
            &[0.0, -2.0, 6.0, 1.0],
            &[1.0, 0.0, -1.0, 3.0],
        ]);
        let b = vec![1.0, 2.0, 3.0, 4.0];
        let lu = LuDecomp::new(&a, n).unwrap();
        let x_direct = lu.solve(&b);
        let report = GmresSolver::default().solve_dense(&a, n, &b, None, None);
        assert!(report.converged, "gmres residual {}", report.residual);
        assert_close(&report.x, &x_direct, 1e-6, "gmres vs lu");
    }

    #[test]
    fn test_preconditioned_sparse_solves_agree() {
        let mut sa = SparseMatrix::new();
        let n = 12;
        for i in 0..n {
            sa.insert(i, i, 4.0);
            if i + 1 < n {
                sa.insert(i, i + 1, -1.0);
                sa.insert(i + 1, i, -1.0);
            }
        }
        let b: Vec<Real> = (0..n).map(|i| 1.0 + (i % 3) as Real).collect();

        let plain = CgSolver::default().solve_sparse(&sa, &b, None, None);
        assert!(plain.converged);
        for kind in [
            PrecondKind::Jacobi,
            PrecondKind::IncompleteCholesky,
            PrecondKind::Ilu0,
        ] {
            let p = Preconditioner::build(&sa, kind, n).unwrap();
            let report = CgSolver::default().solve_sparse(&sa, &b, None, Some(&p));
            assert!(report.converged, "{:?}", kind);
            assert_close(&report.x, &plain.x, 1e-6, &format!("{:?}", kind));
            assert!(report.iterations <= plain.iterations + 2, "{:?}", kind);
        }
    }
}

mod refinement {
    use super::*;
    use axb_core::svd::{jacobi_svd, least_squares};
    use axb_core::{LuDecomp, SparseLu};

    #[test]
    fn test_refined_solve_reaches_direct_accuracy() {
        let (a, n, _) = build(&[
            &[10.0, 7.0, 8.0],
            &[7.0, 5.0, 6.0],
            &[8.0, 6.0, 10.0],
        ]);
        let x_true = vec![1.0, -1.0, 2.0];
        let b = dense::mat_vec(&a, n, n, &x_true);
        let lu = LuDecomp::new(&a, n).unwrap();
        let x = lu.solve_refined(&a, &b, None, 20, 1e-14);
        assert_close(&x, &x_true, 1e-8, "refined lu");
    }

    #[test]
    fn test_sparse_lu_refined() {
        let sa = SparseMatrix::from_triplets(
            &[0, 0, 1, 1, 2, 2],
            &[0, 1, 0, 1, 1, 2],
            &[4.0, 1.0, 1.0, 3.0, -1.0, 2.0],
        );
        let x_true = vec![1.0, 2.0, -1.0];
        let b = sa.mat_vec(&x_true, 3);
        let lu = SparseLu::new(&sa, 3).unwrap();
        let x = lu.solve_refined(&sa, &b, None, 20, 1e-14);
        assert_close(&x, &x_true, 1e-8, "refined sparse lu");
    }

    #[test]
    fn test_svd_least_squares_overdetermined() {
        // fit y = c0 + c1 t through four points; residual orthogonal
        // to the column space
        let (a, m, n) = build(&[
            &[1.0, 0.0],
            &[1.0, 1.0],
            &[1.0, 2.0],
            &[1.0, 3.0],
        ]);
        let b = vec![1.0, 2.1, 2.9, 4.2];
        let triples = jacobi_svd(&a, m, n, 1e-12, 100);
        let x = least_squares(&triples, &b);
        let r: Vec<Real> = dense::mat_vec(&a, m, n, &x)
            .iter()
            .zip(b.iter())
            .map(|(ax, bi)| ax - bi)
            .collect();
        let atr = dense::mat_vec_t(&a, m, n, &r);
        for i in 0..n {
            assert!(atr[i].abs() < 1e-8, "a'r[{}] = {}", i, atr[i]);
        }
    }
}
