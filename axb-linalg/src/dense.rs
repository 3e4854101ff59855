#![allow(clippy::needless_range_loop)]
//! Dense matrix primitives over flat buffers.
//!
//! A dense matrix is a plain `&[Real]` of `nrows * ncols` entries; shape
//! is passed alongside the buffer at every call and the memory order is a
//! single global policy chosen at build time, never a per-matrix
//! property. The engine never retains a reference to a caller's buffer
//! across calls.

use crate::scalar::Real;

/// Memory order of dense buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RowMajor,
    ColMajor,
}

/// The global dense layout policy.
#[cfg(not(feature = "col-major"))]
pub const LAYOUT: Layout = Layout::RowMajor;

/// The global dense layout policy.
#[cfg(feature = "col-major")]
pub const LAYOUT: Layout = Layout::ColMajor;

/// Flat index of element (i, j) under the global layout.
#[inline(always)]
pub fn idx(i: usize, j: usize, nrows: usize, ncols: usize) -> usize {
    match LAYOUT {
        Layout::RowMajor => {
            debug_assert!(i < nrows && j < ncols);
            i * ncols + j
        }
        Layout::ColMajor => {
            debug_assert!(i < nrows && j < ncols);
            j * nrows + i
        }
    }
}

/// Read element (i, j).
#[inline(always)]
pub fn get(a: &[Real], nrows: usize, ncols: usize, i: usize, j: usize) -> Real {
    a[idx(i, j, nrows, ncols)]
}

/// Write element (i, j).
#[inline(always)]
pub fn set(a: &mut [Real], nrows: usize, ncols: usize, i: usize, j: usize, value: Real) {
    a[idx(i, j, nrows, ncols)] = value;
}

/// Dot product of two vectors.
pub fn dot(a: &[Real], b: &[Real]) -> Real {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm of a vector.
pub fn norm2(v: &[Real]) -> Real {
    v.iter().map(|x| x * x).sum::<Real>().sqrt()
}

/// Identity matrix as a flat buffer.
pub fn identity(n: usize) -> Vec<Real> {
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        a[idx(i, i, n, n)] = 1.0;
    }
    a
}

/// Matrix-vector product: a * x.
pub fn mat_vec(a: &[Real], nrows: usize, ncols: usize, x: &[Real]) -> Vec<Real> {
    assert_eq!(a.len(), nrows * ncols);
    assert_eq!(x.len(), ncols);
    let mut y = vec![0.0; nrows];
    for i in 0..nrows {
        let mut sum = 0.0;
        for j in 0..ncols {
            sum += a[idx(i, j, nrows, ncols)] * x[j];
        }
        y[i] = sum;
    }
    y
}

/// Transposed matrix-vector product: a' * x.
pub fn mat_vec_t(a: &[Real], nrows: usize, ncols: usize, x: &[Real]) -> Vec<Real> {
    assert_eq!(a.len(), nrows * ncols);
    assert_eq!(x.len(), nrows);
    let mut y = vec![0.0; ncols];
    for j in 0..ncols {
        let mut sum = 0.0;
        for i in 0..nrows {
            sum += a[idx(i, j, nrows, ncols)] * x[i];
        }
        y[j] = sum;
    }
    y
}

/// Matrix-matrix product: a (m x k) * b (k x n) -> (m x n).
pub fn mat_mul(a: &[Real], b: &[Real], m: usize, k: usize, n: usize) -> Vec<Real> {
    assert_eq!(a.len(), m * k);
    assert_eq!(b.len(), k * n);
    let mut c = vec![0.0; m * n];
    for i in 0..m {
        for l in 0..k {
            let ail = a[idx(i, l, m, k)];
            if ail == 0.0 {
                continue;
            }
            for j in 0..n {
                c[idx(i, j, m, n)] += ail * b[idx(l, j, k, n)];
            }
        }
    }
    c
}

/// Transpose: (nrows x ncols) -> (ncols x nrows).
pub fn transpose(a: &[Real], nrows: usize, ncols: usize) -> Vec<Real> {
    assert_eq!(a.len(), nrows * ncols);
    let mut t = vec![0.0; nrows * ncols];
    for i in 0..nrows {
        for j in 0..ncols {
            t[idx(j, i, ncols, nrows)] = a[idx(i, j, nrows, ncols)];
        }
    }
    t
}

/// Residual b - a * x for a square system.
pub fn residual(a: &[Real], n: usize, x: &[Real], b: &[Real]) -> Vec<Real> {
    let ax = mat_vec(a, n, n, x);
    b.iter().zip(ax.iter()).map(|(bi, ai)| bi - ai).collect()
}

/// Forward substitution: solve L * y = b for lower-triangular L.
///
/// With `unit_diag` the diagonal of L is taken as 1 and never read.
/// Zero pivots are the caller's responsibility; decompositions reject
/// them before a factor ever reaches this function.
pub fn forward_substitute(l: &[Real], n: usize, b: &[Real], unit_diag: bool) -> Vec<Real> {
    assert_eq!(l.len(), n * n);
    assert_eq!(b.len(), n);
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[idx(i, j, n, n)] * y[j];
        }
        y[i] = if unit_diag { sum } else { sum / l[idx(i, i, n, n)] };
    }
    y
}

/// Backward substitution: solve U * x = b for upper-triangular U.
pub fn back_substitute(u: &[Real], n: usize, b: &[Real], unit_diag: bool) -> Vec<Real> {
    assert_eq!(u.len(), n * n);
    assert_eq!(b.len(), n);
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= u[idx(i, j, n, n)] * x[j];
        }
        x[i] = if unit_diag { sum } else { sum / u[idx(i, i, n, n)] };
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mat_vec() {
        let a = identity(3);
        let x = vec![1.0, 2.0, 3.0];
        assert_eq!(mat_vec(&a, 3, 3, &x), x);
    }

    #[test]
    fn test_mat_mul() {
        let mut a = vec![0.0; 6];
        let mut b = vec![0.0; 6];
        let av = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let bv = [[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]];
        for i in 0..2 {
            for j in 0..3 {
                set(&mut a, 2, 3, i, j, av[i][j]);
            }
        }
        for i in 0..3 {
            for j in 0..2 {
                set(&mut b, 3, 2, i, j, bv[i][j]);
            }
        }
        let c = mat_mul(&a, &b, 2, 3, 2);
        assert!((get(&c, 2, 2, 0, 0) - 58.0).abs() < 1e-10);
        assert!((get(&c, 2, 2, 0, 1) - 64.0).abs() < 1e-10);
        assert!((get(&c, 2, 2, 1, 0) - 139.0).abs() < 1e-10);
        assert!((get(&c, 2, 2, 1, 1) - 154.0).abs() < 1e-10);
    }

    #[test]
    fn test_transpose() {
        let mut a = vec![0.0; 6];
        for i in 0..2 {
            for j in 0..3 {
                set(&mut a, 2, 3, i, j, (i * 3 + j) as Real);
            }
        }
        let t = transpose(&a, 2, 3);
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(get(&t, 3, 2, j, i), get(&a, 2, 3, i, j));
            }
        }
    }

    #[test]
    fn test_mat_vec_t() {
        let mut a = vec![0.0; 6];
        for i in 0..2 {
            for j in 0..3 {
                set(&mut a, 2, 3, i, j, (i * 3 + j + 1) as Real);
            }
        }
        let x = vec![1.0, 1.0];
        let y = mat_vec_t(&a, 2, 3, &x);
        assert_eq!(y, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_substitution_round_trip() {
        let n = 3;
        let mut l = vec![0.0; 9];
        set(&mut l, 3, 3, 0, 0, 2.0);
        set(&mut l, 3, 3, 1, 0, 1.0);
        set(&mut l, 3, 3, 1, 1, 3.0);
        set(&mut l, 3, 3, 2, 0, -1.0);
        set(&mut l, 3, 3, 2, 1, 0.5);
        set(&mut l, 3, 3, 2, 2, 4.0);
        let b = vec![2.0, 7.0, 3.0];
        let y = forward_substitute(&l, n, &b, false);
        let lb = mat_vec(&l, n, n, &y);
        for i in 0..n {
            assert!((lb[i] - b[i]).abs() < 1e-12);
        }
        let u = transpose(&l, n, n);
        let x = back_substitute(&u, n, &b, false);
        let ub = mat_vec(&u, n, n, &x);
        for i in 0..n {
            assert!((ub[i] - b[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dot_norm() {
        assert!((dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]) - 32.0).abs() < 1e-12);
        assert!((norm2(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
    }
}
