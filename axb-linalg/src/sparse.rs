#![allow(clippy::needless_range_loop)]
//! Sparse vector and matrix containers.
//!
//! A `SparseVector` is an ordered-by-index list of (index, value) pairs
//! with unique indices; short vectors live in an inline buffer and only
//! promote to the heap when they outgrow it. A `SparseMatrix` is an
//! ordered list of non-empty rows, each a `SparseVector` over its
//! non-zero columns. Dimensions are supplied by callers per operation,
//! not stored in the matrix.
//!
//! Insertion never materializes a zero at an absent index, but
//! overwriting an existing entry with zero is allowed and leaves a
//! logical zero in place until `clean()` compacts it; Givens rotation
//! sequences rely on those explicit holes.

use smallvec::SmallVec;

use crate::scalar::Real;

/// Entries held inline before promoting to a heap buffer.
const INLINE_ENTRIES: usize = 8;

type Entries = SmallVec<[(usize, Real); INLINE_ENTRIES]>;

/// An ordered sparse vector of (index, value) pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Entries,
}

impl SparseVector {
    /// Create an empty sparse vector.
    pub fn new() -> Self {
        Self {
            entries: Entries::new(),
        }
    }

    /// Build from the non-zero entries of a dense slice.
    pub fn from_dense(v: &[Real]) -> Self {
        let mut out = Self::new();
        for (i, &x) in v.iter().enumerate() {
            if x != 0.0 {
                out.entries.push((i, x));
            }
        }
        out
    }

    /// Expand into a dense vector of the given length.
    pub fn to_dense(&self, len: usize) -> Vec<Real> {
        let mut v = vec![0.0; len];
        for &(i, x) in self.entries.iter() {
            v[i] = x;
        }
        v
    }

    /// Number of stored entries (logical zeros included until `clean`).
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value at `index`; zero for absent indices.
    pub fn get(&self, index: usize) -> Real {
        match self.entries.binary_search_by(|e| e.0.cmp(&index)) {
            Ok(pos) => self.entries[pos].1,
            Err(_) => 0.0,
        }
    }

    /// Ordered insertion at `index`.
    ///
    /// Overwrites an existing entry even with zero (explicit hole);
    /// skips creating a new entry when `value` is exactly zero.
    pub fn insert(&mut self, index: usize, value: Real) {
        match self.entries.binary_search_by(|e| e.0.cmp(&index)) {
            Ok(pos) => self.entries[pos].1 = value,
            Err(pos) => {
                if value != 0.0 {
                    self.entries.insert(pos, (index, value));
                }
            }
        }
    }

    /// Drop stored entries whose value is exactly zero.
    pub fn clean(&mut self) {
        self.entries.retain(|e| e.1 != 0.0);
    }

    /// Iterate stored (index, value) pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Real)> + '_ {
        self.entries.iter().copied()
    }

    /// Largest stored index plus one, or zero when empty.
    pub fn dim_hint(&self) -> usize {
        self.entries.last().map_or(0, |e| e.0 + 1)
    }

    /// Multiply every entry in place.
    pub fn scale(&mut self, s: Real) {
        for e in self.entries.iter_mut() {
            e.1 *= s;
        }
    }

    /// Dot product via merge co-iteration over the sorted indices.
    pub fn dot(&self, other: &SparseVector) -> Real {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ia, va) = self.entries[i];
            let (ib, vb) = other.entries[j];
            match ia.cmp(&ib) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += va * vb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Dot product against a dense slice.
    pub fn dot_dense(&self, v: &[Real]) -> Real {
        self.entries.iter().map(|&(i, x)| x * v[i]).sum()
    }

    /// Euclidean norm.
    pub fn norm2(&self) -> Real {
        self.entries
            .iter()
            .map(|&(_, x)| x * x)
            .sum::<Real>()
            .sqrt()
    }

    /// Merge `ca * a + cb * b` into a new vector.
    ///
    /// Entries that cancel to exactly zero are kept as logical zeros so
    /// a rotation pair applied through this function behaves like the
    /// in-place overwrite path; callers compact with `clean`.
    pub fn scaled_sum(a: &SparseVector, ca: Real, b: &SparseVector, cb: Real) -> SparseVector {
        let mut entries = Entries::new();
        let (mut i, mut j) = (0, 0);
        while i < a.entries.len() || j < b.entries.len() {
            let next_a = a.entries.get(i).map(|e| e.0);
            let next_b = b.entries.get(j).map(|e| e.0);
            match (next_a, next_b) {
                (Some(ia), Some(ib)) if ia == ib => {
                    entries.push((ia, ca * a.entries[i].1 + cb * b.entries[j].1));
                    i += 1;
                    j += 1;
                }
                (Some(ia), Some(ib)) if ia < ib => {
                    entries.push((ia, ca * a.entries[i].1));
                    i += 1;
                }
                (Some(_), Some(ib)) => {
                    entries.push((ib, cb * b.entries[j].1));
                    j += 1;
                }
                (Some(ia), None) => {
                    entries.push((ia, ca * a.entries[i].1));
                    i += 1;
                }
                (None, Some(ib)) => {
                    entries.push((ib, cb * b.entries[j].1));
                    j += 1;
                }
                (None, None) => unreachable!(),
            }
        }
        SparseVector { entries }
    }

    /// Element-wise sum.
    pub fn add(&self, other: &SparseVector) -> SparseVector {
        Self::scaled_sum(self, 1.0, other, 1.0)
    }

    /// Element-wise difference.
    pub fn sub(&self, other: &SparseVector) -> SparseVector {
        Self::scaled_sum(self, 1.0, other, -1.0)
    }
}

/// A row-sparse matrix: ordered non-empty rows of sparse columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<(usize, SparseVector)>,
}

impl SparseMatrix {
    /// Create an empty sparse matrix.
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Build from COO triplets.
    pub fn from_triplets(rows: &[usize], cols: &[usize], vals: &[Real]) -> Self {
        assert_eq!(rows.len(), cols.len());
        assert_eq!(rows.len(), vals.len());
        let mut m = Self::new();
        for k in 0..rows.len() {
            m.insert(rows[k], cols[k], vals[k]);
        }
        m
    }

    /// Build from the non-zero entries of a dense buffer.
    pub fn from_dense(a: &[Real], nrows: usize, ncols: usize) -> Self {
        assert_eq!(a.len(), nrows * ncols);
        let mut m = Self::new();
        for i in 0..nrows {
            for j in 0..ncols {
                let v = crate::dense::get(a, nrows, ncols, i, j);
                if v != 0.0 {
                    m.insert(i, j, v);
                }
            }
        }
        m
    }

    /// Expand into a dense buffer of the given shape.
    pub fn to_dense(&self, nrows: usize, ncols: usize) -> Vec<Real> {
        let mut a = vec![0.0; nrows * ncols];
        for (i, row) in self.rows.iter() {
            for (j, v) in row.iter() {
                crate::dense::set(&mut a, nrows, ncols, *i, j, v);
            }
        }
        a
    }

    /// Sparse identity of size n.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new();
        for i in 0..n {
            m.insert(i, i, 1.0);
        }
        m
    }

    /// Total stored entries across all rows.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(|(_, r)| r.nnz()).sum()
    }

    /// Number of stored (non-empty) rows.
    pub fn n_stored_rows(&self) -> usize {
        self.rows.len()
    }

    fn row_pos(&self, i: usize) -> Result<usize, usize> {
        self.rows.binary_search_by(|r| r.0.cmp(&i))
    }

    /// The stored row at index `i`, if any.
    pub fn row(&self, i: usize) -> Option<&SparseVector> {
        self.row_pos(i).ok().map(|pos| &self.rows[pos].1)
    }

    /// Iterate stored rows as (row_index, row) in row order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (usize, &SparseVector)> {
        self.rows.iter().map(|(i, r)| (*i, r))
    }

    /// Value at (i, j); zero when the row or entry is absent.
    pub fn get(&self, i: usize, j: usize) -> Real {
        match self.row_pos(i) {
            Ok(pos) => self.rows[pos].1.get(j),
            Err(_) => 0.0,
        }
    }

    /// Ordered insertion at (i, j) with the sparse-vector overwrite
    /// contract; a zero at an absent position never creates a row.
    pub fn insert(&mut self, i: usize, j: usize, value: Real) {
        match self.row_pos(i) {
            Ok(pos) => self.rows[pos].1.insert(j, value),
            Err(pos) => {
                if value != 0.0 {
                    let mut row = SparseVector::new();
                    row.insert(j, value);
                    self.rows.insert(pos, (i, row));
                }
            }
        }
    }

    /// Replace an entire row. An empty vector removes the row.
    pub fn set_row(&mut self, i: usize, row: SparseVector) {
        match self.row_pos(i) {
            Ok(pos) => {
                if row.is_empty() {
                    self.rows.remove(pos);
                } else {
                    self.rows[pos].1 = row;
                }
            }
            Err(pos) => {
                if !row.is_empty() {
                    self.rows.insert(pos, (i, row));
                }
            }
        }
    }

    /// Compact: drop exactly-zero entries and rows left empty by them.
    /// Idempotent.
    pub fn clean(&mut self) {
        for (_, row) in self.rows.iter_mut() {
            row.clean();
        }
        self.rows.retain(|(_, r)| !r.is_empty());
    }

    /// Diagonal entries 0..n.
    pub fn diag(&self, n: usize) -> Vec<Real> {
        (0..n).map(|i| self.get(i, i)).collect()
    }

    /// Multiply every stored entry in place.
    pub fn scale(&mut self, s: Real) {
        for (_, row) in self.rows.iter_mut() {
            row.scale(s);
        }
    }

    /// Transpose.
    pub fn transpose(&self) -> SparseMatrix {
        let mut t = SparseMatrix::new();
        for (i, row) in self.rows.iter() {
            for (j, v) in row.iter() {
                if v != 0.0 {
                    t.insert(j, *i, v);
                }
            }
        }
        t
    }

    /// Element-wise sum.
    pub fn add(&self, other: &SparseMatrix) -> SparseMatrix {
        self.merge(other, 1.0)
    }

    /// Element-wise difference.
    pub fn sub(&self, other: &SparseMatrix) -> SparseMatrix {
        self.merge(other, -1.0)
    }

    fn merge(&self, other: &SparseMatrix, sign: Real) -> SparseMatrix {
        let mut out = SparseMatrix::new();
        let (mut i, mut j) = (0, 0);
        while i < self.rows.len() || j < other.rows.len() {
            let next_a = self.rows.get(i).map(|r| r.0);
            let next_b = other.rows.get(j).map(|r| r.0);
            match (next_a, next_b) {
                (Some(ra), Some(rb)) if ra == rb => {
                    out.set_row(
                        ra,
                        SparseVector::scaled_sum(&self.rows[i].1, 1.0, &other.rows[j].1, sign),
                    );
                    i += 1;
                    j += 1;
                }
                (Some(ra), Some(rb)) if ra < rb => {
                    out.set_row(ra, self.rows[i].1.clone());
                    i += 1;
                }
                (Some(_), Some(rb)) => {
                    let mut row = other.rows[j].1.clone();
                    row.scale(sign);
                    out.set_row(rb, row);
                    j += 1;
                }
                (Some(ra), None) => {
                    out.set_row(ra, self.rows[i].1.clone());
                    i += 1;
                }
                (None, Some(rb)) => {
                    let mut row = other.rows[j].1.clone();
                    row.scale(sign);
                    out.set_row(rb, row);
                    j += 1;
                }
                (None, None) => unreachable!(),
            }
        }
        out
    }

    /// Matrix-vector product against a dense vector; `nrows` sizes the
    /// result (dimensions are supplied per operation, never stored).
    pub fn mat_vec(&self, x: &[Real], nrows: usize) -> Vec<Real> {
        let mut y = vec![0.0; nrows];
        for (i, row) in self.rows.iter() {
            y[*i] = row.dot_dense(x);
        }
        y
    }

    /// Matrix-vector product against a sparse vector.
    pub fn mat_vec_sparse(&self, x: &SparseVector) -> SparseVector {
        let mut y = SparseVector::new();
        for (i, row) in self.rows.iter() {
            let v = row.dot(x);
            if v != 0.0 {
                y.insert(*i, v);
            }
        }
        y
    }

    /// Matrix-matrix product: for each row of self, accumulate the
    /// scaled rows of `other` it selects. Runs over stored entries only.
    pub fn mat_mul(&self, other: &SparseMatrix) -> SparseMatrix {
        let mut out = SparseMatrix::new();
        for (i, row) in self.rows.iter() {
            let mut acc = SparseVector::new();
            for (k, aik) in row.iter() {
                if aik == 0.0 {
                    continue;
                }
                if let Some(bk) = other.row(k) {
                    acc = SparseVector::scaled_sum(&acc, 1.0, bk, aik);
                }
            }
            acc.clean();
            out.set_row(*i, acc);
        }
        out
    }
}
