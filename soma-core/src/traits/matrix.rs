//! Core matrix abstraction traits
//!
//! The chunk-size selector and the ingestors only need row-level nonzero
//! counts and the matrix shape, so that is all this trait asks for.

use super::element::MatrixElement;

/// Format-agnostic view of a two-dimensional sparse matrix
pub trait SparseMatrix {
    /// The element type stored in this matrix
    type Element: MatrixElement;

    /// Get matrix dimensions as (rows, cols)
    fn dimensions(&self) -> (usize, usize);

    /// Get number of stored elements
    fn nnz(&self) -> usize;

    /// Get number of stored elements in one row
    ///
    /// `row` must be less than the row dimension.
    fn row_nnz(&self, row: usize) -> usize;

    fn n_rows(&self) -> usize {
        self.dimensions().0
    }

    fn n_cols(&self) -> usize {
        self.dimensions().1
    }
}
