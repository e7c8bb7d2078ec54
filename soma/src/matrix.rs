//! In-memory source matrices
//!
//! Matrices handed to the ingestors. [`CsrMatrix`] is the row-compressed
//! form the chunked ingestor works on; [`CooMatrix`] and [`DenseMatrix`] are
//! accepted by the whole-matrix ingestor. Stored entries are kept verbatim:
//! explicit zeros and duplicate coordinates in CSR/COO input survive
//! conversion.

use soma_core::{MatrixElement, Result, SomaError, SparseMatrix};

/// Compressed sparse row matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<T>,
}

impl<T: MatrixElement> CsrMatrix<T> {
    /// Build from raw CSR buffers, validating their consistency
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<T>,
    ) -> Result<Self> {
        if indptr.len() != n_rows + 1 {
            return Err(SomaError::invalid_matrix(format!(
                "indptr has {} entries, expected {}",
                indptr.len(),
                n_rows + 1
            )));
        }
        if indptr[0] != 0 {
            return Err(SomaError::invalid_matrix("indptr must start at 0"));
        }
        if indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(SomaError::invalid_matrix("indptr must be non-decreasing"));
        }
        if indices.len() != data.len() {
            return Err(SomaError::invalid_matrix(format!(
                "{} column indices for {} values",
                indices.len(),
                data.len()
            )));
        }
        if indptr[n_rows] != data.len() {
            return Err(SomaError::invalid_matrix(format!(
                "indptr ends at {} but {} values are stored",
                indptr[n_rows],
                data.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&c| c >= n_cols) {
            return Err(SomaError::invalid_matrix(format!(
                "column index {bad} out of bounds for {n_cols} columns"
            )));
        }
        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    /// Build from unordered triplets; entries keep their relative order within a row
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[T],
    ) -> Result<Self> {
        if rows.len() != cols.len() || cols.len() != values.len() {
            return Err(SomaError::invalid_matrix(
                "rows, cols, and values must have the same length",
            ));
        }
        if let Some(&bad) = rows.iter().find(|&&r| r >= n_rows) {
            return Err(SomaError::invalid_matrix(format!(
                "row index {bad} out of bounds for {n_rows} rows"
            )));
        }

        let mut indptr = vec![0usize; n_rows + 1];
        for &r in rows {
            indptr[r + 1] += 1;
        }
        for r in 0..n_rows {
            indptr[r + 1] += indptr[r];
        }

        let mut cursor = indptr.clone();
        let mut indices = vec![0usize; values.len()];
        let mut data = vec![T::zero(); values.len()];
        for ((&r, &c), &v) in rows.iter().zip(cols).zip(values) {
            let slot = cursor[r];
            indices[slot] = c;
            data[slot] = v;
            cursor[r] += 1;
        }

        Self::new(n_rows, n_cols, indptr, indices, data)
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Column indices and values stored in one row
    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        let span = self.indptr[row]..self.indptr[row + 1];
        (&self.indices[span.clone()], &self.data[span])
    }

    /// Gather the given physical rows into coordinate form
    ///
    /// Row `k` of the result is physical row `rows[k]`; no reordered copy of
    /// the whole matrix is made.
    pub fn gather_rows(&self, rows: &[usize]) -> CooMatrix<T> {
        let nnz: usize = rows.iter().map(|&r| self.row_nnz(r)).sum();
        let mut coo = CooMatrix::with_capacity(rows.len(), self.n_cols, nnz);
        for (local, &physical) in rows.iter().enumerate() {
            let (cols, values) = self.row(physical);
            coo.rows.extend(std::iter::repeat(local).take(cols.len()));
            coo.cols.extend_from_slice(cols);
            coo.values.extend_from_slice(values);
        }
        coo
    }

    /// Whole matrix in coordinate form, row by row
    pub fn to_coo(&self) -> CooMatrix<T> {
        let mut coo = CooMatrix::with_capacity(self.n_rows, self.n_cols, self.nnz());
        for row in 0..self.n_rows {
            let (cols, values) = self.row(row);
            coo.rows.extend(std::iter::repeat(row).take(cols.len()));
            coo.cols.extend_from_slice(cols);
            coo.values.extend_from_slice(values);
        }
        coo
    }
}

impl<T: MatrixElement> SparseMatrix for CsrMatrix<T> {
    type Element = T;

    fn dimensions(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    fn nnz(&self) -> usize {
        self.data.len()
    }

    fn row_nnz(&self, row: usize) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }
}

/// Coordinate-format matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CooMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
}

impl<T: MatrixElement> CooMatrix<T> {
    fn with_capacity(n_rows: usize, n_cols: usize, nnz: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz),
            cols: Vec::with_capacity(nnz),
            values: Vec::with_capacity(nnz),
        }
    }

    /// Build from triplet vectors, checking lengths and bounds
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        if rows.len() != cols.len() || cols.len() != values.len() {
            return Err(SomaError::invalid_matrix(
                "rows, cols, and values must have the same length",
            ));
        }
        for (i, (&r, &c)) in rows.iter().zip(&cols).enumerate() {
            if r >= n_rows || c >= n_cols {
                return Err(SomaError::invalid_matrix(format!(
                    "triplet {i} index ({r}, {c}) out of bounds for ({n_rows}, {n_cols})"
                )));
            }
        }
        Ok(Self {
            n_rows,
            n_cols,
            rows,
            cols,
            values,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// Row-major dense matrix
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    n_rows: usize,
    n_cols: usize,
    data: Vec<T>,
}

impl<T: MatrixElement> DenseMatrix<T> {
    pub fn new(n_rows: usize, n_cols: usize, data: Vec<T>) -> Result<Self> {
        let expected = n_rows
            .checked_mul(n_cols)
            .ok_or_else(|| SomaError::invalid_matrix("dense shape overflows"))?;
        if data.len() != expected {
            return Err(SomaError::invalid_matrix(format!(
                "dense data has {} values, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            n_rows,
            n_cols,
            data,
        })
    }

    /// Build from equal-length rows
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let n_cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(SomaError::invalid_matrix("dense rows have unequal lengths"));
        }
        Self::new(rows.len(), n_cols, rows.concat())
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.n_cols + col]
    }

    /// Nonzero entries in row-major order
    pub fn to_coo(&self) -> CooMatrix<T> {
        let mut coo = CooMatrix::with_capacity(self.n_rows, self.n_cols, 0);
        for (i, &v) in self.data.iter().enumerate() {
            if !v.is_zero() {
                coo.rows.push(i / self.n_cols);
                coo.cols.push(i % self.n_cols);
                coo.values.push(v);
            }
        }
        coo
    }

    /// Nonzero entries as CSR
    pub fn to_csr(&self) -> CsrMatrix<T> {
        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in self.data.chunks(self.n_cols.max(1)).take(self.n_rows) {
            for (c, &v) in row.iter().enumerate() {
                if !v.is_zero() {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(data.len());
        }
        // Zero-width rows still need one indptr entry each
        indptr.resize(self.n_rows + 1, data.len());
        CsrMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            indptr,
            indices,
            data,
        }
    }
}

impl<T: MatrixElement> SparseMatrix for DenseMatrix<T> {
    type Element = T;

    fn dimensions(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    fn nnz(&self) -> usize {
        self.data.iter().filter(|v| !v.is_zero()).count()
    }

    fn row_nnz(&self, row: usize) -> usize {
        let start = row * self.n_cols;
        self.data[start..start + self.n_cols]
            .iter()
            .filter(|v| !v.is_zero())
            .count()
    }
}

/// Any matrix an assay matrix can ingest
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMatrix<T> {
    Csr(CsrMatrix<T>),
    Coo(CooMatrix<T>),
    Dense(DenseMatrix<T>),
}

impl<T: MatrixElement> SourceMatrix<T> {
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            SourceMatrix::Csr(m) => m.dimensions(),
            SourceMatrix::Coo(m) => m.dimensions(),
            SourceMatrix::Dense(m) => m.dimensions(),
        }
    }

    /// Whole matrix in coordinate form
    pub fn to_coo(&self) -> CooMatrix<T> {
        match self {
            SourceMatrix::Csr(m) => m.to_coo(),
            SourceMatrix::Coo(m) => m.clone(),
            SourceMatrix::Dense(m) => m.to_coo(),
        }
    }

    pub fn as_csr(&self) -> Option<&CsrMatrix<T>> {
        match self {
            SourceMatrix::Csr(m) => Some(m),
            _ => None,
        }
    }
}

impl<T> From<CsrMatrix<T>> for SourceMatrix<T> {
    fn from(m: CsrMatrix<T>) -> Self {
        SourceMatrix::Csr(m)
    }
}

impl<T> From<CooMatrix<T>> for SourceMatrix<T> {
    fn from(m: CooMatrix<T>) -> Self {
        SourceMatrix::Coo(m)
    }
}

impl<T> From<DenseMatrix<T>> for SourceMatrix<T> {
    fn from(m: DenseMatrix<T>) -> Self {
        SourceMatrix::Dense(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worked_example() -> DenseMatrix<f32> {
        DenseMatrix::from_rows(&[
            vec![0.0, 1.0, 2.0],
            vec![4.0, 0.0, 5.0],
            vec![7.0, 0.0, 0.0],
            vec![0.0, 8.0, 9.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_dense_to_csr() {
        let csr = worked_example().to_csr();
        assert_eq!(csr.indptr(), &[0, 2, 4, 5, 7]);
        assert_eq!(csr.indices(), &[1, 2, 0, 2, 0, 1, 2]);
        assert_eq!(csr.data(), &[1.0, 2.0, 4.0, 5.0, 7.0, 8.0, 9.0]);
        assert_eq!(csr.row_nnz(2), 1);
        assert_eq!(csr.nnz(), 7);
    }

    #[test]
    fn test_gather_rows_uses_local_indices() {
        let csr = worked_example().to_csr();
        let block = csr.gather_rows(&[1, 2]);
        assert_eq!(block.dimensions(), (2, 3));
        assert_eq!(block.rows(), &[0, 0, 1]);
        assert_eq!(block.cols(), &[0, 2, 0]);
        assert_eq!(block.values(), &[4.0, 5.0, 7.0]);
    }

    #[test]
    fn test_csr_validation() {
        assert!(CsrMatrix::<f32>::new(2, 2, vec![0, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::<f32>::new(1, 2, vec![1, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::<f32>::new(2, 2, vec![0, 2, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::<f32>::new(1, 2, vec![0, 1], vec![2], vec![1.0]).is_err());
        assert!(CsrMatrix::<f32>::new(1, 2, vec![0, 2], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::<f32>::new(0, 0, vec![0], vec![], vec![]).is_ok());
    }

    #[test]
    fn test_from_triplets_keeps_duplicates() {
        let csr =
            CsrMatrix::from_triplets(2, 2, &[1, 0, 1], &[1, 0, 1], &[3i32, 1, 4]).unwrap();
        assert_eq!(csr.indptr(), &[0, 1, 3]);
        assert_eq!(csr.row(1), (&[1usize, 1][..], &[3, 4][..]));
    }

    #[test]
    fn test_explicit_zero_survives_coo() {
        let csr = CsrMatrix::new(1, 2, vec![0, 2], vec![0, 1], vec![0.0f64, 2.0]).unwrap();
        assert_eq!(csr.to_coo().nnz(), 2);
    }

    #[test]
    fn test_dense_zero_width() {
        let dense = DenseMatrix::<u32>::new(3, 0, vec![]).unwrap();
        let csr = dense.to_csr();
        assert_eq!(csr.indptr(), &[0, 0, 0, 0]);
        assert_eq!(dense.to_coo().nnz(), 0);
    }
}
