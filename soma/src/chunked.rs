//! Row-chunked ingestion of CSR matrices into string-dimensioned arrays
//!
//! Rows are visited in ascending row-label order and grouped into chunks whose
//! total nonzero count stays within a soft budget. Each non-empty chunk is
//! written as one fragment, so fragments cover disjoint, increasing ranges of
//! row labels and readers can skip fragments by their row-label bounds.
//!
//! A single row heavier than the budget still forms its own chunk; the budget
//! bounds memory per write, it never rejects data.

use std::time::Instant;

use soma_core::{
    sort_and_permutation, validate_chunk_boundaries, validate_label_counts, ArrayHandle,
    CoordinateBatch, MatrixElement, Result, SomaError, SparseMatrix,
};
use tracing::{debug, info};

use crate::matrix::{CooMatrix, CsrMatrix, SourceMatrix};

/// A contiguous run of sorted row positions `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChunk {
    pub start: usize,
    pub end: usize,
    /// Stored entries across the chunk's rows
    pub nnz: usize,
}

impl RowChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// What an ingestion run wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Chunks visited, including empty ones
    pub chunks: usize,
    /// Chunks skipped because they held no entries
    pub empty_chunks: usize,
    /// Fragments written
    pub fragments: usize,
    /// Cells written
    pub nnz: usize,
}

fn chunk_extent<M: SparseMatrix + ?Sized>(
    matrix: &M,
    permutation: &[usize],
    start: usize,
    nnz_budget: usize,
) -> (usize, usize) {
    let mut size = 0;
    let mut total = 0;
    for &row in &permutation[start..] {
        let row_nnz = matrix.row_nnz(row);
        if size > 0 && total + row_nnz > nnz_budget {
            break;
        }
        total += row_nnz;
        size += 1;
    }
    (size, total)
}

/// Number of permuted rows, starting at `start_index`, that fit the budget
///
/// Walks `permutation[start_index..]` summing each physical row's stored
/// entries and stops before the running total would exceed `nnz_budget`. The
/// result is always at least 1 and at most `n_rows - start_index`.
/// `permutation` must name every row exactly once.
pub fn select_chunk_size<M: SparseMatrix + ?Sized>(
    matrix: &M,
    permutation: &[usize],
    start_index: usize,
    nnz_budget: usize,
) -> Result<usize> {
    check_permutation(matrix, permutation, nnz_budget)?;
    if start_index >= permutation.len() {
        return Err(SomaError::invalid_argument(format!(
            "start index {start_index} out of range for {} rows",
            permutation.len()
        )));
    }
    Ok(chunk_extent(matrix, permutation, start_index, nnz_budget).0)
}

fn check_permutation<M: SparseMatrix + ?Sized>(
    matrix: &M,
    permutation: &[usize],
    nnz_budget: usize,
) -> Result<()> {
    if nnz_budget == 0 {
        return Err(SomaError::invalid_argument("nnz budget must be positive"));
    }
    if permutation.len() != matrix.n_rows() {
        return Err(SomaError::invalid_argument(format!(
            "permutation has {} entries for {} rows",
            permutation.len(),
            matrix.n_rows()
        )));
    }
    let mut seen = vec![false; permutation.len()];
    for &row in permutation {
        match seen.get_mut(row) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(SomaError::invalid_argument(format!(
                    "permutation entry {row} is out of range or repeated"
                )))
            }
        }
    }
    Ok(())
}

/// Iterator over the budgeted chunks of a permuted matrix
///
/// Chunks are contiguous, non-overlapping and together cover every row.
pub struct RowChunks<'a, M: SparseMatrix + ?Sized> {
    matrix: &'a M,
    permutation: &'a [usize],
    nnz_budget: usize,
    cursor: usize,
}

impl<'a, M: SparseMatrix + ?Sized> RowChunks<'a, M> {
    pub fn new(matrix: &'a M, permutation: &'a [usize], nnz_budget: usize) -> Result<Self> {
        check_permutation(matrix, permutation, nnz_budget)?;
        Ok(Self {
            matrix,
            permutation,
            nnz_budget,
            cursor: 0,
        })
    }
}

impl<M: SparseMatrix + ?Sized> Iterator for RowChunks<'_, M> {
    type Item = RowChunk;

    fn next(&mut self) -> Option<RowChunk> {
        if self.cursor >= self.permutation.len() {
            return None;
        }
        let (size, nnz) =
            chunk_extent(self.matrix, self.permutation, self.cursor, self.nnz_budget);
        let chunk = RowChunk {
            start: self.cursor,
            end: self.cursor + size,
            nnz,
        };
        self.cursor = chunk.end;
        Some(chunk)
    }
}

fn coo_batch<'a, T, C>(
    block: CooMatrix<T>,
    row_label: impl Fn(usize) -> &'a str,
    col_labels: &'a [C],
) -> Result<CoordinateBatch<'a>>
where
    T: MatrixElement,
    C: AsRef<str>,
{
    let dim0 = block.rows().iter().map(|&r| row_label(r)).collect();
    let dim1 = block.cols().iter().map(|&c| col_labels[c].as_ref()).collect();
    CoordinateBatch::new(dim0, dim1, T::into_buffer(block.into_values()))
}

/// Write a CSR matrix through `handle` in row-label-sorted chunks
///
/// Label counts are checked before anything is written. Empty chunks are
/// skipped. Duplicate coordinates and explicitly stored zeros are written
/// as-is.
pub fn ingest_rows_chunked<T, R, C>(
    handle: &mut dyn ArrayHandle,
    matrix: &CsrMatrix<T>,
    row_labels: &[R],
    col_labels: &[C],
    nnz_budget: usize,
) -> Result<IngestSummary>
where
    T: MatrixElement,
    R: AsRef<str>,
    C: AsRef<str>,
{
    validate_label_counts(matrix.dimensions(), row_labels.len(), col_labels.len())?;
    let n_rows = matrix.n_rows();
    let (sorted, permutation) = sort_and_permutation(row_labels);
    let chunks = RowChunks::new(matrix, &permutation, nnz_budget)?;

    let started = Instant::now();
    info!(
        uri = handle.uri(),
        rows = n_rows,
        nnz = matrix.nnz(),
        nnz_budget,
        "START ingest rows chunked"
    );

    let mut summary = IngestSummary::default();
    for chunk in chunks {
        validate_chunk_boundaries(chunk.start, chunk.end, n_rows)?;
        summary.chunks += 1;

        if chunk.nnz == 0 {
            summary.empty_chunks += 1;
            debug!(start = chunk.start, end = chunk.end, "skip empty chunk");
            continue;
        }

        let block = matrix.gather_rows(&permutation[chunk.start..chunk.end]);
        let chunk_labels = &sorted[chunk.start..chunk.end];
        let batch = coo_batch(block, move |r| chunk_labels[r], col_labels)?;

        debug!(
            start = chunk.start,
            end = chunk.end,
            first = sorted[chunk.start],
            last = sorted[chunk.end - 1],
            nnz = batch.len(),
            percent = 100.0 * chunk.end as f64 / n_rows as f64,
            "write chunk"
        );
        handle.write(&batch)?;
        summary.fragments += 1;
        summary.nnz += batch.len();
    }

    info!(
        uri = handle.uri(),
        chunks = summary.chunks,
        fragments = summary.fragments,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "FINISH ingest rows chunked"
    );
    Ok(summary)
}

/// Write an entire matrix through `handle` as a single fragment
///
/// Dense input contributes only its nonzero entries. A matrix with no entries
/// writes nothing.
pub fn ingest_whole<T, R, C>(
    handle: &mut dyn ArrayHandle,
    matrix: &SourceMatrix<T>,
    row_labels: &[R],
    col_labels: &[C],
) -> Result<IngestSummary>
where
    T: MatrixElement,
    R: AsRef<str>,
    C: AsRef<str>,
{
    validate_label_counts(matrix.dimensions(), row_labels.len(), col_labels.len())?;

    let started = Instant::now();
    info!(uri = handle.uri(), "START ingest whole");

    let coo = matrix.to_coo();
    let mut summary = IngestSummary {
        chunks: 1,
        ..IngestSummary::default()
    };
    if coo.nnz() == 0 {
        summary.empty_chunks = 1;
        debug!("skip empty matrix");
    } else {
        let batch = coo_batch(coo, move |r| row_labels[r].as_ref(), col_labels)?;
        handle.write(&batch)?;
        summary.fragments = 1;
        summary.nnz = batch.len();
    }

    info!(
        uri = handle.uri(),
        nnz = summary.nnz,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "FINISH ingest whole"
    );
    Ok(summary)
}
