//! Label and byte-array bounds validation
//!
//! Mathematical checks performed before any mutation, so that a failure
//! never leaves partial state behind.

use crate::{Result, SomaError};

/// Check that label sequences match the matrix shape
pub fn validate_label_counts(
    dimensions: (usize, usize),
    row_labels: usize,
    col_labels: usize,
) -> Result<()> {
    let (n_rows, n_cols) = dimensions;
    if row_labels != n_rows {
        return Err(SomaError::DimensionMismatch {
            axis: "row",
            labels: row_labels,
            expected: n_rows,
        });
    }
    if col_labels != n_cols {
        return Err(SomaError::DimensionMismatch {
            axis: "column",
            labels: col_labels,
            expected: n_cols,
        });
    }
    Ok(())
}

/// Validate that `byte_len` bytes hold a whole number of `T`
///
/// Returns the element count.
pub fn validate_array_bounds<T>(byte_len: usize) -> Result<usize> {
    let element_size = core::mem::size_of::<T>();

    if byte_len % element_size != 0 {
        return Err(SomaError::InvalidFragment("array size not aligned to element size"));
    }

    let count = byte_len / element_size;

    // Reject anything that could overflow downstream offset arithmetic
    if count > usize::MAX / 8 {
        return Err(SomaError::InvalidFragment("array size overflow"));
    }

    Ok(count)
}
