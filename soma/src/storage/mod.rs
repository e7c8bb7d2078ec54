//! Storage engines
//!
//! [`MemoryStorage`] keeps everything in process and is what the tests and
//! the factory examples run against. [`FsStorage`] persists arrays as
//! directories of tiled, filtered fragment files and reads them back through
//! memory maps.

mod memory;

#[cfg(feature = "fs")]
mod codec;
#[cfg(feature = "fs")]
mod fs;

pub use memory::MemoryStorage;

#[cfg(feature = "fs")]
pub use fs::FsStorage;

use std::cmp::Ordering;

use soma_core::{
    ArraySchema, CoordinateBatch, Coordinates, FragmentInfo, Layout, OpenMode, Result, SomaError,
};

pub(crate) fn require_write(uri: &str, mode: OpenMode) -> Result<()> {
    if mode != OpenMode::Write {
        return Err(SomaError::storage(format!("{uri} is not open for writing")));
    }
    Ok(())
}

/// Reject batches the schema cannot hold
pub(crate) fn check_batch(uri: &str, schema: &ArraySchema, batch: &CoordinateBatch<'_>) -> Result<()> {
    if !schema.is_string_matrix() {
        return Err(SomaError::storage(format!(
            "{uri} does not accept string coordinate writes"
        )));
    }
    let expected = schema.value_attribute().data_type;
    if batch.values.data_type() != expected {
        return Err(SomaError::storage(format!(
            "{uri} stores {expected} values, batch holds {}",
            batch.values.data_type()
        )));
    }
    Ok(())
}

fn compare_cells(dim0: &[String], dim1: &[String], layout: Layout, a: usize, b: usize) -> Ordering {
    match layout {
        Layout::RowMajor => dim0[a].cmp(&dim0[b]).then_with(|| dim1[a].cmp(&dim1[b])),
        Layout::ColMajor => dim1[a].cmp(&dim1[b]).then_with(|| dim0[a].cmp(&dim0[b])),
    }
}

/// Stable sort of cells by `layout`; equal coordinates keep their order
pub(crate) fn sort_cells(cells: Coordinates, layout: Layout) -> Coordinates {
    let mut order: Vec<usize> = (0..cells.len()).collect();
    order.sort_by(|&a, &b| compare_cells(&cells.dim0, &cells.dim1, layout, a, b));
    if order.iter().enumerate().all(|(k, &i)| k == i) {
        return cells;
    }
    cells.gather(&order)
}

/// Owned, cell-ordered copy of a batch
pub(crate) fn batch_cells(batch: &CoordinateBatch<'_>, layout: Layout) -> Result<Coordinates> {
    let mut cells = Coordinates::empty(batch.values.data_type());
    cells.extend_from_batch(batch)?;
    Ok(sort_cells(cells, layout))
}

pub(crate) fn fragment_info(cells: &Coordinates) -> FragmentInfo {
    FragmentInfo {
        cell_count: cells.len() as u64,
        dim0_min: cells.dim0.iter().min().cloned().unwrap_or_default(),
        dim0_max: cells.dim0.iter().max().cloned().unwrap_or_default(),
    }
}

/// Bytes a cell set occupies before filtering
pub(crate) fn raw_size(cells: &Coordinates) -> u64 {
    let labels: usize = cells.dim0.iter().chain(&cells.dim1).map(String::len).sum();
    (labels + cells.values.as_bytes().len()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use soma_core::ValueBuffer;

    fn cells(dim0: &[&str], dim1: &[&str], values: Vec<i32>) -> Coordinates {
        Coordinates {
            dim0: dim0.iter().map(|s| s.to_string()).collect(),
            dim1: dim1.iter().map(|s| s.to_string()).collect(),
            values: ValueBuffer::I32(values),
        }
    }

    #[test]
    fn test_sort_row_major_is_stable() {
        let sorted = sort_cells(
            cells(&["b", "a", "b", "a"], &["x", "y", "x", "x"], vec![1, 2, 3, 4]),
            Layout::RowMajor,
        );
        assert_eq!(sorted.dim0, vec!["a", "a", "b", "b"]);
        assert_eq!(sorted.dim1, vec!["x", "y", "x", "x"]);
        assert_eq!(sorted.values, ValueBuffer::I32(vec![4, 2, 1, 3]));
    }

    #[test]
    fn test_sort_col_major() {
        let sorted = sort_cells(
            cells(&["a", "b", "a"], &["y", "x", "x"], vec![1, 2, 3]),
            Layout::ColMajor,
        );
        assert_eq!(sorted.dim1, vec!["x", "x", "y"]);
        assert_eq!(sorted.dim0, vec!["a", "b", "a"]);
        assert_eq!(sorted.values, ValueBuffer::I32(vec![3, 2, 1]));
    }

    #[test]
    fn test_fragment_info() {
        let info = fragment_info(&cells(&["m", "c", "q"], &["x", "x", "x"], vec![1, 2, 3]));
        assert_eq!(info.cell_count, 3);
        assert_eq!(info.dim0_min, "c");
        assert_eq!(info.dim0_max, "q");
    }
}
