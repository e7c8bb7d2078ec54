//! Format-level constraint checks

use crate::format::constants::defaults::MAX_ZSTD_LEVEL;
use crate::{Result, SomaError};

/// Validate chunk boundary constraints
///
/// Ensures `start <= end <= total_size`.
pub fn validate_chunk_boundaries(start: usize, end: usize, total_size: usize) -> Result<()> {
    if start > end {
        return Err(SomaError::invalid_argument(format!(
            "chunk start {start} is past chunk end {end}"
        )));
    }
    if end > total_size {
        return Err(SomaError::invalid_argument(format!(
            "chunk end {end} is past row count {total_size}"
        )));
    }
    Ok(())
}

/// Validate a zstd compression level
pub fn validate_zstd_level(level: i32) -> Result<()> {
    if !(1..=MAX_ZSTD_LEVEL).contains(&level) {
        return Err(SomaError::invalid_argument(format!(
            "zstd level {level} outside 1..={MAX_ZSTD_LEVEL}"
        )));
    }
    Ok(())
}
