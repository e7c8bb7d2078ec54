//! Ingestion and schema options
//!
//! Options are read-only once attached to a context. They can be built in
//! code with the `with_*` methods or loaded from JSON, where any missing field
//! takes its default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use soma_core::format::constants::defaults;
use soma_core::{validate_zstd_level, Layout, Result, SomaError};

/// Options consulted when creating and filling SOMA arrays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SomaOptions {
    /// Soft nonzero budget per ingestion chunk
    pub goal_chunk_nnz: usize,
    /// Route CSR input through the chunked ingestor
    pub write_x_chunked_if_csr: bool,
    /// Zstd level for string dimension tiles
    pub string_dim_zstd_level: i32,
    /// Target cells per tile for assay matrices
    pub x_capacity: u64,
    pub x_cell_order: Layout,
    pub x_tile_order: Layout,
}

impl Default for SomaOptions {
    fn default() -> Self {
        Self {
            goal_chunk_nnz: defaults::GOAL_CHUNK_NNZ,
            write_x_chunked_if_csr: true,
            string_dim_zstd_level: defaults::STRING_DIM_ZSTD_LEVEL,
            x_capacity: defaults::X_CAPACITY,
            x_cell_order: Layout::RowMajor,
            x_tile_order: Layout::RowMajor,
        }
    }
}

impl SomaOptions {
    /// Parse options from a JSON document and validate them
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_goal_chunk_nnz(mut self, goal_chunk_nnz: usize) -> Self {
        self.goal_chunk_nnz = goal_chunk_nnz;
        self
    }

    pub fn with_write_x_chunked_if_csr(mut self, chunked: bool) -> Self {
        self.write_x_chunked_if_csr = chunked;
        self
    }

    pub fn with_string_dim_zstd_level(mut self, level: i32) -> Self {
        self.string_dim_zstd_level = level;
        self
    }

    pub fn with_x_capacity(mut self, capacity: u64) -> Self {
        self.x_capacity = capacity;
        self
    }

    pub fn with_x_cell_order(mut self, order: Layout) -> Self {
        self.x_cell_order = order;
        self
    }

    pub fn with_x_tile_order(mut self, order: Layout) -> Self {
        self.x_tile_order = order;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.goal_chunk_nnz == 0 {
            return Err(SomaError::invalid_argument("goal_chunk_nnz must be positive"));
        }
        if self.x_capacity == 0 {
            return Err(SomaError::invalid_argument("x_capacity must be positive"));
        }
        validate_zstd_level(self.string_dim_zstd_level)
    }
}
