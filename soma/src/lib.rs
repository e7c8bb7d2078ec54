//! SOMA - typed single-cell object model over array stores
//!
//! Objects (collections, experiments, measurements, data frames and N-D
//! arrays) live at URIs inside a [`StorageEngine`] and are recognized by the
//! type tag and encoding version stamped into their metadata.
//!
//! ## Architecture
//!
//! - **soma-core**: tags, schemas, fragment format, traits and validation (no I/O)
//! - **soma**: typed wrappers, the object factory, chunked ingestion and
//!   concrete storage engines
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use soma::{CsrMatrix, Experiment, MemoryStorage, SomaContext, SomaOptions, SourceMatrix};
//!
//! fn example() -> soma::Result<()> {
//!     let ctx = SomaContext::new(Arc::new(MemoryStorage::new()))
//!         .with_options(SomaOptions::default().with_goal_chunk_nnz(2))?;
//!
//!     let exp = Experiment::new("pbmc", &ctx);
//!     exp.create()?;
//!     let rna = exp.add_measurement("RNA")?;
//!
//!     let x = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![1, 0], vec![3.0f32, 4.0])?;
//!     let data = rna.assay_matrix("data", "obs_id", "var_id");
//!     data.from_matrix(&SourceMatrix::from(x), &["cell_b", "cell_a"], &["g1", "g2"])?;
//!
//!     assert!(rna.member("data")?.is_some());
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! ## Features
//!
//! - **fs** (default): directory-backed [`FsStorage`] with memory-mapped,
//!   zstd-compressed fragments

pub use soma_core::{
    // Core traits
    ArrayHandle, GroupHandle, MatrixElement, MetadataStore, SparseMatrix, StorageEngine,
    // Format definitions
    ArraySchema, Attribute, DataType, Dimension, DimensionType, Filter, Layout, ObjectType,
    OpenMode, StorageKind,
    // Coordinates
    CoordinateBatch, Coordinates, FragmentInfo, ValueBuffer,
    // Error handling
    ErrorCategory, Result, SomaError,
    // Label ordering
    invert_permutation, sort_and_permutation,
    // Observability
    IoStats, IoStatsSnapshot,
    // Constants
    SOMA_ENCODING_VERSION, SOMA_ENCODING_VERSION_METADATA_KEY, SOMA_OBJECT_TYPE_METADATA_KEY,
};

pub mod assay_matrix;
pub mod chunked;
pub mod collection;
pub mod context;
pub mod dataframe;
pub mod factory;
pub mod matrix;
pub mod metadata;
pub mod ndarray;
pub mod object;
pub mod options;
pub mod storage;

pub use assay_matrix::AssayMatrix;
pub use chunked::{
    ingest_rows_chunked, ingest_whole, select_chunk_size, IngestSummary, RowChunk, RowChunks,
};
pub use collection::{Collection, Experiment, Measurement};
pub use context::{Lineage, SomaContext};
pub use dataframe::DataFrame;
pub use factory::{classify, construct_member, SomaObject};
pub use matrix::{CooMatrix, CsrMatrix, DenseMatrix, SourceMatrix};
pub use metadata::{stamp_object_metadata, LabelIndex, ObjectMetadata};
pub use ndarray::{DenseNdArray, SparseNdArray};
pub use object::{ObjectInfo, TypedObject};
pub use options::SomaOptions;
#[cfg(feature = "fs")]
pub use storage::FsStorage;
pub use storage::MemoryStorage;
