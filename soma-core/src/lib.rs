//! SOMA Core - object model format definitions
//!
//! This crate provides the pure definitions shared by every SOMA store:
//! object-type tags and metadata keys, array schemas, the fragment wire
//! format, element and storage-handle traits, validation helpers and the
//! error taxonomy. It performs no I/O.

pub mod batch;
pub mod error;
pub mod format;
pub mod sort;
pub mod stats;
pub mod traits;
pub mod validation;

pub use batch::{CoordinateBatch, Coordinates, ValueBuffer};
pub use error::{ErrorCategory, Result, SomaError};
pub use format::constants::{
    SOMA_ENCODING_VERSION, SOMA_ENCODING_VERSION_METADATA_KEY, SOMA_OBJECT_TYPE_METADATA_KEY,
};
pub use format::{
    ArraySchema, Attribute, DataType, Dimension, DimensionType, Filter, FragmentHeader, Layout,
    ObjectType, StorageKind, TileHeader,
};
pub use sort::{invert_permutation, sort_and_permutation};
pub use stats::{IoStats, IoStatsSnapshot};
pub use traits::*;
pub use validation::{
    parse_encoding_version, validate_array_bounds, validate_chunk_boundaries,
    validate_label_counts, validate_zstd_level,
};
