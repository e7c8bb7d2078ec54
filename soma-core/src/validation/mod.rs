//! Input validation utilities
//!
//! Pure validation functions with no I/O dependencies: label/dimension
//! agreement, byte-array bounds, chunk boundaries and metadata parsing.

pub mod bounds;
pub mod format;
pub mod parsing;

pub use bounds::{validate_array_bounds, validate_label_counts};
pub use format::{validate_chunk_boundaries, validate_zstd_level};
pub use parsing::parse_encoding_version;
