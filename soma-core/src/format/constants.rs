//! Format constants and metadata keys for SOMA stores

/// Metadata key holding the object type tag
pub const SOMA_OBJECT_TYPE_METADATA_KEY: &str = "soma_object_type";

/// Metadata key holding the string-encoded encoding version
pub const SOMA_ENCODING_VERSION_METADATA_KEY: &str = "soma_encoding_version";

/// Newest encoding version this library reads and the one it writes
pub const SOMA_ENCODING_VERSION: u32 = 1;

/// Name of the value attribute on assay matrices
pub const ASSAY_MATRIX_ATTR_NAME: &str = "value";

/// Prefix for the integer dimensions of N-D arrays
pub const ND_ARRAY_DIM_PREFIX: &str = "soma_dim_";

/// Name of the value attribute on N-D arrays
pub const ND_ARRAY_ATTR_NAME: &str = "soma_data";

/// Ingestion defaults
pub mod defaults {
    /// Soft per-chunk nonzero budget
    pub const GOAL_CHUNK_NNZ: usize = 10_000_000;

    /// Zstd level applied to string dimension tiles
    pub const STRING_DIM_ZSTD_LEVEL: i32 = 3;

    /// Zstd level applied to value attribute tiles
    pub const VALUE_ZSTD_LEVEL: i32 = 3;

    /// Target cells per tile
    pub const X_CAPACITY: u64 = 100_000;

    /// Highest accepted zstd level
    pub const MAX_ZSTD_LEVEL: i32 = 22;
}

/// Fragment file constants
pub mod fragment {
    /// Magic bytes for fragment files
    pub const MAGIC: [u8; 4] = *b"SFRG";

    /// Current fragment format version
    pub const VERSION: u8 = 1;

    /// Fixed size of the fragment header
    pub const HEADER_SIZE: usize = 32;

    /// Fixed size of a tile header
    pub const TILE_HEADER_SIZE: usize = 32;
}
