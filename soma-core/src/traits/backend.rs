//! Storage engine and handle traits
//!
//! The object model and the ingestors consume exactly this surface: probe a
//! location, create an array or group, open a scoped handle, read/write
//! metadata, write coordinate batches and read every cell back. Engines are
//! free to implement it over memory, local files or anything else.
//!
//! Handles are scoped resources. Dropping a handle releases it; engines must
//! not require an explicit close for correctness.

use crate::batch::{CoordinateBatch, Coordinates};
use crate::format::{ArraySchema, StorageKind};
use crate::Result;

pub use crate::stats::IoStats;

/// How a handle is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// Summary of one persisted fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentInfo {
    /// Cells in the fragment
    pub cell_count: u64,
    /// Smallest dim0 label in the fragment
    pub dim0_min: String,
    /// Largest dim0 label in the fragment
    pub dim0_max: String,
}

/// Key/value metadata attached to an array or group
pub trait MetadataStore {
    /// Fetch a metadata value; `Ok(None)` when the key is absent
    fn metadata_get(&self, key: &str) -> Result<Option<String>>;

    /// Store a metadata value; requires a handle opened for writing
    fn metadata_set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Open session on an array
pub trait ArrayHandle: MetadataStore {
    /// Location this handle was opened on
    fn uri(&self) -> &str;

    fn mode(&self) -> OpenMode;

    /// Schema the array was created with
    fn schema(&self) -> &ArraySchema;

    /// Persist one batch as a single fragment
    ///
    /// Requires a handle opened for writing. The value column type must match
    /// the schema's value attribute.
    fn write(&mut self, batch: &CoordinateBatch<'_>) -> Result<()>;

    /// Every cell in the array, ordered by the schema's cell order
    ///
    /// Cells with equal coordinates keep their write order.
    fn read_all(&self) -> Result<Coordinates>;

    /// Fragments in the order they were written
    fn fragments(&self) -> Result<Vec<FragmentInfo>>;
}

/// Open session on a group
pub trait GroupHandle: MetadataStore {
    fn uri(&self) -> &str;

    fn mode(&self) -> OpenMode;

    /// Names of direct children, sorted
    fn members(&self) -> Result<Vec<String>>;
}

/// A store of arrays and groups addressed by URI
pub trait StorageEngine: core::fmt::Debug + Send + Sync {
    /// What is stored at `uri`, or `None` if nothing recognizable is
    fn probe(&self, uri: &str) -> Result<Option<StorageKind>>;

    /// Create an empty array; fails if anything already exists at `uri`
    fn create_array(&self, uri: &str, schema: &ArraySchema) -> Result<()>;

    /// Create an empty group; fails if anything already exists at `uri`
    fn create_group(&self, uri: &str) -> Result<()>;

    fn open_array<'a>(&'a self, uri: &str, mode: OpenMode) -> Result<Box<dyn ArrayHandle + 'a>>;

    fn open_group<'a>(&'a self, uri: &str, mode: OpenMode) -> Result<Box<dyn GroupHandle + 'a>>;

    /// Delete the object at `uri` and everything beneath it
    fn remove(&self, uri: &str) -> Result<()>;

    /// I/O counters for this engine
    fn stats(&self) -> &IoStats;

    /// Join a child name onto a parent location
    fn join(&self, parent: &str, child: &str) -> String {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    }
}
