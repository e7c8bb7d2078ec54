//! Persisted format definitions for SOMA stores
//!
//! Object-type tags, array schemas and the fragment wire format. Pure data
//! structure definitions with validation, no I/O.

pub mod constants;
pub mod header;
pub mod metadata;
pub mod schema;

pub use header::{FragmentHeader, TileHeader};
pub use metadata::{ObjectType, StorageKind};
pub use schema::{ArraySchema, Attribute, DataType, Dimension, DimensionType, Filter, Layout};
