//! Abstract interfaces for SOMA stores
//!
//! This module defines all trait abstractions used across the workspace.
//! Traits are pure interfaces - no concrete implementations.

pub mod backend;
pub mod element;
pub mod matrix;

pub use backend::{
    ArrayHandle, FragmentInfo, GroupHandle, IoStats, MetadataStore, OpenMode, StorageEngine,
};
pub use element::MatrixElement;
pub use matrix::SparseMatrix;
