//! Shared context and lineage
//!
//! A [`SomaContext`] bundles the storage engine with the options that steer
//! array creation and ingestion. Cloning a context is cheap and every object
//! built from it shares the same engine.

use std::sync::Arc;

use soma_core::{Result, StorageEngine};

use crate::options::SomaOptions;

/// Storage engine plus options, shared by every object
#[derive(Debug, Clone)]
pub struct SomaContext {
    options: Arc<SomaOptions>,
    storage: Arc<dyn StorageEngine>,
}

impl SomaContext {
    /// Context with default options
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self {
            options: Arc::new(SomaOptions::default()),
            storage,
        }
    }

    /// Replace the options, validating them first
    pub fn with_options(mut self, options: SomaOptions) -> Result<Self> {
        options.validate()?;
        self.options = Arc::new(options);
        Ok(self)
    }

    pub fn options(&self) -> &SomaOptions {
        &self.options
    }

    pub fn storage(&self) -> &dyn StorageEngine {
        self.storage.as_ref()
    }
}

/// Naming information copied from a parent into its children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    /// Slash-joined names from the root object down
    pub nested_name: String,
    /// Zero for a root object
    pub depth: usize,
}
