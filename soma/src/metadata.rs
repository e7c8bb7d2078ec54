//! Object metadata and label lookup
//!
//! Every SOMA object carries two metadata entries: its type tag and the
//! encoding version it was written with. This module reads and stamps them,
//! and provides the O(1) label-to-index map used when reading matrices back.

use hashbrown::HashMap;
use soma_core::{
    MetadataStore, ObjectType, Result, SomaError, SOMA_ENCODING_VERSION,
    SOMA_ENCODING_VERSION_METADATA_KEY, SOMA_OBJECT_TYPE_METADATA_KEY,
};

/// Raw classification metadata as stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub object_type: Option<String>,
    pub encoding_version: Option<String>,
}

impl ObjectMetadata {
    pub fn read<S: MetadataStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self {
            object_type: store.metadata_get(SOMA_OBJECT_TYPE_METADATA_KEY)?,
            encoding_version: store.metadata_get(SOMA_ENCODING_VERSION_METADATA_KEY)?,
        })
    }
}

/// Record `object_type` and the current encoding version on a store
pub fn stamp_object_metadata<S: MetadataStore + ?Sized>(
    store: &mut S,
    object_type: ObjectType,
) -> Result<()> {
    store.metadata_set(SOMA_OBJECT_TYPE_METADATA_KEY, object_type.tag())?;
    store.metadata_set(
        SOMA_ENCODING_VERSION_METADATA_KEY,
        &SOMA_ENCODING_VERSION.to_string(),
    )
}

/// Label to position map for one axis
#[derive(Debug, Clone)]
pub struct LabelIndex<'a> {
    axis: &'static str,
    positions: HashMap<&'a str, usize>,
}

impl<'a> LabelIndex<'a> {
    /// Index `labels`; a repeated label maps to its first position
    pub fn new<S: AsRef<str>>(axis: &'static str, labels: &'a [S]) -> Self {
        let mut positions = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            positions.entry(label.as_ref()).or_insert(i);
        }
        Self { axis, positions }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Position of `label`, or an error naming the axis
    pub fn position(&self, label: &str) -> Result<usize> {
        self.get(label).ok_or_else(|| SomaError::UnknownLabel {
            axis: self.axis,
            label: label.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
