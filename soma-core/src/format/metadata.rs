//! Object-type metadata definitions
//!
//! Every persisted SOMA object carries a type tag naming which typed wrapper
//! it represents. The set of tags is closed; each tag maps to exactly one
//! [`ObjectType`] and each object type is valid on exactly one
//! [`StorageKind`].

use core::fmt;

/// Physical shape of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StorageKind {
    /// A multi-dimensional array with fragments
    Array,
    /// A group of named members
    Group,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Array => write!(f, "array"),
            StorageKind::Group => write!(f, "group"),
        }
    }
}

/// Recognized object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Collection,
    Experiment,
    Measurement,
    DataFrame,
    DenseNdArray,
    SparseNdArray,
}

impl ObjectType {
    /// Every recognized type, in tag order
    pub const ALL: [ObjectType; 6] = [
        ObjectType::Collection,
        ObjectType::Experiment,
        ObjectType::Measurement,
        ObjectType::DataFrame,
        ObjectType::DenseNdArray,
        ObjectType::SparseNdArray,
    ];

    /// Tag persisted under the object-type metadata key
    pub const fn tag(self) -> &'static str {
        match self {
            ObjectType::Collection => "SOMACollection",
            ObjectType::Experiment => "SOMAExperiment",
            ObjectType::Measurement => "SOMAMeasurement",
            ObjectType::DataFrame => "SOMADataFrame",
            ObjectType::DenseNdArray => "SOMADenseNDArray",
            ObjectType::SparseNdArray => "SOMASparseNDArray",
        }
    }

    /// Exact, case-sensitive tag lookup
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Storage kind this type must be persisted as
    pub const fn storage_kind(self) -> StorageKind {
        match self {
            ObjectType::Collection | ObjectType::Experiment | ObjectType::Measurement => {
                StorageKind::Group
            }
            ObjectType::DataFrame | ObjectType::DenseNdArray | ObjectType::SparseNdArray => {
                StorageKind::Array
            }
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
