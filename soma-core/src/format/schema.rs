//! Array schema definitions
//!
//! Describes dimensions, the value attribute, physical layout and the
//! per-column filter pipelines a storage engine applies to tiles.

use core::fmt;

use crate::{Result, SomaError};

/// Numeric attribute types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum DataType {
    /// 32-bit floating point
    F32 = 0,
    /// 64-bit floating point
    F64 = 1,
    /// 32-bit signed integer
    I32 = 2,
    /// 64-bit signed integer
    I64 = 3,
    /// 32-bit unsigned integer
    U32 = 4,
    /// 64-bit unsigned integer
    U64 = 5,
}

impl DataType {
    /// Convert from u8 representation
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::F32),
            1 => Some(DataType::F64),
            2 => Some(DataType::I32),
            3 => Some(DataType::I64),
            4 => Some(DataType::U32),
            5 => Some(DataType::U64),
            _ => None,
        }
    }

    /// Convert to u8 representation
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the size in bytes for this data type
    pub const fn size_bytes(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::F32 => write!(f, "f32"),
            DataType::F64 => write!(f, "f64"),
            DataType::I32 => write!(f, "i32"),
            DataType::I64 => write!(f, "i64"),
            DataType::U32 => write!(f, "u32"),
            DataType::U64 => write!(f, "u64"),
        }
    }
}

/// Cell or tile ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Layout {
    #[default]
    RowMajor,
    ColMajor,
}

/// Column filter applied to tile data, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum Filter {
    /// Run-length encoding of repeated string values
    Rle,
    /// Zstandard compression at the given level
    Zstd { level: i32 },
}

/// Dimension coordinate types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum DimensionType {
    /// Variable-length ASCII strings with an unbounded domain
    Ascii,
    /// Signed integer coordinates in the inclusive domain `[lo, hi]`
    Int64 { lo: i64, hi: i64 },
}

/// One array dimension
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimension {
    pub name: String,
    pub dim_type: DimensionType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub filters: Vec<Filter>,
}

impl Dimension {
    /// Unbounded string dimension
    pub fn ascii(name: impl Into<String>, filters: Vec<Filter>) -> Self {
        Self {
            name: name.into(),
            dim_type: DimensionType::Ascii,
            filters,
        }
    }

    /// Integer dimension over `[lo, hi]`
    pub fn int64(name: impl Into<String>, lo: i64, hi: i64) -> Self {
        Self {
            name: name.into(),
            dim_type: DimensionType::Int64 { lo, hi },
            filters: Vec::new(),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self.dim_type, DimensionType::Ascii)
    }
}

/// Value attribute
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub filters: Vec<Filter>,
}

/// Complete array schema
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArraySchema {
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<Attribute>,
    pub sparse: bool,
    pub allows_duplicates: bool,
    /// Target cell count per tile
    pub capacity: u64,
    pub cell_order: Layout,
    pub tile_order: Layout,
}

fn check_filter(filter: &Filter, column: &str, is_string: bool) -> Result<()> {
    match *filter {
        Filter::Rle if !is_string => Err(SomaError::invalid_argument(format!(
            "rle filter on {column} requires a string column"
        ))),
        Filter::Zstd { level } => crate::validation::validate_zstd_level(level),
        Filter::Rle => Ok(()),
    }
}

impl ArraySchema {
    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.is_empty() {
            return Err(SomaError::invalid_argument("schema has no dimensions"));
        }
        if self.attributes.is_empty() {
            return Err(SomaError::invalid_argument("schema has no attributes"));
        }
        if self.capacity == 0 {
            return Err(SomaError::invalid_argument("schema capacity must be positive"));
        }
        for dim in &self.dimensions {
            if let DimensionType::Int64 { lo, hi } = dim.dim_type {
                if lo > hi {
                    return Err(SomaError::invalid_argument(format!(
                        "dimension {} has empty domain [{lo}, {hi}]",
                        dim.name
                    )));
                }
            }
            for filter in &dim.filters {
                check_filter(filter, &dim.name, dim.is_string())?;
            }
            if !self.sparse && dim.is_string() {
                return Err(SomaError::invalid_argument(format!(
                    "dense arrays cannot have string dimension {}",
                    dim.name
                )));
            }
        }
        for attr in &self.attributes {
            for filter in &attr.filters {
                check_filter(filter, &attr.name, false)?;
            }
        }
        let mut names: Vec<&str> = self
            .dimensions
            .iter()
            .map(|d| d.name.as_str())
            .chain(self.attributes.iter().map(|a| a.name.as_str()))
            .collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(SomaError::invalid_argument(
                "dimension and attribute names must be unique",
            ));
        }
        Ok(())
    }

    /// True when the schema is two string dimensions over one attribute
    pub fn is_string_matrix(&self) -> bool {
        self.sparse
            && self.dimensions.len() == 2
            && self.dimensions.iter().all(Dimension::is_string)
            && self.attributes.len() == 1
    }

    /// The first attribute, which carries cell values
    pub fn value_attribute(&self) -> &Attribute {
        &self.attributes[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_schema() -> ArraySchema {
        ArraySchema {
            dimensions: vec![
                Dimension::ascii("obs_id", vec![Filter::Rle]),
                Dimension::ascii("var_id", vec![Filter::Zstd { level: 3 }]),
            ],
            attributes: vec![Attribute {
                name: "value".into(),
                data_type: DataType::F32,
                filters: vec![Filter::Zstd { level: 3 }],
            }],
            sparse: true,
            allows_duplicates: true,
            capacity: 100_000,
            cell_order: Layout::RowMajor,
            tile_order: Layout::RowMajor,
        }
    }

    #[test]
    fn test_validate_matrix_schema() {
        let schema = matrix_schema();
        assert!(schema.validate().is_ok());
        assert!(schema.is_string_matrix());
        assert_eq!(schema.value_attribute().data_type, DataType::F32);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_zero_capacity() {
        let mut schema = matrix_schema();
        schema.dimensions[1].name = "obs_id".into();
        assert!(schema.validate().is_err());

        let mut schema = matrix_schema();
        schema.capacity = 0;
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_dense_string_dims_rejected() {
        let mut schema = matrix_schema();
        schema.sparse = false;
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_filter_checks() {
        let mut schema = matrix_schema();
        schema.attributes[0].filters = vec![Filter::Rle];
        assert!(schema.validate().is_err());

        let mut schema = matrix_schema();
        schema.dimensions[1].filters = vec![Filter::Zstd { level: 40 }];
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_data_type_u8() {
        for v in 0..6u8 {
            assert_eq!(DataType::from_u8(v).map(DataType::to_u8), Some(v));
        }
        assert_eq!(DataType::from_u8(6), None);
        assert_eq!(DataType::F64.size_bytes(), 8);
    }
}
