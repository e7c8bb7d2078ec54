//! Integer-indexed N-dimensional arrays

use soma_core::format::constants::{ND_ARRAY_ATTR_NAME, ND_ARRAY_DIM_PREFIX};
use soma_core::{
    ArraySchema, Attribute, DataType, Dimension, DimensionType, ObjectType, Result, SomaError,
};

use crate::assay_matrix::AssayMatrix;
use crate::context::{Lineage, SomaContext};
use crate::object::{ObjectInfo, TypedObject};

/// Schema with dimensions `soma_dim_0..` over `[0, shape[i])`
fn nd_schema(shape: &[u64], data_type: DataType, sparse: bool, capacity: u64) -> Result<ArraySchema> {
    if shape.is_empty() {
        return Err(SomaError::invalid_argument("shape must have at least one dimension"));
    }
    let dimensions = shape
        .iter()
        .enumerate()
        .map(|(i, &extent)| {
            let hi = extent
                .checked_sub(1)
                .and_then(|hi| i64::try_from(hi).ok())
                .ok_or_else(|| {
                    SomaError::invalid_argument(format!("dimension {i} has invalid extent {extent}"))
                })?;
            Ok(Dimension::int64(format!("{ND_ARRAY_DIM_PREFIX}{i}"), 0, hi))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ArraySchema {
        dimensions,
        attributes: vec![Attribute {
            name: ND_ARRAY_ATTR_NAME.to_string(),
            data_type,
            filters: Vec::new(),
        }],
        sparse,
        allows_duplicates: false,
        capacity,
        cell_order: Default::default(),
        tile_order: Default::default(),
    })
}

/// Extents recorded in an N-D schema
fn schema_shape(schema: &ArraySchema) -> Result<Vec<u64>> {
    schema
        .dimensions
        .iter()
        .map(|dim| match dim.dim_type {
            DimensionType::Int64 { lo: 0, hi } if hi >= 0 => Ok(hi as u64 + 1),
            _ => Err(SomaError::storage(format!(
                "dimension {} is not a zero-based integer dimension",
                dim.name
            ))),
        })
        .collect()
}

macro_rules! nd_array {
    ($(#[$doc:meta])* $name:ident, $object_type:expr, sparse = $sparse:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            info: ObjectInfo,
        }

        impl $name {
            pub fn new(uri: &str, ctx: &SomaContext) -> Self {
                Self::from_info(ObjectInfo::new(uri, None, ctx, None))
            }

            pub fn with_parent(
                uri: &str,
                name: Option<&str>,
                ctx: &SomaContext,
                parent: &Lineage,
            ) -> Self {
                Self::from_info(ObjectInfo::new(uri, name, ctx, Some(parent)))
            }

            pub(crate) fn from_info(info: ObjectInfo) -> Self {
                Self { info }
            }

            /// Create the array with one integer dimension per `shape` entry
            pub fn create(&self, shape: &[u64], data_type: DataType) -> Result<()> {
                let capacity = self.info.context().options().x_capacity;
                let schema = nd_schema(shape, data_type, $sparse, capacity)?;
                self.info.create_array_as(&schema, Self::OBJECT_TYPE)
            }

            pub fn schema(&self) -> Result<ArraySchema> {
                self.info.array_schema()
            }

            /// Extent of each dimension
            pub fn shape(&self) -> Result<Vec<u64>> {
                schema_shape(&self.schema()?)
            }
        }

        impl TypedObject for $name {
            const OBJECT_TYPE: ObjectType = $object_type;

            fn info(&self) -> &ObjectInfo {
                &self.info
            }
        }
    };
}

nd_array!(
    /// Dense array over integer coordinates
    DenseNdArray,
    ObjectType::DenseNdArray,
    sparse = false
);

nd_array!(
    /// Sparse array; also the stored type of assay matrices
    SparseNdArray,
    ObjectType::SparseNdArray,
    sparse = true
);

impl SparseNdArray {
    /// View this array as an assay matrix when it has two string dimensions
    pub fn as_assay_matrix(&self) -> Result<AssayMatrix> {
        let schema = self.schema()?;
        if !schema.is_string_matrix() {
            return Err(SomaError::invalid_argument(format!(
                "{} is not a two-dimensional string-indexed array",
                self.info.uri()
            )));
        }
        Ok(AssayMatrix::from_info(
            self.info.clone(),
            &schema.dimensions[0].name,
            &schema.dimensions[1].name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::MemoryStorage;

    fn ctx() -> SomaContext {
        SomaContext::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_dense_schema() {
        let ctx = ctx();
        let arr = DenseNdArray::new("d", &ctx);
        arr.create(&[4, 7], DataType::F64).unwrap();

        let schema = arr.schema().unwrap();
        assert!(!schema.sparse);
        assert_eq!(schema.dimensions[0].name, "soma_dim_0");
        assert_eq!(schema.dimensions[1].name, "soma_dim_1");
        assert_eq!(schema.value_attribute().name, "soma_data");
        assert_eq!(arr.shape().unwrap(), vec![4, 7]);
        assert!(arr.exists());
    }

    #[test]
    fn test_invalid_shapes() {
        let ctx = ctx();
        assert!(SparseNdArray::new("a", &ctx).create(&[], DataType::F32).is_err());
        assert!(SparseNdArray::new("b", &ctx).create(&[3, 0], DataType::F32).is_err());
        assert!(SparseNdArray::new("c", &ctx)
            .create(&[u64::MAX], DataType::F32)
            .is_err());
        assert_eq!(ctx.storage().probe("b").unwrap(), None);
    }

    #[test]
    fn test_integer_array_is_not_assay_matrix() {
        let ctx = ctx();
        let arr = SparseNdArray::new("s", &ctx);
        arr.create(&[10, 10], DataType::I32).unwrap();
        assert!(arr.as_assay_matrix().is_err());
    }
}
