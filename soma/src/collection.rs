//! Group-shaped SOMA objects
//!
//! `Collection`, `Experiment` and `Measurement` differ only in their type tag.
//! Each can hold any other object as a named member.

use soma_core::{ArraySchema, DataType, ObjectType, OpenMode, Result};

use crate::assay_matrix::AssayMatrix;
use crate::context::{Lineage, SomaContext};
use crate::dataframe::DataFrame;
use crate::factory::{construct_member, SomaObject};
use crate::ndarray::{DenseNdArray, SparseNdArray};
use crate::object::{ObjectInfo, TypedObject};

macro_rules! group_object {
    ($(#[$doc:meta])* $name:ident, $object_type:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            info: ObjectInfo,
        }

        impl $name {
            /// Wrapper for a root object at `uri`
            pub fn new(uri: &str, ctx: &SomaContext) -> Self {
                Self::from_info(ObjectInfo::new(uri, None, ctx, None))
            }

            /// Wrapper for an object nested under `parent`
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

            /// Create the group and stamp its type
            pub fn create(&self) -> Result<()> {
                self.info.create_group_as(Self::OBJECT_TYPE)
            }

            /// Names of the stored members, sorted
            pub fn members(&self) -> Result<Vec<String>> {
                let storage = self.info.context().storage();
                storage.open_group(self.info.uri(), OpenMode::Read)?.members()
            }

            /// Classify and wrap the member called `name`
            pub fn member(&self, name: &str) -> Result<Option<SomaObject>> {
                construct_member(
                    &self.info.child_uri(name),
                    self.info.context(),
                    Some(&self.info.lineage()),
                )
            }

            fn child(&self, name: &str) -> ObjectInfo {
                ObjectInfo::new(
                    &self.info.child_uri(name),
                    Some(name),
                    self.info.context(),
                    Some(&self.info.lineage()),
                )
            }

            pub fn add_collection(&self, name: &str) -> Result<Collection> {
                let child = Collection::from_info(self.child(name));
                child.create()?;
                Ok(child)
            }

            pub fn add_experiment(&self, name: &str) -> Result<Experiment> {
                let child = Experiment::from_info(self.child(name));
                child.create()?;
                Ok(child)
            }

            pub fn add_measurement(&self, name: &str) -> Result<Measurement> {
                let child = Measurement::from_info(self.child(name));
                child.create()?;
                Ok(child)
            }

            pub fn add_dataframe(&self, name: &str, schema: &ArraySchema) -> Result<DataFrame> {
                let child = DataFrame::from_info(self.child(name));
                child.create(schema)?;
                Ok(child)
            }

            pub fn add_dense_nd_array(
                &self,
                name: &str,
                shape: &[u64],
                data_type: DataType,
            ) -> Result<DenseNdArray> {
                let child = DenseNdArray::from_info(self.child(name));
                child.create(shape, data_type)?;
                Ok(child)
            }

            pub fn add_sparse_nd_array(
                &self,
                name: &str,
                shape: &[u64],
                data_type: DataType,
            ) -> Result<SparseNdArray> {
                let child = SparseNdArray::from_info(self.child(name));
                child.create(shape, data_type)?;
                Ok(child)
            }

            /// Assay matrix wrapper for member `name`; nothing is created
            /// until it is first filled
            pub fn assay_matrix(&self, name: &str, row_dim_name: &str, col_dim_name: &str) -> AssayMatrix {
                AssayMatrix::from_info(self.child(name), row_dim_name, col_dim_name)
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

group_object!(
    /// Generic named container
    Collection,
    ObjectType::Collection
);

group_object!(
    /// Root of a single-cell dataset: observation annotations plus measurements
    Experiment,
    ObjectType::Experiment
);

group_object!(
    /// One modality of an experiment, holding its assay matrices
    Measurement,
    ObjectType::Measurement
);
