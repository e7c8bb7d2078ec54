//! Array-shaped data frame member
//!
//! Only creation and schema access are provided; the data frame is otherwise
//! opaque here.

use soma_core::{ArraySchema, ObjectType, Result};

use crate::context::{Lineage, SomaContext};
use crate::object::{ObjectInfo, TypedObject};

#[derive(Debug, Clone)]
pub struct DataFrame {
    info: ObjectInfo,
}

impl DataFrame {
    pub fn new(uri: &str, ctx: &SomaContext) -> Self {
        Self::from_info(ObjectInfo::new(uri, None, ctx, None))
    }

    pub fn with_parent(uri: &str, name: Option<&str>, ctx: &SomaContext, parent: &Lineage) -> Self {
        Self::from_info(ObjectInfo::new(uri, name, ctx, Some(parent)))
    }

    pub(crate) fn from_info(info: ObjectInfo) -> Self {
        Self { info }
    }

    /// Create the backing array with `schema`
    pub fn create(&self, schema: &ArraySchema) -> Result<()> {
        self.info.create_array_as(schema, Self::OBJECT_TYPE)
    }

    pub fn schema(&self) -> Result<ArraySchema> {
        self.info.array_schema()
    }
}

impl TypedObject for DataFrame {
    const OBJECT_TYPE: ObjectType = ObjectType::DataFrame;

    fn info(&self) -> &ObjectInfo {
        &self.info
    }
}
