//! Per-object identity shared by every typed wrapper

use soma_core::{ArraySchema, ObjectType, OpenMode, Result, StorageKind};
use tracing::{debug, info, trace};

use crate::context::{Lineage, SomaContext};
use crate::metadata::{stamp_object_metadata, ObjectMetadata};

/// Identity and context common to every SOMA object
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    uri: String,
    name: String,
    nested_name: String,
    depth: usize,
    ctx: SomaContext,
}

/// Last path segment of a URI
fn default_name(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

impl ObjectInfo {
    /// Identity for the object at `uri`
    ///
    /// The name defaults to the last URI segment. A parent's lineage extends
    /// the nested name and depth; no reference to the parent is kept.
    pub fn new(uri: &str, name: Option<&str>, ctx: &SomaContext, parent: Option<&Lineage>) -> Self {
        let name = name.unwrap_or_else(|| default_name(uri)).to_string();
        let (nested_name, depth) = match parent {
            Some(p) if !p.nested_name.is_empty() => {
                (format!("{}/{}", p.nested_name, name), p.depth + 1)
            }
            Some(p) => (name.clone(), p.depth + 1),
            None => (name.clone(), 0),
        };
        Self {
            uri: uri.to_string(),
            name,
            nested_name,
            depth,
            ctx: ctx.clone(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nested_name(&self) -> &str {
        &self.nested_name
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn context(&self) -> &SomaContext {
        &self.ctx
    }

    /// Lineage to hand to children of this object
    pub fn lineage(&self) -> Lineage {
        Lineage {
            nested_name: self.nested_name.clone(),
            depth: self.depth,
        }
    }

    /// Location of a named child
    pub fn child_uri(&self, name: &str) -> String {
        self.ctx.storage().join(&self.uri, name)
    }

    /// Whether a `object_type` object is stored here
    ///
    /// Storage errors count as absence.
    pub fn exists_as(&self, object_type: ObjectType) -> bool {
        match self.read_type_tag(object_type) {
            Ok(tag) => tag.as_deref() == Some(object_type.tag()),
            Err(err) => {
                debug!(uri = %self.uri, error = %err, "exists check failed");
                false
            }
        }
    }

    fn read_type_tag(&self, object_type: ObjectType) -> Result<Option<String>> {
        let storage = self.ctx.storage();
        if storage.probe(&self.uri)? != Some(object_type.storage_kind()) {
            return Ok(None);
        }
        let meta = match object_type.storage_kind() {
            StorageKind::Array => {
                let handle = storage.open_array(&self.uri, OpenMode::Read)?;
                ObjectMetadata::read(&*handle)?
            }
            StorageKind::Group => {
                let handle = storage.open_group(&self.uri, OpenMode::Read)?;
                ObjectMetadata::read(&*handle)?
            }
        };
        Ok(meta.object_type)
    }

    /// Stamp type and encoding version on a freshly created object
    pub(crate) fn stamp(&self, object_type: ObjectType) -> Result<()> {
        let storage = self.ctx.storage();
        match object_type.storage_kind() {
            StorageKind::Array => {
                let mut handle = storage.open_array(&self.uri, OpenMode::Write)?;
                stamp_object_metadata(&mut *handle, object_type)?;
            }
            StorageKind::Group => {
                let mut handle = storage.open_group(&self.uri, OpenMode::Write)?;
                stamp_object_metadata(&mut *handle, object_type)?;
            }
        }
        trace!(uri = %self.uri, tag = object_type.tag(), "stamped object metadata");
        Ok(())
    }

    /// Create a group here and stamp it as `object_type`
    pub(crate) fn create_group_as(&self, object_type: ObjectType) -> Result<()> {
        self.ctx.storage().create_group(&self.uri)?;
        self.stamp(object_type)?;
        info!(uri = %self.uri, nested_name = %self.nested_name, tag = object_type.tag(), "created group");
        Ok(())
    }

    /// Create an array here and stamp it as `object_type`
    pub(crate) fn create_array_as(&self, schema: &ArraySchema, object_type: ObjectType) -> Result<()> {
        self.ctx.storage().create_array(&self.uri, schema)?;
        self.stamp(object_type)?;
        info!(uri = %self.uri, nested_name = %self.nested_name, tag = object_type.tag(), "created array");
        Ok(())
    }

    /// Schema of the array stored here
    pub(crate) fn array_schema(&self) -> Result<ArraySchema> {
        let handle = self.ctx.storage().open_array(&self.uri, OpenMode::Read)?;
        Ok(handle.schema().clone())
    }
}

/// Behavior common to the typed SOMA wrappers
pub trait TypedObject {
    /// Type tag this wrapper stamps and expects
    const OBJECT_TYPE: ObjectType;

    fn info(&self) -> &ObjectInfo;

    fn object_type(&self) -> ObjectType {
        Self::OBJECT_TYPE
    }

    fn uri(&self) -> &str {
        self.info().uri()
    }

    fn name(&self) -> &str {
        self.info().name()
    }

    fn nested_name(&self) -> &str {
        self.info().nested_name()
    }

    /// True when an object of this type is stored at the URI
    fn exists(&self) -> bool {
        self.info().exists_as(Self::OBJECT_TYPE)
    }
}
