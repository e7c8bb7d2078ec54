//! Object-type classification
//!
//! [`construct_member`] turns a bare location into a typed wrapper using only
//! what is stored there. The steps run in a fixed order and each failure maps
//! to its own classification error:
//!
//! 1. probe: nothing recognizable at the location yields `Ok(None)`
//! 2. read the type tag and encoding version; either missing is an error
//! 3. the version must be an integer no newer than [`SOMA_ENCODING_VERSION`]
//! 4. the tag must be one of the six known tags, matched exactly
//! 5. the tag's storage kind must match what was probed
//!
//! Nothing is cached; every call re-reads the stored metadata.

use soma_core::{
    parse_encoding_version, ObjectType, OpenMode, Result, SomaError, StorageKind,
    SOMA_ENCODING_VERSION, SOMA_ENCODING_VERSION_METADATA_KEY, SOMA_OBJECT_TYPE_METADATA_KEY,
};
use tracing::debug;

use crate::collection::{Collection, Experiment, Measurement};
use crate::context::{Lineage, SomaContext};
use crate::dataframe::DataFrame;
use crate::metadata::ObjectMetadata;
use crate::ndarray::{DenseNdArray, SparseNdArray};
use crate::object::{ObjectInfo, TypedObject};

/// Any typed SOMA object
#[derive(Debug, Clone)]
pub enum SomaObject {
    Collection(Collection),
    Experiment(Experiment),
    Measurement(Measurement),
    DataFrame(DataFrame),
    DenseNdArray(DenseNdArray),
    SparseNdArray(SparseNdArray),
}

impl SomaObject {
    fn construct(object_type: ObjectType, info: ObjectInfo) -> Self {
        match object_type {
            ObjectType::Collection => SomaObject::Collection(Collection::from_info(info)),
            ObjectType::Experiment => SomaObject::Experiment(Experiment::from_info(info)),
            ObjectType::Measurement => SomaObject::Measurement(Measurement::from_info(info)),
            ObjectType::DataFrame => SomaObject::DataFrame(DataFrame::from_info(info)),
            ObjectType::DenseNdArray => SomaObject::DenseNdArray(DenseNdArray::from_info(info)),
            ObjectType::SparseNdArray => SomaObject::SparseNdArray(SparseNdArray::from_info(info)),
        }
    }

    pub fn info(&self) -> &ObjectInfo {
        match self {
            SomaObject::Collection(o) => o.info(),
            SomaObject::Experiment(o) => o.info(),
            SomaObject::Measurement(o) => o.info(),
            SomaObject::DataFrame(o) => o.info(),
            SomaObject::DenseNdArray(o) => o.info(),
            SomaObject::SparseNdArray(o) => o.info(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            SomaObject::Collection(_) => ObjectType::Collection,
            SomaObject::Experiment(_) => ObjectType::Experiment,
            SomaObject::Measurement(_) => ObjectType::Measurement,
            SomaObject::DataFrame(_) => ObjectType::DataFrame,
            SomaObject::DenseNdArray(_) => ObjectType::DenseNdArray,
            SomaObject::SparseNdArray(_) => ObjectType::SparseNdArray,
        }
    }

    pub fn uri(&self) -> &str {
        self.info().uri()
    }

    pub fn name(&self) -> &str {
        self.info().name()
    }

    pub fn exists(&self) -> bool {
        self.info().exists_as(self.object_type())
    }
}

/// Determine the object type stored at `uri`
///
/// Returns `Ok(None)` when nothing is stored there.
pub fn classify(uri: &str, ctx: &SomaContext) -> Result<Option<ObjectType>> {
    let storage = ctx.storage();
    let Some(kind) = storage.probe(uri)? else {
        debug!(uri, "nothing stored");
        return Ok(None);
    };

    let meta = match kind {
        StorageKind::Array => ObjectMetadata::read(&*storage.open_array(uri, OpenMode::Read)?)?,
        StorageKind::Group => ObjectMetadata::read(&*storage.open_group(uri, OpenMode::Read)?)?,
    };

    let tag = meta.object_type.ok_or_else(|| SomaError::MissingMetadata {
        uri: uri.to_string(),
        key: SOMA_OBJECT_TYPE_METADATA_KEY,
    })?;
    let version_tag = meta
        .encoding_version
        .ok_or_else(|| SomaError::MissingMetadata {
            uri: uri.to_string(),
            key: SOMA_ENCODING_VERSION_METADATA_KEY,
        })?;

    let version = parse_encoding_version(&version_tag).ok_or_else(|| {
        SomaError::InvalidEncodingVersion {
            uri: uri.to_string(),
            value: version_tag.clone(),
        }
    })?;
    if version > u64::from(SOMA_ENCODING_VERSION) {
        return Err(SomaError::FutureEncodingVersion {
            uri: uri.to_string(),
            found: version,
            supported: SOMA_ENCODING_VERSION,
        });
    }

    let object_type = ObjectType::from_tag(&tag).ok_or_else(|| SomaError::UnknownObjectType {
        uri: uri.to_string(),
        tag: tag.clone(),
    })?;
    if object_type.storage_kind() != kind {
        return Err(SomaError::InconsistentObjectShape {
            uri: uri.to_string(),
            object_type,
            kind,
        });
    }

    debug!(uri, %kind, tag = %tag, version, "classified");
    Ok(Some(object_type))
}

/// Build the typed wrapper for whatever is stored at `uri`
///
/// `parent` supplies the lineage the new object extends.
pub fn construct_member(
    uri: &str,
    ctx: &SomaContext,
    parent: Option<&Lineage>,
) -> Result<Option<SomaObject>> {
    Ok(classify(uri, ctx)?.map(|object_type| {
        SomaObject::construct(object_type, ObjectInfo::new(uri, None, ctx, parent))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use soma_core::{MetadataStore, StorageEngine};

    use crate::storage::MemoryStorage;

    fn ctx() -> SomaContext {
        SomaContext::new(Arc::new(MemoryStorage::new()))
    }

    fn tag_group(ctx: &SomaContext, uri: &str, tag: Option<&str>, version: Option<&str>) {
        let storage = ctx.storage();
        storage.create_group(uri).unwrap();
        let mut handle = storage.open_group(uri, OpenMode::Write).unwrap();
        if let Some(tag) = tag {
            handle.metadata_set(SOMA_OBJECT_TYPE_METADATA_KEY, tag).unwrap();
        }
        if let Some(version) = version {
            handle
                .metadata_set(SOMA_ENCODING_VERSION_METADATA_KEY, version)
                .unwrap();
        }
    }

    #[test]
    fn test_absent_is_none() {
        assert!(construct_member("nowhere", &ctx(), None).unwrap().is_none());
    }

    #[test]
    fn test_group_round_trip() {
        let ctx = ctx();
        tag_group(&ctx, "c", Some("SOMACollection"), Some("1"));
        let obj = construct_member("c", &ctx, None).unwrap().unwrap();
        assert_eq!(obj.object_type(), ObjectType::Collection);
        assert!(obj.exists());
        assert_eq!(obj.name(), "c");
    }

    #[test]
    fn test_missing_keys() {
        let ctx = ctx();
        tag_group(&ctx, "bare", None, None);
        tag_group(&ctx, "no_version", Some("SOMACollection"), None);

        let err = classify("bare", &ctx).unwrap_err();
        assert!(matches!(err, SomaError::MissingMetadata { key: "soma_object_type", .. }));
        let err = classify("no_version", &ctx).unwrap_err();
        assert!(matches!(
            err,
            SomaError::MissingMetadata { key: "soma_encoding_version", .. }
        ));
    }

    #[test]
    fn test_version_checks() {
        let ctx = ctx();
        tag_group(&ctx, "zero", Some("SOMACollection"), Some("0"));
        tag_group(&ctx, "future", Some("SOMACollection"), Some("2"));
        tag_group(&ctx, "garbage", Some("SOMACollection"), Some("1.0"));

        assert_eq!(classify("zero", &ctx).unwrap(), Some(ObjectType::Collection));
        assert!(matches!(
            classify("future", &ctx),
            Err(SomaError::FutureEncodingVersion { found: 2, supported: 1, .. })
        ));
        assert!(matches!(
            classify("garbage", &ctx),
            Err(SomaError::InvalidEncodingVersion { .. })
        ));
    }

    #[test]
    fn test_parent_lineage() {
        let ctx = ctx();
        tag_group(&ctx, "root/child", Some("SOMAMeasurement"), Some("1"));
        let parent = Lineage {
            nested_name: "root".into(),
            depth: 0,
        };
        let obj = construct_member("root/child", &ctx, Some(&parent))
            .unwrap()
            .unwrap();
        assert_eq!(obj.info().nested_name(), "root/child");
        assert_eq!(obj.info().depth(), 1);
    }

    #[test]
    fn test_reclassifies_after_replace() {
        let ctx = ctx();
        tag_group(&ctx, "x", Some("SOMACollection"), Some("1"));
        assert_eq!(classify("x", &ctx).unwrap(), Some(ObjectType::Collection));

        ctx.storage().remove("x").unwrap();
        assert_eq!(classify("x", &ctx).unwrap(), None);

        tag_group(&ctx, "x", Some("SOMAExperiment"), Some("1"));
        assert_eq!(classify("x", &ctx).unwrap(), Some(ObjectType::Experiment));
    }
}
