//! In-process storage engine

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashMap;
use soma_core::{
    ArrayHandle, ArraySchema, CoordinateBatch, Coordinates, FragmentInfo, GroupHandle, IoStats,
    MetadataStore, OpenMode, Result, SomaError, StorageEngine, StorageKind,
};
use tracing::trace;

use super::{batch_cells, check_batch, fragment_info, raw_size, require_write, sort_cells};

#[derive(Debug)]
enum Body {
    Array {
        schema: ArraySchema,
        fragments: Vec<Coordinates>,
    },
    Group,
}

#[derive(Debug)]
struct Object {
    body: Body,
    metadata: BTreeMap<String, String>,
}

impl Object {
    fn kind(&self) -> StorageKind {
        match self.body {
            Body::Array { .. } => StorageKind::Array,
            Body::Group => StorageKind::Group,
        }
    }
}

/// Storage engine backed by a map of URI to object
///
/// URIs are opaque keys; a trailing slash is ignored. Handles re-resolve their
/// object on every call, so removing an object invalidates open handles.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Object>>,
    stats: IoStats,
}

fn key(uri: &str) -> &str {
    uri.trim_end_matches('/')
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Object>>> {
        self.objects
            .read()
            .map_err(|_| SomaError::storage("memory store lock poisoned"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Object>>> {
        self.objects
            .write()
            .map_err(|_| SomaError::storage("memory store lock poisoned"))
    }

    fn with_object<R>(&self, uri: &str, f: impl FnOnce(&Object) -> Result<R>) -> Result<R> {
        let objects = self.read_lock()?;
        let object = objects
            .get(key(uri))
            .ok_or_else(|| SomaError::NotFound(uri.to_string()))?;
        f(object)
    }

    fn with_object_mut<R>(&self, uri: &str, f: impl FnOnce(&mut Object) -> Result<R>) -> Result<R> {
        let mut objects = self.write_lock()?;
        let object = objects
            .get_mut(key(uri))
            .ok_or_else(|| SomaError::NotFound(uri.to_string()))?;
        f(object)
    }

    fn insert(&self, uri: &str, body: Body) -> Result<()> {
        let mut objects = self.write_lock()?;
        if objects.contains_key(key(uri)) {
            return Err(SomaError::AlreadyExists(uri.to_string()));
        }
        objects.insert(
            key(uri).to_string(),
            Object {
                body,
                metadata: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn open(&self, uri: &str, expected: StorageKind) -> Result<()> {
        match self.probe(uri)? {
            Some(kind) if kind == expected => Ok(()),
            _ => Err(SomaError::NotFound(uri.to_string())),
        }
    }

    fn metadata_get(&self, uri: &str, metadata_key: &str) -> Result<Option<String>> {
        self.stats.record_metadata_read();
        self.with_object(uri, |object| Ok(object.metadata.get(metadata_key).cloned()))
    }

    fn metadata_set(&self, uri: &str, metadata_key: &str, value: &str) -> Result<()> {
        self.with_object_mut(uri, |object| {
            object
                .metadata
                .insert(metadata_key.to_string(), value.to_string());
            Ok(())
        })
    }
}

impl StorageEngine for MemoryStorage {
    fn probe(&self, uri: &str) -> Result<Option<StorageKind>> {
        Ok(self.read_lock()?.get(key(uri)).map(Object::kind))
    }

    fn create_array(&self, uri: &str, schema: &ArraySchema) -> Result<()> {
        schema.validate()?;
        self.insert(
            uri,
            Body::Array {
                schema: schema.clone(),
                fragments: Vec::new(),
            },
        )
    }

    fn create_group(&self, uri: &str) -> Result<()> {
        self.insert(uri, Body::Group)
    }

    fn open_array<'a>(&'a self, uri: &str, mode: OpenMode) -> Result<Box<dyn ArrayHandle + 'a>> {
        self.open(uri, StorageKind::Array)?;
        let schema = self.with_object(uri, |object| match &object.body {
            Body::Array { schema, .. } => Ok(schema.clone()),
            Body::Group => Err(SomaError::NotFound(uri.to_string())),
        })?;
        self.stats.record_array_open();
        trace!(uri, ?mode, "open array");
        Ok(Box::new(MemoryArray {
            store: self,
            uri: uri.to_string(),
            mode,
            schema,
        }))
    }

    fn open_group<'a>(&'a self, uri: &str, mode: OpenMode) -> Result<Box<dyn GroupHandle + 'a>> {
        self.open(uri, StorageKind::Group)?;
        self.stats.record_group_open();
        trace!(uri, ?mode, "open group");
        Ok(Box::new(MemoryGroup {
            store: self,
            uri: uri.to_string(),
            mode,
        }))
    }

    fn remove(&self, uri: &str) -> Result<()> {
        let mut objects = self.write_lock()?;
        let root = key(uri);
        if objects.remove(root).is_none() {
            return Err(SomaError::NotFound(uri.to_string()));
        }
        let prefix = format!("{root}/");
        objects.retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    fn stats(&self) -> &IoStats {
        &self.stats
    }
}

struct MemoryArray<'a> {
    store: &'a MemoryStorage,
    uri: String,
    mode: OpenMode,
    schema: ArraySchema,
}

impl MetadataStore for MemoryArray<'_> {
    fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        self.store.metadata_get(&self.uri, key)
    }

    fn metadata_set(&mut self, key: &str, value: &str) -> Result<()> {
        require_write(&self.uri, self.mode)?;
        self.store.metadata_set(&self.uri, key, value)
    }
}

impl MemoryArray<'_> {
    fn with_fragments<R>(&self, f: impl FnOnce(&[Coordinates]) -> Result<R>) -> Result<R> {
        self.store.with_object(&self.uri, |object| match &object.body {
            Body::Array { fragments, .. } => f(fragments),
            Body::Group => Err(SomaError::NotFound(self.uri.clone())),
        })
    }
}

impl ArrayHandle for MemoryArray<'_> {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    fn write(&mut self, batch: &CoordinateBatch<'_>) -> Result<()> {
        require_write(&self.uri, self.mode)?;
        check_batch(&self.uri, &self.schema, batch)?;
        if batch.is_empty() {
            return Ok(());
        }
        let cells = batch_cells(batch, self.schema.cell_order)?;
        let (count, bytes) = (cells.len() as u64, raw_size(&cells));
        self.store
            .with_object_mut(&self.uri, |object| match &mut object.body {
                Body::Array { fragments, .. } => {
                    fragments.push(cells);
                    Ok(())
                }
                Body::Group => Err(SomaError::NotFound(self.uri.clone())),
            })?;
        self.store.stats.record_fragment(count, bytes);
        trace!(uri = %self.uri, cells = count, "wrote fragment");
        Ok(())
    }

    fn read_all(&self) -> Result<Coordinates> {
        let data_type = self.schema.value_attribute().data_type;
        let all = self.with_fragments(|fragments| {
            let mut all = Coordinates::empty(data_type);
            for fragment in fragments {
                all.append(fragment.clone())?;
            }
            Ok(all)
        })?;
        Ok(sort_cells(all, self.schema.cell_order))
    }

    fn fragments(&self) -> Result<Vec<FragmentInfo>> {
        self.with_fragments(|fragments| Ok(fragments.iter().map(fragment_info).collect()))
    }
}

impl Drop for MemoryArray<'_> {
    fn drop(&mut self) {
        trace!(uri = %self.uri, "close array");
    }
}

struct MemoryGroup<'a> {
    store: &'a MemoryStorage,
    uri: String,
    mode: OpenMode,
}

impl MetadataStore for MemoryGroup<'_> {
    fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        self.store.metadata_get(&self.uri, key)
    }

    fn metadata_set(&mut self, key: &str, value: &str) -> Result<()> {
        require_write(&self.uri, self.mode)?;
        self.store.metadata_set(&self.uri, key, value)
    }
}

impl GroupHandle for MemoryGroup<'_> {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn members(&self) -> Result<Vec<String>> {
        let objects = self.store.read_lock()?;
        let prefix = format!("{}/", key(&self.uri));
        let mut members: Vec<String> = objects
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect();
        members.sort();
        Ok(members)
    }
}

impl Drop for MemoryGroup<'_> {
    fn drop(&mut self) {
        trace!(uri = %self.uri, "close group");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soma_core::{Attribute, DataType, Dimension, Layout, ValueBuffer};

    fn matrix_schema() -> ArraySchema {
        ArraySchema {
            dimensions: vec![Dimension::ascii("obs_id", vec![]), Dimension::ascii("var_id", vec![])],
            attributes: vec![Attribute {
                name: "value".into(),
                data_type: DataType::F64,
                filters: vec![],
            }],
            sparse: true,
            allows_duplicates: true,
            capacity: 4,
            cell_order: Layout::RowMajor,
            tile_order: Layout::RowMajor,
        }
    }

    #[test]
    fn test_probe_and_create() {
        let store = MemoryStorage::new();
        assert_eq!(store.probe("a").unwrap(), None);
        store.create_group("a").unwrap();
        store.create_array("a/x/", &matrix_schema()).unwrap();
        assert_eq!(store.probe("a/").unwrap(), Some(StorageKind::Group));
        assert_eq!(store.probe("a/x").unwrap(), Some(StorageKind::Array));
        assert!(matches!(
            store.create_group("a/x"),
            Err(SomaError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_metadata_requires_write_mode() {
        let store = MemoryStorage::new();
        store.create_group("g").unwrap();
        let mut reader = store.open_group("g", OpenMode::Read).unwrap();
        assert!(reader.metadata_set("k", "v").is_err());

        let mut writer = store.open_group("g", OpenMode::Write).unwrap();
        writer.metadata_set("k", "v").unwrap();
        assert_eq!(reader.metadata_get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(reader.metadata_get("missing").unwrap(), None);
    }

    #[test]
    fn test_write_read_fragments() {
        let store = MemoryStorage::new();
        store.create_array("x", &matrix_schema()).unwrap();
        let mut handle = store.open_array("x", OpenMode::Write).unwrap();

        let batch = CoordinateBatch::new(
            vec!["r2", "r1"],
            vec!["c1", "c1"],
            ValueBuffer::F64(vec![2.0, 1.0]),
        )
        .unwrap();
        handle.write(&batch).unwrap();
        let batch =
            CoordinateBatch::new(vec!["r1"], vec!["c1"], ValueBuffer::F64(vec![3.0])).unwrap();
        handle.write(&batch).unwrap();

        let cells = handle.read_all().unwrap();
        assert_eq!(cells.dim0, vec!["r1", "r1", "r2"]);
        assert_eq!(cells.values, ValueBuffer::F64(vec![1.0, 3.0, 2.0]));

        let fragments = handle.fragments().unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].dim0_min, "r1");
        assert_eq!(fragments[0].dim0_max, "r2");
    }

    #[test]
    fn test_write_rejects_wrong_type() {
        let store = MemoryStorage::new();
        store.create_array("x", &matrix_schema()).unwrap();
        let mut handle = store.open_array("x", OpenMode::Write).unwrap();
        let batch = CoordinateBatch::new(vec!["r"], vec!["c"], ValueBuffer::I32(vec![1])).unwrap();
        assert!(handle.write(&batch).is_err());
    }

    #[test]
    fn test_members_and_remove() {
        let store = MemoryStorage::new();
        store.create_group("root").unwrap();
        store.create_group("root/b").unwrap();
        store.create_group("root/a").unwrap();
        store.create_group("root/a/deep").unwrap();
        store.create_group("rootless").unwrap();

        let group = store.open_group("root", OpenMode::Read).unwrap();
        assert_eq!(group.members().unwrap(), vec!["a", "b"]);

        store.remove("root").unwrap();
        assert_eq!(store.probe("root/a/deep").unwrap(), None);
        assert!(store.probe("rootless").unwrap().is_some());
        assert!(group.metadata_get("k").is_err());
    }

    #[test]
    fn test_stats_count_when_enabled() {
        let store = MemoryStorage::new();
        store.create_group("g").unwrap();
        store.open_group("g", OpenMode::Read).unwrap();
        assert_eq!(store.stats().snapshot().groups_opened, 0);

        store.stats().enable();
        store.open_group("g", OpenMode::Read).unwrap();
        assert_eq!(store.stats().snapshot().groups_opened, 1);
    }
}
