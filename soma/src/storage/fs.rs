//! Directory-backed storage engine
//!
//! Each object is a directory under the engine root, addressed by a relative
//! URI such as `pbmc/ms/RNA/X/data`:
//!
//! ```text
//! <object>/__schema.json        array schema (arrays only)
//! <object>/__group.json         group marker (groups only)
//! <object>/__meta.json          key/value metadata
//! <object>/__fragments/NNNNNNNN.sfrg
//! ```
//!
//! A fragment file is a [`FragmentHeader`] followed by `tile_count` tiles of at
//! most `capacity` cells. Each tile is a [`TileHeader`] and the filtered dim0,
//! dim1 and value columns. Fragments are written under a temporary name and
//! renamed into place, and are read back through a memory map.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use soma_core::{
    ArrayHandle, ArraySchema, CoordinateBatch, Coordinates, FragmentHeader, FragmentInfo,
    GroupHandle, IoStats, MetadataStore, OpenMode, Result, SomaError, StorageEngine, StorageKind,
    TileHeader,
};
use tracing::{debug, trace};

use super::codec::{decode_strings, decode_values, encode_strings, encode_values};
use super::{batch_cells, check_batch, fragment_info, require_write, sort_cells};

const SCHEMA_FILE: &str = "__schema.json";
const GROUP_FILE: &str = "__group.json";
const META_FILE: &str = "__meta.json";
const FRAGMENT_DIR: &str = "__fragments";
const FRAGMENT_EXT: &str = "sfrg";

#[derive(Debug, Serialize, Deserialize)]
struct GroupMarker {
    kind: StorageKind,
}

fn exists(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn kind_at(dir: &Path) -> Result<Option<StorageKind>> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(None),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        // a path nested under a plain file
        Err(_) if dir.ancestors().skip(1).any(Path::is_file) => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    if exists(&dir.join(SCHEMA_FILE))? {
        Ok(Some(StorageKind::Array))
    } else if exists(&dir.join(GROUP_FILE))? {
        Ok(Some(StorageKind::Group))
    } else {
        Ok(None)
    }
}

/// Write through a temporary file so readers never see a partial file
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

fn read_meta(dir: &Path) -> Result<BTreeMap<String, String>> {
    match fs::read(dir.join(META_FILE)) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(err.into()),
    }
}

fn write_meta(dir: &Path, meta: &BTreeMap<String, String>) -> Result<()> {
    write_atomic(&dir.join(META_FILE), &serde_json::to_vec_pretty(meta)?)?;
    Ok(())
}

/// Fragment files in write order
fn fragment_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir.join(FRAGMENT_DIR))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == FRAGMENT_EXT) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn next_fragment_path(dir: &Path) -> Result<PathBuf> {
    let next = fragment_paths(dir)?
        .iter()
        .filter_map(|p| p.file_stem()?.to_str()?.parse::<u64>().ok())
        .max()
        .map_or(0, |last| last + 1);
    Ok(dir
        .join(FRAGMENT_DIR)
        .join(format!("{next:08}.{FRAGMENT_EXT}")))
}

/// Serialize cell-ordered cells as one fragment
fn encode_fragment(schema: &ArraySchema, cells: &Coordinates) -> Result<Vec<u8>> {
    let capacity = usize::try_from(schema.capacity).unwrap_or(usize::MAX).max(1);
    let n = cells.len();
    let tile_count = u32::try_from(n.div_ceil(capacity))
        .map_err(|_| SomaError::storage("fragment has too many tiles"))?;
    let header = FragmentHeader::new(
        schema.value_attribute().data_type,
        schema.cell_order,
        n as u64,
        tile_count,
    );

    let mut out = header.to_bytes().to_vec();
    for start in (0..n).step_by(capacity) {
        let end = (start + capacity).min(n);
        let dim0 = encode_strings(&cells.dim0[start..end], &schema.dimensions[0].filters)?;
        let dim1 = encode_strings(&cells.dim1[start..end], &schema.dimensions[1].filters)?;
        let values = encode_values(
            &cells.values.slice(start..end),
            &schema.value_attribute().filters,
        )?;
        let tile = TileHeader {
            cell_count: (end - start) as u64,
            dim0_size: dim0.len() as u64,
            dim1_size: dim1.len() as u64,
            values_size: values.len() as u64,
        };
        out.extend_from_slice(&tile.to_bytes());
        out.extend_from_slice(&dim0);
        out.extend_from_slice(&dim1);
        out.extend_from_slice(&values);
    }
    Ok(out)
}

fn decode_fragment(bytes: &[u8], schema: &ArraySchema) -> Result<Coordinates> {
    let header = FragmentHeader::from_bytes(bytes)?;
    let data_type = schema.value_attribute().data_type;
    if header.data_type != data_type {
        return Err(SomaError::InvalidFragment("fragment value type differs from schema"));
    }

    let mut cells = Coordinates::empty(data_type);
    let mut pos = FragmentHeader::SIZE;
    for _ in 0..header.tile_count {
        let tile = TileHeader::from_bytes(&bytes[pos.min(bytes.len())..])?;
        pos += TileHeader::SIZE;
        let end = pos
            .checked_add(tile.payload_size()?)
            .filter(|&end| end <= bytes.len())
            .ok_or(SomaError::InvalidFragment("tile payload truncated"))?;
        let count = usize::try_from(tile.cell_count)
            .map_err(|_| SomaError::InvalidFragment("tile cell count overflow"))?;

        // payload_size has already bounded every column size
        let dim0_end = pos + tile.dim0_size as usize;
        let dim1_end = dim0_end + tile.dim1_size as usize;
        cells.dim0.extend(decode_strings(
            &bytes[pos..dim0_end],
            count,
            &schema.dimensions[0].filters,
        )?);
        cells.dim1.extend(decode_strings(
            &bytes[dim0_end..dim1_end],
            count,
            &schema.dimensions[1].filters,
        )?);
        cells.values.extend_from(&decode_values(
            &bytes[dim1_end..end],
            data_type,
            count,
            &schema.value_attribute().filters,
        )?)?;
        pos = end;
    }

    if pos != bytes.len() || cells.len() as u64 != header.cell_count {
        return Err(SomaError::InvalidFragment("fragment length disagrees with header"));
    }
    Ok(cells)
}

fn read_fragment(path: &Path, schema: &ArraySchema) -> Result<Coordinates> {
    let file = File::open(path)?;
    // SAFETY: fragment files are renamed into place once complete and never
    // modified afterwards; the map lives only for this decode
    let mmap = unsafe { Mmap::map(&file)? };
    decode_fragment(&mmap, schema)
}

/// Storage engine rooted at a local directory
#[derive(Debug)]
pub struct FsStorage {
    root: PathBuf,
    stats: IoStats,
}

impl FsStorage {
    /// Open or create an engine rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            stats: IoStats::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory under the root for a relative URI
    ///
    /// `None` for absolute URIs, parent components, or the root itself.
    fn resolve(&self, uri: &str) -> Option<PathBuf> {
        let mut dir = self.root.clone();
        for component in Path::new(uri).components() {
            match component {
                Component::Normal(part) => dir.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        (dir != self.root).then_some(dir)
    }

    fn dir(&self, uri: &str) -> Result<PathBuf> {
        self.resolve(uri).ok_or_else(|| {
            SomaError::invalid_argument(format!(
                "uri {uri:?} must be a relative path without '..' naming an object"
            ))
        })
    }

    fn open_dir(&self, uri: &str, expected: StorageKind) -> Result<PathBuf> {
        let dir = self.dir(uri)?;
        if kind_at(&dir)? != Some(expected) {
            return Err(SomaError::NotFound(uri.to_string()));
        }
        Ok(dir)
    }

    fn create_dir(&self, uri: &str) -> Result<PathBuf> {
        let dir = self.dir(uri)?;
        if kind_at(&dir)?.is_some() {
            return Err(SomaError::AlreadyExists(uri.to_string()));
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn metadata_get(&self, dir: &Path, key: &str) -> Result<Option<String>> {
        self.stats.record_metadata_read();
        Ok(read_meta(dir)?.remove(key))
    }

    fn metadata_set(&self, dir: &Path, key: &str, value: &str) -> Result<()> {
        let mut meta = read_meta(dir)?;
        meta.insert(key.to_string(), value.to_string());
        write_meta(dir, &meta)
    }
}

impl StorageEngine for FsStorage {
    fn probe(&self, uri: &str) -> Result<Option<StorageKind>> {
        match self.resolve(uri) {
            Some(dir) => kind_at(&dir),
            None => Ok(None),
        }
    }

    fn create_array(&self, uri: &str, schema: &ArraySchema) -> Result<()> {
        schema.validate()?;
        let dir = self.create_dir(uri)?;
        fs::create_dir_all(dir.join(FRAGMENT_DIR))?;
        write_meta(&dir, &BTreeMap::new())?;
        write_atomic(&dir.join(SCHEMA_FILE), &serde_json::to_vec_pretty(schema)?)?;
        debug!(uri, "created array");
        Ok(())
    }

    fn create_group(&self, uri: &str) -> Result<()> {
        let dir = self.create_dir(uri)?;
        write_meta(&dir, &BTreeMap::new())?;
        let marker = GroupMarker {
            kind: StorageKind::Group,
        };
        write_atomic(&dir.join(GROUP_FILE), &serde_json::to_vec_pretty(&marker)?)?;
        debug!(uri, "created group");
        Ok(())
    }

    fn open_array<'a>(&'a self, uri: &str, mode: OpenMode) -> Result<Box<dyn ArrayHandle + 'a>> {
        let dir = self.open_dir(uri, StorageKind::Array)?;
        let schema: ArraySchema = serde_json::from_slice(&fs::read(dir.join(SCHEMA_FILE))?)?;
        self.stats.record_array_open();
        trace!(uri, ?mode, "open array");
        Ok(Box::new(FsArray {
            store: self,
            uri: uri.to_string(),
            dir,
            mode,
            schema,
        }))
    }

    fn open_group<'a>(&'a self, uri: &str, mode: OpenMode) -> Result<Box<dyn GroupHandle + 'a>> {
        let dir = self.open_dir(uri, StorageKind::Group)?;
        self.stats.record_group_open();
        trace!(uri, ?mode, "open group");
        Ok(Box::new(FsGroup {
            store: self,
            uri: uri.to_string(),
            dir,
            mode,
        }))
    }

    fn remove(&self, uri: &str) -> Result<()> {
        let dir = self.dir(uri)?;
        if kind_at(&dir)?.is_none() {
            return Err(SomaError::NotFound(uri.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        debug!(uri, "removed");
        Ok(())
    }

    fn stats(&self) -> &IoStats {
        &self.stats
    }
}

struct FsArray<'a> {
    store: &'a FsStorage,
    uri: String,
    dir: PathBuf,
    mode: OpenMode,
    schema: ArraySchema,
}

impl MetadataStore for FsArray<'_> {
    fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        self.store.metadata_get(&self.dir, key)
    }

    fn metadata_set(&mut self, key: &str, value: &str) -> Result<()> {
        require_write(&self.uri, self.mode)?;
        self.store.metadata_set(&self.dir, key, value)
    }
}

impl ArrayHandle for FsArray<'_> {
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
        let bytes = encode_fragment(&self.schema, &cells)?;
        let path = next_fragment_path(&self.dir)?;
        write_atomic(&path, &bytes)?;
        self.store
            .stats
            .record_fragment(cells.len() as u64, bytes.len() as u64);
        trace!(path = %path.display(), cells = cells.len(), bytes = bytes.len(), "wrote fragment");
        Ok(())
    }

    fn read_all(&self) -> Result<Coordinates> {
        let mut all = Coordinates::empty(self.schema.value_attribute().data_type);
        for path in fragment_paths(&self.dir)? {
            all.append(read_fragment(&path, &self.schema)?)?;
        }
        Ok(sort_cells(all, self.schema.cell_order))
    }

    fn fragments(&self) -> Result<Vec<FragmentInfo>> {
        fragment_paths(&self.dir)?
            .iter()
            .map(|path| Ok(fragment_info(&read_fragment(path, &self.schema)?)))
            .collect()
    }
}

impl Drop for FsArray<'_> {
    fn drop(&mut self) {
        trace!(uri = %self.uri, "close array");
    }
}

struct FsGroup<'a> {
    store: &'a FsStorage,
    uri: String,
    dir: PathBuf,
    mode: OpenMode,
}

impl MetadataStore for FsGroup<'_> {
    fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        self.store.metadata_get(&self.dir, key)
    }

    fn metadata_set(&mut self, key: &str, value: &str) -> Result<()> {
        require_write(&self.uri, self.mode)?;
        self.store.metadata_set(&self.dir, key, value)
    }
}

impl GroupHandle for FsGroup<'_> {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn mode(&self) -> OpenMode {
        self.mode
    }

    fn members(&self) -> Result<Vec<String>> {
        let mut members = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if kind_at(&entry.path())?.is_none() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                members.push(name.to_string());
            }
        }
        members.sort();
        Ok(members)
    }
}

impl Drop for FsGroup<'_> {
    fn drop(&mut self) {
        trace!(uri = %self.uri, "close group");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soma_core::{Attribute, DataType, Dimension, Filter, Layout, ValueBuffer};

    fn matrix_schema(capacity: u64) -> ArraySchema {
        ArraySchema {
            dimensions: vec![
                Dimension::ascii("obs_id", vec![Filter::Rle, Filter::Zstd { level: 3 }]),
                Dimension::ascii("var_id", vec![Filter::Zstd { level: 3 }]),
            ],
            attributes: vec![Attribute {
                name: "value".into(),
                data_type: DataType::I64,
                filters: vec![Filter::Zstd { level: 3 }],
            }],
            sparse: true,
            allows_duplicates: true,
            capacity,
            cell_order: Layout::RowMajor,
            tile_order: Layout::RowMajor,
        }
    }

    fn cells(n: usize) -> Coordinates {
        Coordinates {
            dim0: (0..n).map(|i| format!("cell{:04}", i / 3)).collect(),
            dim1: (0..n).map(|i| format!("gene{}", i % 3)).collect(),
            values: ValueBuffer::I64((0..n as i64).collect()),
        }
    }

    #[test]
    fn test_fragment_tiles_by_capacity() {
        let schema = matrix_schema(4);
        let original = cells(10);
        let bytes = encode_fragment(&schema, &original).unwrap();
        let header = FragmentHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.tile_count, 3);
        assert_eq!(header.cell_count, 10);
        assert_eq!(decode_fragment(&bytes, &schema).unwrap(), original);
    }

    #[test]
    fn test_fragment_rejects_truncation() {
        let schema = matrix_schema(4);
        let bytes = encode_fragment(&schema, &cells(10)).unwrap();
        assert!(decode_fragment(&bytes[..bytes.len() - 1], &schema).is_err());
        assert!(decode_fragment(&bytes[..10], &schema).is_err());
    }

    #[test]
    fn test_uri_must_stay_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path()).unwrap();
        assert!(store.create_group("../escape").is_err());
        assert!(store.create_group("/abs").is_err());
        assert!(store.create_group("").is_err());
        assert!(store.remove("../escape").is_err());

        // locations outside the root are never objects
        assert_eq!(store.probe("../escape").unwrap(), None);
        assert_eq!(store.probe("/tmp/no/such/file/exists/").unwrap(), None);
        assert_eq!(store.probe("").unwrap(), None);
        assert_eq!(store.probe("missing").unwrap(), None);
    }

    #[test]
    fn test_plain_files_are_not_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        assert_eq!(store.probe("notes.txt").unwrap(), None);
        assert_eq!(store.probe("notes.txt/inner").unwrap(), None);
        assert_eq!(store.probe("empty").unwrap(), None);
        assert!(matches!(
            store.open_group("notes.txt", OpenMode::Read),
            Err(SomaError::NotFound(_))
        ));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path()).unwrap();
        store.create_array("x", &matrix_schema(2)).unwrap();

        let mut handle = store.open_array("x", OpenMode::Write).unwrap();
        let batch = CoordinateBatch::new(
            vec!["b", "a", "c"],
            vec!["g", "g", "g"],
            ValueBuffer::I64(vec![2, 1, 3]),
        )
        .unwrap();
        handle.write(&batch).unwrap();
        let batch =
            CoordinateBatch::new(vec!["a"], vec!["g"], ValueBuffer::I64(vec![9])).unwrap();
        handle.write(&batch).unwrap();
        drop(handle);

        assert!(dir.path().join("x/__fragments/00000000.sfrg").is_file());
        assert!(dir.path().join("x/__fragments/00000001.sfrg").is_file());

        let handle = store.open_array("x", OpenMode::Read).unwrap();
        let all = handle.read_all().unwrap();
        assert_eq!(all.dim0, vec!["a", "a", "b", "c"]);
        assert_eq!(all.values, ValueBuffer::I64(vec![1, 9, 2, 3]));

        let fragments = handle.fragments().unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].cell_count, 3);
        assert_eq!(fragments[1].dim0_min, "a");
    }

    #[test]
    fn test_groups_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path()).unwrap();
        store.create_group("g").unwrap();
        store.create_group("g/child").unwrap();
        store.create_array("g/arr", &matrix_schema(8)).unwrap();
        fs::create_dir_all(dir.path().join("g/not_an_object")).unwrap();

        let mut group = store.open_group("g", OpenMode::Write).unwrap();
        group.metadata_set("soma_object_type", "SOMACollection").unwrap();
        assert_eq!(
            group.metadata_get("soma_object_type").unwrap().as_deref(),
            Some("SOMACollection")
        );
        assert_eq!(group.members().unwrap(), vec!["arr", "child"]);

        assert!(matches!(store.create_group("g"), Err(SomaError::AlreadyExists(_))));
        assert!(store.open_array("g", OpenMode::Read).is_err());

        drop(group);
        store.remove("g").unwrap();
        assert_eq!(store.probe("g/child").unwrap(), None);
        assert!(matches!(store.remove("g"), Err(SomaError::NotFound(_))));
    }
}
