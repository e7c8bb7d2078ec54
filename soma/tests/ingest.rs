use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::collection::vec;
use proptest::prelude::*;
use soma::{
    ingest_rows_chunked, ArrayHandle, ArraySchema, AssayMatrix, CoordinateBatch, Coordinates,
    CsrMatrix, DataType, FragmentInfo, MemoryStorage, MetadataStore, OpenMode, Result,
    SomaContext, SomaError, SomaOptions, SourceMatrix, SparseMatrix, TypedObject,
};

/// Handle that keeps every written batch separately
struct RecordingArray {
    schema: ArraySchema,
    batches: Vec<Coordinates>,
    metadata: BTreeMap<String, String>,
}

impl RecordingArray {
    fn new(schema: ArraySchema) -> Self {
        Self {
            schema,
            batches: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

impl MetadataStore for RecordingArray {
    fn metadata_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.metadata.get(key).cloned())
    }

    fn metadata_set(&mut self, key: &str, value: &str) -> Result<()> {
        self.metadata.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl ArrayHandle for RecordingArray {
    fn uri(&self) -> &str {
        "recording"
    }

    fn mode(&self) -> OpenMode {
        OpenMode::Write
    }

    fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    fn write(&mut self, batch: &CoordinateBatch<'_>) -> Result<()> {
        let mut cells = Coordinates::empty(batch.values.data_type());
        cells.extend_from_batch(batch)?;
        self.batches.push(cells);
        Ok(())
    }

    fn read_all(&self) -> Result<Coordinates> {
        let mut all = Coordinates::empty(self.schema.value_attribute().data_type);
        for batch in &self.batches {
            all.append(batch.clone())?;
        }
        Ok(all)
    }

    fn fragments(&self) -> Result<Vec<FragmentInfo>> {
        Ok(self
            .batches
            .iter()
            .map(|b| FragmentInfo {
                cell_count: b.len() as u64,
                dim0_min: b.dim0.iter().min().cloned().unwrap_or_default(),
                dim0_max: b.dim0.iter().max().cloned().unwrap_or_default(),
            })
            .collect())
    }
}

fn memory_ctx(options: SomaOptions) -> SomaContext {
    SomaContext::new(Arc::new(MemoryStorage::new()))
        .with_options(options)
        .unwrap()
}

/// Rows C, A, B, D over columns X, Y, Z
fn worked_matrix() -> (CsrMatrix<f64>, Vec<&'static str>, Vec<&'static str>) {
    let csr = CsrMatrix::new(
        4,
        3,
        vec![0, 2, 4, 5, 7],
        vec![1, 2, 0, 2, 0, 1, 2],
        vec![1.0, 2.0, 4.0, 5.0, 7.0, 8.0, 9.0],
    )
    .unwrap();
    (csr, vec!["C", "A", "B", "D"], vec!["X", "Y", "Z"])
}

fn sorted_triples(cells: &Coordinates) -> Vec<(String, String, f64)> {
    let mut triples: Vec<_> = cells
        .triples::<f64>()
        .unwrap()
        .into_iter()
        .map(|(r, c, v)| (r.to_string(), c.to_string(), v))
        .collect();
    triples.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    triples
}

fn owned(cells: &[(&str, &str, f64)]) -> Vec<(String, String, f64)> {
    cells
        .iter()
        .map(|&(r, c, v)| (r.to_string(), c.to_string(), v))
        .collect()
}

#[test]
fn worked_example_chunk_contents() {
    let ctx = memory_ctx(SomaOptions::default());
    let schema = AssayMatrix::new("x", "obs_id", "var_id", &ctx).schema_for(DataType::F64);
    let mut handle = RecordingArray::new(schema);
    let (csr, rows, cols) = worked_matrix();

    let summary = ingest_rows_chunked(&mut handle, &csr, &rows, &cols, 4).unwrap();
    assert_eq!(summary.chunks, 2);
    assert_eq!(summary.fragments, 2);
    assert_eq!(summary.nnz, 7);

    assert_eq!(
        sorted_triples(&handle.batches[0]),
        owned(&[("A", "X", 4.0), ("A", "Z", 5.0), ("B", "X", 7.0)])
    );
    assert_eq!(
        sorted_triples(&handle.batches[1]),
        owned(&[
            ("C", "Y", 1.0),
            ("C", "Z", 2.0),
            ("D", "Y", 8.0),
            ("D", "Z", 9.0)
        ])
    );
}

#[test]
fn worked_example_tight_budget() {
    let ctx = memory_ctx(SomaOptions::default());
    let schema = AssayMatrix::new("x", "obs_id", "var_id", &ctx).schema_for(DataType::F64);
    let mut handle = RecordingArray::new(schema);
    let (csr, rows, cols) = worked_matrix();

    ingest_rows_chunked(&mut handle, &csr, &rows, &cols, 3).unwrap();
    let sizes: Vec<u64> = handle
        .fragments()
        .unwrap()
        .iter()
        .map(|f| f.cell_count)
        .collect();
    assert_eq!(sizes, vec![3, 2, 2]);
    let labels: Vec<_> = handle
        .fragments()
        .unwrap()
        .into_iter()
        .map(|f| (f.dim0_min, f.dim0_max))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("A".to_string(), "B".to_string()),
            ("C".to_string(), "C".to_string()),
            ("D".to_string(), "D".to_string())
        ]
    );
}

#[test]
fn empty_rows_write_nothing() {
    let ctx = memory_ctx(SomaOptions::default().with_goal_chunk_nnz(1));
    let csr = CsrMatrix::<f64>::new(3, 2, vec![0, 0, 0, 0], vec![], vec![]).unwrap();
    let x = AssayMatrix::new("empty", "obs_id", "var_id", &ctx);

    let summary = x
        .from_matrix(&SourceMatrix::from(csr), &["a", "b", "c"], &["g1", "g2"])
        .unwrap();
    assert_eq!(summary.fragments, 0);
    assert_eq!(summary.empty_chunks, summary.chunks);
    assert!(x.exists());
    assert!(x.fragments().unwrap().is_empty());
}

#[test]
fn label_mismatch_is_a_precondition_failure() {
    let ctx = memory_ctx(SomaOptions::default());
    let (csr, _, cols) = worked_matrix();
    let x = AssayMatrix::new("x", "obs_id", "var_id", &ctx);

    let err = x
        .from_matrix(&SourceMatrix::from(csr), &["A", "B", "C"], &cols)
        .unwrap_err();
    assert!(matches!(err, SomaError::DimensionMismatch { .. }));
    assert!(!x.exists());
}

#[test]
fn reingest_reuses_schema() {
    let ctx = memory_ctx(SomaOptions::default().with_goal_chunk_nnz(4));
    let (csr, rows, cols) = worked_matrix();
    let x = AssayMatrix::new("x", "obs_id", "var_id", &ctx);
    let source = SourceMatrix::from(csr.clone());

    x.from_matrix(&source, &rows, &cols).unwrap();
    let schema = x.schema().unwrap();
    x.from_matrix(&source, &rows, &cols).unwrap();

    assert_eq!(x.schema().unwrap(), schema);
    assert_eq!(x.fragments().unwrap().len(), 4);

    let back: CsrMatrix<f64> = x.to_csr_matrix(&rows, &cols).unwrap();
    assert_eq!(back.nnz(), 2 * csr.nnz());
}

#[test]
fn chunked_read_back_matches_source() {
    let ctx = memory_ctx(SomaOptions::default().with_goal_chunk_nnz(2));
    let (csr, rows, cols) = worked_matrix();
    let x = AssayMatrix::new("x", "obs_id", "var_id", &ctx);
    x.from_matrix(&SourceMatrix::from(csr.clone()), &rows, &cols)
        .unwrap();

    let back: CsrMatrix<f64> = x.to_csr_matrix(&rows, &cols).unwrap();
    for r in 0..4 {
        assert_eq!(back.row(r), csr.row(r), "row {r}");
    }
}

fn csr_with_labels() -> impl Strategy<Value = (CsrMatrix<i64>, Vec<String>, Vec<String>)> {
    (1usize..6, 0usize..15)
        .prop_flat_map(|(n_cols, n_rows)| {
            (
                Just(n_cols),
                vec(vec((0..n_cols, -50i64..50), 0..5), n_rows),
                vec("[a-d]{1,2}", n_rows),
            )
        })
        .prop_map(|(n_cols, rows, row_labels)| {
            let mut indptr = vec![0];
            let mut indices = Vec::new();
            let mut data = Vec::new();
            for row in &rows {
                for &(c, v) in row {
                    indices.push(c);
                    data.push(v);
                }
                indptr.push(indices.len());
            }
            let csr = CsrMatrix::new(rows.len(), n_cols, indptr, indices, data).unwrap();
            let col_labels = (0..n_cols).map(|c| format!("g{c}")).collect();
            (csr, row_labels, col_labels)
        })
}

fn multiset(cells: &Coordinates) -> Vec<(String, String, i64)> {
    let mut triples: Vec<_> = cells
        .triples::<i64>()
        .unwrap()
        .into_iter()
        .map(|(r, c, v)| (r.to_string(), c.to_string(), v))
        .collect();
    triples.sort();
    triples
}

proptest! {
    #[test]
    fn chunked_and_whole_store_the_same_cells(
        (csr, rows, cols) in csr_with_labels(),
        budget in 1usize..30,
    ) {
        let chunked_ctx = memory_ctx(SomaOptions::default().with_goal_chunk_nnz(budget));
        let whole_ctx = memory_ctx(SomaOptions::default().with_write_x_chunked_if_csr(false));
        let source = SourceMatrix::from(csr.clone());

        let chunked = AssayMatrix::new("x", "obs_id", "var_id", &chunked_ctx);
        let whole = AssayMatrix::new("x", "obs_id", "var_id", &whole_ctx);
        let summary = chunked.from_matrix(&source, &rows, &cols).unwrap();
        whole.from_matrix(&source, &rows, &cols).unwrap();

        prop_assert_eq!(summary.nnz, csr.nnz());
        prop_assert!(whole.fragments().unwrap().len() <= 1);

        let read = |x: &AssayMatrix| {
            let storage = x.info().context().storage();
            let handle = storage.open_array(x.uri(), OpenMode::Read).unwrap();
            multiset(&handle.read_all().unwrap())
        };
        prop_assert_eq!(read(&chunked), read(&whole));
    }

    #[test]
    fn fragments_follow_sorted_row_labels(
        (csr, rows, cols) in csr_with_labels(),
        budget in 1usize..10,
    ) {
        let ctx = memory_ctx(SomaOptions::default().with_goal_chunk_nnz(budget));
        let x = AssayMatrix::new("x", "obs_id", "var_id", &ctx);
        x.from_matrix(&SourceMatrix::from(csr), &rows, &cols).unwrap();

        let fragments = x.fragments().unwrap();
        for pair in fragments.windows(2) {
            prop_assert!(pair[0].dim0_max <= pair[1].dim0_min);
        }
        for fragment in &fragments {
            prop_assert!(fragment.cell_count > 0);
        }
    }
}
