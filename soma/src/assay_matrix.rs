//! Assay matrices: string-indexed sparse matrices of measurements
//!
//! An assay matrix is stored as a sparse array with two string dimensions
//! (observation and variable labels) and one numeric `value` attribute. It is
//! tagged `SOMASparseNDArray`, so the factory hands it back as a
//! [`SparseNdArray`](crate::ndarray::SparseNdArray); use
//! `SparseNdArray::as_assay_matrix` to recover this view.

use rayon::prelude::*;
use soma_core::format::constants::{defaults, ASSAY_MATRIX_ATTR_NAME};
use soma_core::{
    validate_label_counts, ArrayHandle, ArraySchema, Attribute, DataType, Dimension, Filter,
    FragmentInfo, MatrixElement, ObjectType, OpenMode, Result, SomaError, SparseMatrix,
};
use tracing::debug;

use crate::chunked::{ingest_rows_chunked, ingest_whole, IngestSummary};
use crate::context::{Lineage, SomaContext};
use crate::matrix::{CsrMatrix, SourceMatrix};
use crate::metadata::LabelIndex;
use crate::object::{ObjectInfo, TypedObject};

#[derive(Debug, Clone)]
pub struct AssayMatrix {
    info: ObjectInfo,
    row_dim_name: String,
    col_dim_name: String,
}

fn check_compatible(uri: &str, schema: &ArraySchema, data_type: DataType) -> Result<()> {
    if !schema.is_string_matrix() {
        return Err(SomaError::storage(format!(
            "{uri} exists but is not a string-indexed matrix"
        )));
    }
    let stored = schema.value_attribute().data_type;
    if stored != data_type {
        return Err(SomaError::storage(format!(
            "{uri} stores {stored} values, cannot ingest {data_type}"
        )));
    }
    Ok(())
}

impl AssayMatrix {
    pub fn new(uri: &str, row_dim_name: &str, col_dim_name: &str, ctx: &SomaContext) -> Self {
        Self::from_info(ObjectInfo::new(uri, None, ctx, None), row_dim_name, col_dim_name)
    }

    pub fn with_parent(
        uri: &str,
        name: Option<&str>,
        row_dim_name: &str,
        col_dim_name: &str,
        ctx: &SomaContext,
        parent: &Lineage,
    ) -> Self {
        Self::from_info(
            ObjectInfo::new(uri, name, ctx, Some(parent)),
            row_dim_name,
            col_dim_name,
        )
    }

    pub(crate) fn from_info(info: ObjectInfo, row_dim_name: &str, col_dim_name: &str) -> Self {
        Self {
            info,
            row_dim_name: row_dim_name.to_string(),
            col_dim_name: col_dim_name.to_string(),
        }
    }

    pub fn row_dim_name(&self) -> &str {
        &self.row_dim_name
    }

    pub fn col_dim_name(&self) -> &str {
        &self.col_dim_name
    }

    pub fn attr_name(&self) -> &str {
        ASSAY_MATRIX_ATTR_NAME
    }

    /// Schema a new array of `data_type` values would be created with
    pub fn schema_for(&self, data_type: DataType) -> ArraySchema {
        let options = self.info.context().options();
        let level = options.string_dim_zstd_level;
        ArraySchema {
            dimensions: vec![
                Dimension::ascii(&self.row_dim_name, vec![Filter::Rle]),
                Dimension::ascii(&self.col_dim_name, vec![Filter::Zstd { level }]),
            ],
            attributes: vec![Attribute {
                name: ASSAY_MATRIX_ATTR_NAME.to_string(),
                data_type,
                filters: vec![Filter::Zstd {
                    level: defaults::VALUE_ZSTD_LEVEL,
                }],
            }],
            sparse: true,
            allows_duplicates: true,
            capacity: options.x_capacity,
            cell_order: options.x_cell_order,
            tile_order: options.x_tile_order,
        }
    }

    /// Create the empty backing array and stamp its type
    ///
    /// Fails if anything already exists at the location.
    pub fn create_empty_array(&self, data_type: DataType) -> Result<()> {
        self.info
            .create_array_as(&self.schema_for(data_type), Self::OBJECT_TYPE)
    }

    /// Create the array if needed, then ingest `matrix`
    ///
    /// An existing assay matrix at the location keeps its schema and the new
    /// cells are appended.
    pub fn from_matrix<T, R, C>(
        &self,
        matrix: &SourceMatrix<T>,
        row_labels: &[R],
        col_labels: &[C],
    ) -> Result<IngestSummary>
    where
        T: MatrixElement,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        validate_label_counts(matrix.dimensions(), row_labels.len(), col_labels.len())?;
        if self.exists() {
            debug!(uri = self.info.uri(), "reuse existing array");
        } else {
            self.create_empty_array(T::data_type())?;
        }
        self.ingest_data(matrix, row_labels, col_labels)
    }

    /// Ingest chunked for CSR input when enabled, whole otherwise
    pub fn ingest_data<T, R, C>(
        &self,
        matrix: &SourceMatrix<T>,
        row_labels: &[R],
        col_labels: &[C],
    ) -> Result<IngestSummary>
    where
        T: MatrixElement,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        match matrix {
            SourceMatrix::Csr(csr) if self.info.context().options().write_x_chunked_if_csr => {
                self.ingest_data_rows_chunked(csr, row_labels, col_labels)
            }
            _ => self.ingest_data_whole(matrix, row_labels, col_labels),
        }
    }

    fn open_for_write(&self, data_type: DataType) -> Result<Box<dyn ArrayHandle + '_>> {
        let handle = self
            .info
            .context()
            .storage()
            .open_array(self.info.uri(), OpenMode::Write)?;
        check_compatible(self.info.uri(), handle.schema(), data_type)?;
        Ok(handle)
    }

    pub fn ingest_data_whole<T, R, C>(
        &self,
        matrix: &SourceMatrix<T>,
        row_labels: &[R],
        col_labels: &[C],
    ) -> Result<IngestSummary>
    where
        T: MatrixElement,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        validate_label_counts(matrix.dimensions(), row_labels.len(), col_labels.len())?;
        let mut handle = self.open_for_write(T::data_type())?;
        ingest_whole(&mut *handle, matrix, row_labels, col_labels)
    }

    pub fn ingest_data_rows_chunked<T, R, C>(
        &self,
        matrix: &CsrMatrix<T>,
        row_labels: &[R],
        col_labels: &[C],
    ) -> Result<IngestSummary>
    where
        T: MatrixElement,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        validate_label_counts(matrix.dimensions(), row_labels.len(), col_labels.len())?;
        let budget = self.info.context().options().goal_chunk_nnz;
        let mut handle = self.open_for_write(T::data_type())?;
        ingest_rows_chunked(&mut *handle, matrix, row_labels, col_labels, budget)
    }

    pub fn schema(&self) -> Result<ArraySchema> {
        self.info.array_schema()
    }

    pub fn fragments(&self) -> Result<Vec<FragmentInfo>> {
        let storage = self.info.context().storage();
        storage.open_array(self.info.uri(), OpenMode::Read)?.fragments()
    }

    /// Read every cell back as CSR, indexed by the given label orders
    ///
    /// Duplicate coordinates stay as separate stored entries. A stored label
    /// missing from `row_labels` or `col_labels` is an error.
    pub fn to_csr_matrix<T, R, C>(&self, row_labels: &[R], col_labels: &[C]) -> Result<CsrMatrix<T>>
    where
        T: MatrixElement,
        R: AsRef<str>,
        C: AsRef<str>,
    {
        let cells = {
            let storage = self.info.context().storage();
            let handle = storage.open_array(self.info.uri(), OpenMode::Read)?;
            handle.read_all()?
        };
        let values = T::from_buffer(&cells.values).ok_or_else(|| {
            SomaError::storage(format!(
                "{} stores {} values, requested {}",
                self.info.uri(),
                cells.values.data_type(),
                T::data_type()
            ))
        })?;

        let rows = LabelIndex::new("row", row_labels);
        let cols = LabelIndex::new("column", col_labels);
        let positions = cells
            .dim0
            .par_iter()
            .zip(cells.dim1.par_iter())
            .map(|(r, c)| Ok((rows.position(r)?, cols.position(c)?)))
            .collect::<Result<Vec<(usize, usize)>>>()?;
        let (row_idx, col_idx): (Vec<usize>, Vec<usize>) = positions.into_iter().unzip();

        CsrMatrix::from_triplets(row_labels.len(), col_labels.len(), &row_idx, &col_idx, values)
    }
}

impl TypedObject for AssayMatrix {
    const OBJECT_TYPE: ObjectType = ObjectType::SparseNdArray;

    fn info(&self) -> &ObjectInfo {
        &self.info
    }
}
