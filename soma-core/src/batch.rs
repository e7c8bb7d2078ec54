//! Coordinate batches exchanged with storage engines
//!
//! A write batch is three parallel columns: dim0 labels, dim1 labels and a
//! typed value column. Reads hand back the owned equivalent.

use crate::format::DataType;
use crate::traits::MatrixElement;
use crate::validation::validate_array_bounds;
use crate::{Result, SomaError};

/// Type-tagged value column
#[derive(Debug, Clone, PartialEq)]
pub enum ValueBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

macro_rules! each_variant {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            ValueBuffer::F32($values) => $body,
            ValueBuffer::F64($values) => $body,
            ValueBuffer::I32($values) => $body,
            ValueBuffer::I64($values) => $body,
            ValueBuffer::U32($values) => $body,
            ValueBuffer::U64($values) => $body,
        }
    };
}

macro_rules! map_variant {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            ValueBuffer::F32($values) => ValueBuffer::F32($body),
            ValueBuffer::F64($values) => ValueBuffer::F64($body),
            ValueBuffer::I32($values) => ValueBuffer::I32($body),
            ValueBuffer::I64($values) => ValueBuffer::I64($body),
            ValueBuffer::U32($values) => ValueBuffer::U32($body),
            ValueBuffer::U64($values) => ValueBuffer::U64($body),
        }
    };
}

fn collect_pod<T: bytemuck::Pod>(bytes: &[u8]) -> Result<Vec<T>> {
    validate_array_bounds::<T>(bytes.len())?;
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

impl ValueBuffer {
    /// Empty column of the given type
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::F32 => ValueBuffer::F32(Vec::new()),
            DataType::F64 => ValueBuffer::F64(Vec::new()),
            DataType::I32 => ValueBuffer::I32(Vec::new()),
            DataType::I64 => ValueBuffer::I64(Vec::new()),
            DataType::U32 => ValueBuffer::U32(Vec::new()),
            DataType::U64 => ValueBuffer::U64(Vec::new()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ValueBuffer::F32(_) => DataType::F32,
            ValueBuffer::F64(_) => DataType::F64,
            ValueBuffer::I32(_) => DataType::I32,
            ValueBuffer::I64(_) => DataType::I64,
            ValueBuffer::U32(_) => DataType::U32,
            ValueBuffer::U64(_) => DataType::U64,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian bytes of the column
    pub fn as_bytes(&self) -> &[u8] {
        each_variant!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    /// Rebuild a column from bytes; `bytes` need not be aligned
    pub fn from_bytes(data_type: DataType, bytes: &[u8]) -> Result<Self> {
        Ok(match data_type {
            DataType::F32 => ValueBuffer::F32(collect_pod(bytes)?),
            DataType::F64 => ValueBuffer::F64(collect_pod(bytes)?),
            DataType::I32 => ValueBuffer::I32(collect_pod(bytes)?),
            DataType::I64 => ValueBuffer::I64(collect_pod(bytes)?),
            DataType::U32 => ValueBuffer::U32(collect_pod(bytes)?),
            DataType::U64 => ValueBuffer::U64(collect_pod(bytes)?),
        })
    }

    /// New column holding `self[order[k]]` at position `k`
    pub fn gather(&self, order: &[usize]) -> Self {
        map_variant!(self, v => order.iter().map(|&i| v[i]).collect())
    }

    /// New column holding `self[range]`
    pub fn slice(&self, range: core::ops::Range<usize>) -> Self {
        map_variant!(self, v => v[range].to_vec())
    }

    /// Append another column of the same type
    pub fn extend_from(&mut self, other: &ValueBuffer) -> Result<()> {
        match (self, other) {
            (ValueBuffer::F32(a), ValueBuffer::F32(b)) => a.extend_from_slice(b),
            (ValueBuffer::F64(a), ValueBuffer::F64(b)) => a.extend_from_slice(b),
            (ValueBuffer::I32(a), ValueBuffer::I32(b)) => a.extend_from_slice(b),
            (ValueBuffer::I64(a), ValueBuffer::I64(b)) => a.extend_from_slice(b),
            (ValueBuffer::U32(a), ValueBuffer::U32(b)) => a.extend_from_slice(b),
            (ValueBuffer::U64(a), ValueBuffer::U64(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(SomaError::storage(format!(
                    "cannot append {} values to a {} column",
                    b.data_type(),
                    a.data_type()
                )))
            }
        }
        Ok(())
    }

    /// Typed view of the column
    pub fn as_slice<T: MatrixElement>(&self) -> Option<&[T]> {
        T::from_buffer(self)
    }
}

/// One write batch of borrowed labels and owned values
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateBatch<'a> {
    pub dim0: Vec<&'a str>,
    pub dim1: Vec<&'a str>,
    pub values: ValueBuffer,
}

impl<'a> CoordinateBatch<'a> {
    /// Build a batch, rejecting columns of unequal length
    pub fn new(dim0: Vec<&'a str>, dim1: Vec<&'a str>, values: ValueBuffer) -> Result<Self> {
        if dim0.len() != dim1.len() || dim1.len() != values.len() {
            return Err(SomaError::RaggedBatch {
                dim0: dim0.len(),
                dim1: dim1.len(),
                values: values.len(),
            });
        }
        Ok(Self { dim0, dim1, values })
    }

    pub fn len(&self) -> usize {
        self.dim0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dim0.is_empty()
    }
}

/// Cells returned by a read, in storage order
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub dim0: Vec<String>,
    pub dim1: Vec<String>,
    pub values: ValueBuffer,
}

impl Coordinates {
    pub fn empty(data_type: DataType) -> Self {
        Self {
            dim0: Vec::new(),
            dim1: Vec::new(),
            values: ValueBuffer::empty(data_type),
        }
    }

    pub fn len(&self) -> usize {
        self.dim0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dim0.is_empty()
    }

    /// Append owned copies of a batch
    pub fn extend_from_batch(&mut self, batch: &CoordinateBatch<'_>) -> Result<()> {
        self.values.extend_from(&batch.values)?;
        self.dim0.extend(batch.dim0.iter().map(|s| s.to_string()));
        self.dim1.extend(batch.dim1.iter().map(|s| s.to_string()));
        Ok(())
    }

    /// Append another result of the same value type
    pub fn append(&mut self, mut other: Coordinates) -> Result<()> {
        self.values.extend_from(&other.values)?;
        self.dim0.append(&mut other.dim0);
        self.dim1.append(&mut other.dim1);
        Ok(())
    }

    /// Reorder every column by `order`
    pub fn gather(&self, order: &[usize]) -> Self {
        Self {
            dim0: order.iter().map(|&i| self.dim0[i].clone()).collect(),
            dim1: order.iter().map(|&i| self.dim1[i].clone()).collect(),
            values: self.values.gather(order),
        }
    }

    /// `(dim0, dim1, value)` triples when the value type is `T`
    pub fn triples<T: MatrixElement>(&self) -> Option<Vec<(&str, &str, T)>> {
        let values = T::from_buffer(&self.values)?;
        Some(
            self.dim0
                .iter()
                .zip(&self.dim1)
                .zip(values)
                .map(|((r, c), &v)| (r.as_str(), c.as_str(), v))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_batch_rejected() {
        let err = CoordinateBatch::new(vec!["a", "b"], vec!["x"], ValueBuffer::F32(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            SomaError::RaggedBatch {
                dim0: 2,
                dim1: 1,
                values: 2
            }
        ));
    }

    #[test]
    fn test_value_bytes_unaligned() {
        let buffer = ValueBuffer::I64(vec![-3, 7, 1 << 40]);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(buffer.as_bytes());
        let restored = ValueBuffer::from_bytes(DataType::I64, &shifted[1..]).unwrap();
        assert_eq!(restored, buffer);
        assert!(ValueBuffer::from_bytes(DataType::I64, &shifted[1..5]).is_err());
    }

    #[test]
    fn test_extend_type_mismatch() {
        let mut a = ValueBuffer::F32(vec![1.0]);
        assert!(a.extend_from(&ValueBuffer::F64(vec![2.0])).is_err());
        a.extend_from(&ValueBuffer::F32(vec![2.0])).unwrap();
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_gather_and_triples() {
        let mut coords = Coordinates::empty(DataType::U32);
        let batch =
            CoordinateBatch::new(vec!["b", "a"], vec!["x", "y"], ValueBuffer::U32(vec![2, 1]))
                .unwrap();
        coords.extend_from_batch(&batch).unwrap();
        let sorted = coords.gather(&[1, 0]);
        assert_eq!(
            sorted.triples::<u32>().unwrap(),
            vec![("a", "y", 1), ("b", "x", 2)]
        );
        assert!(sorted.triples::<f32>().is_none());
    }
}
