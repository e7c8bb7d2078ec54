//! Matrix element type constraints
//!
//! This module defines the trait that constrains what types can be
//! stored as cell values, and binds each one to its [`DataType`] and its
//! [`ValueBuffer`] variant.

use crate::batch::ValueBuffer;
use crate::format::DataType;

/// Trait for types that can be stored as matrix elements
///
/// Elements are plain-old-data so value columns can be cast to and from
/// bytes without copying.
pub trait MatrixElement:
    bytemuck::Pod + PartialEq + PartialOrd + core::fmt::Debug + Send + Sync + 'static
{
    /// Get the DataType representation for this element type
    fn data_type() -> DataType;

    /// Additive identity, used to drop implicit zeros from dense input
    fn zero() -> Self;

    /// Wrap an owned value column
    fn into_buffer(values: Vec<Self>) -> ValueBuffer;

    /// Borrow the typed column out of a buffer of the same type
    fn from_buffer(buffer: &ValueBuffer) -> Option<&[Self]>;

    /// Convert to f64 for generic operations
    fn to_f64(self) -> f64;

    fn is_zero(self) -> bool {
        self == Self::zero()
    }
}

macro_rules! impl_matrix_element {
    ($type:ty, $variant:ident, $zero:expr) => {
        impl MatrixElement for $type {
            fn data_type() -> DataType {
                DataType::$variant
            }

            fn zero() -> Self {
                $zero
            }

            fn into_buffer(values: Vec<Self>) -> ValueBuffer {
                ValueBuffer::$variant(values)
            }

            fn from_buffer(buffer: &ValueBuffer) -> Option<&[Self]> {
                match buffer {
                    ValueBuffer::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_matrix_element!(f32, F32, 0.0);
impl_matrix_element!(f64, F64, 0.0);
impl_matrix_element!(i32, I32, 0);
impl_matrix_element!(i64, I64, 0);
impl_matrix_element!(u32, U32, 0);
impl_matrix_element!(u64, U64, 0);
