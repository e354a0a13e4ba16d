use std::sync::Arc;

use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::array::UInt32Array;
use arrow::compute::take;
use datafusion::execution::memory_pool::MemoryReservation;

use crate::data::Block;
use crate::data::ElementType;
use crate::error::ComputeError;
use crate::error::Result;

/// Fixed-length column with exactly one non-null value per position.
///
/// A constant vector keeps a single physical value which every position yields.
#[derive(Debug)]
pub struct Vector<E: ElementType> {
    values: E::Array,
    position_count: usize,
    constant: bool,
    reservation: MemoryReservation,
}

impl<E: ElementType> Vector<E> {
    pub(crate) fn try_new(
        values: E::Array,
        position_count: usize,
        constant: bool,
        reservation: MemoryReservation,
    ) -> Result<Self> {
        if values.null_count() > 0 {
            return Err(ComputeError::InvalidBlock(format!(
                "vector values contain {} nulls",
                values.null_count()
            )));
        }
        let expected = if constant { 1 } else { position_count };
        if values.len() != expected {
            return Err(ComputeError::InvalidBlock(format!(
                "vector of {} positions (constant: {}) holds {} values",
                position_count,
                constant,
                values.len()
            )));
        }

        Ok(Self {
            values,
            position_count,
            constant,
            reservation,
        })
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn is_constant(&self) -> bool {
        self.constant
    }

    pub fn value(&self, position: usize) -> E::Value<'_> {
        if self.constant {
            E::value(&self.values, 0)
        } else {
            E::value(&self.values, position)
        }
    }

    /// Physical values. A constant vector has exactly one.
    pub fn values(&self) -> &E::Array {
        &self.values
    }

    /// Bytes accounted against the memory pool for this vector.
    pub fn reserved_bytes(&self) -> usize {
        self.reservation.size()
    }

    pub fn into_block(self) -> Block<E> {
        Block::from_vector(self)
    }

    /// Materialises the vector as an arrow array, expanding constants.
    pub fn to_arrow(&self) -> Result<ArrayRef> {
        if self.constant {
            let indices = UInt32Array::from(vec![0u32; self.position_count]);
            return Ok(take(&self.values, &indices, None)?);
        }

        Ok(Arc::new(self.values.clone()) as ArrayRef)
    }
}
