use std::sync::Arc;

use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::array::ListArray;
use arrow::array::UInt32Array;
use arrow::buffer::NullBuffer;
use arrow::buffer::OffsetBuffer;
use arrow::compute::take;
use arrow::datatypes::Field;
use datafusion::execution::memory_pool::MemoryReservation;

use crate::data::ElementType;
use crate::data::Vector;
use crate::error::ComputeError;
use crate::error::Result;

/// Name of the item field of list arrays produced from multi-valued blocks.
pub const LIST_ITEM_FIELD: &str = "item";

#[derive(Debug)]
enum Repr<E: ElementType> {
    /// Every position holds exactly one value.
    Vector(Vector<E>),
    /// Positions map onto a flat run through `first_value_indexes`. An empty range is a null.
    Values {
        values: E::Array,
        first_value_indexes: OffsetBuffer<i32>,
        reservation: MemoryReservation,
    },
}

/// Column where each position holds zero (null), one or many values.
///
/// `value_count(p)` values of position `p` start at `first_value_index(p)` in the flat run
/// read through [Block::value].
#[derive(Debug)]
pub struct Block<E: ElementType> {
    repr: Repr<E>,
}

impl<E: ElementType> Block<E> {
    pub(crate) fn from_vector(vector: Vector<E>) -> Self {
        Self {
            repr: Repr::Vector(vector),
        }
    }

    pub(crate) fn try_new(
        values: E::Array,
        first_value_indexes: OffsetBuffer<i32>,
        reservation: MemoryReservation,
    ) -> Result<Self> {
        if values.null_count() > 0 {
            return Err(ComputeError::InvalidBlock(format!(
                "value run contains {} nulls",
                values.null_count()
            )));
        }
        if first_value_indexes[0] != 0 {
            return Err(ComputeError::InvalidBlock(format!(
                "value run starts at {}",
                first_value_indexes[0]
            )));
        }
        let last = first_value_indexes[first_value_indexes.len() - 1] as usize;
        if last != values.len() {
            return Err(ComputeError::InvalidBlock(format!(
                "positions cover {} values, value run has {}",
                last,
                values.len()
            )));
        }

        Ok(Self {
            repr: Repr::Values {
                values,
                first_value_indexes,
                reservation,
            },
        })
    }

    pub fn position_count(&self) -> usize {
        match &self.repr {
            Repr::Vector(v) => v.position_count(),
            Repr::Values {
                first_value_indexes,
                ..
            } => first_value_indexes.len() - 1,
        }
    }

    pub fn first_value_index(&self, position: usize) -> usize {
        match &self.repr {
            Repr::Vector(_) => position,
            Repr::Values {
                first_value_indexes,
                ..
            } => first_value_indexes[position] as usize,
        }
    }

    pub fn value_count(&self, position: usize) -> usize {
        match &self.repr {
            Repr::Vector(_) => 1,
            Repr::Values {
                first_value_indexes,
                ..
            } => (first_value_indexes[position + 1] - first_value_indexes[position]) as usize,
        }
    }

    pub fn is_null(&self, position: usize) -> bool {
        self.value_count(position) == 0
    }

    /// Reads the value at `index` of the flat value run.
    pub fn value(&self, index: usize) -> E::Value<'_> {
        match &self.repr {
            Repr::Vector(v) => v.value(index),
            Repr::Values { values, .. } => E::value(values, index),
        }
    }

    pub fn total_value_count(&self) -> usize {
        match &self.repr {
            Repr::Vector(v) => v.position_count(),
            Repr::Values { values, .. } => values.len(),
        }
    }

    /// Returns the vector view when every position holds exactly one value.
    pub fn as_vector(&self) -> Option<&Vector<E>> {
        match &self.repr {
            Repr::Vector(v) => Some(v),
            Repr::Values { .. } => None,
        }
    }

    pub fn may_have_nulls(&self) -> bool {
        match &self.repr {
            Repr::Vector(_) => false,
            Repr::Values { .. } => (0..self.position_count()).any(|p| self.is_null(p)),
        }
    }

    pub fn may_have_multivalues(&self) -> bool {
        match &self.repr {
            Repr::Vector(_) => false,
            Repr::Values { .. } => (0..self.position_count()).any(|p| self.value_count(p) > 1),
        }
    }

    pub fn position_values(&self, position: usize) -> impl Iterator<Item = E::Value<'_>> + '_ {
        let start = self.first_value_index(position);
        let end = start + self.value_count(position);
        (start..end).map(move |i| self.value(i))
    }

    /// Owned values per position. Nulls are empty rows.
    pub fn to_rows(&self) -> Vec<Vec<E::Owned>> {
        (0..self.position_count())
            .map(|p| self.position_values(p).map(E::to_owned_value).collect())
            .collect()
    }

    /// Bytes accounted against the memory pool for this block.
    pub fn reserved_bytes(&self) -> usize {
        match &self.repr {
            Repr::Vector(v) => v.reserved_bytes(),
            Repr::Values { reservation, .. } => reservation.size(),
        }
    }

    /// Converts to the most compact arrow representation: a plain (nullable) array unless some
    /// position holds more than one value.
    pub fn to_arrow(&self) -> Result<ArrayRef> {
        match &self.repr {
            Repr::Vector(v) => v.to_arrow(),
            Repr::Values { .. } if self.may_have_multivalues() => {
                Ok(Arc::new(self.to_list_array()?) as ArrayRef)
            }
            Repr::Values { values, .. } => {
                let indices = (0..self.position_count())
                    .map(|p| {
                        if self.is_null(p) {
                            None
                        } else {
                            Some(self.first_value_index(p) as u32)
                        }
                    })
                    .collect::<Vec<_>>();

                Ok(take(values, &UInt32Array::from(indices), None)?)
            }
        }
    }

    pub fn to_list_array(&self) -> Result<ListArray> {
        let field = Arc::new(Field::new(LIST_ITEM_FIELD, E::KIND.data_type(), true));
        match &self.repr {
            Repr::Vector(v) => {
                let offsets = OffsetBuffer::from_lengths(std::iter::repeat(1).take(v.position_count()));
                Ok(ListArray::try_new(field, offsets, v.to_arrow()?, None)?)
            }
            Repr::Values {
                values,
                first_value_indexes,
                ..
            } => {
                let nulls = if self.may_have_nulls() {
                    Some(NullBuffer::from(
                        (0..self.position_count())
                            .map(|p| !self.is_null(p))
                            .collect::<Vec<_>>(),
                    ))
                } else {
                    None
                };

                Ok(ListArray::try_new(
                    field,
                    first_value_indexes.clone(),
                    Arc::new(values.clone()) as ArrayRef,
                    nulls,
                )?)
            }
        }
    }
}

/// Logical equality: same positions holding the same values, regardless of representation.
impl<E: ElementType> PartialEq for Block<E> {
    fn eq(&self, other: &Self) -> bool {
        if self.position_count() != other.position_count() {
            return false;
        }

        (0..self.position_count()).all(|p| {
            self.value_count(p) == other.value_count(p)
                && self.position_values(p).eq(other.position_values(p))
        })
    }
}
