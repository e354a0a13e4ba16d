use std::sync::Arc;

use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::array::ListArray;
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;

use crate::data::downcast_array;
use crate::data::AnyBlock;
use crate::data::Block;
use crate::data::BlockFactory;
use crate::data::BooleanType;
use crate::data::BytesRefType;
use crate::data::DoubleType;
use crate::data::ElementKind;
use crate::data::ElementType;
use crate::data::IntType;
use crate::data::LongType;
use crate::data::LIST_ITEM_FIELD;
use crate::error::ComputeError;
use crate::error::Result;

impl<E: ElementType> Block<E> {
    /// Reads an arrow array of `E` storage, or a list of it.
    ///
    /// Null or empty list entries become null positions, null list items are skipped.
    pub fn from_arrow(factory: &BlockFactory, array: &dyn Array) -> Result<Self> {
        if let Some(list) = array.as_any().downcast_ref::<ListArray>() {
            return Self::from_list_array(factory, list);
        }

        let values = downcast_array::<E>(array)?;
        if values.null_count() == 0 {
            return Ok(factory.new_vector::<E>(values.clone())?.into_block());
        }

        let mut builder = factory.new_block_builder::<E>(values.len());
        for p in 0..values.len() {
            if values.is_null(p) {
                builder.append_null()?;
            } else {
                builder.append_value(E::value(values, p))?;
            }
        }

        builder.build()
    }

    fn from_list_array(factory: &BlockFactory, list: &ListArray) -> Result<Self> {
        let values = downcast_array::<E>(list.values().as_ref())?;
        let offsets = list.offsets();
        let mut builder = factory.new_block_builder::<E>(list.len());
        for p in 0..list.len() {
            if list.is_null(p) {
                builder.append_null()?;
                continue;
            }

            let start = offsets[p] as usize;
            let end = offsets[p + 1] as usize;
            let value_count = (start..end).filter(|i| values.is_valid(*i)).count();
            match value_count {
                0 => builder.append_null()?,
                1 => {
                    let i = (start..end).find(|i| values.is_valid(*i)).ok_or_else(|| {
                        ComputeError::Internal("list item disappeared".to_string())
                    })?;
                    builder.append_value(E::value(values, i))?;
                }
                _ => {
                    builder.begin_position_entry()?;
                    for i in (start..end).filter(|i| values.is_valid(*i)) {
                        builder.append_value(E::value(values, i))?;
                    }
                    builder.end_position_entry()?;
                }
            }
        }

        builder.build()
    }
}

/// Casts text and large binary storage, including list items, to the `Binary` storage of
/// [BytesRefType].
fn normalize(array: &ArrayRef, kind: ElementKind) -> Result<ArrayRef> {
    if kind != ElementKind::BytesRef {
        return Ok(array.clone());
    }

    match array.data_type() {
        DataType::Binary => Ok(array.clone()),
        DataType::List(f) if f.data_type() == &DataType::Binary => Ok(array.clone()),
        DataType::List(_) => {
            let item = Field::new(LIST_ITEM_FIELD, DataType::Binary, true);
            Ok(cast(array, &DataType::List(Arc::new(item)))?)
        }
        _ => Ok(cast(array, &DataType::Binary)?),
    }
}

impl AnyBlock {
    pub fn from_arrow(factory: &BlockFactory, array: &ArrayRef) -> Result<Self> {
        let item_type = match array.data_type() {
            DataType::List(f) => f.data_type(),
            other => other,
        };
        let kind = ElementKind::from_data_type(item_type)
            .ok_or_else(|| ComputeError::UnsupportedType(array.data_type().to_string()))?;
        let array = normalize(array, kind)?;

        Ok(match kind {
            ElementKind::Boolean => {
                AnyBlock::Boolean(Block::<BooleanType>::from_arrow(factory, array.as_ref())?)
            }
            ElementKind::Int => AnyBlock::Int(Block::<IntType>::from_arrow(factory, array.as_ref())?),
            ElementKind::Long => {
                AnyBlock::Long(Block::<LongType>::from_arrow(factory, array.as_ref())?)
            }
            ElementKind::Double => {
                AnyBlock::Double(Block::<DoubleType>::from_arrow(factory, array.as_ref())?)
            }
            ElementKind::BytesRef => {
                AnyBlock::BytesRef(Block::<BytesRefType>::from_arrow(factory, array.as_ref())?)
            }
        })
    }
}
