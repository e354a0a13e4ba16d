use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

use arrow::array::Array;
use arrow::array::BinaryArray;
use arrow::array::BinaryBuilder;
use arrow::array::BooleanArray;
use arrow::array::BooleanBuilder;
use arrow::array::Float64Array;
use arrow::array::Float64Builder;
use arrow::array::Int32Array;
use arrow::array::Int32Builder;
use arrow::array::Int64Array;
use arrow::array::Int64Builder;
use arrow::datatypes::DataType;

use crate::data::AnyBlock;
use crate::data::Block;
use crate::error::ComputeError;
use crate::error::Result;

/// Physical storage kind of the values held by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Boolean,
    Int,
    Long,
    Double,
    BytesRef,
}

impl ElementKind {
    pub fn data_type(&self) -> DataType {
        match self {
            ElementKind::Boolean => DataType::Boolean,
            ElementKind::Int => DataType::Int32,
            ElementKind::Long => DataType::Int64,
            ElementKind::Double => DataType::Float64,
            ElementKind::BytesRef => DataType::Binary,
        }
    }

    /// Maps an arrow type onto the element kind that stores it, if any.
    pub fn from_data_type(data_type: &DataType) -> Option<ElementKind> {
        match data_type {
            DataType::Boolean => Some(ElementKind::Boolean),
            DataType::Int32 => Some(ElementKind::Int),
            DataType::Int64 => Some(ElementKind::Long),
            DataType::Float64 => Some(ElementKind::Double),
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Binary | DataType::LargeBinary => {
                Some(ElementKind::BytesRef)
            }
            _ => None,
        }
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Boolean => write!(f, "Boolean"),
            ElementKind::Int => write!(f, "Int"),
            ElementKind::Long => write!(f, "Long"),
            ElementKind::Double => write!(f, "Double"),
            ElementKind::BytesRef => write!(f, "BytesRef"),
        }
    }
}

/// Typed access to one element kind.
///
/// Each kind has a marker type implementing this trait. Vectors, blocks and builders are
/// generic over it, so the evaluator code is written once and specialised per storage type.
pub trait ElementType: Debug + Send + Sync + Sized + 'static {
    const KIND: ElementKind;

    /// Value as read from storage. Borrowed for variable-width kinds.
    type Value<'a>: Copy + Debug + PartialEq
    where
        Self: 'a;
    type Owned: Clone + Debug + PartialEq + Send + Sync;
    type Array: Array + Clone + 'static;
    type ArrayBuilder: Send;

    fn new_array_builder(capacity: usize) -> Self::ArrayBuilder;

    fn append(builder: &mut Self::ArrayBuilder, value: Self::Value<'_>);

    fn finish(builder: &mut Self::ArrayBuilder) -> Self::Array;

    fn value(array: &Self::Array, index: usize) -> Self::Value<'_>;

    /// Estimated bytes one value occupies once appended.
    fn value_bytes(value: Self::Value<'_>) -> usize;

    fn to_owned_value(value: Self::Value<'_>) -> Self::Owned;

    fn as_value(owned: &Self::Owned) -> Self::Value<'_>;

    fn wrap(block: Block<Self>) -> AnyBlock;

    fn downcast(block: &AnyBlock) -> Option<&Block<Self>>;
}

pub fn downcast_array<E: ElementType>(array: &dyn Array) -> Result<&E::Array> {
    array.as_any().downcast_ref::<E::Array>().ok_or_else(|| {
        ComputeError::InvalidBlock(format!(
            "expected {} storage, got {}",
            E::KIND.data_type(),
            array.data_type()
        ))
    })
}

macro_rules! primitive_element_type {
    ($name:ident, $kind:ident, $native:ty, $array:ty, $builder:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl ElementType for $name {
            const KIND: ElementKind = ElementKind::$kind;

            type Value<'a> = $native;
            type Owned = $native;
            type Array = $array;
            type ArrayBuilder = $builder;

            fn new_array_builder(capacity: usize) -> Self::ArrayBuilder {
                <$builder>::with_capacity(capacity)
            }

            fn append(builder: &mut Self::ArrayBuilder, value: Self::Value<'_>) {
                builder.append_value(value);
            }

            fn finish(builder: &mut Self::ArrayBuilder) -> Self::Array {
                builder.finish()
            }

            fn value(array: &Self::Array, index: usize) -> Self::Value<'_> {
                array.value(index)
            }

            fn value_bytes(_value: Self::Value<'_>) -> usize {
                std::mem::size_of::<$native>()
            }

            fn to_owned_value(value: Self::Value<'_>) -> Self::Owned {
                value
            }

            fn as_value(owned: &Self::Owned) -> Self::Value<'_> {
                *owned
            }

            fn wrap(block: Block<Self>) -> AnyBlock {
                AnyBlock::$kind(block)
            }

            fn downcast(block: &AnyBlock) -> Option<&Block<Self>> {
                match block {
                    AnyBlock::$kind(b) => Some(b),
                    _ => None,
                }
            }
        }
    };
}

primitive_element_type!(BooleanType, Boolean, bool, BooleanArray, BooleanBuilder);
primitive_element_type!(IntType, Int, i32, Int32Array, Int32Builder);
primitive_element_type!(LongType, Long, i64, Int64Array, Int64Builder);
primitive_element_type!(DoubleType, Double, f64, Float64Array, Float64Builder);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesRefType;

impl ElementType for BytesRefType {
    const KIND: ElementKind = ElementKind::BytesRef;

    type Value<'a> = &'a [u8];
    type Owned = Vec<u8>;
    type Array = BinaryArray;
    type ArrayBuilder = BinaryBuilder;

    fn new_array_builder(capacity: usize) -> Self::ArrayBuilder {
        BinaryBuilder::with_capacity(capacity, capacity * 8)
    }

    fn append(builder: &mut Self::ArrayBuilder, value: Self::Value<'_>) {
        builder.append_value(value);
    }

    fn finish(builder: &mut Self::ArrayBuilder) -> Self::Array {
        builder.finish()
    }

    fn value(array: &Self::Array, index: usize) -> Self::Value<'_> {
        array.value(index)
    }

    fn value_bytes(value: Self::Value<'_>) -> usize {
        // offset slot plus payload
        std::mem::size_of::<i32>() + value.len()
    }

    fn to_owned_value(value: Self::Value<'_>) -> Self::Owned {
        value.to_vec()
    }

    fn as_value(owned: &Self::Owned) -> Self::Value<'_> {
        owned.as_slice()
    }

    fn wrap(block: Block<Self>) -> AnyBlock {
        AnyBlock::BytesRef(block)
    }

    fn downcast(block: &AnyBlock) -> Option<&Block<Self>> {
        match block {
            AnyBlock::BytesRef(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;

    use crate::data::ElementKind;

    #[test]
    fn data_type_mapping() {
        assert_eq!(
            ElementKind::from_data_type(&DataType::Utf8),
            Some(ElementKind::BytesRef)
        );
        assert_eq!(
            ElementKind::from_data_type(&DataType::Int32),
            Some(ElementKind::Int)
        );
        assert_eq!(ElementKind::from_data_type(&DataType::Float32), None);
        assert_eq!(ElementKind::Long.data_type(), DataType::Int64);
        assert_eq!(ElementKind::BytesRef.to_string(), "BytesRef");
    }
}
