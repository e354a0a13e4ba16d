pub mod block;
pub mod builder;
pub mod element;
pub mod factory;
pub mod interop;
pub mod page;
pub mod vector;

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::array::ListArray;
pub use block::Block;
pub use block::LIST_ITEM_FIELD;
pub use builder::BlockBuilder;
pub use element::downcast_array;
pub use element::BooleanType;
pub use element::BytesRefType;
pub use element::DoubleType;
pub use element::ElementKind;
pub use element::ElementType;
pub use element::IntType;
pub use element::LongType;
pub use factory::BlockFactory;
pub use page::Page;
pub use vector::Vector;

use crate::error::Result;

/// Block of any element kind.
#[derive(Debug, PartialEq)]
pub enum AnyBlock {
    Boolean(Block<BooleanType>),
    Int(Block<IntType>),
    Long(Block<LongType>),
    Double(Block<DoubleType>),
    BytesRef(Block<BytesRefType>),
}

/// Shared block. The block and its memory are released with the last reference.
pub type BlockRef = Arc<AnyBlock>;

macro_rules! dispatch {
    ($self:expr, $b:ident => $body:expr) => {
        match $self {
            AnyBlock::Boolean($b) => $body,
            AnyBlock::Int($b) => $body,
            AnyBlock::Long($b) => $body,
            AnyBlock::Double($b) => $body,
            AnyBlock::BytesRef($b) => $body,
        }
    };
}

impl AnyBlock {
    pub fn element_kind(&self) -> ElementKind {
        match self {
            AnyBlock::Boolean(_) => ElementKind::Boolean,
            AnyBlock::Int(_) => ElementKind::Int,
            AnyBlock::Long(_) => ElementKind::Long,
            AnyBlock::Double(_) => ElementKind::Double,
            AnyBlock::BytesRef(_) => ElementKind::BytesRef,
        }
    }

    pub fn position_count(&self) -> usize {
        dispatch!(self, b => b.position_count())
    }

    pub fn reserved_bytes(&self) -> usize {
        dispatch!(self, b => b.reserved_bytes())
    }

    pub fn to_arrow(&self) -> Result<ArrayRef> {
        dispatch!(self, b => b.to_arrow())
    }

    pub fn to_list_array(&self) -> Result<ListArray> {
        dispatch!(self, b => b.to_list_array())
    }

    pub fn into_ref(self) -> BlockRef {
        Arc::new(self)
    }
}

impl<E: ElementType> From<Block<E>> for AnyBlock {
    fn from(block: Block<E>) -> Self {
        E::wrap(block)
    }
}
