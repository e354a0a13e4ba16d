pub mod convert;
pub mod data;
pub mod error;
pub mod operator;
pub mod udf;

pub use data::AnyBlock;
pub use data::Block;
pub use data::BlockFactory;
pub use data::BlockRef;
pub use data::Page;
pub use data::Vector;
pub use error::ComputeError;
pub use error::Result;
pub use operator::DriverContext;

pub const METRIC_EVAL_POSITIONS_TOTAL: &str = "compute_eval_positions_total";
pub const METRIC_CONVERSION_FAILURES_TOTAL: &str = "compute_conversion_failures_total";

pub mod test_util {
    use std::sync::Arc;

    use crate::data::AnyBlock;
    use crate::data::Block;
    use crate::data::BlockFactory;
    use crate::data::BlockRef;
    use crate::data::BytesRefType;
    use crate::data::ElementType;
    use crate::data::Page;
    use crate::error::ComputeError;
    use crate::error::Result;
    use crate::operator::DriverContext;

    /// Builds a block from rows of owned values. An empty row is a null, a row with more than
    /// one value a multi-value entry.
    pub fn block_of<E: ElementType>(
        factory: &BlockFactory,
        rows: &[Vec<E::Owned>],
    ) -> Result<Block<E>> {
        let mut builder = factory.new_block_builder::<E>(rows.len());
        for row in rows {
            match row.as_slice() {
                [] => builder.append_null()?,
                [v] => builder.append_value(E::as_value(v))?,
                values => {
                    builder.begin_position_entry()?;
                    for v in values {
                        builder.append_value(E::as_value(v))?;
                    }
                    builder.end_position_entry()?;
                }
            }
        }

        builder.build()
    }

    /// Text block from rows of string literals.
    pub fn text_block(factory: &BlockFactory, rows: &[Vec<&str>]) -> Result<Block<BytesRefType>> {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| v.as_bytes().to_vec()).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        block_of::<BytesRefType>(factory, &rows)
    }

    pub fn page_of<E: ElementType>(block: Block<E>) -> Result<Page> {
        Page::try_new(vec![AnyBlock::from(block).into_ref()])
    }

    /// Owned rows of a block, failing if it holds another element type.
    pub fn rows_of<E: ElementType>(block: &BlockRef) -> Result<Vec<Vec<E::Owned>>> {
        typed::<E>(block).map(|b| b.to_rows())
    }

    pub fn typed<E: ElementType>(block: &BlockRef) -> Result<&Block<E>> {
        E::downcast(block).ok_or_else(|| {
            ComputeError::InvalidBlock(format!(
                "expected {} block, got {}",
                E::KIND,
                block.element_kind()
            ))
        })
    }

    pub fn driver_context() -> Arc<DriverContext> {
        Arc::new(DriverContext::new(BlockFactory::unbounded()))
    }
}
