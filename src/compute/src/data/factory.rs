use std::mem::size_of;
use std::sync::Arc;

use arrow::array::Array;
use arrow::buffer::OffsetBuffer;
use datafusion::execution::memory_pool::GreedyMemoryPool;
use datafusion::execution::memory_pool::MemoryConsumer;
use datafusion::execution::memory_pool::MemoryPool;
use datafusion::execution::memory_pool::MemoryReservation;
use datafusion::execution::memory_pool::UnboundedMemoryPool;

use crate::data::Block;
use crate::data::BlockBuilder;
use crate::data::ElementType;
use crate::data::Vector;
use crate::error::Result;

/// The only way to allocate vectors, blocks and builders. Every allocation is accounted
/// against the wrapped memory pool.
#[derive(Debug, Clone)]
pub struct BlockFactory {
    pool: Arc<dyn MemoryPool>,
}

impl BlockFactory {
    pub fn new(pool: Arc<dyn MemoryPool>) -> Self {
        Self { pool }
    }

    pub fn unbounded() -> Self {
        Self::new(Arc::new(UnboundedMemoryPool::default()))
    }

    pub fn with_memory_limit(limit: usize) -> Self {
        Self::new(Arc::new(GreedyMemoryPool::new(limit)))
    }

    pub fn pool(&self) -> &Arc<dyn MemoryPool> {
        &self.pool
    }

    /// Bytes currently held by live blocks and builders of this factory's pool.
    pub fn reserved(&self) -> usize {
        self.pool.reserved()
    }

    fn reservation<E: ElementType>(&self, what: &str) -> MemoryReservation {
        MemoryConsumer::new(format!("{}{}", E::KIND, what)).register(&self.pool)
    }

    pub fn new_block_builder<E: ElementType>(&self, estimated_positions: usize) -> BlockBuilder<E> {
        BlockBuilder::new(estimated_positions, self.reservation::<E>("BlockBuilder"))
    }

    /// Wraps an arrow array without nulls as a vector.
    pub fn new_vector<E: ElementType>(&self, values: E::Array) -> Result<Vector<E>> {
        let mut reservation = self.reservation::<E>("Vector");
        reservation.try_grow(values.get_array_memory_size())?;
        let position_count = values.len();

        Vector::try_new(values, position_count, false, reservation)
    }

    pub fn new_constant_vector<E: ElementType>(
        &self,
        value: E::Value<'_>,
        position_count: usize,
    ) -> Result<Vector<E>> {
        let mut reservation = self.reservation::<E>("ConstantVector");
        reservation.try_grow(E::value_bytes(value))?;
        let mut builder = E::new_array_builder(1);
        E::append(&mut builder, value);

        Vector::try_new(E::finish(&mut builder), position_count, true, reservation)
    }

    pub fn new_constant_block<E: ElementType>(
        &self,
        value: E::Value<'_>,
        position_count: usize,
    ) -> Result<Block<E>> {
        Ok(self.new_constant_vector(value, position_count)?.into_block())
    }

    pub fn new_constant_null_block<E: ElementType>(&self, position_count: usize) -> Result<Block<E>> {
        let mut reservation = self.reservation::<E>("ConstantNullBlock");
        reservation.try_grow((position_count + 1) * size_of::<i32>())?;
        let first_value_indexes = OffsetBuffer::new_zeroed(position_count);

        Block::try_new(
            E::finish(&mut E::new_array_builder(0)),
            first_value_indexes,
            reservation,
        )
    }
}
