use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::mem::size_of;

use arrow::buffer::OffsetBuffer;
use arrow::buffer::ScalarBuffer;
use datafusion::execution::memory_pool::MemoryReservation;

use crate::data::Block;
use crate::data::ElementType;
use crate::data::Vector;
use crate::error::ComputeError;
use crate::error::Result;

/// Smallest growth step of a builder's memory reservation.
const MIN_RESERVATION_STEP: usize = 1024;

/// Append-only constructor of a [Block].
///
/// Each position is exactly one of: [BlockBuilder::append_null], a single
/// [BlockBuilder::append_value], or [BlockBuilder::begin_position_entry], values,
/// [BlockBuilder::end_position_entry].
///
/// Memory is reserved from the pool while appending. [BlockBuilder::build] hands the
/// reservation to the block; dropping the builder without building returns it.
pub struct BlockBuilder<E: ElementType> {
    values: E::ArrayBuilder,
    first_value_indexes: Vec<i32>,
    value_count: usize,
    entry_start: Option<usize>,
    single_valued: bool,
    estimated_bytes: usize,
    reservation: MemoryReservation,
}

impl<E: ElementType> BlockBuilder<E> {
    pub(crate) fn new(capacity: usize, reservation: MemoryReservation) -> Self {
        let mut first_value_indexes = Vec::with_capacity(capacity + 1);
        first_value_indexes.push(0);

        Self {
            values: E::new_array_builder(capacity),
            first_value_indexes,
            value_count: 0,
            entry_start: None,
            single_valued: true,
            estimated_bytes: 0,
            reservation,
        }
    }

    pub fn position_count(&self) -> usize {
        self.first_value_indexes.len() - 1
    }

    /// Bytes currently reserved from the pool.
    pub fn reserved_bytes(&self) -> usize {
        self.reservation.size()
    }

    fn account(&mut self, bytes: usize) -> Result<()> {
        let required = self.estimated_bytes + bytes;
        let reserved = self.reservation.size();
        if required > reserved {
            let target = required.max(reserved * 2).max(MIN_RESERVATION_STEP);
            if self.reservation.try_grow(target - reserved).is_err() {
                self.reservation.try_grow(required - reserved)?;
            }
        }
        self.estimated_bytes = required;

        Ok(())
    }

    fn close_position(&mut self) -> Result<()> {
        let end = i32::try_from(self.value_count).map_err(|_| {
            ComputeError::Builder(format!("{} values overflow the offsets", self.value_count))
        })?;
        self.first_value_indexes.push(end);

        Ok(())
    }

    pub fn append_null(&mut self) -> Result<()> {
        if self.entry_start.is_some() {
            return Err(ComputeError::Builder(
                "null appended inside an open position entry".to_string(),
            ));
        }
        self.account(size_of::<i32>())?;
        self.single_valued = false;

        self.close_position()
    }

    /// Appends a value. Outside an open entry the value forms its own position.
    pub fn append_value(&mut self, value: E::Value<'_>) -> Result<()> {
        let bytes = E::value_bytes(value);
        if self.entry_start.is_none() {
            self.account(bytes + size_of::<i32>())?;
            E::append(&mut self.values, value);
            self.value_count += 1;
            return self.close_position();
        }

        self.account(bytes)?;
        E::append(&mut self.values, value);
        self.value_count += 1;

        Ok(())
    }

    pub fn begin_position_entry(&mut self) -> Result<()> {
        if self.entry_start.is_some() {
            return Err(ComputeError::Builder(
                "position entry is already open".to_string(),
            ));
        }
        self.entry_start = Some(self.value_count);

        Ok(())
    }

    /// Closes the open entry. An entry without values is a null position.
    pub fn end_position_entry(&mut self) -> Result<()> {
        let start = self.entry_start.take().ok_or_else(|| {
            ComputeError::Builder("no position entry to end".to_string())
        })?;
        self.account(size_of::<i32>())?;
        if self.value_count - start != 1 {
            self.single_valued = false;
        }

        self.close_position()
    }

    pub fn build(mut self) -> Result<Block<E>> {
        if self.entry_start.is_some() {
            return Err(ComputeError::Builder(
                "build with an open position entry".to_string(),
            ));
        }
        let excess = self.reservation.size().saturating_sub(self.estimated_bytes);
        if excess > 0 {
            self.reservation.shrink(excess);
        }

        let position_count = self.position_count();
        let values = E::finish(&mut self.values);
        if self.single_valued {
            return Ok(Vector::try_new(values, position_count, false, self.reservation)?.into_block());
        }

        let first_value_indexes =
            OffsetBuffer::new(ScalarBuffer::from(self.first_value_indexes));
        Block::try_new(values, first_value_indexes, self.reservation)
    }
}

impl<E: ElementType> Debug for BlockBuilder<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockBuilder")
            .field("element", &E::KIND)
            .field("positions", &self.position_count())
            .field("values", &self.value_count)
            .field("entry_open", &self.entry_start.is_some())
            .field("reserved", &self.reservation.size())
            .finish()
    }
}
