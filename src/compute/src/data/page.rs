use crate::data::BlockRef;
use crate::error::ComputeError;
use crate::error::Result;

/// Ordered blocks describing the same positions. A block is addressed by its channel.
#[derive(Debug, Clone)]
pub struct Page {
    blocks: Vec<BlockRef>,
    position_count: usize,
}

impl Page {
    pub fn try_new(blocks: Vec<BlockRef>) -> Result<Self> {
        let position_count = blocks.first().map(|b| b.position_count()).unwrap_or(0);
        if let Some((channel, b)) = blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.position_count() != position_count)
        {
            return Err(ComputeError::InvalidBlock(format!(
                "block at channel {} has {} positions, page has {}",
                channel,
                b.position_count(),
                position_count
            )));
        }

        Ok(Self {
            blocks,
            position_count,
        })
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn channel_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, channel: usize) -> Result<&BlockRef> {
        self.blocks.get(channel).ok_or_else(|| {
            ComputeError::InvalidBlock(format!(
                "channel {} out of range, page has {} blocks",
                channel,
                self.blocks.len()
            ))
        })
    }

    /// Returns a page with `block` appended as the last channel.
    pub fn append_block(&self, block: BlockRef) -> Result<Page> {
        if !self.blocks.is_empty() && block.position_count() != self.position_count {
            return Err(ComputeError::InvalidBlock(format!(
                "appended block has {} positions, page has {}",
                block.position_count(),
                self.position_count
            )));
        }
        let mut blocks = self.blocks.clone();
        blocks.push(block);

        Page::try_new(blocks)
    }
}
