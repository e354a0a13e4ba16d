use std::sync::Mutex;
use std::sync::MutexGuard;

use common::config::Compute;
use common::config::WarningsMode;
use common::config::DEFAULT_BATCH_SIZE;
use common::config::DEFAULT_MAX_WARNINGS;
use tracing::debug;

use crate::data::BlockFactory;

/// Resources of one unit of parallel execution: the block factory with its memory pool and
/// the sink for conversion warnings.
#[derive(Debug)]
pub struct DriverContext {
    block_factory: BlockFactory,
    warnings_mode: WarningsMode,
    max_warnings: usize,
    batch_size: usize,
    warnings: Mutex<Vec<String>>,
}

impl DriverContext {
    pub fn new(block_factory: BlockFactory) -> Self {
        Self {
            block_factory,
            warnings_mode: WarningsMode::Collect,
            max_warnings: DEFAULT_MAX_WARNINGS,
            batch_size: DEFAULT_BATCH_SIZE,
            warnings: Mutex::new(vec![]),
        }
    }

    pub fn from_config(cfg: &Compute) -> Self {
        let block_factory = match cfg.memory_limit {
            Some(limit) => BlockFactory::with_memory_limit(limit),
            None => BlockFactory::unbounded(),
        };
        debug!(
            memory_limit = ?cfg.memory_limit,
            warnings_mode = ?cfg.warnings_mode,
            "driver context"
        );

        Self {
            block_factory,
            warnings_mode: cfg.warnings_mode,
            max_warnings: cfg.max_warnings,
            batch_size: cfg.batch_size,
            warnings: Mutex::new(vec![]),
        }
    }

    pub fn with_warnings_mode(mut self, mode: WarningsMode) -> Self {
        self.warnings_mode = mode;
        self
    }

    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    pub fn block_factory(&self) -> &BlockFactory {
        &self.block_factory
    }

    pub fn warnings_mode(&self) -> WarningsMode {
        self.warnings_mode
    }

    pub fn max_warnings(&self) -> usize {
        self.max_warnings
    }

    /// Maximum positions handed to an evaluator at once by adapters slicing larger inputs.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn lock_warnings(&self) -> MutexGuard<'_, Vec<String>> {
        self.warnings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_warning(&self, warning: impl Into<String>) {
        if self.warnings_mode == WarningsMode::Ignore {
            return;
        }
        let warning = warning.into();
        debug!(%warning, "warning");
        self.lock_warnings().push(warning);
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lock_warnings().clone()
    }

    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock_warnings())
    }
}

impl Default for DriverContext {
    fn default() -> Self {
        Self::new(BlockFactory::unbounded())
    }
}
