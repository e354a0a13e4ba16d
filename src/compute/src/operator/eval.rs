use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;

use tracing::debug;

use crate::data::Block;
use crate::data::BlockRef;
use crate::data::ElementType;
use crate::data::Page;
use crate::data::Vector;
use crate::error::Result;
use crate::operator::DriverContext;

/// Evaluates an expression over a page, producing one block with the page's positions.
pub trait ExpressionEvaluator: Debug + Send {
    fn eval(&mut self, page: &Page) -> Result<BlockRef>;
}

/// Creates evaluators bound to a driver. Trees of factories describe expression trees.
pub trait ExpressionEvaluatorFactory: Debug + Display + Send + Sync {
    fn get(&self, ctx: &Arc<DriverContext>) -> Result<Box<dyn ExpressionEvaluator>>;
}

/// Evaluator of one typed input, with a fast path for vectors.
pub trait TypedEvaluator<E: ElementType> {
    fn name(&self) -> String;

    /// Evaluates a vector: every position holds exactly one value.
    fn eval_vector(&mut self, vector: &Vector<E>) -> Result<BlockRef>;

    /// Evaluates any block, including vector-backed ones.
    fn eval_block(&mut self, block: &Block<E>) -> Result<BlockRef>;

    fn eval_typed(&mut self, block: &Block<E>) -> Result<BlockRef> {
        match block.as_vector() {
            Some(vector) => self.eval_vector(vector),
            None => self.eval_block(block),
        }
    }
}

/// Returns the block of one page channel.
#[derive(Debug)]
pub struct LoadFromPage {
    channel: usize,
}

impl ExpressionEvaluator for LoadFromPage {
    fn eval(&mut self, page: &Page) -> Result<BlockRef> {
        Ok(page.block(self.channel)?.clone())
    }
}

#[derive(Debug, Clone)]
pub struct LoadFromPageFactory {
    channel: usize,
}

impl LoadFromPageFactory {
    pub fn new(channel: usize) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl Display for LoadFromPageFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute[channel={}]", self.channel)
    }
}

impl ExpressionEvaluatorFactory for LoadFromPageFactory {
    fn get(&self, _ctx: &Arc<DriverContext>) -> Result<Box<dyn ExpressionEvaluator>> {
        Ok(Box::new(LoadFromPage {
            channel: self.channel,
        }))
    }
}

/// Appends the result of an evaluator to each page as a new channel.
#[derive(Debug)]
pub struct EvalOperator {
    evaluator: Box<dyn ExpressionEvaluator>,
}

impl EvalOperator {
    pub fn new(evaluator: Box<dyn ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }

    pub fn try_new(
        factory: &dyn ExpressionEvaluatorFactory,
        ctx: &Arc<DriverContext>,
    ) -> Result<Self> {
        debug!(evaluator = %factory, "eval operator");
        Ok(Self::new(factory.get(ctx)?))
    }

    pub fn process(&mut self, page: &Page) -> Result<Page> {
        let block = self.evaluator.eval(page)?;
        page.append_block(block)
    }
}
