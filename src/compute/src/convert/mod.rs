pub mod to_boolean;
pub mod to_double;
pub mod to_long;
pub mod to_string;
pub mod warnings;

use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;

use metrics::counter;
use thiserror::Error;
use tracing::debug;
use tracing::trace;
pub use warnings::SharedWarnings;
pub use warnings::Source;
pub use warnings::Warnings;

use crate::convert::warnings::lock_shared;
use crate::data::AnyBlock;
use crate::data::Block;
use crate::data::BlockRef;
use crate::data::ElementKind;
use crate::data::ElementType;
use crate::data::Page;
use crate::data::Vector;
use crate::error::ComputeError;
use crate::error::Result;
use crate::operator::DriverContext;
use crate::operator::ExpressionEvaluator;
use crate::operator::ExpressionEvaluatorFactory;
use crate::operator::TypedEvaluator;
use crate::METRIC_CONVERSION_FAILURES_TOTAL;
use crate::METRIC_EVAL_POSITIONS_TOTAL;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("cannot parse [{0}] as a number")]
    InvalidNumber(String),
    #[error("[{value}] out of [{target}] range")]
    OutOfRange { value: String, target: ElementKind },
    #[error("invalid utf-8 sequence")]
    InvalidUtf8,
    #[error("formatting failed")]
    Formatting,
}

/// What an evaluator does when a conversion fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPolicy {
    /// The function never fails. A failure is an internal error.
    Total,
    /// The failed value is dropped and a warning registered. A position left without values
    /// is null.
    NullOnFailure,
    /// The evaluation fails with [ComputeError::Conversion].
    Abort,
}

/// Elementwise mapping between two element types.
///
/// `apply` must depend on its input only. `Scratch` is owned by the evaluator and reused for
/// every value of a batch; outputs may borrow from it until the next call.
pub trait ConversionFunction: Debug + Send + Sync + 'static {
    type Input: ElementType;
    type Output: ElementType;
    type Scratch: Default + Send;

    const NAME: &'static str;
    const POLICY: ConversionPolicy;

    fn apply<'s>(
        value: <Self::Input as ElementType>::Value<'_>,
        scratch: &'s mut Self::Scratch,
    ) -> std::result::Result<<Self::Output as ElementType>::Value<'s>, ConversionError>;
}

fn on_failure<F: ConversionFunction>(
    warnings: &Mutex<Warnings>,
    ctx: &DriverContext,
    err: ConversionError,
) -> Result<()> {
    match F::POLICY {
        ConversionPolicy::Total => Err(ComputeError::Internal(format!(
            "total function {} failed: {}",
            F::NAME,
            err
        ))),
        ConversionPolicy::Abort => Err(ComputeError::Conversion {
            function: F::NAME,
            source: err,
        }),
        ConversionPolicy::NullOnFailure => {
            counter!(METRIC_CONVERSION_FAILURES_TOTAL, "function" => F::NAME).increment(1);
            lock_shared(warnings).register(ctx, &err);
            Ok(())
        }
    }
}

/// Applies a [ConversionFunction] to the block produced by the upstream evaluator.
pub struct ConvertEvaluator<F: ConversionFunction> {
    ctx: Arc<DriverContext>,
    field: Box<dyn ExpressionEvaluator>,
    scratch: F::Scratch,
    warnings: SharedWarnings,
    _function: PhantomData<F>,
}

impl<F: ConversionFunction> ConvertEvaluator<F> {
    pub fn new(ctx: Arc<DriverContext>, field: Box<dyn ExpressionEvaluator>, source: Source) -> Self {
        Self::with_warnings(ctx, field, Warnings::shared(source))
    }

    /// Evaluator registering its failures into `warnings`, which other evaluators of the same
    /// expression may share.
    pub fn with_warnings(
        ctx: Arc<DriverContext>,
        field: Box<dyn ExpressionEvaluator>,
        warnings: SharedWarnings,
    ) -> Self {
        Self {
            ctx,
            field,
            scratch: F::Scratch::default(),
            warnings,
            _function: PhantomData,
        }
    }

    /// Snapshot of the failures registered so far.
    pub fn warnings(&self) -> Warnings {
        lock_shared(&self.warnings).clone()
    }
}

impl<F: ConversionFunction> TypedEvaluator<F::Input> for ConvertEvaluator<F> {
    fn name(&self) -> String {
        F::NAME.to_string()
    }

    fn eval_vector(&mut self, vector: &Vector<F::Input>) -> Result<BlockRef> {
        let factory = self.ctx.block_factory();
        let position_count = vector.position_count();

        if vector.is_constant() {
            if position_count == 0 {
                let block = factory.new_constant_null_block::<F::Output>(0)?;
                return Ok(AnyBlock::from(block).into_ref());
            }
            let block = match F::apply(vector.value(0), &mut self.scratch) {
                Ok(v) => factory.new_constant_block::<F::Output>(v, position_count)?,
                Err(err) => {
                    on_failure::<F>(&self.warnings, &self.ctx, err)?;
                    factory.new_constant_null_block::<F::Output>(position_count)?
                }
            };
            return Ok(AnyBlock::from(block).into_ref());
        }

        let mut builder = factory.new_block_builder::<F::Output>(position_count);
        for p in 0..position_count {
            match F::apply(vector.value(p), &mut self.scratch) {
                Ok(v) => builder.append_value(v)?,
                Err(err) => {
                    on_failure::<F>(&self.warnings, &self.ctx, err)?;
                    builder.append_null()?;
                }
            }
        }

        Ok(AnyBlock::from(builder.build()?).into_ref())
    }

    fn eval_block(&mut self, block: &Block<F::Input>) -> Result<BlockRef> {
        let factory = self.ctx.block_factory();
        let position_count = block.position_count();
        let mut builder = factory.new_block_builder::<F::Output>(position_count);

        for p in 0..position_count {
            let value_count = block.value_count(p);
            if value_count == 0 {
                builder.append_null()?;
                continue;
            }

            let start = block.first_value_index(p);
            let multivalued = value_count > 1;
            if multivalued {
                builder.begin_position_entry()?;
            }
            let mut appended = 0;
            for i in start..start + value_count {
                match F::apply(block.value(i), &mut self.scratch) {
                    Ok(v) => {
                        builder.append_value(v)?;
                        appended += 1;
                    }
                    Err(err) => on_failure::<F>(&self.warnings, &self.ctx, err)?,
                }
            }
            if multivalued {
                builder.end_position_entry()?;
            } else if appended == 0 {
                builder.append_null()?;
            }
        }

        Ok(AnyBlock::from(builder.build()?).into_ref())
    }
}

impl<F: ConversionFunction> ExpressionEvaluator for ConvertEvaluator<F> {
    fn eval(&mut self, page: &Page) -> Result<BlockRef> {
        let input = self.field.eval(page)?;
        let block = <F::Input as ElementType>::downcast(&input).ok_or_else(|| {
            ComputeError::InvalidBlock(format!(
                "{} expects {} input, got {}",
                self.name(),
                <F::Input as ElementType>::KIND,
                input.element_kind()
            ))
        })?;

        trace!(
            evaluator = F::NAME,
            positions = block.position_count(),
            "eval"
        );
        counter!(METRIC_EVAL_POSITIONS_TOTAL, "evaluator" => F::NAME)
            .increment(block.position_count() as u64);

        self.eval_typed(block)
    }
}

impl<F: ConversionFunction> Debug for ConvertEvaluator<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertEvaluator")
            .field("function", &F::NAME)
            .field("field", &self.field)
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// Binds a [ConvertEvaluator] to a driver and to the factory of its input.
///
/// Each evaluator gets its own [Warnings] unless the factory was given shared ones.
pub struct ConvertEvaluatorFactory<F: ConversionFunction> {
    field: Arc<dyn ExpressionEvaluatorFactory>,
    source: Source,
    shared: Option<SharedWarnings>,
    _function: PhantomData<F>,
}

impl<F: ConversionFunction> ConvertEvaluatorFactory<F> {
    pub fn new(field: Arc<dyn ExpressionEvaluatorFactory>, source: Source) -> Self {
        Self {
            field,
            source,
            shared: None,
            _function: PhantomData,
        }
    }

    pub fn with_shared_warnings(
        field: Arc<dyn ExpressionEvaluatorFactory>,
        warnings: SharedWarnings,
    ) -> Self {
        let source = lock_shared(&warnings).source().clone();
        Self {
            field,
            source,
            shared: Some(warnings),
            _function: PhantomData,
        }
    }
}

impl<F: ConversionFunction> ExpressionEvaluatorFactory for ConvertEvaluatorFactory<F> {
    fn get(&self, ctx: &Arc<DriverContext>) -> Result<Box<dyn ExpressionEvaluator>> {
        debug!(evaluator = %self, "new evaluator");
        let field = self.field.get(ctx)?;

        let warnings = match &self.shared {
            Some(warnings) => warnings.clone(),
            None => Warnings::shared(self.source.clone()),
        };

        Ok(Box::new(ConvertEvaluator::<F>::with_warnings(
            ctx.clone(),
            field,
            warnings,
        )))
    }
}

impl<F: ConversionFunction> Display for ConvertEvaluatorFactory<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}Evaluator[field={}]", F::NAME, self.field)
    }
}

impl<F: ConversionFunction> Debug for ConvertEvaluatorFactory<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertEvaluatorFactory")
            .field("function", &F::NAME)
            .field("field", &self.field)
            .field("source", &self.source)
            .field("shared", &self.shared.is_some())
            .finish()
    }
}

enum WarningsScope {
    PerEvaluator(Source),
    Shared(SharedWarnings),
}

fn convert<F: ConversionFunction>(
    field: Arc<dyn ExpressionEvaluatorFactory>,
    scope: WarningsScope,
) -> Arc<dyn ExpressionEvaluatorFactory> {
    match scope {
        WarningsScope::PerEvaluator(source) => {
            Arc::new(ConvertEvaluatorFactory::<F>::new(field, source))
        }
        WarningsScope::Shared(warnings) => Arc::new(
            ConvertEvaluatorFactory::<F>::with_shared_warnings(field, warnings),
        ),
    }
}

/// Factory converting the output of `field` from `input` to `target`.
///
/// Identical kinds return `field` itself.
pub fn factory(
    target: ElementKind,
    input: ElementKind,
    field: Arc<dyn ExpressionEvaluatorFactory>,
    source: Source,
) -> Result<Arc<dyn ExpressionEvaluatorFactory>> {
    build(target, input, field, WarningsScope::PerEvaluator(source))
}

/// Like [factory], but every evaluator registers into the same `warnings`.
pub fn shared_factory(
    target: ElementKind,
    input: ElementKind,
    field: Arc<dyn ExpressionEvaluatorFactory>,
    warnings: SharedWarnings,
) -> Result<Arc<dyn ExpressionEvaluatorFactory>> {
    build(target, input, field, WarningsScope::Shared(warnings))
}

fn build(
    target: ElementKind,
    input: ElementKind,
    field: Arc<dyn ExpressionEvaluatorFactory>,
    scope: WarningsScope,
) -> Result<Arc<dyn ExpressionEvaluatorFactory>> {
    use ElementKind::*;

    if target == input {
        return Ok(field);
    }

    let factory = match (input, target) {
        (BytesRef, Boolean) => convert::<to_boolean::ToBooleanFromString>(field, scope),
        (Int, Boolean) => convert::<to_boolean::ToBooleanFromInt>(field, scope),
        (Long, Boolean) => convert::<to_boolean::ToBooleanFromLong>(field, scope),
        (Double, Boolean) => convert::<to_boolean::ToBooleanFromDouble>(field, scope),
        (BytesRef, Long) => convert::<to_long::ToLongFromString>(field, scope),
        (Boolean, Long) => convert::<to_long::ToLongFromBoolean>(field, scope),
        (Int, Long) => convert::<to_long::ToLongFromInt>(field, scope),
        (Double, Long) => convert::<to_long::ToLongFromDouble>(field, scope),
        (BytesRef, Double) => convert::<to_double::ToDoubleFromString>(field, scope),
        (Boolean, Double) => convert::<to_double::ToDoubleFromBoolean>(field, scope),
        (Int, Double) => convert::<to_double::ToDoubleFromInt>(field, scope),
        (Long, Double) => convert::<to_double::ToDoubleFromLong>(field, scope),
        (Boolean, BytesRef) => convert::<to_string::ToStringFromBoolean>(field, scope),
        (Int, BytesRef) => convert::<to_string::ToStringFromInt>(field, scope),
        (Long, BytesRef) => convert::<to_string::ToStringFromLong>(field, scope),
        (Double, BytesRef) => convert::<to_string::ToStringFromDouble>(field, scope),
        (from, to) => return Err(ComputeError::UnsupportedConversion { from, to }),
    };

    Ok(factory)
}
