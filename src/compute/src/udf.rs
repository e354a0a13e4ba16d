use std::any::Any;
use std::sync::Arc;

use arrow::array::new_null_array;
use arrow::array::Array;
use arrow::array::ArrayRef;
use arrow::compute::cast;
use arrow::compute::concat;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use datafusion::prelude::SessionContext;
use datafusion_common::Result as DFResult;
use datafusion_common::ScalarValue;
use datafusion_expr::ColumnarValue;
use datafusion_expr::ScalarUDF;
use datafusion_expr::ScalarUDFImpl;
use datafusion_expr::Signature;
use datafusion_expr::Volatility;
use tracing::debug;

use crate::convert;
use crate::convert::SharedWarnings;
use crate::convert::Source;
use crate::convert::Warnings;
use crate::data::AnyBlock;
use crate::data::ElementKind;
use crate::data::Page;
use crate::data::LIST_ITEM_FIELD;
use crate::error::ComputeError;
use crate::error::Result;
use crate::operator::DriverContext;
use crate::operator::ExpressionEvaluator;
use crate::operator::LoadFromPageFactory;

pub const TO_BOOLEAN: &str = "to_boolean";
pub const TO_LONG: &str = "to_long";
pub const TO_DOUBLE: &str = "to_double";
pub const TO_STRING: &str = "to_string";

/// Conversion to one target type as a DataFusion scalar function.
///
/// List arguments are multi-valued columns and produce lists. Inputs longer than the driver's
/// batch size are evaluated in slices. Warnings are limited per function over all invocations.
#[derive(Debug)]
pub struct ConvertUdf {
    name: &'static str,
    target: ElementKind,
    ctx: Arc<DriverContext>,
    warnings: SharedWarnings,
    signature: Signature,
}

impl ConvertUdf {
    pub fn new(name: &'static str, target: ElementKind, ctx: Arc<DriverContext>) -> Self {
        Self {
            name,
            target,
            ctx,
            warnings: Warnings::shared(Source::unpositioned(name)),
            signature: Signature::any(1, Volatility::Immutable),
        }
    }

    pub fn to_boolean(ctx: Arc<DriverContext>) -> Self {
        Self::new(TO_BOOLEAN, ElementKind::Boolean, ctx)
    }

    pub fn to_long(ctx: Arc<DriverContext>) -> Self {
        Self::new(TO_LONG, ElementKind::Long, ctx)
    }

    pub fn to_double(ctx: Arc<DriverContext>) -> Self {
        Self::new(TO_DOUBLE, ElementKind::Double, ctx)
    }

    pub fn to_string(ctx: Arc<DriverContext>) -> Self {
        Self::new(TO_STRING, ElementKind::BytesRef, ctx)
    }

    fn target_type(&self) -> DataType {
        match self.target {
            ElementKind::BytesRef => DataType::Utf8,
            other => other.data_type(),
        }
    }

    fn output_type(&self, input: &DataType) -> Result<DataType> {
        match input {
            DataType::Null => Ok(self.target_type()),
            DataType::List(f) => {
                ElementKind::from_data_type(f.data_type())
                    .ok_or_else(|| ComputeError::UnsupportedType(input.to_string()))?;
                let item = Field::new(LIST_ITEM_FIELD, self.target_type(), true);
                Ok(DataType::List(Arc::new(item)))
            }
            other => {
                ElementKind::from_data_type(other)
                    .ok_or_else(|| ComputeError::UnsupportedType(input.to_string()))?;
                Ok(self.target_type())
            }
        }
    }

    fn convert_slice(
        &self,
        evaluator: &mut Box<dyn ExpressionEvaluator>,
        slice: &ArrayRef,
        output_type: &DataType,
    ) -> Result<ArrayRef> {
        let block = AnyBlock::from_arrow(self.ctx.block_factory(), slice)?;
        let page = Page::try_new(vec![block.into_ref()])?;
        let out = evaluator.eval(&page)?;

        let arr = match slice.data_type() {
            DataType::List(_) => Arc::new(out.to_list_array()?) as ArrayRef,
            _ => out.to_arrow()?,
        };
        if arr.data_type() == output_type {
            return Ok(arr);
        }

        Ok(cast(&arr, output_type)?)
    }

    fn convert_array(&self, array: &ArrayRef) -> Result<ArrayRef> {
        let output_type = self.output_type(array.data_type())?;
        if array.data_type() == &DataType::Null {
            return Ok(new_null_array(&output_type, array.len()));
        }

        let item_type = match array.data_type() {
            DataType::List(f) => f.data_type().clone(),
            other => other.clone(),
        };
        let input = ElementKind::from_data_type(&item_type)
            .ok_or_else(|| ComputeError::UnsupportedType(item_type.to_string()))?;
        let factory = convert::shared_factory(
            self.target,
            input,
            Arc::new(LoadFromPageFactory::new(0)),
            self.warnings.clone(),
        )?;
        debug!(function = self.name, evaluator = %factory, rows = array.len(), "invoke");
        let mut evaluator = factory.get(&self.ctx)?;

        let batch_size = self.ctx.batch_size().max(1);
        if array.len() <= batch_size {
            return self.convert_slice(&mut evaluator, array, &output_type);
        }

        let mut outputs = Vec::with_capacity(array.len() / batch_size + 1);
        let mut offset = 0;
        while offset < array.len() {
            let len = batch_size.min(array.len() - offset);
            let slice = array.slice(offset, len);
            outputs.push(self.convert_slice(&mut evaluator, &slice, &output_type)?);
            offset += len;
        }
        let outputs = outputs.iter().map(|a| a.as_ref()).collect::<Vec<_>>();

        Ok(concat(&outputs)?)
    }
}

impl ScalarUDFImpl for ConvertUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, arg_types: &[DataType]) -> DFResult<DataType> {
        match arg_types {
            [input] => self
                .output_type(input)
                .map_err(|err| err.into_datafusion_plan_error()),
            _ => Err(ComputeError::Internal(format!(
                "{} takes one argument, got {}",
                self.name,
                arg_types.len()
            ))
            .into_datafusion_plan_error()),
        }
    }

    fn invoke(&self, args: &[ColumnarValue]) -> DFResult<ColumnarValue> {
        let arg = match args {
            [arg] => arg,
            _ => {
                return Err(ComputeError::Internal(format!(
                    "{} takes one argument, got {}",
                    self.name,
                    args.len()
                ))
                .into_datafusion_execution_error());
            }
        };

        match arg {
            ColumnarValue::Array(array) => Ok(ColumnarValue::Array(self.convert_array(array)?)),
            ColumnarValue::Scalar(scalar) => {
                let array = scalar.to_array_of_size(1)?;
                let out = self.convert_array(&array)?;

                Ok(ColumnarValue::Scalar(ScalarValue::try_from_array(&out, 0)?))
            }
        }
    }
}

/// Registers `to_boolean`, `to_long`, `to_double` and `to_string` evaluated within `ctx`.
pub fn register_conversions(session: &SessionContext, ctx: Arc<DriverContext>) {
    session.register_udf(ScalarUDF::new_from_impl(ConvertUdf::to_boolean(ctx.clone())));
    session.register_udf(ScalarUDF::new_from_impl(ConvertUdf::to_long(ctx.clone())));
    session.register_udf(ScalarUDF::new_from_impl(ConvertUdf::to_double(ctx.clone())));
    session.register_udf(ScalarUDF::new_from_impl(ConvertUdf::to_string(ctx)));
}
