use std::result;

use arrow::error::ArrowError;
use common::error::CommonError;
use datafusion::error::DataFusionError;
use thiserror::Error;

use crate::convert::ConversionError;
use crate::data::ElementKind;

pub type Result<T> = result::Result<T, ComputeError>;

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("internal {0:?}")]
    Internal(String),
    #[error("invalid block {0:?}")]
    InvalidBlock(String),
    #[error("builder {0:?}")]
    Builder(String),
    #[error("unsupported type {0:?}")]
    UnsupportedType(String),
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: ElementKind, to: ElementKind },
    #[error("{function} failed: {source}")]
    Conversion {
        function: &'static str,
        source: ConversionError,
    },
    #[error("datafusion {0:?}")]
    DataFusion(#[from] DataFusionError),
    #[error("arrow {0:?}")]
    Arrow(#[from] ArrowError),
    #[error("common {0:?}")]
    Common(#[from] CommonError),
}

impl ComputeError {
    /// Wraps this [ComputeError] as an [datafusion::error::DataFusionError::Execution].
    pub fn into_datafusion_execution_error(self) -> DataFusionError {
        DataFusionError::Execution(self.to_string())
    }

    /// Wraps this [ComputeError] as an [datafusion::error::DataFusionError::Plan].
    pub fn into_datafusion_plan_error(self) -> DataFusionError {
        DataFusionError::Plan(self.to_string())
    }
}

impl From<ComputeError> for ArrowError {
    fn from(e: ComputeError) -> Self {
        ArrowError::ExternalError(Box::new(e))
    }
}

impl From<ComputeError> for DataFusionError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::DataFusion(err) => err,
            other => DataFusionError::External(Box::new(other)),
        }
    }
}
