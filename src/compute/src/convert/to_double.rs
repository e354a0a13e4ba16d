use crate::convert::ConversionError;
use crate::convert::ConversionFunction;
use crate::convert::ConversionPolicy;
use crate::data::BooleanType;
use crate::data::BytesRefType;
use crate::data::DoubleType;
use crate::data::IntType;
use crate::data::LongType;

/// Parses a finite decimal. `NaN` and infinities fail.
#[derive(Debug)]
pub struct ToDoubleFromString;

impl ConversionFunction for ToDoubleFromString {
    type Input = BytesRefType;
    type Output = DoubleType;
    type Scratch = ();

    const NAME: &'static str = "ToDoubleFromString";
    const POLICY: ConversionPolicy = ConversionPolicy::NullOnFailure;

    fn apply<'s>(value: &[u8], _scratch: &'s mut ()) -> Result<f64, ConversionError> {
        let text = std::str::from_utf8(value).map_err(|_| ConversionError::InvalidUtf8)?;
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ConversionError::InvalidNumber(text.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct ToDoubleFromBoolean;

impl ConversionFunction for ToDoubleFromBoolean {
    type Input = BooleanType;
    type Output = DoubleType;
    type Scratch = ();

    const NAME: &'static str = "ToDoubleFromBoolean";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: bool, _scratch: &'s mut ()) -> Result<f64, ConversionError> {
        Ok(if value { 1.0 } else { 0.0 })
    }
}

#[derive(Debug)]
pub struct ToDoubleFromInt;

impl ConversionFunction for ToDoubleFromInt {
    type Input = IntType;
    type Output = DoubleType;
    type Scratch = ();

    const NAME: &'static str = "ToDoubleFromInt";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: i32, _scratch: &'s mut ()) -> Result<f64, ConversionError> {
        Ok(f64::from(value))
    }
}

/// Rounds to the nearest double above 2^53.
#[derive(Debug)]
pub struct ToDoubleFromLong;

impl ConversionFunction for ToDoubleFromLong {
    type Input = LongType;
    type Output = DoubleType;
    type Scratch = ();

    const NAME: &'static str = "ToDoubleFromLong";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: i64, _scratch: &'s mut ()) -> Result<f64, ConversionError> {
        Ok(value as f64)
    }
}
