use crate::convert::ConversionError;
use crate::convert::ConversionFunction;
use crate::convert::ConversionPolicy;
use crate::data::BooleanType;
use crate::data::BytesRefType;
use crate::data::DoubleType;
use crate::data::ElementKind;
use crate::data::IntType;
use crate::data::LongType;

// 2^63, the first double above i64::MAX
const LONG_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Truncates toward zero. Non-finite and out of range values fail.
pub(crate) fn double_to_long(value: f64) -> Result<i64, ConversionError> {
    if !value.is_finite() || value < i64::MIN as f64 || value >= LONG_UPPER_BOUND {
        return Err(ConversionError::OutOfRange {
            value: format!("{value:?}"),
            target: ElementKind::Long,
        });
    }

    Ok(value.trunc() as i64)
}

/// Parses an integer, falling back to a decimal that is truncated.
#[derive(Debug)]
pub struct ToLongFromString;

impl ConversionFunction for ToLongFromString {
    type Input = BytesRefType;
    type Output = LongType;
    type Scratch = ();

    const NAME: &'static str = "ToLongFromString";
    const POLICY: ConversionPolicy = ConversionPolicy::NullOnFailure;

    fn apply<'s>(value: &[u8], _scratch: &'s mut ()) -> Result<i64, ConversionError> {
        let text = std::str::from_utf8(value).map_err(|_| ConversionError::InvalidUtf8)?;
        if let Ok(v) = text.parse::<i64>() {
            return Ok(v);
        }

        match text.parse::<f64>() {
            Ok(v) => double_to_long(v),
            Err(_) => Err(ConversionError::InvalidNumber(text.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct ToLongFromBoolean;

impl ConversionFunction for ToLongFromBoolean {
    type Input = BooleanType;
    type Output = LongType;
    type Scratch = ();

    const NAME: &'static str = "ToLongFromBoolean";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: bool, _scratch: &'s mut ()) -> Result<i64, ConversionError> {
        Ok(i64::from(value))
    }
}

#[derive(Debug)]
pub struct ToLongFromInt;

impl ConversionFunction for ToLongFromInt {
    type Input = IntType;
    type Output = LongType;
    type Scratch = ();

    const NAME: &'static str = "ToLongFromInt";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: i32, _scratch: &'s mut ()) -> Result<i64, ConversionError> {
        Ok(i64::from(value))
    }
}

#[derive(Debug)]
pub struct ToLongFromDouble;

impl ConversionFunction for ToLongFromDouble {
    type Input = DoubleType;
    type Output = LongType;
    type Scratch = ();

    const NAME: &'static str = "ToLongFromDouble";
    const POLICY: ConversionPolicy = ConversionPolicy::NullOnFailure;

    fn apply<'s>(value: f64, _scratch: &'s mut ()) -> Result<i64, ConversionError> {
        double_to_long(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::convert::to_long::double_to_long;
    use crate::convert::to_long::ToLongFromString;
    use crate::convert::ConversionError;
    use crate::convert::ConversionFunction;

    fn from_str(v: &str) -> Result<i64, ConversionError> {
        ToLongFromString::apply(v.as_bytes(), &mut ())
    }

    #[test]
    fn parse() {
        assert_eq!(from_str("42"), Ok(42));
        assert_eq!(from_str("-9223372036854775808"), Ok(i64::MIN));
        assert_eq!(from_str("12.9"), Ok(12));
        assert_eq!(from_str("-12.9"), Ok(-12));
        assert_eq!(from_str("1e3"), Ok(1000));
    }

    #[test]
    fn failures() {
        assert_eq!(
            from_str("abc"),
            Err(ConversionError::InvalidNumber("abc".to_string()))
        );
        assert!(matches!(
            from_str("1e19"),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            from_str("NaN"),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert_eq!(
            ToLongFromString::apply([0xc3u8, 0x28].as_slice(), &mut ()),
            Err(ConversionError::InvalidUtf8)
        );
    }

    #[test]
    fn double_bounds() {
        assert_eq!(double_to_long(-9.223372036854775808e18), Ok(i64::MIN));
        assert!(double_to_long(9.223372036854775808e18).is_err());
        assert!(double_to_long(f64::INFINITY).is_err());
        assert_eq!(double_to_long(-0.7), Ok(0));
    }
}
