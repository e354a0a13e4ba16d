use std::fmt::Write;

use crate::convert::ConversionError;
use crate::convert::ConversionFunction;
use crate::convert::ConversionPolicy;
use crate::data::BooleanType;
use crate::data::BytesRefType;
use crate::data::DoubleType;
use crate::data::IntType;
use crate::data::LongType;

macro_rules! format_to_string {
    ($name:ident, $input:ty, $native:ty, $fmt:literal) => {
        #[derive(Debug)]
        pub struct $name;

        impl ConversionFunction for $name {
            type Input = $input;
            type Output = BytesRefType;
            type Scratch = String;

            const NAME: &'static str = stringify!($name);
            const POLICY: ConversionPolicy = ConversionPolicy::Total;

            fn apply<'s>(value: $native, scratch: &'s mut String) -> Result<&'s [u8], ConversionError> {
                scratch.clear();
                write!(scratch, $fmt, value).map_err(|_| ConversionError::Formatting)?;

                Ok(scratch.as_bytes())
            }
        }
    };
}

format_to_string!(ToStringFromBoolean, BooleanType, bool, "{}");
format_to_string!(ToStringFromInt, IntType, i32, "{}");
format_to_string!(ToStringFromLong, LongType, i64, "{}");
// debug formatting keeps the fraction of whole numbers: 1.0, not 1
format_to_string!(ToStringFromDouble, DoubleType, f64, "{:?}");

#[cfg(test)]
mod tests {
    use crate::convert::to_string::ToStringFromBoolean;
    use crate::convert::to_string::ToStringFromDouble;
    use crate::convert::to_string::ToStringFromLong;
    use crate::convert::ConversionFunction;

    #[test]
    fn format() {
        let mut scratch = String::new();
        assert_eq!(ToStringFromBoolean::apply(true, &mut scratch).unwrap(), b"true");
        assert_eq!(ToStringFromLong::apply(-42, &mut scratch).unwrap(), b"-42");
        assert_eq!(ToStringFromDouble::apply(1.0, &mut scratch).unwrap(), b"1.0");
        assert_eq!(ToStringFromDouble::apply(0.25, &mut scratch).unwrap(), b"0.25");
        assert_eq!(scratch, "0.25");
    }
}
