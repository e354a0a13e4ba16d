use crate::convert::ConversionError;
use crate::convert::ConversionFunction;
use crate::convert::ConversionPolicy;
use crate::data::BooleanType;
use crate::data::BytesRefType;
use crate::data::DoubleType;
use crate::data::IntType;
use crate::data::LongType;

const TRUE_KEYWORDS: [&str; 4] = ["true", "t", "yes", "1"];
const FALSE_KEYWORDS: [&str; 4] = ["false", "f", "no", "0"];

fn keyword(lowercase: &str) -> Option<bool> {
    if TRUE_KEYWORDS.contains(&lowercase) {
        Some(true)
    } else if FALSE_KEYWORDS.contains(&lowercase) {
        Some(false)
    } else {
        None
    }
}

/// Case-insensitive keyword match: `true`, `t`, `yes` and `1` are true. Falsy keywords, any
/// other text and invalid UTF-8 are false.
#[derive(Debug)]
pub struct ToBooleanFromString;

impl ConversionFunction for ToBooleanFromString {
    type Input = BytesRefType;
    type Output = BooleanType;
    type Scratch = String;

    const NAME: &'static str = "ToBooleanFromString";
    const POLICY: ConversionPolicy = ConversionPolicy::Total;

    fn apply<'s>(value: &[u8], scratch: &'s mut String) -> Result<bool, ConversionError> {
        let Ok(text) = std::str::from_utf8(value) else {
            return Ok(false);
        };

        scratch.clear();
        if text.is_ascii() {
            scratch.push_str(text);
            scratch.make_ascii_lowercase();
        } else {
            scratch.extend(text.chars().flat_map(char::to_lowercase));
        }

        Ok(keyword(scratch).unwrap_or(false))
    }
}

macro_rules! nonzero_to_boolean {
    ($name:ident, $input:ty, $native:ty, $zero:expr) => {
        /// Non-zero is `true`.
        #[derive(Debug)]
        pub struct $name;

        impl ConversionFunction for $name {
            type Input = $input;
            type Output = BooleanType;
            type Scratch = ();

            const NAME: &'static str = stringify!($name);
            const POLICY: ConversionPolicy = ConversionPolicy::Total;

            fn apply<'s>(value: $native, _scratch: &'s mut ()) -> Result<bool, ConversionError> {
                Ok(value != $zero)
            }
        }
    };
}

nonzero_to_boolean!(ToBooleanFromInt, IntType, i32, 0);
nonzero_to_boolean!(ToBooleanFromLong, LongType, i64, 0);
nonzero_to_boolean!(ToBooleanFromDouble, DoubleType, f64, 0.0);
