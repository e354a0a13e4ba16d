use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use common::config::WarningsMode;

use crate::convert::ConversionError;
use crate::operator::DriverContext;

/// Position of an expression in the query text. Line 0 means the position is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub line: usize,
    pub column: usize,
    pub text: String,
}

impl Source {
    pub fn new(line: usize, column: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            column,
            text: text.into(),
        }
    }

    /// Expression text without a position, e.g. a function called outside of a parsed query.
    pub fn unpositioned(text: impl Into<String>) -> Self {
        Self::new(0, 0, text)
    }

    pub fn is_positioned(&self) -> bool {
        self.line > 0
    }

    fn locate(&self, msg: impl Display) -> String {
        if self.is_positioned() {
            format!("{self}: {msg}")
        } else {
            msg.to_string()
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_positioned() {
            write!(f, "Line {}:{}", self.line, self.column)
        } else {
            write!(f, "[{}]", self.text)
        }
    }
}

/// Warnings shared by every evaluator of one expression, so the limit holds across batches.
pub type SharedWarnings = Arc<Mutex<Warnings>>;

pub(crate) fn lock_shared(warnings: &Mutex<Warnings>) -> MutexGuard<'_, Warnings> {
    warnings.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Conversion failures of one evaluator, recorded as driver warnings.
///
/// The first failure adds a header naming the expression, the first `max_warnings` failures
/// are recorded one by one, later ones are only counted.
#[derive(Debug, Clone)]
pub struct Warnings {
    source: Source,
    recorded: usize,
    failures: usize,
}

impl Warnings {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            recorded: 0,
            failures: 0,
        }
    }

    pub fn shared(source: Source) -> SharedWarnings {
        Arc::new(Mutex::new(Self::new(source)))
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Failures seen so far, recorded or not.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn register(&mut self, ctx: &DriverContext, err: &ConversionError) {
        self.failures += 1;
        if ctx.warnings_mode() == WarningsMode::Ignore || self.recorded >= ctx.max_warnings() {
            return;
        }

        if self.recorded == 0 {
            ctx.add_warning(self.source.locate(format_args!(
                "evaluation of [{}] failed, treating result as null. Only first {} failures recorded.",
                self.source.text,
                ctx.max_warnings()
            )));
        }
        ctx.add_warning(self.source.locate(err));
        self.recorded += 1;
    }
}

#[cfg(test)]
mod tests {
    use common::config::WarningsMode;

    use crate::convert::ConversionError;
    use crate::convert::Source;
    use crate::convert::Warnings;
    use crate::operator::DriverContext;

    #[test]
    fn header_and_limit() {
        let ctx = DriverContext::default().with_max_warnings(2);
        let mut w = Warnings::new(Source::new(1, 8, "to_long(x)"));
        for v in ["a", "b", "c"] {
            w.register(&ctx, &ConversionError::InvalidNumber(v.to_string()));
        }

        assert_eq!(w.failures(), 3);
        assert_eq!(ctx.warnings(), vec![
            "Line 1:8: evaluation of [to_long(x)] failed, treating result as null. Only first 2 failures recorded.".to_string(),
            "Line 1:8: cannot parse [a] as a number".to_string(),
            "Line 1:8: cannot parse [b] as a number".to_string(),
        ]);
    }

    #[test]
    fn ignored() {
        let ctx = DriverContext::default().with_warnings_mode(WarningsMode::Ignore);
        let mut w = Warnings::new(Source::default());
        w.register(&ctx, &ConversionError::InvalidUtf8);

        assert_eq!(w.failures(), 1);
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn unpositioned() {
        let ctx = DriverContext::default();
        let mut w = Warnings::new(Source::unpositioned("to_long"));
        w.register(&ctx, &ConversionError::InvalidNumber("a".to_string()));

        assert_eq!(ctx.warnings(), vec![
            "evaluation of [to_long] failed, treating result as null. Only first 20 failures recorded.".to_string(),
            "cannot parse [a] as a number".to_string(),
        ]);
    }
}
