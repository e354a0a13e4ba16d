pub mod driver_context;
pub mod eval;

pub use driver_context::DriverContext;
pub use eval::EvalOperator;
pub use eval::ExpressionEvaluator;
pub use eval::ExpressionEvaluatorFactory;
pub use eval::LoadFromPage;
pub use eval::LoadFromPageFactory;
pub use eval::TypedEvaluator;
