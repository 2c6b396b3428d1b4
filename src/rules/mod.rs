//! Rule validation and evaluation.

pub mod evaluator;

pub use evaluator::RuleEvaluator;
