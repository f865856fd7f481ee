//! Pest grammar for the expression language.

use pest_derive::Parser;

/// The expression parser.
#[derive(Parser)]
#[grammar = "scripting/expr/expression.pest"]
pub struct ExpressionParser;
