// Parser error types

use crate::parser::Rule;
use pest::error::Error as PestError;
use std::fmt;

#[derive(Debug)]
pub enum ExpressionParseError {
    /// The expression did not match the grammar.
    Syntax(Box<PestError<Rule>>),

    /// The expression parsed but a literal inside it is malformed.
    InvalidLiteral { message: String },
}

impl fmt::Display for ExpressionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionParseError::Syntax(err) => write!(f, "syntax error: {}", err),
            ExpressionParseError::InvalidLiteral { message } => {
                write!(f, "invalid literal: {}", message)
            }
        }
    }
}

impl std::error::Error for ExpressionParseError {}

impl From<PestError<Rule>> for ExpressionParseError {
    fn from(err: PestError<Rule>) -> Self {
        ExpressionParseError::Syntax(Box::new(err))
    }
}
