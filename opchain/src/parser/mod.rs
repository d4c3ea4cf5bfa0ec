// Textual chain expression parser
// Parses human-authored pipelines like `math.add(2).mul(3)` into an
// expression tree the codec replays against a navigator. One-way: chains are
// never rendered back into expressions for decoding.

use pest::Parser;

pub mod errors;
pub mod expressions;

pub use errors::ExpressionParseError;
pub use expressions::{ArgumentExpr, PipelineExpr, SegmentExpr};

use expressions::build_pipeline;

// Define the parser struct using the grammar file
#[derive(pest_derive::Parser)]
#[grammar = "opchain.pest"] // Path relative to src/
pub struct ExpressionParser;

/// Parses a full chain expression.
pub fn parse_expression(input: &str) -> Result<PipelineExpr, ExpressionParseError> {
    let mut pairs = ExpressionParser::parse(Rule::expression, input)?;
    let expression = pairs
        .next()
        .ok_or_else(|| ExpressionParseError::InvalidLiteral {
            message: "empty parse result".to_string(),
        })?;
    let pipeline = expression
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::pipeline)
        .ok_or_else(|| ExpressionParseError::InvalidLiteral {
            message: "expression has no pipeline".to_string(),
        })?;
    build_pipeline(pipeline)
}
