// Expression tree building from pest pairs

use crate::parser::errors::ExpressionParseError;
use crate::parser::Rule;
use crate::runtime::values::Value;
use pest::iterators::Pair;

/// A parsed pipeline: the dotted sequence of segments in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineExpr {
    pub segments: Vec<SegmentExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentExpr {
    /// `ns.method(args...)`: namespace path plus the operation name.
    Call {
        path: Vec<String>,
        args: Vec<ArgumentExpr>,
    },
    /// `goto(pipeline)`: jump to the call the inner pipeline starts with.
    Goto { target: PipelineExpr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentExpr {
    Literal(Value),
    Vector(Vec<ArgumentExpr>),
    Object(Vec<(String, ArgumentExpr)>),
    /// A nested pipeline argument, resolved into an embedded chain.
    Pipeline(PipelineExpr),
}

pub(super) fn build_pipeline(pair: Pair<Rule>) -> Result<PipelineExpr, ExpressionParseError> {
    expect_rule(&pair, Rule::pipeline)?;
    let segments = pair
        .into_inner()
        .map(build_segment)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PipelineExpr { segments })
}

fn build_segment(pair: Pair<Rule>) -> Result<SegmentExpr, ExpressionParseError> {
    expect_rule(&pair, Rule::segment)?;
    let inner = single_inner(pair)?;
    match inner.as_rule() {
        Rule::goto_segment => {
            let pipeline = single_inner(inner)?;
            Ok(SegmentExpr::Goto {
                target: build_pipeline(pipeline)?,
            })
        }
        Rule::call_segment => {
            let mut parts = inner.into_inner();
            let path_pair = parts.next().ok_or_else(|| invalid("call without a path"))?;
            let path = path_pair.as_str().split('.').map(str::to_string).collect();
            let args = match parts.next() {
                Some(list) => list
                    .into_inner()
                    .map(build_argument)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(SegmentExpr::Call { path, args })
        }
        rule => Err(invalid(&format!("unexpected segment rule: {:?}", rule))),
    }
}

fn build_argument(pair: Pair<Rule>) -> Result<ArgumentExpr, ExpressionParseError> {
    expect_rule(&pair, Rule::argument)?;
    let inner = single_inner(pair)?;
    match inner.as_rule() {
        Rule::literal => Ok(ArgumentExpr::Literal(build_literal(inner)?)),
        Rule::array => {
            let items = inner
                .into_inner()
                .map(build_argument)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ArgumentExpr::Vector(items))
        }
        Rule::object => {
            let mut members = Vec::new();
            for member in inner.into_inner() {
                let mut parts = member.into_inner();
                let key_pair = parts.next().ok_or_else(|| invalid("member without key"))?;
                let key = unescape_string(key_pair.as_str())?;
                let value_pair = parts
                    .next()
                    .ok_or_else(|| invalid("member without value"))?;
                members.push((key, build_argument(value_pair)?));
            }
            Ok(ArgumentExpr::Object(members))
        }
        Rule::pipeline => Ok(ArgumentExpr::Pipeline(build_pipeline(inner)?)),
        rule => Err(invalid(&format!("unexpected argument rule: {:?}", rule))),
    }
}

fn build_literal(pair: Pair<Rule>) -> Result<Value, ExpressionParseError> {
    let inner = single_inner(pair)?;
    match inner.as_rule() {
        Rule::null => Ok(Value::Nil),
        Rule::boolean => Ok(Value::Boolean(inner.as_str() == "true")),
        Rule::number => build_number(inner.as_str()),
        Rule::string => Ok(Value::String(unescape_string(inner.as_str())?)),
        rule => Err(invalid(&format!("unexpected literal rule: {:?}", rule))),
    }
}

fn build_number(text: &str) -> Result<Value, ExpressionParseError> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|e| invalid(&format!("bad float '{}': {}", text, e)))
    } else {
        // Integers that overflow i64 degrade to floats, as JSON readers do.
        match text.parse::<i64>() {
            Ok(i) => Ok(Value::Integer(i)),
            Err(_) => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| invalid(&format!("bad number '{}': {}", text, e))),
        }
    }
}

/// Strips the surrounding quotes and resolves escape sequences.
fn unescape_string(raw: &str) -> Result<String, ExpressionParseError> {
    let content = &raw[1..raw.len() - 1];
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('/') => result.push('/'),
            Some('b') => result.push('\u{0008}'),
            Some('f') => result.push('\u{000C}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('u') => {
                let digits: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&digits, 16)
                    .map_err(|_| invalid(&format!("bad unicode escape '\\u{}'", digits)))?;
                let ch = char::from_u32(code)
                    .ok_or_else(|| invalid(&format!("invalid code point \\u{}", digits)))?;
                result.push(ch);
            }
            other => {
                return Err(invalid(&format!(
                    "unknown escape sequence '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(result)
}

fn single_inner(pair: Pair<Rule>) -> Result<Pair<Rule>, ExpressionParseError> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| invalid(&format!("{:?} has no inner pair", rule)))
}

fn expect_rule(pair: &Pair<Rule>, rule: Rule) -> Result<(), ExpressionParseError> {
    if pair.as_rule() == rule {
        Ok(())
    } else {
        Err(invalid(&format!(
            "expected {:?}, found {:?}",
            rule,
            pair.as_rule()
        )))
    }
}

fn invalid(message: &str) -> ExpressionParseError {
    ExpressionParseError::InvalidLiteral {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    #[test]
    fn parses_dotted_pipeline_with_literals() {
        let pipeline = parse_expression("math.add(2).mul(3.5, \"x\")").unwrap();
        assert_eq!(pipeline.segments.len(), 2);
        match &pipeline.segments[0] {
            SegmentExpr::Call { path, args } => {
                assert_eq!(path, &["math".to_string(), "add".to_string()]);
                assert_eq!(args, &[ArgumentExpr::Literal(Value::Integer(2))]);
            }
            other => panic!("unexpected segment: {:?}", other),
        }
        match &pipeline.segments[1] {
            SegmentExpr::Call { path, args } => {
                assert_eq!(path, &["mul".to_string()]);
                assert_eq!(
                    args,
                    &[
                        ArgumentExpr::Literal(Value::Float(3.5)),
                        ArgumentExpr::Literal(Value::String("x".to_string())),
                    ]
                );
            }
            other => panic!("unexpected segment: {:?}", other),
        }
    }

    #[test]
    fn parses_goto_and_nested_pipelines() {
        let pipeline = parse_expression("step(inner.call(1)).goto(step(inner.call(1)))").unwrap();
        assert_eq!(pipeline.segments.len(), 2);
        assert!(matches!(
            &pipeline.segments[0],
            SegmentExpr::Call { args, .. } if matches!(args[0], ArgumentExpr::Pipeline(_))
        ));
        assert!(matches!(&pipeline.segments[1], SegmentExpr::Goto { .. }));
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        // `nullify` must parse as a call, not the `null` literal.
        let pipeline = parse_expression("wrap([true, null]).nullify()").unwrap();
        assert_eq!(pipeline.segments.len(), 2);
        match &pipeline.segments[0] {
            SegmentExpr::Call { args, .. } => assert_eq!(
                args,
                &[ArgumentExpr::Vector(vec![
                    ArgumentExpr::Literal(Value::Boolean(true)),
                    ArgumentExpr::Literal(Value::Nil),
                ])]
            ),
            other => panic!("unexpected segment: {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(parse_expression("math.add(").is_err());
        assert!(parse_expression("math.add(2) extra").is_err());
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn unescapes_string_literals() {
        let pipeline = parse_expression(r#"emit("line\nbreak A")"#).unwrap();
        match &pipeline.segments[0] {
            SegmentExpr::Call { args, .. } => assert_eq!(
                args,
                &[ArgumentExpr::Literal(Value::String(
                    "line\nbreak A".to_string()
                ))]
            ),
            other => panic!("unexpected segment: {:?}", other),
        }
    }
}
