// Chain codec
// Converts between a chain's in-memory form and its external forms: the
// JSON-compatible step array, and textual expressions replayed against a
// navigator over the bound table. Argument normalization lives here and is
// shared with the builder: embedded sub-chains are recovered from their
// structural encodings wherever they appear inside arguments.

use crate::ast::{CallStep, Chain, ChainStep, GotoStep};
use crate::builders::ChainBuilder;
use crate::config::ExecutionOptions;
use crate::parser::{self, ArgumentExpr, PipelineExpr, SegmentExpr};
use crate::runtime::capabilities::BoundTable;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::scheduler::Scheduler;
use crate::runtime::values::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// External chain description accepted at construction time.
#[derive(Debug, Clone)]
pub enum ChainSource {
    /// No chain supplied; decodes to an empty chain.
    Empty,
    /// An existing chain; arguments are re-normalized.
    Chain(Chain),
    /// The JSON wire form: an array of call/goto step objects.
    Json(serde_json::Value),
    /// A textual pipeline expression, evaluated against the table.
    Expression(String),
}

impl Default for ChainSource {
    fn default() -> Self {
        ChainSource::Empty
    }
}

impl From<Chain> for ChainSource {
    fn from(chain: Chain) -> Self {
        ChainSource::Chain(chain)
    }
}

impl From<&Chain> for ChainSource {
    fn from(chain: &Chain) -> Self {
        ChainSource::Chain(chain.clone())
    }
}

impl From<serde_json::Value> for ChainSource {
    fn from(value: serde_json::Value) -> Self {
        ChainSource::Json(value)
    }
}

impl From<&str> for ChainSource {
    fn from(expression: &str) -> Self {
        ChainSource::Expression(expression.to_string())
    }
}

impl From<String> for ChainSource {
    fn from(expression: String) -> Self {
        ChainSource::Expression(expression)
    }
}

/// Direct, stable, total structural serialization.
pub fn encode(chain: &Chain) -> serde_json::Value {
    serde_json::Value::from(chain)
}

/// Resolves a chain source against a bound table.
pub fn decode(
    table: &Arc<BoundTable>,
    options: ExecutionOptions,
    scheduler: &Arc<dyn Scheduler>,
    source: ChainSource,
) -> RuntimeResult<Chain> {
    match source {
        ChainSource::Empty => Ok(Chain::new()),
        ChainSource::Chain(chain) => Ok(normalize_chain(chain)),
        ChainSource::Json(value) => {
            let chain: Chain = serde_json::from_value(value)?;
            Ok(normalize_chain(chain))
        }
        ChainSource::Expression(text) => {
            let pipeline = parser::parse_expression(&text)
                .map_err(|e| RuntimeError::ExpressionError(e.to_string()))?;
            replay_pipeline(table, options, scheduler, &pipeline)
        }
    }
}

/// Re-normalizes every step's arguments.
pub(crate) fn normalize_chain(chain: Chain) -> Chain {
    let steps = chain
        .steps()
        .iter()
        .cloned()
        .map(|step| match step {
            ChainStep::Call(call) => ChainStep::Call(CallStep {
                method: call.method,
                args: call.args.into_iter().map(normalize_argument).collect(),
            }),
            ChainStep::Goto(jump) => ChainStep::Goto(GotoStep {
                target: jump.target,
                args: jump.args.into_iter().map(normalize_argument).collect(),
            }),
        })
        .collect();
    Chain::from_steps(steps)
}

/// Normalizes one argument value: structural encodings of chains become
/// `Value::Chain`, containers normalize recursively, primitives pass through.
pub(crate) fn normalize_argument(value: Value) -> Value {
    match value {
        Value::Vector(items) => match chain_from_step_values(&items) {
            Some(chain) => Value::Chain(chain),
            None => Value::Vector(items.into_iter().map(normalize_argument).collect()),
        },
        Value::Map(entries) => {
            // The `{"chain": [...]}` wrapper is the explicit embedded form.
            if entries.len() == 1 {
                if let Some(Value::Vector(items)) = entries.get("chain") {
                    if let Some(chain) = chain_from_step_values(items) {
                        return Value::Chain(chain);
                    }
                }
            }
            Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, normalize_argument(v)))
                    .collect::<IndexMap<_, _>>(),
            )
        }
        Value::Chain(chain) => Value::Chain(normalize_chain(chain)),
        primitive => primitive,
    }
}

/// A non-empty vector in which every element carries a step shape is an
/// embedded chain; anything else is left to element-wise normalization.
fn chain_from_step_values(items: &[Value]) -> Option<Chain> {
    if items.is_empty() {
        return None;
    }
    let steps = items
        .iter()
        .map(step_from_value)
        .collect::<Option<Vec<_>>>()?;
    Some(Chain::from_steps(steps))
}

fn step_from_value(value: &Value) -> Option<ChainStep> {
    let Value::Map(entries) = value else {
        return None;
    };
    let mut path: Option<(&str, &str)> = None;
    let mut args: Vec<Value> = Vec::new();
    for (key, entry) in entries {
        match (key.as_str(), entry) {
            ("method" | "goto", Value::String(target)) if path.is_none() => {
                path = Some((key.as_str(), target.as_str()));
            }
            ("args", Value::Vector(items)) => {
                args = items.iter().cloned().map(normalize_argument).collect();
            }
            _ => return None,
        }
    }
    match path {
        Some(("method", method)) => Some(ChainStep::Call(CallStep::new(method, args))),
        Some(("goto", target)) => Some(ChainStep::Goto(GotoStep {
            target: target.to_string(),
            args,
        })),
        _ => None,
    }
}

/// Replays a parsed expression onto a fresh navigator, so every name is
/// checked against the table while the chain is assembled.
fn replay_pipeline(
    table: &Arc<BoundTable>,
    options: ExecutionOptions,
    scheduler: &Arc<dyn Scheduler>,
    pipeline: &PipelineExpr,
) -> RuntimeResult<Chain> {
    let mut builder = ChainBuilder::new(Arc::clone(table), options, Arc::clone(scheduler));
    for segment in &pipeline.segments {
        match segment {
            SegmentExpr::Call { path, args } => {
                let (name, namespaces) = path.split_last().ok_or_else(|| {
                    RuntimeError::ExpressionError("empty method path".to_string())
                })?;
                let mut navigator = builder;
                for namespace in namespaces {
                    navigator = navigator
                        .enter(namespace)
                        .map_err(|e| RuntimeError::ExpressionError(e.to_string()))?;
                }
                let args = args
                    .iter()
                    .map(|arg| argument_to_value(table, options, scheduler, arg))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                builder = navigator
                    .call(name, args)
                    .map_err(|e| RuntimeError::ExpressionError(e.to_string()))?;
            }
            SegmentExpr::Goto { target } => {
                let target_chain = replay_pipeline(table, options, scheduler, target)?;
                builder = builder
                    .goto(&target_chain)
                    .map_err(|e| RuntimeError::ExpressionError(e.to_string()))?;
            }
        }
    }
    Ok(builder.into_chain())
}

fn argument_to_value(
    table: &Arc<BoundTable>,
    options: ExecutionOptions,
    scheduler: &Arc<dyn Scheduler>,
    argument: &ArgumentExpr,
) -> RuntimeResult<Value> {
    match argument {
        ArgumentExpr::Literal(value) => Ok(value.clone()),
        ArgumentExpr::Vector(items) => Ok(Value::Vector(
            items
                .iter()
                .map(|item| argument_to_value(table, options, scheduler, item))
                .collect::<RuntimeResult<Vec<_>>>()?,
        )),
        ArgumentExpr::Object(members) => {
            let mut entries = IndexMap::new();
            for (key, member) in members {
                entries.insert(
                    key.clone(),
                    argument_to_value(table, options, scheduler, member)?,
                );
            }
            Ok(Value::Map(entries))
        }
        ArgumentExpr::Pipeline(pipeline) => Ok(Value::Chain(replay_pipeline(
            table, options, scheduler, pipeline,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_arrays_normalize_into_embedded_chains() {
        let argument = Value::from(json!([
            {"method": "math.add", "args": [1]},
            {"goto": "math.add", "args": [1]},
        ]));
        match normalize_argument(argument) {
            Value::Chain(chain) => {
                assert_eq!(chain.len(), 2);
                assert!(matches!(chain.steps()[1], ChainStep::Goto(_)));
            }
            other => panic!("expected embedded chain, got {}", other.type_name()),
        }
    }

    #[test]
    fn chain_wrapper_normalizes_into_embedded_chain() {
        let argument = Value::from(json!({"chain": [{"method": "emit", "args": []}]}));
        assert!(matches!(normalize_argument(argument), Value::Chain(_)));
    }

    #[test]
    fn plain_containers_normalize_element_wise() {
        let argument = Value::from(json!([
            {"method": "emit", "args": []},
            42,
        ]));
        // Mixed content: not a chain, elements normalized in place.
        match normalize_argument(argument) {
            Value::Vector(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1], Value::Integer(42));
            }
            other => panic!("expected vector, got {}", other.type_name()),
        }
    }

    #[test]
    fn empty_vectors_stay_vectors() {
        assert_eq!(
            normalize_argument(Value::Vector(vec![])),
            Value::Vector(vec![])
        );
    }

    #[test]
    fn step_shape_rejects_extra_keys() {
        let argument = Value::from(json!([
            {"method": "emit", "args": [], "extra": true},
        ]));
        assert!(matches!(normalize_argument(argument), Value::Vector(_)));
    }
}
