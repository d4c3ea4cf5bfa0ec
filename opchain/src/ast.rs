// Chain data model
// A chain is plain, serializable data: an ordered sequence of call and goto
// steps. It carries no live binding and no interpretation state, so identical
// chains are interchangeable and safely re-runnable.

use crate::runtime::values::Value;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a chain: an operation invocation or a jump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainStep {
    Call(CallStep),
    Goto(GotoStep),
}

/// An invocation step: a fully-qualified dotted method path plus arguments.
/// Wire shape: `{"method": "a.b.c", "args": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStep {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A jump step: resume at the call matching this signature.
/// Wire shape: `{"goto": "a.b.c", "args": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotoStep {
    #[serde(rename = "goto")]
    pub target: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallStep {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        CallStep {
            method: method.into(),
            args,
        }
    }
}

impl GotoStep {
    /// Derive the jump signature from an existing call step.
    pub fn for_call(call: &CallStep) -> Self {
        GotoStep {
            target: call.method.clone(),
            args: call.args.clone(),
        }
    }

    /// True when `call` carries the signature this jump names.
    pub fn matches(&self, call: &CallStep) -> bool {
        self.target == call.method && self.args == call.args
    }
}

/// An ordered, immutable sequence of chain steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain(Vec<ChainStep>);

impl Chain {
    pub fn new() -> Self {
        Chain(Vec::new())
    }

    pub fn from_steps(steps: Vec<ChainStep>) -> Self {
        Chain(steps)
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&ChainStep> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChainStep> {
        self.0.iter()
    }

    /// Extension always yields a new chain; the receiver is untouched.
    pub fn appended(&self, step: ChainStep) -> Chain {
        let mut steps = self.0.clone();
        steps.push(step);
        Chain(steps)
    }
}

impl From<Vec<ChainStep>> for Chain {
    fn from(steps: Vec<ChainStep>) -> Self {
        Chain(steps)
    }
}

impl AsRef<Chain> for Chain {
    fn as_ref(&self) -> &Chain {
        self
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a ChainStep;
    type IntoIter = std::slice::Iter<'a, ChainStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStep::Call(call) => {
                write!(
                    f,
                    "{}({})",
                    call.method,
                    call.args.iter().map(|a| a.to_string()).join(", ")
                )
            }
            ChainStep::Goto(jump) => {
                write!(
                    f,
                    "goto({}({}))",
                    jump.target,
                    jump.args.iter().map(|a| a.to_string()).join(", ")
                )
            }
        }
    }
}

/// Renders `method(arg1, arg2).method2(...)` with JSON-literal arguments and
/// no trailing separator.
impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().map(|s| s.to_string()).join("."))
    }
}

impl From<&ChainStep> for serde_json::Value {
    fn from(step: &ChainStep) -> Self {
        let (key, path, args) = match step {
            ChainStep::Call(call) => ("method", &call.method, &call.args),
            ChainStep::Goto(jump) => ("goto", &jump.target, &jump.args),
        };
        let mut object = serde_json::Map::new();
        object.insert(key.to_string(), serde_json::Value::String(path.clone()));
        object.insert(
            "args".to_string(),
            serde_json::Value::Array(args.iter().map(serde_json::Value::from).collect()),
        );
        serde_json::Value::Object(object)
    }
}

impl From<&Chain> for serde_json::Value {
    fn from(chain: &Chain) -> Self {
        serde_json::Value::Array(chain.iter().map(serde_json::Value::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn steps_serialize_to_wire_shapes() {
        let chain = Chain::from_steps(vec![
            ChainStep::Call(CallStep::new("math.add", vec![Value::Integer(2)])),
            ChainStep::Goto(GotoStep {
                target: "math.add".to_string(),
                args: vec![Value::Integer(2)],
            }),
        ]);
        let encoded = serde_json::Value::from(&chain);
        assert_eq!(
            encoded,
            json!([
                {"method": "math.add", "args": [2]},
                {"goto": "math.add", "args": [2]},
            ])
        );
    }

    #[test]
    fn wire_shapes_deserialize_back() {
        let chain: Chain = serde_json::from_value(json!([
            {"method": "set", "args": ["x"]},
            {"goto": "set", "args": ["x"]},
            {"method": "done"},
        ]))
        .unwrap();
        assert_eq!(chain.len(), 3);
        assert!(matches!(chain.steps()[1], ChainStep::Goto(_)));
        assert!(
            matches!(&chain.steps()[2], ChainStep::Call(call) if call.args.is_empty())
        );
    }

    #[test]
    fn appended_leaves_original_untouched() {
        let base = Chain::new();
        let extended = base.appended(ChainStep::Call(CallStep::new("noop", vec![])));
        assert!(base.is_empty());
        assert_eq!(extended.len(), 1);
    }

    #[test]
    fn display_renders_dotted_pipeline() {
        let chain = Chain::from_steps(vec![
            ChainStep::Call(CallStep::new(
                "text.concat",
                vec![Value::String("a".to_string()), Value::Integer(1)],
            )),
            ChainStep::Call(CallStep::new("emit", vec![])),
        ]);
        assert_eq!(chain.to_string(), "text.concat(\"a\", 1).emit()");
    }
}
