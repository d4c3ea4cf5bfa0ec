// Execution options
// Read once from the context's reserved field when a runtime is constructed.

use crate::runtime::values::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    /// Blocking mode resumes jump continuations inline instead of yielding
    /// to the scheduler first.
    pub blocking: bool,
}

impl ExecutionOptions {
    /// Reserved context field carrying the blocking flag.
    pub const CONTEXT_KEY: &'static str = "blocking";

    /// Extracts options from a context value. Non-map contexts and contexts
    /// without the reserved field fall back to the default (non-blocking).
    pub fn from_context(context: &Value) -> Self {
        let blocking = context
            .get(Self::CONTEXT_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        ExecutionOptions { blocking }
    }
}
