// Execution outcome types
// Every operation reports how it completed through an explicit union: an
// immediate value, or a deferred future the interpreter must await. Whole
// runs surface the same distinction as complete-vs-pending.

use crate::runtime::error::RuntimeResult;
use crate::runtime::values::Value;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

/// Result of one operation invocation. `Immediate(None)` is a void call:
/// the running value passes through unchanged.
pub enum StepOutcome {
    Immediate(Option<Value>),
    Deferred(StepFuture),
}

pub type StepFuture = BoxFuture<'static, RuntimeResult<Option<Value>>>;

impl StepOutcome {
    pub fn value(value: Value) -> Self {
        StepOutcome::Immediate(Some(value))
    }

    pub fn void() -> Self {
        StepOutcome::Immediate(None)
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = RuntimeResult<Option<Value>>> + Send + 'static,
    {
        StepOutcome::Deferred(Box::pin(future))
    }
}

impl fmt::Debug for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Immediate(value) => f.debug_tuple("Immediate").field(value).finish(),
            StepOutcome::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

/// Result of interpreting a whole chain. `Pending` is returned the moment an
/// operation defers or a non-blocking jump fires; the future resolves to the
/// eventual final value.
pub enum RunOutcome {
    Complete(Value),
    Pending(PendingValue),
}

pub type PendingValue = BoxFuture<'static, RuntimeResult<Value>>;

impl RunOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, RunOutcome::Pending(_))
    }

    /// The final value for a synchronous run, `None` if pending.
    pub fn into_complete(self) -> Option<Value> {
        match self {
            RunOutcome::Complete(value) => Some(value),
            RunOutcome::Pending(_) => None,
        }
    }

    /// Awaits the pending branch if necessary and yields the final value.
    pub async fn resolve(self) -> RuntimeResult<Value> {
        match self {
            RunOutcome::Complete(value) => Ok(value),
            RunOutcome::Pending(pending) => pending.await,
        }
    }
}

impl fmt::Debug for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            RunOutcome::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}
