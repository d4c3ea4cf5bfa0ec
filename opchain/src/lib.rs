// opchain library
// Call-chain construction and execution over capability tables: build a
// chain by navigating a table of named operations, serialize it as plain
// data, and interpret it later against an initial value, with goto jumps and
// operations that complete asynchronously.

pub mod ast;
pub mod builders;
pub mod codec;
pub mod config;
pub mod parser;
pub mod runtime;

// Re-export the key components from our submodules so embedders reach the
// whole construction-to-execution surface from the crate root.
pub use ast::{CallStep, Chain, ChainStep, GotoStep};
pub use builders::{BuilderError, ChainBuilder};
pub use codec::{encode, ChainSource};
pub use config::ExecutionOptions;
pub use parser::{parse_expression, ExpressionParseError};
pub use runtime::{
    BoundTable, CapabilityTable, CooperativeScheduler, Evaluator, ManualScheduler, PendingValue,
    RunOutcome, Runtime, RuntimeError, RuntimeResult, Scheduler, StepFuture, StepOutcome, Value,
};
