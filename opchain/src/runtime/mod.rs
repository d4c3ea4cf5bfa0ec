// opchain runtime
// Entry points for binding a capability table to a context, decoding chain
// sources, and executing chains. The heavy logic lives in the submodules.

pub mod capabilities;
pub mod error;
pub mod evaluator;
pub mod execution_outcome;
pub mod scheduler;
pub mod values;

pub use capabilities::{BoundTable, CapabilityTable, ContextRef, TableEntry};
pub use error::{RuntimeError, RuntimeResult};
pub use evaluator::Evaluator;
pub use execution_outcome::{PendingValue, RunOutcome, StepFuture, StepOutcome};
pub use scheduler::{CooperativeScheduler, ManualScheduler, Scheduler};
pub use values::Value;

use crate::ast::Chain;
use crate::builders::ChainBuilder;
use crate::codec::{self, ChainSource};
use crate::config::ExecutionOptions;
use std::sync::Arc;

/// A capability table bound to a context, ready to build and run chains.
/// This is the construction call of the engine: table, optional context,
/// optional chain source.
#[derive(Debug, Clone)]
pub struct Runtime {
    table: Arc<BoundTable>,
    options: ExecutionOptions,
    scheduler: Arc<dyn Scheduler>,
}

impl Runtime {
    /// Binds `table` to `context`. Execution options are read once from the
    /// context's reserved field; the default scheduler is installed.
    pub fn new(table: CapabilityTable, context: Value) -> Self {
        Self::with_scheduler(table, context, Arc::new(CooperativeScheduler))
    }

    /// Same as [`Runtime::new`] with an explicit scheduler, so embedders can
    /// single-step jump continuations in tests.
    pub fn with_scheduler(
        table: CapabilityTable,
        context: Value,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let options = ExecutionOptions::from_context(&context);
        let table = Arc::new(table.bind(Arc::new(context)));
        Runtime {
            table,
            options,
            scheduler,
        }
    }

    pub fn options(&self) -> ExecutionOptions {
        self.options
    }

    /// A navigator over the bound table with an empty chain.
    pub fn navigator(&self) -> ChainBuilder {
        ChainBuilder::new(
            Arc::clone(&self.table),
            self.options,
            Arc::clone(&self.scheduler),
        )
    }

    /// Decodes `source` and returns a navigator carrying the resulting
    /// chain, positioned at the table root.
    pub fn navigator_from(&self, source: impl Into<ChainSource>) -> RuntimeResult<ChainBuilder> {
        let chain = self.decode(source)?;
        Ok(ChainBuilder::with_chain(
            Arc::clone(&self.table),
            self.options,
            Arc::clone(&self.scheduler),
            chain,
        ))
    }

    /// Resolves a chain source against the bound table.
    pub fn decode(&self, source: impl Into<ChainSource>) -> RuntimeResult<Chain> {
        codec::decode(&self.table, self.options, &self.scheduler, source.into())
    }

    /// Interprets `chain` against `initial`.
    pub fn run(&self, chain: &Chain, initial: Value) -> RuntimeResult<RunOutcome> {
        let evaluator = Evaluator::new(
            Arc::clone(&self.table),
            self.options,
            Arc::clone(&self.scheduler),
        );
        evaluator.run(chain, initial)
    }

    /// Checks every call step of `chain` against the table without running
    /// it, so statically known chains fail at construction time.
    pub fn validate(&self, chain: &Chain) -> RuntimeResult<()> {
        self.table.validate_chain(chain)
    }
}
