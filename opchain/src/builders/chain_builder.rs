// Chain builder (navigator)
// A traversable, callable view over a bound capability table. Entering a
// namespace repositions the builder; invoking an operation appends a call
// step and repositions at the table root. The builder is an immutable value:
// each step returns a fresh builder and the accumulated chain is shared data.

use crate::ast::{CallStep, Chain, ChainStep, GotoStep};
use crate::builders::BuilderError;
use crate::codec;
use crate::config::ExecutionOptions;
use crate::runtime::capabilities::{BoundEntry, BoundTable};
use crate::runtime::error::RuntimeResult;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::execution_outcome::RunOutcome;
use crate::runtime::scheduler::Scheduler;
use crate::runtime::values::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ChainBuilder {
    table: Arc<BoundTable>,
    position: Vec<String>,
    chain: Chain,
    options: ExecutionOptions,
    scheduler: Arc<dyn Scheduler>,
}

impl ChainBuilder {
    pub(crate) fn new(
        table: Arc<BoundTable>,
        options: ExecutionOptions,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self::with_chain(table, options, scheduler, Chain::new())
    }

    pub(crate) fn with_chain(
        table: Arc<BoundTable>,
        options: ExecutionOptions,
        scheduler: Arc<dyn Scheduler>,
        chain: Chain,
    ) -> Self {
        ChainBuilder {
            table,
            position: Vec::new(),
            chain,
            options,
            scheduler,
        }
    }

    /// Repositions into a namespace; the chain is unchanged.
    pub fn enter(&self, name: &str) -> Result<ChainBuilder, BuilderError> {
        let (path, entry) = self
            .resolve(name)
            .ok_or_else(|| BuilderError::UnknownName(name.to_string()))?;
        match entry {
            BoundEntry::Namespace(_) => Ok(ChainBuilder {
                table: Arc::clone(&self.table),
                position: path,
                chain: self.chain.clone(),
                options: self.options,
                scheduler: Arc::clone(&self.scheduler),
            }),
            BoundEntry::Operation(_) => Err(BuilderError::NotANamespace(name.to_string())),
        }
    }

    /// Appends a call step for the operation `name` resolves to and returns
    /// a builder repositioned at the table root.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<ChainBuilder, BuilderError> {
        let (path, entry) = self
            .resolve(name)
            .ok_or_else(|| BuilderError::UnknownName(name.to_string()))?;
        match entry {
            BoundEntry::Operation(_) => {
                let args = args.into_iter().map(codec::normalize_argument).collect();
                let step = ChainStep::Call(CallStep::new(path.join("."), args));
                Ok(ChainBuilder {
                    table: Arc::clone(&self.table),
                    position: Vec::new(),
                    chain: self.chain.appended(step),
                    options: self.options,
                    scheduler: Arc::clone(&self.scheduler),
                })
            }
            BoundEntry::Namespace(_) => Err(BuilderError::NotAnOperation(name.to_string())),
        }
    }

    /// Appends a jump step derived from the first call of `target`'s chain.
    pub fn goto<C: AsRef<Chain>>(&self, target: C) -> Result<ChainBuilder, BuilderError> {
        let step = match target.as_ref().first() {
            Some(ChainStep::Call(call)) => ChainStep::Goto(GotoStep::for_call(call)),
            Some(ChainStep::Goto(_)) => {
                return Err(BuilderError::InvalidGoto(
                    "target chain starts with a goto step".to_string(),
                ))
            }
            None => {
                return Err(BuilderError::InvalidGoto(
                    "target chain is empty".to_string(),
                ))
            }
        };
        Ok(ChainBuilder {
            table: Arc::clone(&self.table),
            position: Vec::new(),
            chain: self.chain.appended(step),
            options: self.options,
            scheduler: Arc::clone(&self.scheduler),
        })
    }

    /// The chain accumulated so far.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn into_chain(self) -> Chain {
        self.chain
    }

    /// Delegates to the interpreter; building state is left untouched.
    pub fn run(&self, initial: Value) -> RuntimeResult<RunOutcome> {
        let evaluator = Evaluator::new(
            Arc::clone(&self.table),
            self.options,
            Arc::clone(&self.scheduler),
        );
        evaluator.run(&self.chain, initial)
    }

    /// Resolves a key against the current namespace position first, then the
    /// table root; the current position wins on collision. Returns the fully
    /// qualified path alongside the entry.
    fn resolve(&self, name: &str) -> Option<(Vec<String>, &BoundEntry)> {
        if !self.position.is_empty() {
            let mut path = self.position.clone();
            path.push(name.to_string());
            if let Some(entry) = self.table.lookup_path(&path) {
                return Some((path, entry));
            }
        }
        self.table
            .lookup(name)
            .map(|entry| (vec![name.to_string()], entry))
    }
}

impl AsRef<Chain> for ChainBuilder {
    fn as_ref(&self) -> &Chain {
        &self.chain
    }
}

impl fmt::Display for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chain)
    }
}
