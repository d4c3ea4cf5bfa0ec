// Chain interpreter
// Executes chain steps in order against a bound capability table, threading
// each operation's result into the next. Runs synchronously until the first
// deferred result or non-blocking jump, then hands the remainder to the
// asynchronous driver. Items never execute concurrently; the asynchronous
// driver awaits one deferred result at a time, preserving chain order.

use crate::ast::{CallStep, Chain, ChainStep, GotoStep};
use crate::config::ExecutionOptions;
use crate::runtime::capabilities::BoundTable;
use crate::runtime::error::RuntimeResult;
use crate::runtime::execution_outcome::{PendingValue, RunOutcome, StepFuture, StepOutcome};
use crate::runtime::scheduler::Scheduler;
use crate::runtime::values::Value;
use log::{debug, warn};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Evaluator {
    table: Arc<BoundTable>,
    options: ExecutionOptions,
    scheduler: Arc<dyn Scheduler>,
}

impl Evaluator {
    pub fn new(
        table: Arc<BoundTable>,
        options: ExecutionOptions,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Evaluator {
            table,
            options,
            scheduler,
        }
    }

    /// Interprets `chain` against `initial`. Returns `Complete` when every
    /// step finished synchronously; `Pending` the moment a step defers or a
    /// non-blocking jump fires.
    pub fn run(&self, chain: &Chain, initial: Value) -> RuntimeResult<RunOutcome> {
        let mut i = 0;
        let mut value = initial;
        while i < chain.len() {
            match &chain.steps()[i] {
                ChainStep::Goto(jump) => match resolve_jump(chain, i, jump) {
                    Some(target) => {
                        if !self.options.blocking {
                            // Hand the jump to the asynchronous driver; it
                            // yields once before re-executing the target.
                            return Ok(RunOutcome::Pending(
                                self.clone().drive_async(chain.clone(), i, value),
                            ));
                        }
                        debug!("goto {} re-executes step {}", jump.target, target);
                        match self.execute_jump_target(chain, target, value.clone())? {
                            StepOutcome::Immediate(next) => {
                                if let Some(v) = next {
                                    value = v;
                                }
                            }
                            StepOutcome::Deferred(deferred) => {
                                return Ok(RunOutcome::Pending(self.clone().drive_deferred(
                                    chain.clone(),
                                    i + 1,
                                    deferred,
                                    value,
                                )));
                            }
                        }
                        i += 1;
                    }
                    None => {
                        warn!("goto {} matched no call step; skipping", jump.target);
                        i += 1;
                    }
                },
                ChainStep::Call(call) => match self.invoke(call, value.clone())? {
                    StepOutcome::Immediate(next) => {
                        if let Some(v) = next {
                            value = v;
                        }
                        i += 1;
                    }
                    StepOutcome::Deferred(deferred) => {
                        debug!("step {} deferred; switching drivers", i);
                        return Ok(RunOutcome::Pending(self.clone().drive_deferred(
                            chain.clone(),
                            i + 1,
                            deferred,
                            value,
                        )));
                    }
                },
            }
        }
        Ok(RunOutcome::Complete(value))
    }

    fn invoke(&self, call: &CallStep, data: Value) -> RuntimeResult<StepOutcome> {
        let handler = self.table.resolve_method(&call.method)?;
        handler(data, &call.args)
    }

    /// Re-executes the call at `target`, threading the current value; a void
    /// result passes the value through unchanged.
    fn execute_jump_target(
        &self,
        chain: &Chain,
        target: usize,
        value: Value,
    ) -> RuntimeResult<StepOutcome> {
        match &chain.steps()[target] {
            ChainStep::Call(call) => self.invoke(call, value),
            // resolve_jump only matches call steps.
            ChainStep::Goto(_) => unreachable!("jump target is always a call step"),
        }
    }

    fn drive_deferred(
        self,
        chain: Chain,
        next: usize,
        deferred: StepFuture,
        value: Value,
    ) -> PendingValue {
        Box::pin(async move {
            // The awaited result threads into the remaining steps exactly as
            // a synchronous one would; a void result passes `value` through.
            let value = deferred.await?.unwrap_or(value);
            self.run_async(chain, next, value).await
        })
    }

    fn drive_async(self, chain: Chain, at: usize, value: Value) -> PendingValue {
        Box::pin(async move { self.run_async(chain, at, value).await })
    }

    /// Asynchronous driver: the same interpretation loop, awaiting deferred
    /// results in turn and yielding to the scheduler before each
    /// non-blocking jump resumption.
    async fn run_async(self, chain: Chain, start: usize, initial: Value) -> RuntimeResult<Value> {
        let mut i = start;
        let mut value = initial;
        while i < chain.len() {
            match &chain.steps()[i] {
                ChainStep::Goto(jump) => match resolve_jump(&chain, i, jump) {
                    Some(target) => {
                        if !self.options.blocking {
                            self.scheduler.yield_now().await;
                        }
                        debug!("goto {} re-executes step {}", jump.target, target);
                        let outcome = self.execute_jump_target(&chain, target, value.clone())?;
                        let resolved = match outcome {
                            StepOutcome::Immediate(next) => next,
                            StepOutcome::Deferred(deferred) => deferred.await?,
                        };
                        if let Some(v) = resolved {
                            value = v;
                        }
                        i += 1;
                    }
                    None => {
                        warn!("goto {} matched no call step; skipping", jump.target);
                        i += 1;
                    }
                },
                ChainStep::Call(call) => {
                    let outcome = self.invoke(call, value.clone())?;
                    let resolved = match outcome {
                        StepOutcome::Immediate(next) => next,
                        StepOutcome::Deferred(deferred) => deferred.await?,
                    };
                    if let Some(v) = resolved {
                        value = v;
                    }
                    i += 1;
                }
            }
        }
        Ok(value)
    }
}

/// Finds the call step a jump resumes at: forward from the jump first, then
/// backward from the chain start. A match carries the same method path and
/// element-wise-equal arguments; the jump's own position is excluded.
fn resolve_jump(chain: &Chain, from: usize, jump: &GotoStep) -> Option<usize> {
    let steps = chain.steps();
    let is_match = |step: &ChainStep| matches!(step, ChainStep::Call(call) if jump.matches(call));
    steps[from + 1..]
        .iter()
        .position(|step| is_match(step))
        .map(|offset| from + 1 + offset)
        .or_else(|| steps[..from].iter().position(is_match))
}
