// Capability table
// The registry of operations a chain can invoke: string keys mapping to
// operation handlers or nested namespace tables. Keys are validated at
// registration time, so a builder-built chain can only name operations that
// exist. Binding a context produces an equivalent table whose handlers carry
// the context as implicit receiver.

use crate::ast::{Chain, ChainStep};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::execution_outcome::StepOutcome;
use crate::runtime::values::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to the context value every bound operation receives.
pub type ContextRef = Arc<Value>;

/// An unbound operation: `(context, data, args) -> outcome`.
pub type OperationHandler =
    Arc<dyn Fn(&Value, Value, &[Value]) -> RuntimeResult<StepOutcome> + Send + Sync>;

/// A context-bound operation: `(data, args) -> outcome`.
pub type BoundHandler = Arc<dyn Fn(Value, &[Value]) -> RuntimeResult<StepOutcome> + Send + Sync>;

#[derive(Clone)]
pub enum TableEntry {
    Operation(OperationHandler),
    Namespace(CapabilityTable),
}

/// Nested registry of named operations, read-only once bound.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    entries: IndexMap<String, TableEntry>,
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an operation under `name` at this level of the table.
    pub fn register<F>(&mut self, name: &str, handler: F) -> RuntimeResult<()>
    where
        F: Fn(&Value, Value, &[Value]) -> RuntimeResult<StepOutcome> + Send + Sync + 'static,
    {
        self.insert(name, TableEntry::Operation(Arc::new(handler)))
    }

    /// Registers a nested namespace under `name`.
    pub fn register_namespace(&mut self, name: &str, table: CapabilityTable) -> RuntimeResult<()> {
        self.insert(name, TableEntry::Namespace(table))
    }

    fn insert(&mut self, name: &str, entry: TableEntry) -> RuntimeResult<()> {
        if name.is_empty() {
            return Err(RuntimeError::InvalidArgument(
                "capability name must not be empty".to_string(),
            ));
        }
        if name.contains('.') {
            return Err(RuntimeError::InvalidArgument(format!(
                "capability name '{}' must not contain '.'",
                name
            )));
        }
        if self.entries.contains_key(name) {
            return Err(RuntimeError::InvalidArgument(format!(
                "capability name '{}' is already registered",
                name
            )));
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pre-binds every operation in the table to `context`, recursively
    /// through nested namespaces. Pure and total.
    pub fn bind(&self, context: ContextRef) -> BoundTable {
        let entries = self
            .entries
            .iter()
            .map(|(name, entry)| {
                let bound = match entry {
                    TableEntry::Operation(handler) => {
                        let handler = Arc::clone(handler);
                        let context = Arc::clone(&context);
                        BoundEntry::Operation(Arc::new(move |data, args| {
                            handler(&context, data, args)
                        }))
                    }
                    TableEntry::Namespace(table) => {
                        BoundEntry::Namespace(table.bind(Arc::clone(&context)))
                    }
                };
                (name.clone(), bound)
            })
            .collect();
        BoundTable { entries }
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in &self.entries {
            match entry {
                TableEntry::Operation(_) => map.entry(&name, &"#<operation>"),
                TableEntry::Namespace(table) => map.entry(&name, table),
            };
        }
        map.finish()
    }
}

#[derive(Clone)]
pub enum BoundEntry {
    Operation(BoundHandler),
    Namespace(BoundTable),
}

/// A capability table whose operations carry their context implicitly.
#[derive(Clone, Default)]
pub struct BoundTable {
    entries: IndexMap<String, BoundEntry>,
}

impl BoundTable {
    /// Single-key lookup at this level.
    pub fn lookup(&self, key: &str) -> Option<&BoundEntry> {
        self.entries.get(key)
    }

    /// Walks a sequence of keys from this level downward.
    pub fn lookup_path(&self, segments: &[String]) -> Option<&BoundEntry> {
        let (first, rest) = segments.split_first()?;
        let mut entry = self.entries.get(first)?;
        for segment in rest {
            match entry {
                BoundEntry::Namespace(table) => entry = table.entries.get(segment)?,
                BoundEntry::Operation(_) => return None,
            }
        }
        Some(entry)
    }

    /// Resolves a dotted method path to an invocable operation.
    pub fn resolve_method(&self, path: &str) -> RuntimeResult<&BoundHandler> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        match self.lookup_path(&segments) {
            Some(BoundEntry::Operation(handler)) => Ok(handler),
            _ => Err(RuntimeError::MethodNotFound(path.to_string())),
        }
    }

    /// Checks every call step of `chain` against the table, turning
    /// method-not-found into a construction-time failure for statically
    /// known chains.
    pub fn validate_chain(&self, chain: &Chain) -> RuntimeResult<()> {
        for step in chain {
            if let ChainStep::Call(call) = step {
                self.resolve_method(&call.method)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BoundTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in &self.entries {
            match entry {
                BoundEntry::Operation(_) => map.entry(&name, &"#<operation>"),
                BoundEntry::Namespace(table) => map.entry(&name, table),
            };
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> CapabilityTable {
        let mut math = CapabilityTable::new();
        math.register("add", |_ctx, data, args| {
            let base = data.as_integer().unwrap_or(0);
            let delta = args.first().and_then(Value::as_integer).unwrap_or(0);
            Ok(StepOutcome::value(Value::Integer(base + delta)))
        })
        .unwrap();

        let mut root = CapabilityTable::new();
        root.register("context_tag", |ctx, _data, _args| {
            Ok(StepOutcome::value(ctx.clone()))
        })
        .unwrap();
        root.register_namespace("math", math).unwrap();
        root
    }

    #[test]
    fn rejects_invalid_and_duplicate_names() {
        let mut table = CapabilityTable::new();
        assert!(table.register("", |_, _, _| Ok(StepOutcome::void())).is_err());
        assert!(table
            .register("a.b", |_, _, _| Ok(StepOutcome::void()))
            .is_err());
        table.register("ok", |_, _, _| Ok(StepOutcome::void())).unwrap();
        assert!(table
            .register("ok", |_, _, _| Ok(StepOutcome::void()))
            .is_err());
    }

    #[test]
    fn resolve_method_walks_namespaces() {
        let bound = sample_table().bind(Arc::new(Value::Nil));
        assert!(bound.resolve_method("math.add").is_ok());
        match bound.resolve_method("math.missing") {
            Err(RuntimeError::MethodNotFound(path)) => assert_eq!(path, "math.missing"),
            _ => panic!("expected MethodNotFound"),
        }
        // A namespace is not invocable.
        assert!(bound.resolve_method("math").is_err());
    }

    #[test]
    fn bound_operations_receive_the_context() {
        let context = Value::String("ctx".to_string());
        let bound = sample_table().bind(Arc::new(context.clone()));
        let handler = bound.resolve_method("context_tag").unwrap();
        match handler(Value::Nil, &[]).unwrap() {
            StepOutcome::Immediate(Some(value)) => assert_eq!(value, context),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
