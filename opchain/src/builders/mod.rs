// Chain builders
// Fluent construction of chains by navigating a bound capability table.
// Building never executes anything; every step yields a new builder value.

pub mod chain_builder;

pub use chain_builder::ChainBuilder;

/// Error type for builder operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuilderError {
    #[error("Unknown name: '{0}' is not reachable from the current position or the root")]
    UnknownName(String),

    #[error("'{0}' names a namespace, not an operation")]
    NotAnOperation(String),

    #[error("'{0}' names an operation, not a namespace")]
    NotANamespace(String),

    #[error("Invalid goto target: {0}")]
    InvalidGoto(String),
}
