//! Compilation error types.
//!
//! Any of these aborts the whole compile: there is no partial artifact,
//! and callers re-run from the first phase rather than resuming.

use thiserror::Error;

/// Errors that abort a test compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A test must reference at least one item to be compiled.
    #[error("a test must contain at least one item reference to be compiled, none found")]
    NoItems,

    /// A rubric block failed to render; the artifact would be unusable.
    #[error("failed to render rubric block '{identifier}'")]
    RubricRenderFailed {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// The compact document could not be serialized.
    #[error("failed to serialize the compact test document")]
    SerializationFailed {
        #[source]
        source: anyhow::Error,
    },

    /// An item reference could not be resolved to an authored item.
    #[error("failed to resolve item reference '{href}'")]
    ItemResolution {
        href: String,
        #[source]
        source: anyhow::Error,
    },

    /// The item compiler collaborator failed on one item.
    #[error("failed to compile item '{identifier}'")]
    ItemCompilation {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// A filesystem operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A storage area or resource copy operation failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
