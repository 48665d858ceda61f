//! Collaborator interfaces for compilation and delivery.
//!
//! The compiler and the sequencer never locate their collaborators through
//! a service registry; concrete implementations are injected through these
//! traits. Filesystem-backed implementations live in `qtiforge-compiler`
//! and `qtiforge-runner`.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::ItemDefinition;

/// Resolves an authored item reference to its item definition.
pub trait ItemResolver: Send + Sync {
    /// Resolve the `href` of an item ref into the authored item document.
    fn resolve(&self, href: &str) -> anyhow::Result<ItemDefinition>;
}

/// Sub-compiles a single item into the private storage area.
pub trait ItemCompiler: Send + Sync {
    /// Compile one item, returning where the compiled output can be
    /// resolved from at delivery time.
    fn compile_item(
        &self,
        item: &ItemDefinition,
        private_area: &Path,
    ) -> anyhow::Result<CompiledItemLocation>;
}

/// Where a compiled item lives, used to rewrite its href in the compact
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledItemLocation {
    /// Stable URI of the compiled item.
    pub uri: String,
    /// Private-area-relative path of the compiled output.
    pub path: String,
}

/// Delivery-time access to per-item runtime data.
///
/// Reading may suspend (the data can live in a remote store), which is why
/// this is the one async collaborator: the sequencer primes its response
/// store from it during `init`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch the runtime data of an item, `None` if unknown.
    async fn get(&self, item_id: &str) -> anyhow::Result<Option<ItemRuntimeData>>;
}

/// The slice of item data the sequencer needs at delivery time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRuntimeData {
    pub identifier: String,
    /// Response identifier to the list of correct response ids.
    pub correct_responses: HashMap<String, Vec<String>>,
}
