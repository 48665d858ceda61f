//! Artifact-backed item store and compact test loading.
//!
//! The compact artifact carries every item's declarations and correct
//! responses, so a delivery session can run fully offline: this store
//! serves item runtime data straight from the loaded artifact.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use qtiforge_core::artifact::{CompactTest, InvocationDescriptor};
use qtiforge_core::traits::{ItemRuntimeData, ItemStore};

/// Load the compact test a descriptor points at. `areas_root` is the
/// directory the compiler spawned the storage areas under.
pub fn load_compact_test(
    areas_root: &Path,
    descriptor: &InvocationDescriptor,
) -> Result<CompactTest> {
    let (private_id, _public_id) = descriptor
        .area_ids()
        .context("invocation descriptor has a malformed compilation handle")?;
    CompactTest::load_json(&areas_root.join(private_id))
}

/// Serves item runtime data from an already-loaded compact test.
#[derive(Debug, Clone)]
pub struct ArtifactItemStore {
    items: HashMap<String, ItemRuntimeData>,
}

impl ArtifactItemStore {
    pub fn from_compact(test: &CompactTest) -> Self {
        let items = test
            .items()
            .map(|(_, _, item)| {
                let correct_responses = item
                    .response_declarations
                    .iter()
                    .map(|declaration| {
                        (
                            declaration.variable.identifier.clone(),
                            declaration.correct_responses.clone(),
                        )
                    })
                    .collect();
                (
                    item.identifier.clone(),
                    ItemRuntimeData {
                        identifier: item.identifier.clone(),
                        correct_responses,
                    },
                )
            })
            .collect();
        Self { items }
    }
}

#[async_trait]
impl ItemStore for ArtifactItemStore {
    async fn get(&self, item_id: &str) -> Result<Option<ItemRuntimeData>> {
        Ok(self.items.get(item_id).cloned())
    }
}
