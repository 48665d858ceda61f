//! Filesystem-backed item collaborators.
//!
//! `FsItemResolver` resolves item refs against a directory of authored
//! item TOML files; `JsonItemCompiler` sub-compiles each item into a
//! fast-loading JSON document inside the private area. Deployments with a
//! different authoring store supply their own implementations of the core
//! traits.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use qtiforge_core::model::ItemDefinition;
use qtiforge_core::parser;
use qtiforge_core::traits::{CompiledItemLocation, ItemCompiler, ItemResolver};

/// Resolves item hrefs relative to a base directory of authored items.
#[derive(Debug, Clone)]
pub struct FsItemResolver {
    base_dir: PathBuf,
}

impl FsItemResolver {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }
}

impl ItemResolver for FsItemResolver {
    fn resolve(&self, href: &str) -> Result<ItemDefinition> {
        let path = self.base_dir.join(href);
        parser::parse_item(&path)
            .with_context(|| format!("failed to resolve item href '{href}'"))
    }
}

/// Compiles each item to `items/{identifier}/item.json` in the private
/// area.
#[derive(Debug, Clone, Default)]
pub struct JsonItemCompiler;

impl JsonItemCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl ItemCompiler for JsonItemCompiler {
    fn compile_item(
        &self,
        item: &ItemDefinition,
        private_area: &Path,
    ) -> Result<CompiledItemLocation> {
        let relative = format!("items/{}/item.json", item.identifier);
        let path = private_area.join(&relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(item)
            .with_context(|| format!("failed to serialize item '{}'", item.identifier))?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(CompiledItemLocation {
            uri: format!("qti://items/{}", item.identifier),
            path: relative,
        })
    }
}
