//! The `qtiforge compile` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use qtiforge_compiler::items::{FsItemResolver, JsonItemCompiler};
use qtiforge_compiler::TestCompiler;

use crate::config::load_config_from;

pub fn execute(
    test_path: PathBuf,
    items_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let test = qtiforge_core::parser::parse_test(&test_path)?;

    let warnings = qtiforge_core::parser::validate_test(&test);
    for w in &warnings {
        tracing::warn!(test = %test.identifier, "{}", w.message);
    }

    let source_dir = test_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let items_dir = items_dir.unwrap_or_else(|| source_dir.clone());
    let output = output.unwrap_or(config.output_dir);
    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    let compiler = TestCompiler::new(
        Arc::new(FsItemResolver::new(&items_dir)),
        Arc::new(JsonItemCompiler::new()),
    );
    let descriptor = compiler.compile(&test, &source_dir, &output)?;

    let descriptor_path = output.join("invocation.json");
    descriptor.save_json(&descriptor_path)?;

    println!(
        "Compiled test '{}' ({} items)",
        test.identifier,
        test.item_ref_count()
    );
    println!("Compilation: {}", descriptor.compilation);
    println!("Descriptor written to {}", descriptor_path.display());

    Ok(())
}
