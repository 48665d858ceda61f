//! The `qtiforge inspect` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};

use qtiforge_core::artifact::InvocationDescriptor;
use qtiforge_runner::load_compact_test;

pub fn execute(artifact_path: PathBuf) -> Result<()> {
    let descriptor = InvocationDescriptor::load_json(&artifact_path)?;
    let areas_root = artifact_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let test = load_compact_test(areas_root, &descriptor)
        .context("failed to load the compact test the descriptor points at")?;

    println!("Test: {} ({})", test.title, test.identifier);
    println!("Compilation: {}", descriptor.compilation);
    println!(
        "Format v{}, compiled at {}",
        test.meta.format_version,
        test.meta.compiled_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "{} outcome declaration(s), {} item(s)",
        test.outcome_declarations.len(),
        test.item_count()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Part", "Section", "Item", "Branch rule", "Responses"]);

    for (part, section, item) in test.items() {
        table.add_row(vec![
            part.identifier.clone(),
            section.identifier.clone(),
            item.identifier.clone(),
            item.branch_rule
                .as_ref()
                .map(|rule| rule.target.clone())
                .unwrap_or_else(|| "-".to_string()),
            item.response_declarations.len().to_string(),
        ]);
    }

    println!("{table}");

    for part in &test.parts {
        for section in &part.sections {
            for rubric in &section.rubric_refs {
                println!(
                    "Rubric '{}' ({}) -> {}",
                    rubric.identifier, rubric.view, rubric.href
                );
            }
        }
    }

    Ok(())
}
