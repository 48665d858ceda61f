//! The `qtiforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(test_path: PathBuf) -> Result<()> {
    let test = qtiforge_core::parser::parse_test(&test_path)?;

    println!(
        "Test: {} ({} item refs)",
        test.title,
        test.item_ref_count()
    );

    let warnings = qtiforge_core::parser::validate_test(&test);
    for w in &warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Test is valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
