//! The `qtiforge init` command: starter config and an example test.

use std::path::Path;

use anyhow::{Context, Result};

const STARTER_CONFIG: &str = r#"# qtiforge configuration
output_dir = "./qtiforge-build"

# What to do when a malformed branch rule fails to evaluate:
# "fall-through" continues in document order, "abort" rejects the move.
branch_rule_policy = "fall-through"

# Require a non-empty response before accepting a move.
validate_responses = false
"#;

const EXAMPLE_TEST: &str = r#"[test]
identifier = "example-test"
title = "Example Test"

[[outcomes]]
identifier = "SCORE"
base_type = "float"
default_value = ["0.0"]

[[parts]]
identifier = "part-1"
navigation_mode = "linear"

[[parts.sections]]
identifier = "section-1"
title = "Getting started"

[[parts.sections.rubric_blocks]]
identifier = "instructions"
content = "<p>Answer every question. You cannot go back.</p>"

[[parts.sections.item_refs]]
identifier = "question-1"
href = "items/question-1.toml"

[[parts.sections.item_refs]]
identifier = "question-2"
href = "items/question-2.toml"
"#;

const EXAMPLE_ITEM_1: &str = r#"[item]
identifier = "question-1"
title = "First question"

[[responses]]
identifier = "RESPONSE"
base_type = "identifier"
cardinality = "single"
correct_responses = ["CHOICE_A"]
"#;

const EXAMPLE_ITEM_2: &str = r#"[item]
identifier = "question-2"
title = "Second question"

[[responses]]
identifier = "RESPONSE"
base_type = "integer"
cardinality = "single"
correct_responses = ["42"]
"#;

pub fn execute() -> Result<()> {
    write_if_absent(Path::new("qtiforge.toml"), STARTER_CONFIG)?;
    write_if_absent(Path::new("tests-authoring/example-test.toml"), EXAMPLE_TEST)?;
    write_if_absent(
        Path::new("tests-authoring/items/question-1.toml"),
        EXAMPLE_ITEM_1,
    )?;
    write_if_absent(
        Path::new("tests-authoring/items/question-2.toml"),
        EXAMPLE_ITEM_2,
    )?;
    Ok(())
}

fn write_if_absent(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}
