//! TOML parsers for authored test and item documents.
//!
//! Loads authored documents from TOML files and validates them before
//! compilation. The verbose authoring format is never read at delivery
//! time; the compiler turns it into the compact artifact.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::branch::BranchRule;
use crate::model::{
    AssessmentSection, ItemDefinition, ItemRef, ResponseDeclaration, RubricBlock, TestDefinition,
    TestPart, VariableDeclaration,
};

/// Intermediate TOML structure for authored test files.
#[derive(Debug, Deserialize)]
struct TomlTestFile {
    test: TomlTestHeader,
    #[serde(default)]
    outcomes: Vec<TomlDeclaration>,
    #[serde(default)]
    parts: Vec<TomlPart>,
}

#[derive(Debug, Deserialize)]
struct TomlTestHeader {
    identifier: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct TomlPart {
    identifier: String,
    #[serde(default = "default_navigation_mode")]
    navigation_mode: String,
    #[serde(default)]
    sections: Vec<TomlSection>,
}

fn default_navigation_mode() -> String {
    "linear".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlSection {
    identifier: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    rubric_blocks: Vec<TomlRubricBlock>,
    #[serde(default)]
    item_refs: Vec<TomlItemRef>,
}

#[derive(Debug, Deserialize)]
struct TomlRubricBlock {
    identifier: String,
    #[serde(default = "default_view")]
    view: String,
    content: String,
    #[serde(default)]
    stylesheets: Vec<String>,
}

fn default_view() -> String {
    "candidate".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlItemRef {
    identifier: String,
    href: String,
    #[serde(default)]
    branch_rule: Option<BranchRule>,
}

#[derive(Debug, Deserialize)]
struct TomlDeclaration {
    identifier: String,
    base_type: String,
    #[serde(default = "default_cardinality")]
    cardinality: String,
    #[serde(default)]
    default_value: Option<Vec<String>>,
    #[serde(default)]
    correct_responses: Vec<String>,
}

fn default_cardinality() -> String {
    "single".to_string()
}

impl TomlDeclaration {
    fn into_declaration(self) -> Result<VariableDeclaration> {
        Ok(VariableDeclaration {
            identifier: self.identifier,
            base_type: self.base_type.parse()?,
            cardinality: self
                .cardinality
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{}", e))?,
            default_value: self.default_value,
        })
    }

    fn into_response_declaration(self) -> Result<ResponseDeclaration> {
        let correct_responses = self.correct_responses.clone();
        Ok(ResponseDeclaration {
            variable: self.into_declaration()?,
            correct_responses,
        })
    }
}

/// Intermediate TOML structure for authored item files.
#[derive(Debug, Deserialize)]
struct TomlItemFile {
    item: TomlItemHeader,
    #[serde(default)]
    responses: Vec<TomlDeclaration>,
    #[serde(default)]
    outcomes: Vec<TomlDeclaration>,
}

#[derive(Debug, Deserialize)]
struct TomlItemHeader {
    identifier: String,
    #[serde(default)]
    title: String,
}

/// Parse a single TOML file into a `TestDefinition`.
pub fn parse_test(path: &Path) -> Result<TestDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test file: {}", path.display()))?;
    parse_test_str(&content, path)
}

/// Parse a TOML string into a `TestDefinition` (useful for testing).
pub fn parse_test_str(content: &str, source_path: &Path) -> Result<TestDefinition> {
    let parsed: TomlTestFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let outcome_declarations = parsed
        .outcomes
        .into_iter()
        .map(TomlDeclaration::into_declaration)
        .collect::<Result<Vec<_>>>()?;

    let parts = parsed
        .parts
        .into_iter()
        .map(|p| {
            let sections = p
                .sections
                .into_iter()
                .map(|s| {
                    let rubric_blocks = s
                        .rubric_blocks
                        .into_iter()
                        .map(|r| {
                            Ok(RubricBlock {
                                identifier: r.identifier,
                                view: r
                                    .view
                                    .parse()
                                    .map_err(|e: String| anyhow::anyhow!("{}", e))?,
                                content: r.content,
                                stylesheets: r.stylesheets,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;

                    let item_refs = s
                        .item_refs
                        .into_iter()
                        .map(|i| ItemRef {
                            identifier: i.identifier,
                            href: i.href,
                            branch_rule: i.branch_rule,
                        })
                        .collect();

                    Ok(AssessmentSection {
                        identifier: s.identifier,
                        title: s.title,
                        rubric_blocks,
                        item_refs,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(TestPart {
                identifier: p.identifier,
                navigation_mode: p
                    .navigation_mode
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("{}", e))?,
                sections,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TestDefinition {
        identifier: parsed.test.identifier,
        title: parsed.test.title,
        outcome_declarations,
        parts,
    })
}

/// Parse a single TOML file into an `ItemDefinition`.
pub fn parse_item(path: &Path) -> Result<ItemDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read item file: {}", path.display()))?;
    parse_item_str(&content, path)
}

/// Parse a TOML string into an `ItemDefinition`.
pub fn parse_item_str(content: &str, source_path: &Path) -> Result<ItemDefinition> {
    let parsed: TomlItemFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let response_declarations = parsed
        .responses
        .into_iter()
        .map(TomlDeclaration::into_response_declaration)
        .collect::<Result<Vec<_>>>()?;

    let outcome_declarations = parsed
        .outcomes
        .into_iter()
        .map(TomlDeclaration::into_declaration)
        .collect::<Result<Vec<_>>>()?;

    Ok(ItemDefinition {
        identifier: parsed.item.identifier,
        title: parsed.item.title,
        response_declarations,
        outcome_declarations,
    })
}

/// A warning from test validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The item ref identifier (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an authored test for common issues.
pub fn validate_test(test: &TestDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let all_items: Vec<&ItemRef> = test
        .parts
        .iter()
        .flat_map(|p| &p.sections)
        .flat_map(|s| &s.item_refs)
        .collect();

    // Check for duplicate item ref identifiers
    let mut seen_ids = std::collections::HashSet::new();
    for item in &all_items {
        if !seen_ids.insert(&item.identifier) {
            warnings.push(ValidationWarning {
                item_id: Some(item.identifier.clone()),
                message: format!("duplicate item ref identifier: {}", item.identifier),
            });
        }
    }

    // Check for branch rule targets that are not in the test
    for item in &all_items {
        if let Some(rule) = &item.branch_rule {
            if !all_items.iter().any(|i| i.identifier == rule.target) {
                warnings.push(ValidationWarning {
                    item_id: Some(item.identifier.clone()),
                    message: format!("branch rule target '{}' not found in test", rule.target),
                });
            }
        }
    }

    // Check for empty parts and sections
    for part in &test.parts {
        if part.sections.is_empty() {
            warnings.push(ValidationWarning {
                item_id: None,
                message: format!("part '{}' has no sections", part.identifier),
            });
        }
        for section in &part.sections {
            if section.item_refs.is_empty() {
                warnings.push(ValidationWarning {
                    item_id: None,
                    message: format!("section '{}' has no item refs", section.identifier),
                });
            }
            for rubric in &section.rubric_blocks {
                if rubric.content.trim().is_empty() {
                    warnings.push(ValidationWarning {
                        item_id: None,
                        message: format!("rubric block '{}' is empty", rubric.identifier),
                    });
                }
            }
        }
    }

    // A compilable test needs at least one item ref
    if all_items.is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: "test has no item refs and cannot be compiled".into(),
        });
    }

    warnings
}
