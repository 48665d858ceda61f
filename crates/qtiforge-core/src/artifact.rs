//! The compact artifact: the serialized, execution-optimized form of a
//! compiled test, plus the invocation descriptor a delivery runtime uses
//! to locate it.
//!
//! A [`CompactTest`] merges the authored test structure with enough item
//! metadata (declarations, correct responses) for the delivery runtime to
//! sequence the test without ever re-reading the authoring store. It is
//! produced exclusively by the compiler and read-only afterwards.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::branch::BranchRule;
use crate::model::{NavigationMode, ResponseDeclaration, RubricView, VariableDeclaration};

/// The filename the compact document is serialized under in the private
/// storage area.
pub const COMPACT_TEST_FILENAME: &str = "compact-test.json";

/// Current artifact format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Artifact header: format version, what was compiled, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Artifact format version, bumped on incompatible layout changes.
    pub format_version: u32,
    /// Reference to the authored test definition.
    pub test_ref: String,
    /// When compilation ran. Excluded from structural comparisons.
    pub compiled_at: DateTime<Utc>,
}

/// The compact, self-contained test document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactTest {
    pub meta: ArtifactMeta,
    pub identifier: String,
    pub title: String,
    /// Test-level outcome declarations, including the delivery-only ones
    /// injected at compile time.
    pub outcome_declarations: Vec<VariableDeclaration>,
    pub parts: Vec<CompactPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactPart {
    pub identifier: String,
    pub navigation_mode: NavigationMode,
    pub sections: Vec<CompactSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactSection {
    pub identifier: String,
    pub title: String,
    /// References to rendered rubric fragments. Populated when rubric
    /// blocks are extracted; hrefs are rewritten once rendering completes.
    #[serde(default)]
    pub rubric_refs: Vec<RubricRef>,
    pub items: Vec<CompactItem>,
}

/// A reference to an extracted rubric fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricRef {
    pub identifier: String,
    pub view: RubricView,
    /// Private-area-relative path of the rendered fragment.
    pub href: String,
}

/// An item reference merged with the item metadata the runtime needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactItem {
    pub identifier: String,
    /// After compilation: `"{item_uri}|{item_path}|{test_ref}"`.
    pub href: String,
    #[serde(default)]
    pub branch_rule: Option<BranchRule>,
    #[serde(default)]
    pub response_declarations: Vec<ResponseDeclaration>,
    #[serde(default)]
    pub outcome_declarations: Vec<VariableDeclaration>,
}

impl CompactTest {
    /// Iterate all items in document order as `(part, section, item)`.
    pub fn items(&self) -> impl Iterator<Item = (&CompactPart, &CompactSection, &CompactItem)> {
        self.parts.iter().flat_map(|part| {
            part.sections.iter().flat_map(move |section| {
                section.items.iter().map(move |item| (part, section, item))
            })
        })
    }

    /// Find an item by identifier.
    pub fn find_item(&self, identifier: &str) -> Option<&CompactItem> {
        self.items()
            .map(|(_, _, item)| item)
            .find(|item| item.identifier == identifier)
    }

    /// Total number of items.
    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// Serialize to pretty JSON in the given directory, for fast loading
    /// at delivery time.
    pub fn save_json(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("failed to serialize compact test document")?;
        let path = dir.join(COMPACT_TEST_FILENAME);
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write compact test to {}", path.display()))?;
        Ok(())
    }

    /// Load a serialized compact document from the given directory.
    pub fn load_json(dir: &Path) -> Result<Self> {
        let path = dir.join(COMPACT_TEST_FILENAME);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read compact test from {}", path.display()))?;
        let test: CompactTest =
            serde_json::from_str(&content).context("failed to parse compact test JSON")?;
        Ok(test)
    }

    /// Structural equality, ignoring the compile timestamp. Compiling the
    /// same inputs twice must produce structurally identical output.
    pub fn structurally_equals(&self, other: &CompactTest) -> bool {
        let strip = |test: &CompactTest| -> serde_json::Value {
            let mut value = serde_json::to_value(test).expect("compact test serializes");
            if let Some(meta) = value.get_mut("meta").and_then(|m| m.as_object_mut()) {
                meta.remove("compiled_at");
            }
            value
        };
        strip(self) == strip(other)
    }
}

/// The handle a delivery runtime uses to locate and execute a compiled
/// test: the test definition reference plus the joined storage area ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationDescriptor {
    /// Reference to the authored test definition.
    pub test_ref: String,
    /// `"{private_area_id}|{public_area_id}"`.
    pub compilation: String,
}

impl InvocationDescriptor {
    pub fn new(test_ref: &str, private_area_id: &str, public_area_id: &str) -> Self {
        Self {
            test_ref: test_ref.to_string(),
            compilation: format!("{private_area_id}|{public_area_id}"),
        }
    }

    /// Split the compilation handle back into `(private, public)` ids.
    pub fn area_ids(&self) -> Option<(&str, &str)> {
        self.compilation.split_once('|')
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("failed to serialize descriptor")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write descriptor to {}", path.display()))?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read descriptor from {}", path.display()))?;
        let descriptor: InvocationDescriptor =
            serde_json::from_str(&content).context("failed to parse descriptor JSON")?;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BaseType, Cardinality};

    fn two_item_test() -> CompactTest {
        CompactTest {
            meta: ArtifactMeta {
                format_version: ARTIFACT_FORMAT_VERSION,
                test_ref: "tests/demo".into(),
                compiled_at: Utc::now(),
            },
            identifier: "demo".into(),
            title: "Demo".into(),
            outcome_declarations: vec![],
            parts: vec![CompactPart {
                identifier: "p1".into(),
                navigation_mode: NavigationMode::Linear,
                sections: vec![CompactSection {
                    identifier: "s1".into(),
                    title: "Section 1".into(),
                    rubric_refs: vec![],
                    items: vec![
                        CompactItem {
                            identifier: "item1".into(),
                            href: "uri1|items/item1|tests/demo".into(),
                            branch_rule: None,
                            response_declarations: vec![ResponseDeclaration {
                                variable: VariableDeclaration {
                                    identifier: "RESPONSE".into(),
                                    base_type: BaseType::Identifier,
                                    cardinality: Cardinality::Single,
                                    default_value: None,
                                },
                                correct_responses: vec!["A".into()],
                            }],
                            outcome_declarations: vec![],
                        },
                        CompactItem {
                            identifier: "item2".into(),
                            href: "uri2|items/item2|tests/demo".into(),
                            branch_rule: None,
                            response_declarations: vec![],
                            outcome_declarations: vec![],
                        },
                    ],
                }],
            }],
        }
    }

    #[test]
    fn document_order_iteration() {
        let test = two_item_test();
        let ids: Vec<&str> = test.items().map(|(_, _, i)| i.identifier.as_str()).collect();
        assert_eq!(ids, ["item1", "item2"]);
        assert_eq!(test.item_count(), 2);
        assert!(test.find_item("item2").is_some());
        assert!(test.find_item("item9").is_none());
    }

    #[test]
    fn json_roundtrip() {
        let test = two_item_test();
        let dir = tempfile::tempdir().unwrap();
        test.save_json(dir.path()).unwrap();
        let loaded = CompactTest::load_json(dir.path()).unwrap();
        assert_eq!(loaded.identifier, "demo");
        assert_eq!(loaded.item_count(), 2);
    }

    #[test]
    fn structural_equality_ignores_timestamp() {
        let a = two_item_test();
        let mut b = a.clone();
        b.meta.compiled_at = Utc::now() + chrono::Duration::hours(1);
        assert!(a.structurally_equals(&b));

        b.parts[0].sections[0].items.pop();
        assert!(!a.structurally_equals(&b));
    }

    #[test]
    fn descriptor_joins_and_splits_area_ids() {
        let descriptor = InvocationDescriptor::new("tests/demo", "private-abc", "public-def");
        assert_eq!(descriptor.compilation, "private-abc|public-def");
        assert_eq!(descriptor.area_ids(), Some(("private-abc", "public-def")));
    }

    #[test]
    fn descriptor_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invocation.json");
        let descriptor = InvocationDescriptor::new("tests/demo", "priv", "pub");
        descriptor.save_json(&path).unwrap();
        assert_eq!(InvocationDescriptor::load_json(&path).unwrap(), descriptor);
    }
}
