//! The test compilation pipeline.
//!
//! Compilation is a strictly sequential batch: each phase runs once, in
//! order, and any failure aborts the whole compile. The same authored
//! inputs always produce a structurally identical compact artifact.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use qtiforge_core::artifact::{
    ArtifactMeta, CompactItem, CompactPart, CompactSection, CompactTest, InvocationDescriptor,
    RubricRef, ARTIFACT_FORMAT_VERSION,
};
use qtiforge_core::model::{
    BaseType, Cardinality, ItemDefinition, RubricBlock, TestDefinition, VariableDeclaration,
};
use qtiforge_core::traits::{ItemCompiler, ItemResolver};

use crate::error::CompileError;
use crate::partition::{copy_private_resources, copy_public_resources};
use crate::rubric::RubricRenderer;
use crate::storage::StorageArea;

/// Identifier of the outcome injected for external grade reporting.
pub const LTI_OUTCOME_IDENTIFIER: &str = "LtiOutcome";

/// Compiles an authored test and its items into a compact artifact.
///
/// Collaborators are injected at construction; the compiler owns its
/// storage areas for the duration of one `compile` run and performs no
/// concurrent I/O.
pub struct TestCompiler {
    resolver: Arc<dyn ItemResolver>,
    item_compiler: Arc<dyn ItemCompiler>,
}

impl TestCompiler {
    pub fn new(resolver: Arc<dyn ItemResolver>, item_compiler: Arc<dyn ItemCompiler>) -> Self {
        Self {
            resolver,
            item_compiler,
        }
    }

    /// Compile `test` into `destination`, copying authored resources from
    /// `source_dir`.
    ///
    /// Returns the invocation descriptor a delivery runtime needs to
    /// locate and execute the artifact. On any error the partially
    /// written areas must be discarded and the compile re-run from
    /// scratch.
    pub fn compile(
        &self,
        test: &TestDefinition,
        source_dir: &Path,
        destination: &Path,
    ) -> Result<InvocationDescriptor, CompileError> {
        // 1. Spawn storage areas and rendering utilities.
        let private = StorageArea::spawn(destination, "private")?;
        let public = StorageArea::spawn(destination, "public")?;
        let renderer = RubricRenderer::new();

        // 2. Copy the authored resources into the private area.
        let copied = copy_private_resources(source_dir, &private)?;
        tracing::debug!(test = %test.identifier, copied, "private resources copied");

        // 3. Compact the test definition with resolved item metadata.
        let (mut compact, resolved) = self.compact_test(test)?;
        tracing::debug!(test = %test.identifier, "test definition compacted");

        // 4. Sub-compile every referenced item and rewrite its href.
        self.compile_items(&mut compact, &resolved, &private)?;

        // 5. Extract rubric blocks into standalone pre-render fragments.
        let rubrics = extract_rubric_blocks(test, &mut compact, &private)?;

        // 6. Inject delivery-only runtime variables.
        inject_delivery_outcomes(&mut compact);

        // 7. Render every rubric fragment, scoping its stylesheets.
        let mut public_exclusions = HashSet::new();
        for rubric in &rubrics {
            let rendered = renderer.render(rubric, &private).map_err(|source| {
                CompileError::RubricRenderFailed {
                    identifier: rubric.identifier.clone(),
                    source,
                }
            })?;

            // The pre-render body is no longer needed once rendered.
            private.remove(&staged_rubric_path(&rubric.identifier))?;
            rewrite_rubric_href(&mut compact, &rubric.identifier, &rendered.href);
            public_exclusions.extend(rendered.stylesheet_paths);
        }

        // 8. Serialize the compact document for fast loading.
        compact
            .save_json(private.root())
            .map_err(|source| CompileError::SerializationFailed { source })?;

        // 9. Mirror allow-listed resources into the public area.
        let published = copy_public_resources(&private, &public, &public_exclusions)?;
        tracing::debug!(test = %test.identifier, published, "public resources copied");

        // 10. Build the invocation descriptor.
        let descriptor = InvocationDescriptor::new(&test.identifier, private.id(), public.id());
        tracing::info!(test = %test.identifier, compilation = %descriptor.compilation, "test compiled");
        Ok(descriptor)
    }

    fn compact_test(
        &self,
        test: &TestDefinition,
    ) -> Result<(CompactTest, HashMap<String, ItemDefinition>), CompileError> {
        let mut resolved = HashMap::new();
        let mut parts = Vec::with_capacity(test.parts.len());

        for part in &test.parts {
            let mut sections = Vec::with_capacity(part.sections.len());
            for section in &part.sections {
                let mut items = Vec::with_capacity(section.item_refs.len());
                for item_ref in &section.item_refs {
                    let item = self.resolver.resolve(&item_ref.href).map_err(|source| {
                        CompileError::ItemResolution {
                            href: item_ref.href.clone(),
                            source,
                        }
                    })?;

                    items.push(CompactItem {
                        identifier: item_ref.identifier.clone(),
                        href: item_ref.href.clone(),
                        branch_rule: item_ref.branch_rule.clone(),
                        response_declarations: item.response_declarations.clone(),
                        outcome_declarations: item.outcome_declarations.clone(),
                    });
                    resolved.insert(item_ref.identifier.clone(), item);
                }
                sections.push(CompactSection {
                    identifier: section.identifier.clone(),
                    title: section.title.clone(),
                    rubric_refs: Vec::new(),
                    items,
                });
            }
            parts.push(CompactPart {
                identifier: part.identifier.clone(),
                navigation_mode: part.navigation_mode,
                sections,
            });
        }

        let compact = CompactTest {
            meta: ArtifactMeta {
                format_version: ARTIFACT_FORMAT_VERSION,
                test_ref: test.identifier.clone(),
                compiled_at: Utc::now(),
            },
            identifier: test.identifier.clone(),
            title: test.title.clone(),
            outcome_declarations: test.outcome_declarations.clone(),
            parts,
        };
        Ok((compact, resolved))
    }

    fn compile_items(
        &self,
        compact: &mut CompactTest,
        resolved: &HashMap<String, ItemDefinition>,
        private: &StorageArea,
    ) -> Result<(), CompileError> {
        let test_ref = compact.meta.test_ref.clone();
        let mut item_count = 0usize;

        for part in &mut compact.parts {
            for section in &mut part.sections {
                for item in &mut section.items {
                    let definition = resolved
                        .get(&item.identifier)
                        .expect("every compact item was resolved during compaction");
                    let location = self
                        .item_compiler
                        .compile_item(definition, private.root())
                        .map_err(|source| CompileError::ItemCompilation {
                            identifier: item.identifier.clone(),
                            source,
                        })?;

                    item.href = format!("{}|{}|{}", location.uri, location.path, test_ref);
                    item_count += 1;
                    tracing::debug!(item = %item.identifier, "item compiled");
                }
            }
        }

        if item_count == 0 {
            return Err(CompileError::NoItems);
        }
        Ok(())
    }
}

/// Move rubric blocks out of the test body into standalone pre-render
/// fragments in the private area. The compact sections keep only refs.
fn extract_rubric_blocks(
    test: &TestDefinition,
    compact: &mut CompactTest,
    private: &StorageArea,
) -> Result<Vec<RubricBlock>, CompileError> {
    let mut extracted = Vec::new();

    for (part_index, part) in test.parts.iter().enumerate() {
        for (section_index, section) in part.sections.iter().enumerate() {
            for rubric in &section.rubric_blocks {
                let staged = staged_rubric_path(&rubric.identifier);
                private.write(&staged, &rubric.content)?;

                compact.parts[part_index].sections[section_index]
                    .rubric_refs
                    .push(RubricRef {
                        identifier: rubric.identifier.clone(),
                        view: rubric.view,
                        href: staged.to_string_lossy().into_owned(),
                    });
                extracted.push(rubric.clone());
            }
        }
    }

    Ok(extracted)
}

fn staged_rubric_path(identifier: &str) -> PathBuf {
    PathBuf::from(format!("rubrics/{identifier}.html"))
}

fn rewrite_rubric_href(compact: &mut CompactTest, identifier: &str, href: &Path) {
    for part in &mut compact.parts {
        for section in &mut part.sections {
            for rubric_ref in &mut section.rubric_refs {
                if rubric_ref.identifier == identifier {
                    rubric_ref.href = href.to_string_lossy().into_owned();
                }
            }
        }
    }
}

/// Add outcome variables that exist only at delivery time, such as the
/// outcome used for external grade reporting.
fn inject_delivery_outcomes(compact: &mut CompactTest) {
    let already_declared = compact
        .outcome_declarations
        .iter()
        .any(|d| d.identifier == LTI_OUTCOME_IDENTIFIER);
    if already_declared {
        return;
    }
    compact.outcome_declarations.push(VariableDeclaration {
        identifier: LTI_OUTCOME_IDENTIFIER.to_string(),
        base_type: BaseType::Float,
        cardinality: Cardinality::Single,
        default_value: Some(vec!["0.0".to_string()]),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{FsItemResolver, JsonItemCompiler};
    use qtiforge_core::model::{
        AssessmentSection, ItemRef, NavigationMode, RubricView, TestPart,
    };

    const ITEM_TOML: &str = r#"
[item]
identifier = "{id}"
title = "Question {id}"

[[responses]]
identifier = "RESPONSE"
base_type = "identifier"
correct_responses = ["A"]
"#;

    fn write_item(source: &Path, id: &str) {
        std::fs::create_dir_all(source.join("items")).unwrap();
        std::fs::write(
            source.join(format!("items/{id}.toml")),
            ITEM_TOML.replace("{id}", id),
        )
        .unwrap();
    }

    fn item_ref(id: &str) -> ItemRef {
        ItemRef {
            identifier: id.into(),
            href: format!("items/{id}.toml"),
            branch_rule: None,
        }
    }

    fn authored_test(item_ids: &[&str], rubrics: Vec<RubricBlock>) -> TestDefinition {
        TestDefinition {
            identifier: "demo".into(),
            title: "Demo Test".into(),
            outcome_declarations: vec![],
            parts: vec![TestPart {
                identifier: "p1".into(),
                navigation_mode: NavigationMode::Linear,
                sections: vec![AssessmentSection {
                    identifier: "s1".into(),
                    title: "Section 1".into(),
                    rubric_blocks: rubrics,
                    item_refs: item_ids.iter().map(|id| item_ref(id)).collect(),
                }],
            }],
        }
    }

    fn make_compiler(source: &Path) -> TestCompiler {
        TestCompiler::new(
            Arc::new(FsItemResolver::new(source)),
            Arc::new(JsonItemCompiler::new()),
        )
    }

    fn area_dir(destination: &Path, id: &str) -> PathBuf {
        destination.join(id)
    }

    #[test]
    fn full_compile_produces_artifact() {
        let source = tempfile::tempdir().unwrap();
        let destination = tempfile::tempdir().unwrap();
        write_item(source.path(), "item1");
        write_item(source.path(), "item2");
        std::fs::create_dir_all(source.path().join("css")).unwrap();
        std::fs::write(source.path().join("css/intro.css"), "p { color: red; }").unwrap();
        std::fs::write(source.path().join("figure.png"), b"png").unwrap();
        std::fs::write(source.path().join("notes.txt"), "authoring notes").unwrap();

        let rubric = RubricBlock {
            identifier: "intro".into(),
            view: RubricView::Candidate,
            content: "<p>Welcome.</p>".into(),
            stylesheets: vec!["css/intro.css".into()],
        };
        let test = authored_test(&["item1", "item2"], vec![rubric]);

        let descriptor = make_compiler(source.path())
            .compile(&test, source.path(), destination.path())
            .unwrap();

        let (private_id, public_id) = descriptor.area_ids().unwrap();
        let private = area_dir(destination.path(), private_id);
        let public = area_dir(destination.path(), public_id);

        // Compact document is loadable and fully rewritten.
        let compact = CompactTest::load_json(&private).unwrap();
        assert_eq!(compact.item_count(), 2);
        let item = compact.find_item("item1").unwrap();
        assert_eq!(
            item.href,
            "qti://items/item1|items/item1/item.json|demo"
        );
        assert_eq!(item.response_declarations[0].correct_responses, ["A"]);

        // Delivery-only outcome was injected.
        assert!(compact
            .outcome_declarations
            .iter()
            .any(|d| d.identifier == LTI_OUTCOME_IDENTIFIER));

        // Rubric fragment rendered, staging body removed, href rewritten.
        let rubric_ref = &compact.parts[0].sections[0].rubric_refs[0];
        assert_eq!(rubric_ref.href, "intro.tpl");
        assert!(private.join("intro.tpl").exists());
        assert!(!private.join("rubrics/intro.html").exists());

        // Scoped stylesheet stays private; other assets are partitioned.
        assert!(!public.join("css/intro.css").exists());
        assert!(public.join("figure.png").exists());
        assert!(!public.join("notes.txt").exists());
        assert!(!public.join("compact-test.json").exists());
        assert!(private.join("notes.txt").exists());
    }

    #[test]
    fn zero_item_refs_fails_with_no_items() {
        let source = tempfile::tempdir().unwrap();
        let destination = tempfile::tempdir().unwrap();
        let test = authored_test(&[], vec![]);

        let err = make_compiler(source.path())
            .compile(&test, source.path(), destination.path())
            .unwrap_err();
        assert!(matches!(err, CompileError::NoItems));
    }

    #[test]
    fn unresolvable_item_ref_aborts() {
        let source = tempfile::tempdir().unwrap();
        let destination = tempfile::tempdir().unwrap();
        let test = authored_test(&["ghost"], vec![]);

        let err = make_compiler(source.path())
            .compile(&test, source.path(), destination.path())
            .unwrap_err();
        assert!(matches!(err, CompileError::ItemResolution { .. }));
    }

    #[test]
    fn missing_rubric_stylesheet_aborts() {
        let source = tempfile::tempdir().unwrap();
        let destination = tempfile::tempdir().unwrap();
        write_item(source.path(), "item1");

        let rubric = RubricBlock {
            identifier: "intro".into(),
            view: RubricView::Candidate,
            content: "<p>Welcome.</p>".into(),
            stylesheets: vec!["css/missing.css".into()],
        };
        let test = authored_test(&["item1"], vec![rubric]);

        let err = make_compiler(source.path())
            .compile(&test, source.path(), destination.path())
            .unwrap_err();
        assert!(matches!(err, CompileError::RubricRenderFailed { .. }));
    }

    #[test]
    fn recompilation_is_structurally_identical() {
        let source = tempfile::tempdir().unwrap();
        let destination = tempfile::tempdir().unwrap();
        write_item(source.path(), "item1");
        write_item(source.path(), "item2");
        let test = authored_test(&["item1", "item2"], vec![]);

        let compiler = make_compiler(source.path());
        let first = compiler
            .compile(&test, source.path(), destination.path())
            .unwrap();
        let second = compiler
            .compile(&test, source.path(), destination.path())
            .unwrap();

        let load = |descriptor: &InvocationDescriptor| {
            let (private_id, _) = descriptor.area_ids().unwrap();
            CompactTest::load_json(&area_dir(destination.path(), private_id)).unwrap()
        };
        assert!(load(&first).structurally_equals(&load(&second)));
    }
}
