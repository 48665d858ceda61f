//! End-to-end pipeline tests: compile an authored test, load the compact
//! artifact, and drive a delivery session through it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use qtiforge_compiler::items::{FsItemResolver, JsonItemCompiler};
use qtiforge_compiler::TestCompiler;
use qtiforge_core::artifact::{CompactTest, InvocationDescriptor};
use qtiforge_core::parser;
use qtiforge_core::responses::NavigationParams;
use qtiforge_runner::{
    load_compact_test, ArtifactItemStore, DeliverySession, ResumeContext, SequencerError,
    SessionConfig,
};

const TEST_TOML: &str = r#"
[test]
identifier = "e2e-demo"
title = "End to End Demo"

[[parts]]
identifier = "p1"
navigation_mode = "linear"

[[parts.sections]]
identifier = "s1"
title = "Section 1"

[[parts.sections.rubric_blocks]]
identifier = "intro"
content = "<p>Good luck.</p>"
stylesheets = ["css/intro.css"]

[[parts.sections.item_refs]]
identifier = "item1"
href = "items/item1.toml"

# Answering A on item1 jumps straight to item3.
[parts.sections.item_refs.branch_rule]
target = "item3"

[parts.sections.item_refs.branch_rule.expression]
kind = "match"

[parts.sections.item_refs.branch_rule.expression.left]
kind = "variable"
identifier = "RESPONSE"

[parts.sections.item_refs.branch_rule.expression.right]
kind = "correct"
identifier = "RESPONSE"

[[parts.sections.item_refs]]
identifier = "item2"
href = "items/item2.toml"

[[parts.sections.item_refs]]
identifier = "item3"
href = "items/item3.toml"
"#;

const ITEM_TOML: &str = r#"
[item]
identifier = "{id}"
title = "Question {id}"

[[responses]]
identifier = "RESPONSE"
base_type = "identifier"
cardinality = "single"
correct_responses = ["A"]
"#;

fn write_authoring(dir: &Path) -> std::path::PathBuf {
    let test_path = dir.join("test.toml");
    std::fs::write(&test_path, TEST_TOML).unwrap();
    std::fs::create_dir_all(dir.join("items")).unwrap();
    std::fs::create_dir_all(dir.join("css")).unwrap();
    std::fs::write(dir.join("css/intro.css"), "p { color: green; }").unwrap();
    for id in ["item1", "item2", "item3"] {
        std::fs::write(
            dir.join(format!("items/{id}.toml")),
            ITEM_TOML.replace("{id}", id),
        )
        .unwrap();
    }
    test_path
}

/// Compile the authored test and return the descriptor plus the loaded
/// compact document.
fn compile(source: &Path, destination: &Path) -> (InvocationDescriptor, CompactTest) {
    let test = parser::parse_test(&source.join("test.toml")).unwrap();
    let compiler = TestCompiler::new(
        Arc::new(FsItemResolver::new(source)),
        Arc::new(JsonItemCompiler::new()),
    );
    let descriptor = compiler.compile(&test, source, destination).unwrap();
    let compact = load_compact_test(destination, &descriptor).unwrap();
    (descriptor, compact)
}

fn session(compact: &CompactTest, config: SessionConfig) -> DeliverySession {
    let store = Arc::new(ArtifactItemStore::from_compact(compact));
    DeliverySession::new(compact, store, config)
}

fn answer(item: &str, id: &str) -> NavigationParams {
    let mut responses = HashMap::new();
    responses.insert("RESPONSE".to_string(), vec![id.to_string()]);
    NavigationParams::for_item(item, responses)
}

#[tokio::test]
async fn compile_then_deliver_with_branching() {
    let source = tempfile::tempdir().unwrap();
    let destination = tempfile::tempdir().unwrap();
    write_authoring(source.path());

    let (descriptor, compact) = compile(source.path(), destination.path());
    assert_eq!(descriptor.test_ref, "e2e-demo");
    assert_eq!(compact.item_count(), 3);

    let session = session(&compact, SessionConfig::default());
    session.init(None).await.unwrap();
    assert_eq!(session.current().await.unwrap().unwrap().item, "item1");

    // The correct response triggers the branch rule and skips item2. The
    // correct responses were primed from the artifact during init, no
    // server round trip involved.
    let jump = session
        .move_next(answer("item1", "A"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jump.item, "item3");
    assert_eq!(jump.position, 1);

    // item3 is the last item: the next move is a terminal no-op.
    assert!(session
        .move_next(answer("item3", "A"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn wrong_answer_follows_document_order() {
    let source = tempfile::tempdir().unwrap();
    let destination = tempfile::tempdir().unwrap();
    write_authoring(source.path());

    let (_, compact) = compile(source.path(), destination.path());
    let session = session(&compact, SessionConfig::default());
    session.init(None).await.unwrap();

    let jump = session
        .move_next(answer("item1", "B"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jump.item, "item2");
}

#[tokio::test]
async fn resume_after_interruption() {
    let source = tempfile::tempdir().unwrap();
    let destination = tempfile::tempdir().unwrap();
    write_authoring(source.path());

    let (_, compact) = compile(source.path(), destination.path());

    // First session walks to item2 and is then abandoned.
    let first = session(&compact, SessionConfig::default());
    first.init(None).await.unwrap();
    first.move_next(answer("item1", "B")).await.unwrap();
    let interrupted_at = first.current().await.unwrap().unwrap();
    assert_eq!(interrupted_at.item, "item2");

    // A fresh session resumes from the persisted position and rebuilds
    // the same visited prefix.
    let resumed = session(&compact, SessionConfig::default());
    resumed
        .init(Some(ResumeContext {
            item: interrupted_at.item.clone(),
            position: interrupted_at.position,
        }))
        .await
        .unwrap();

    let table = resumed.jump_table().await.unwrap();
    let items: Vec<&str> = table.iter().map(|j| j.item.as_str()).collect();
    assert_eq!(items, ["item1", "item2"]);
    let positions: Vec<i64> = table.iter().map(|j| j.position).collect();
    assert_eq!(positions, [0, 1]);

    let jump = resumed
        .move_next(answer("item2", "B"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(jump.item, "item3");
}

#[tokio::test]
async fn required_responses_gate_navigation() {
    let source = tempfile::tempdir().unwrap();
    let destination = tempfile::tempdir().unwrap();
    write_authoring(source.path());

    let (_, compact) = compile(source.path(), destination.path());
    let session = session(
        &compact,
        SessionConfig {
            validate_responses: true,
            ..Default::default()
        },
    );
    session.init(None).await.unwrap();

    let err = session.move_next(answer("item1", "")).await.unwrap_err();
    assert!(matches!(err, SequencerError::EmptyResponseRejected));
    assert_eq!(session.current().await.unwrap().unwrap().item, "item1");
}

#[tokio::test]
async fn rendered_rubric_is_in_the_artifact() {
    let source = tempfile::tempdir().unwrap();
    let destination = tempfile::tempdir().unwrap();
    write_authoring(source.path());

    let (descriptor, compact) = compile(source.path(), destination.path());
    let (private_id, public_id) = descriptor.area_ids().unwrap();

    let rubric_ref = &compact.parts[0].sections[0].rubric_refs[0];
    assert_eq!(rubric_ref.identifier, "intro");

    let fragment =
        std::fs::read_to_string(destination.path().join(private_id).join(&rubric_ref.href))
            .unwrap();
    assert!(fragment.contains("id=\"intro\""));
    assert!(fragment.contains("{{artifact_base}}css/intro.css"));

    // The scoped rubric stylesheet never reaches the public area.
    let scoped = std::fs::read_to_string(
        destination.path().join(private_id).join("css/intro.css"),
    )
    .unwrap();
    assert!(scoped.contains("#intro p"));
    assert!(!destination
        .path()
        .join(public_id)
        .join("css/intro.css")
        .exists());
}
