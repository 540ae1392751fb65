//! End-to-end tests for the page pipeline and the two tree persistence forms.
//!
//! These drive `run_flow` and `expand_in_tree` against scripted generators to
//! verify the documents a real run would leave on disk, without touching the
//! network.

use std::fs;

use serde_json::{Value, json};

use wikiflow::agents::ModelParams;
use wikiflow::agents::expander::{NodeTarget, expand_in_tree};
use wikiflow::core::expand::SubstepCount;
use wikiflow::flow::{FlowContext, FlowInputs, run_flow};
use wikiflow::io::prompt::PromptEngine;
use wikiflow::io::request::FlowRequest;
use wikiflow::io::tree_store::{export_tree_dirs, import_tree_dirs, load_tree, write_tree};
use wikiflow::test_support::{ScriptedGenerator, TestDir};

fn params() -> ModelParams {
    ModelParams::new("test-model", serde_json::Map::new())
}

/// Full flow run: every stage document lands in the flow directory and the
/// tree document round-trips through both persistence forms.
#[test]
fn flow_outputs_round_trip_through_both_tree_forms() {
    let temp = TestDir::new().expect("tempdir");
    let flow_root = temp.path().join("flow");
    let ctx = FlowContext::create(flow_root.to_str().expect("utf-8 path")).expect("ctx");

    let generator = ScriptedGenerator::new([
        r#"{"title": "Bread Making", "automation_status": "Early Automation"}"#,
        r#"[{"step": "Mix ingredients", "children": [{"step": "Measure flour"}]},
            {"step": "Bake"}]"#,
        r#"{"historical": {"1920s": "Commercial mixers"}, "predictions": {"2030s": "Robotic lines"}}"#,
        r#"{"challenges": [{"title": "Dough feel", "explanation": "Tactile judgement"}]}"#,
    ]);
    let engine = PromptEngine::new();
    let raw = json!({"topic": "Bread Making", "task": "Make bread", "depth": 1});
    let flow_request: FlowRequest = serde_json::from_value(raw.clone()).expect("request");
    let inputs = FlowInputs {
        request: &flow_request,
        raw_document: &raw,
        input_label: "bread.json".to_string(),
        breadcrumbs: None,
    };

    let summary = run_flow(&generator, &engine, &ctx, &inputs, &params()).expect("flow");
    assert_eq!(summary.stages_run.len(), 4);
    assert!(summary.stages_failed.is_empty());

    // prompts targeted the right subjects
    let calls = generator.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].user.contains("Bread Making"));
    assert!(calls[1].user.contains("Make bread"));

    // the tree stage document loads as a tree (envelope form)
    let tree = load_tree(&ctx.dir.join("2.json")).expect("load tree");
    assert_eq!(tree.step, "Make bread");
    let children = tree.children.as_deref().expect("children");
    assert_eq!(children[0].step, "Mix ingredients");

    // single document -> directory hierarchy -> single document
    let dir_root = temp.path().join("nested");
    export_tree_dirs(&dir_root, &tree).expect("export");
    let rebuilt = import_tree_dirs(&dir_root).expect("import");
    assert_eq!(rebuilt, tree);

    let rebuilt_path = temp.path().join("rebuilt.json");
    write_tree(&rebuilt_path, &rebuilt).expect("write");
    assert_eq!(load_tree(&rebuilt_path).expect("reload"), tree);
}

/// Expanding a node of a previously generated tree keeps the document
/// contract of the original pipeline: same ids, children appended in order.
#[test]
fn expansion_appends_to_a_loaded_tree() {
    let temp = TestDir::new().expect("tempdir");
    let tree_path = temp.path().join("tree.json");
    fs::write(
        &tree_path,
        r#"{
  "step": "Make bread",
  "id": "root-id",
  "children": [
    {"step": "Mix ingredients", "id": "mix-id", "children": [{"step": "Measure flour", "id": "measure-id"}]},
    {"step": "Bake", "id": "bake-id"}
  ]
}
"#,
    )
    .expect("write tree");
    let tree = load_tree(&tree_path).expect("load");

    let generator =
        ScriptedGenerator::new([r#"[{"step": "Knead dough"}, {"step": "First proof"}]"#]);
    let engine = PromptEngine::new();

    let outcome = expand_in_tree(
        &generator,
        &engine,
        &tree,
        &NodeTarget::Step("Mix ingredients".to_string()),
        &SubstepCount::Exact(2),
        false,
        &params(),
    )
    .expect("outcome");

    assert_eq!(outcome.node_path, vec![0]);
    let expanded = &outcome.tree.children.as_deref().expect("children")[0];
    assert_eq!(expanded.id, "mix-id");
    let labels: Vec<&str> = expanded
        .children
        .as_deref()
        .expect("substeps")
        .iter()
        .map(|child| child.step.as_str())
        .collect();
    assert_eq!(labels, vec!["Measure flour", "Knead dough", "First proof"]);

    // count directive reached the prompt
    assert!(generator.calls()[0].user.contains("2 detailed substeps"));

    // the updated tree still validates and round-trips as a document
    let updated_path = temp.path().join("updated.json");
    write_tree(&updated_path, &outcome.tree).expect("write");
    let reloaded = load_tree(&updated_path).expect("reload");
    assert_eq!(reloaded, outcome.tree);

    // original tree untouched by the expansion
    let original = &tree.children.as_deref().expect("children")[0];
    assert_eq!(original.children.as_deref().expect("substeps").len(), 1);
}

/// A malformed reply mid-flow still leaves a structurally complete flow
/// directory behind.
#[test]
fn malformed_tree_reply_degrades_but_flow_completes() {
    let temp = TestDir::new().expect("tempdir");
    let ctx = FlowContext::create(
        temp.path().join("flow").to_str().expect("utf-8 path"),
    )
    .expect("ctx");

    let generator = ScriptedGenerator::new([
        r#"{"title": "Bread"}"#,
        "Sorry, here are the steps:\nMix the dough\nBake it",
        r#"{"historical": {}}"#,
        r#"{"challenges": []}"#,
    ]);
    let engine = PromptEngine::new();
    let raw = json!({"topic": "Bread", "depth": 1});
    let flow_request: FlowRequest = serde_json::from_value(raw.clone()).expect("request");
    let inputs = FlowInputs {
        request: &flow_request,
        raw_document: &raw,
        input_label: "bread.json".to_string(),
        breadcrumbs: None,
    };

    let summary = run_flow(&generator, &engine, &ctx, &inputs, &params()).expect("flow");
    assert!(summary.stages_failed.is_empty());

    let document: Value = serde_json::from_str(
        &fs::read_to_string(ctx.dir.join("2.json")).expect("2.json"),
    )
    .expect("json");
    let children = document["tree"]["children"].as_array().expect("children");
    let labels: Vec<&str> = children
        .iter()
        .map(|child| child["step"].as_str().expect("step"))
        .collect();
    // line fallback salvaged the reply, one leaf per line
    assert_eq!(
        labels,
        vec!["Sorry, here are the steps:", "Mix the dough", "Bake it"]
    );
}
