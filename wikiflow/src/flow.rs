//! Staged pipeline that builds every section of a wiki page run.
//!
//! A flow gets its own directory named by a fresh identifier; the identifier
//! travels in an explicit [`FlowContext`] handed to every stage writer rather
//! than through ambient state. Stages run strictly in order; a failed stage
//! is logged and recorded, and the flow continues with the next one.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::hallucinator::hallucinate_tree;
use crate::agents::page::{PageKind, generate_section};
use crate::agents::{ModelParams, TextGenerator};
use crate::core::normalize::EmbeddedLabelMode;
use crate::io::prompt::PromptEngine;
use crate::io::report::{report_document, run_report, save_output};
use crate::io::request::FlowRequest;

/// Identity and output directory of one flow run.
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub id: String,
    pub dir: PathBuf,
}

impl FlowContext {
    /// Allocate a fresh flow under `flow_root`.
    pub fn create(flow_root: &str) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let dir = Path::new(flow_root).join(&id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create flow dir {}", dir.display()))?;
        Ok(Self { id, dir })
    }
}

/// Everything a flow run consumes besides the generator itself.
#[derive(Debug, Clone)]
pub struct FlowInputs<'a> {
    pub request: &'a FlowRequest,
    /// The input document verbatim, copied into the flow directory.
    pub raw_document: &'a Value,
    /// Where the input came from, recorded in `flow-metadata.json`.
    pub input_label: String,
    /// Free-text trail recorded as `breadcrumbs.txt` when present.
    pub breadcrumbs: Option<String>,
}

/// Which stages completed and which failed, in run order.
#[derive(Debug, Clone, Default)]
pub struct FlowSummary {
    pub stages_run: Vec<String>,
    pub stages_failed: Vec<String>,
}

/// Run the full pipeline: metadata, tree, timeline, challenges, then any
/// alternative trees, finishing with `flow-metadata.json`.
pub fn run_flow<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    ctx: &FlowContext,
    inputs: &FlowInputs<'_>,
    params: &ModelParams,
) -> Result<FlowSummary> {
    let started = Utc::now();
    save_output(&ctx.dir.join("input.json"), inputs.raw_document)?;
    if let Some(trail) = &inputs.breadcrumbs {
        let trail_path = ctx.dir.join("breadcrumbs.txt");
        fs::write(&trail_path, trail)
            .with_context(|| format!("write {}", trail_path.display()))?;
        info!(breadcrumbs = %trail, "recorded breadcrumbs");
    }

    let subject = inputs
        .request
        .subject()
        .ok_or_else(|| anyhow!("flow input needs a 'topic' or 'task' field"))?
        .to_string();
    let task_line = inputs
        .request
        .task
        .clone()
        .unwrap_or_else(|| subject.clone());

    let mut summary = FlowSummary::default();

    let page_stage = |kind: PageKind, file: &str| -> Result<()> {
        let stage_started = Utc::now();
        let section = generate_section(generator, engine, kind, &subject, None, params)?;
        write_stage(
            ctx,
            file,
            kind.task_name(),
            stage_started,
            kind.section_key(),
            section,
        )
    };

    run_stage(&mut summary, PageKind::Metadata.category(), || {
        page_stage(PageKind::Metadata, "1.json")
    });
    run_stage(&mut summary, "step-tree", || {
        let stage_started = Utc::now();
        let tree = hallucinate_tree(
            generator,
            engine,
            &task_line,
            inputs.request.depth,
            params,
            EmbeddedLabelMode::Clear,
        );
        write_stage(
            ctx,
            "2.json",
            "Hallucinate Tree",
            stage_started,
            "tree",
            serde_json::to_value(&tree)?,
        )
    });
    run_stage(&mut summary, PageKind::Timeline.category(), || {
        page_stage(PageKind::Timeline, "3.json")
    });
    run_stage(&mut summary, PageKind::Challenges.category(), || {
        page_stage(PageKind::Challenges, "4.json")
    });

    for index in 0..inputs.request.alternatives {
        let stage_name = format!("alternative-{}", index + 1);
        run_stage(&mut summary, &stage_name, || {
            generate_alternative(generator, engine, ctx, inputs, params, &task_line, index)
        });
    }

    let report = run_report("Complete Automation Flow", started, ctx.id.clone());
    let metadata = report_document(
        &report,
        [
            ("input_file", json!(inputs.input_label)),
            ("stages_run", json!(summary.stages_run)),
            ("stages_failed", json!(summary.stages_failed)),
        ],
    )?;
    save_output(&ctx.dir.join("flow-metadata.json"), &metadata)?;
    info!(
        flow = %ctx.id,
        run = summary.stages_run.len(),
        failed = summary.stages_failed.len(),
        "flow finished"
    );
    Ok(summary)
}

fn run_stage(summary: &mut FlowSummary, name: &str, stage: impl FnOnce() -> Result<()>) {
    info!(stage = name, "running stage");
    match stage() {
        Ok(()) => summary.stages_run.push(name.to_string()),
        Err(err) => {
            warn!(stage = name, error = %format!("{err:#}"), "stage failed, continuing");
            summary.stages_failed.push(name.to_string());
        }
    }
}

fn write_stage(
    ctx: &FlowContext,
    file: &str,
    task_name: &str,
    started: DateTime<Utc>,
    key: &'static str,
    section: Value,
) -> Result<()> {
    let report = run_report(task_name, started, Uuid::new_v4().to_string());
    let document = report_document(&report, [(key, section)])?;
    save_output(&ctx.dir.join(file), &document)
}

/// One extra tree with varied sampling parameters and an approach label.
fn generate_alternative<G: TextGenerator>(
    generator: &G,
    engine: &PromptEngine,
    ctx: &FlowContext,
    inputs: &FlowInputs<'_>,
    params: &ModelParams,
    task_line: &str,
    index: u32,
) -> Result<()> {
    let (approach_name, approach_description) = approach_label(index);
    let mut options = params.options.clone();
    options.insert(
        "temperature".to_string(),
        json!(0.3 + f64::from(index) * 0.15),
    );
    let alt_params = ModelParams::new(params.model.clone(), options.clone());

    let mut alt_document = match inputs.raw_document {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    alt_document.insert("approach_name".to_string(), json!(approach_name));
    alt_document.insert("approach_description".to_string(), json!(approach_description));
    alt_document.insert("parameters".to_string(), Value::Object(options));
    save_output(
        &ctx.dir.join("inputs").join(format!("alt_input_{}.json", index + 1)),
        &Value::Object(alt_document),
    )?;

    let stage_started = Utc::now();
    let tree = hallucinate_tree(
        generator,
        engine,
        task_line,
        inputs.request.depth,
        &alt_params,
        EmbeddedLabelMode::Clear,
    );
    let report = run_report("Hallucinate Tree", stage_started, Uuid::new_v4().to_string());
    let document = report_document(
        &report,
        [
            ("approach_name", json!(approach_name)),
            ("approach_description", json!(approach_description)),
            ("tree", serde_json::to_value(&tree)?),
        ],
    )?;
    save_output(&ctx.dir.join(format!("alt{}.json", index + 1)), &document)
}

fn approach_label(index: u32) -> (String, String) {
    match index {
        0 => (
            "Efficiency-Optimized Approach".to_string(),
            "This approach prioritizes minimizing resource usage and production time.".to_string(),
        ),
        1 => (
            "Safety-Optimized Approach".to_string(),
            "This approach focuses on maximizing safety and reliability.".to_string(),
        ),
        2 => (
            "Hybridized Approach".to_string(),
            "This approach balances efficiency with safety considerations.".to_string(),
        ),
        _ => (
            format!("Alternative Approach {}", index + 1),
            "An alternative methodology for approaching this process.".to_string(),
        ),
    }
}
