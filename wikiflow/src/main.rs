//! Command-line interface for the wiki page pipeline.
//!
//! Every subcommand follows the same shape: read a JSON input document, call
//! the generation backend, write an envelope output document
//! (`{uuid, date_created, task, time_taken, ...}`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

use wikiflow::agents::ModelParams;
use wikiflow::agents::expander::{NodeTarget, expand_in_tree};
use wikiflow::agents::hallucinator::hallucinate_tree;
use wikiflow::agents::ollama::OllamaGenerator;
use wikiflow::agents::page::{PageKind, generate_section};
use wikiflow::core::normalize::EmbeddedLabelMode;
use wikiflow::flow::{FlowContext, FlowInputs, run_flow};
use wikiflow::io::config::{WikiflowConfig, load_config};
use wikiflow::io::prompt::PromptEngine;
use wikiflow::io::report::{output_filepath, report_document, run_report, save_output};
use wikiflow::io::request::{ExpandRequest, FlowRequest, HallucinateRequest, TopicRequest, load_json};
use wikiflow::io::tree_store::{export_tree_dirs, import_tree_dirs, load_tree, write_tree};
use wikiflow::logging;

#[derive(Parser)]
#[command(
    name = "wikiflow",
    version,
    about = "LLM-driven task decomposition trees for automation wiki pages"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "wikiflow.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expand one node of an existing tree into substeps.
    Expand {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Generate a task tree from a single task description.
    Hallucinate {
        input: PathBuf,
        output: Option<PathBuf>,
        /// Also export the tree as a directory hierarchy under this path.
        #[arg(long)]
        nested: Option<PathBuf>,
        /// Labels containing embedded JSON: 'clear' them or keep them as 'title'.
        #[arg(long, default_value = "clear")]
        embedded_labels: String,
    },
    /// Generate page metadata for a topic.
    Metadata {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Generate an automation timeline for a topic.
    Timeline {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Generate automation challenges for a topic.
    Challenges {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Run the full page pipeline into a flow directory.
    Flow {
        input: PathBuf,
        /// Free-text trail recorded alongside the flow outputs.
        breadcrumbs: Option<String>,
    },
    /// Check a tree document against the schema and invariants.
    Validate { tree: PathBuf },
    /// Export a tree document as a directory hierarchy.
    ExportDir { tree: PathBuf, dir: PathBuf },
    /// Rebuild a tree document from a directory hierarchy.
    ImportDir { dir: PathBuf, output: PathBuf },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;
    match cli.command {
        Command::Expand { input, output } => cmd_expand(&cfg, &input, output),
        Command::Hallucinate {
            input,
            output,
            nested,
            embedded_labels,
        } => cmd_hallucinate(&cfg, &input, output, nested, &embedded_labels),
        Command::Metadata { input, output } => cmd_page(&cfg, PageKind::Metadata, &input, output),
        Command::Timeline { input, output } => cmd_page(&cfg, PageKind::Timeline, &input, output),
        Command::Challenges { input, output } => {
            cmd_page(&cfg, PageKind::Challenges, &input, output)
        }
        Command::Flow { input, breadcrumbs } => cmd_flow(&cfg, &input, breadcrumbs),
        Command::Validate { tree } => cmd_validate(&tree),
        Command::ExportDir { tree, dir } => cmd_export_dir(&tree, &dir),
        Command::ImportDir { dir, output } => cmd_import_dir(&dir, &output),
    }
}

fn generator_for(cfg: &WikiflowConfig) -> OllamaGenerator {
    OllamaGenerator::new(
        cfg.ollama_url.clone(),
        Duration::from_secs(cfg.request_timeout_secs),
    )
}

fn model_params(
    model: Option<String>,
    parameters: Map<String, Value>,
    cfg: &WikiflowConfig,
) -> ModelParams {
    ModelParams::new(
        model.unwrap_or_else(|| cfg.default_model.clone()),
        parameters,
    )
}

fn cmd_expand(cfg: &WikiflowConfig, input: &Path, output: Option<PathBuf>) -> Result<()> {
    println!("Working...");
    let started = Utc::now();
    let request: ExpandRequest = load_json(input)?;
    let target = NodeTarget::from_request(&request.node_path, request.node_step.as_deref());
    let count = request.num_substeps.unwrap_or_default();

    let engine = PromptEngine::new();
    let generator = generator_for(cfg);
    let params = model_params(request.model.clone(), request.parameters.clone(), cfg);

    let outcome = expand_in_tree(
        &generator,
        &engine,
        &request.tree,
        &target,
        &count,
        request.replace_existing,
        &params,
    )
    .ok_or_else(|| anyhow!("could not find the requested node in the tree"))?;

    let (path, output_uuid) = output_filepath(&cfg.output_dir, "expand-node", output)?;
    let report = run_report("Node Expansion", started, output_uuid);
    let document = report_document(
        &report,
        [
            ("tree", serde_json::to_value(&outcome.tree)?),
            ("expanded_node_path", json!(outcome.node_path)),
            ("expanded_node_step", json!(outcome.node_step)),
        ],
    )?;
    save_output(&path, &document)?;
    println!("Node expanded, updated tree saved to {}", path.display());
    Ok(())
}

fn cmd_hallucinate(
    cfg: &WikiflowConfig,
    input: &Path,
    output: Option<PathBuf>,
    nested: Option<PathBuf>,
    embedded_labels: &str,
) -> Result<()> {
    println!("Working...");
    let started = Utc::now();
    let request: HallucinateRequest = load_json(input)?;
    let mode: EmbeddedLabelMode = embedded_labels.parse()?;

    let engine = PromptEngine::new();
    let generator = generator_for(cfg);
    let params = model_params(request.model.clone(), request.parameters.clone(), cfg);

    let tree = hallucinate_tree(
        &generator,
        &engine,
        &request.task,
        request.depth,
        &params,
        mode,
    );

    if let Some(dir) = &nested {
        export_tree_dirs(dir, &tree)?;
        println!("Nested tree exported to {}", dir.display());
    }

    let (path, output_uuid) = output_filepath(&cfg.output_dir, "hallucinate-tree", output)?;
    let report = run_report("Hallucinate Tree", started, output_uuid);
    let document = report_document(&report, [("tree", serde_json::to_value(&tree)?)])?;
    save_output(&path, &document)?;
    println!("Generated initial tree, output saved to {}", path.display());
    Ok(())
}

fn cmd_page(
    cfg: &WikiflowConfig,
    kind: PageKind,
    input: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    println!("Working...");
    let started = Utc::now();
    let request: TopicRequest = load_json(input)?;
    let precomputed = match kind {
        PageKind::Metadata => request.metadata.clone(),
        PageKind::Timeline => request.timeline.clone(),
        PageKind::Challenges => request.challenges.clone(),
    };

    let engine = PromptEngine::new();
    let generator = generator_for(cfg);
    let params = model_params(request.model.clone(), request.parameters.clone(), cfg);

    let section = generate_section(
        &generator,
        &engine,
        kind,
        &request.topic,
        precomputed,
        &params,
    )?;

    let (path, output_uuid) = output_filepath(&cfg.output_dir, kind.category(), output)?;
    let report = run_report(kind.task_name(), started, output_uuid);
    let document = report_document(&report, [(kind.section_key(), section)])?;
    save_output(&path, &document)?;
    println!(
        "Generated {}, output saved to {}",
        kind.section_key(),
        path.display()
    );
    Ok(())
}

fn cmd_flow(cfg: &WikiflowConfig, input: &Path, breadcrumbs: Option<String>) -> Result<()> {
    println!("Starting flow process...");
    let raw_document: Value = load_json(input)?;
    let request: FlowRequest = serde_json::from_value(raw_document.clone())
        .with_context(|| format!("parse input {}", input.display()))?;

    let ctx = FlowContext::create(&cfg.flow_dir)?;
    println!("Flow UUID: {}", ctx.id);

    let engine = PromptEngine::new();
    let generator = generator_for(cfg);
    let params = model_params(request.model.clone(), request.parameters.clone(), cfg);
    let inputs = FlowInputs {
        request: &request,
        raw_document: &raw_document,
        input_label: input.display().to_string(),
        breadcrumbs,
    };

    let summary = run_flow(&generator, &engine, &ctx, &inputs, &params)?;
    if summary.stages_failed.is_empty() {
        println!(
            "Flow process completed, output files saved to {}",
            ctx.dir.display()
        );
    } else {
        println!(
            "Flow completed with failed stages ({}), partial output saved to {}",
            summary.stages_failed.join(", "),
            ctx.dir.display()
        );
    }
    Ok(())
}

fn cmd_validate(tree_path: &Path) -> Result<()> {
    let tree = load_tree(tree_path)?;
    println!("tree OK: {} nodes", tree.node_count());
    Ok(())
}

fn cmd_export_dir(tree_path: &Path, dir: &Path) -> Result<()> {
    let tree = load_tree(tree_path)?;
    export_tree_dirs(dir, &tree)?;
    println!("Tree exported to {}", dir.display());
    Ok(())
}

fn cmd_import_dir(dir: &Path, output: &Path) -> Result<()> {
    let tree = import_tree_dirs(dir)?;
    write_tree(output, &tree)?;
    println!("Tree rebuilt at {}", output.display());
    Ok(())
}
