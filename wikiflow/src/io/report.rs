//! Output envelopes shared by every generation command.
//!
//! Every output document leads with the same metadata block
//! `{uuid, date_created, task, time_taken}` followed by command-specific
//! fields.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Standard metadata block for output documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunReport {
    pub uuid: String,
    pub date_created: String,
    pub task: String,
    pub time_taken: String,
}

/// Build the metadata block for a command that started at `started`.
pub fn run_report(task: &str, started: DateTime<Utc>, output_uuid: String) -> RunReport {
    let finished = Utc::now();
    let elapsed = finished - started;
    RunReport {
        uuid: output_uuid,
        date_created: finished.to_rfc3339(),
        task: task.to_string(),
        time_taken: format!("{:.3}s", elapsed.num_milliseconds() as f64 / 1000.0),
    }
}

/// Assemble a full output document: the metadata block plus extra fields.
pub fn report_document<I>(report: &RunReport, fields: I) -> Result<Value>
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let mut doc = match serde_json::to_value(report).context("serialize report metadata")? {
        Value::Object(map) => map,
        _ => return Err(anyhow!("report metadata must serialize to an object")),
    };
    for (key, value) in fields {
        doc.insert(key.to_string(), value);
    }
    Ok(Value::Object(doc))
}

/// Decide where a command's output goes and under which id.
///
/// With no explicit path, outputs land at `<root>/<category>/<uuid>.json`
/// (directories created as needed). An output id is generated either way so
/// envelope metadata is never empty.
pub fn output_filepath(
    root: &str,
    category: &str,
    specified: Option<PathBuf>,
) -> Result<(PathBuf, String)> {
    let output_uuid = Uuid::new_v4().to_string();
    if let Some(path) = specified {
        return Ok((path, output_uuid));
    }
    let dir = Path::new(root).join(category);
    fs::create_dir_all(&dir).with_context(|| format!("create output dir {}", dir.display()))?;
    Ok((dir.join(format!("{output_uuid}.json")), output_uuid))
}

/// Write an output document with pretty formatting and a trailing newline.
pub fn save_output(path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir {}", parent.display()))?;
        }
    }
    let mut buf = serde_json::to_string_pretty(document).context("serialize output document")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write output {}", path.display()))
}
