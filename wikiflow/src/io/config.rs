//! Tool configuration loaded from `wikiflow.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Configuration for the generation backend and output locations (TOML).
///
/// Intended to be edited by humans; missing fields default to values that
/// work against a local Ollama install.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WikiflowConfig {
    /// Base URL of the Ollama server.
    pub ollama_url: String,

    /// Model used when a request document does not name one.
    pub default_model: String,

    /// Read timeout for one chat call, in seconds. Generation is slow;
    /// budget accordingly.
    pub request_timeout_secs: u64,

    /// Directory for per-command output documents (`<output_dir>/<category>/`).
    pub output_dir: String,

    /// Directory for flow runs (`<flow_dir>/<flow uuid>/`).
    pub flow_dir: String,
}

impl Default for WikiflowConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            default_model: "gemma3".to_string(),
            request_timeout_secs: 300,
            output_dir: "output".to_string(),
            flow_dir: "flow".to_string(),
        }
    }
}

impl WikiflowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ollama_url.trim().is_empty() {
            return Err(anyhow!("ollama_url must not be empty"));
        }
        if self.default_model.trim().is_empty() {
            return Err(anyhow!("default_model must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WikiflowConfig::default()`.
pub fn load_config(path: &Path) -> Result<WikiflowConfig> {
    if !path.exists() {
        let cfg = WikiflowConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WikiflowConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, WikiflowConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("wikiflow.toml");
        fs::write(&path, "default_model = \"llama3\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.default_model, "llama3");
        assert_eq!(cfg.ollama_url, WikiflowConfig::default().ollama_url);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("wikiflow.toml");
        fs::write(&path, "request_timeout_secs = 0\n").expect("write");
        assert!(load_config(&path).is_err());
    }
}
