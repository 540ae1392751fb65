//! Blocking chat client for a local Ollama server.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{ModelParams, TextGenerator};

/// Generator backed by the Ollama `/api/chat` endpoint.
#[derive(Debug)]
pub struct OllamaGenerator {
    base_url: String,
    agent: ureq::Agent,
}

impl OllamaGenerator {
    /// `request_timeout` bounds one full chat call; generation takes seconds
    /// even on small models, so keep it generous.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(request_timeout)
            .timeout_write(Duration::from_secs(30))
            .build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct ChatReply {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

impl TextGenerator for OllamaGenerator {
    #[instrument(skip_all, fields(model = %params.model))]
    fn generate(&self, system: &str, user: &str, params: &ModelParams) -> Result<String> {
        let url = self.chat_url();
        let request = ChatRequest {
            model: &params.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
            options: &params.options,
        };

        debug!(url = %url, "sending chat request");
        let response = match self.agent.post(&url).send_json(&request) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(anyhow!(
                    "chat request failed: {url}: HTTP {code}: {}",
                    body.trim()
                ));
            }
            Err(err) => return Err(anyhow!("chat request failed: {url}: {err}")),
        };

        let reply: ChatReply = response.into_json().context("parse chat response")?;
        Ok(reply.message.content.trim().to_string())
    }
}
