//! Completion providers selectable from the command line.

use anyhow::{Context, Result};
use loopwise_agent::{prompt::render_prompt, CannedCompletion};
use loopwise_core::{Completion, CompletionError, CompletionRequest, CompletionResponse};
use serde_json::{json, Value};
use std::env;
use std::thread;
use std::time::Duration;

const DEFAULT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
const DEFAULT_MODEL: &str = "gemini-pro";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
/// Content used when the provider answers without any candidate text
const NO_RESPONSE: &str = "No response generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    /// Hosted model over HTTP (needs LOOPWISE_LLM_API_KEY)
    Http,
    /// Deterministic canned answers, no network
    Offline,
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl HttpSettings {
    pub fn from_env() -> Result<Self> {
        let api_key =
            env::var("LOOPWISE_LLM_API_KEY").context("LOOPWISE_LLM_API_KEY env var is required")?;
        if api_key.trim().is_empty() {
            anyhow::bail!("LOOPWISE_LLM_API_KEY must not be empty");
        }

        Ok(Self {
            url: env::var("LOOPWISE_LLM_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            api_key,
            model: env::var("LOOPWISE_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(env_or("LOOPWISE_LLM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            retries: env_or("LOOPWISE_LLM_RETRIES", DEFAULT_RETRIES)?.max(1),
            retry_delay: Duration::from_millis(env_or(
                "LOOPWISE_LLM_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )?),
        })
    }
}

/// Blocking client for a `generateContent`-style endpoint.
pub struct HttpCompletion {
    client: reqwest::blocking::Client,
    settings: HttpSettings,
}

impl HttpCompletion {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, settings })
    }

    fn send_once(&self, prompt: &str) -> Result<CompletionResponse, CompletionError> {
        let resp = self
            .client
            .post(&self.settings.url)
            .bearer_auth(&self.settings.api_key)
            .json(&json!({"contents": [{"parts": [{"text": prompt}]}]}))
            .send()
            .map_err(|e| self.transport_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp
            .json()
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
        Ok(parse_generate_content(&body, &self.settings.model))
    }

    fn transport_error(&self, e: &reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.settings.timeout)
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

impl Completion for HttpCompletion {
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        if request.decision_type.trim().is_empty() {
            return Err(CompletionError::EmptyPrompt);
        }
        let prompt = render_prompt(request);

        let mut attempt = 1;
        loop {
            match self.send_once(&prompt) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.settings.retries => {
                    tracing::warn!(
                        attempt,
                        retries = self.settings.retries,
                        error = %err,
                        "completion failed, retrying"
                    );
                    thread::sleep(self.settings.retry_delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Read `candidates[0].content.parts[0].text` and the token count.
fn parse_generate_content(body: &Value, model: &str) -> CompletionResponse {
    let content = body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .unwrap_or(NO_RESPONSE)
        .to_string();
    let tokens_used = body
        .pointer("/usageMetadata/totalTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    CompletionResponse {
        content,
        confidence: None,
        model: model.to_string(),
        tokens_used,
    }
}

pub enum Provider {
    Http(HttpCompletion),
    Offline(CannedCompletion),
}

impl Provider {
    pub fn from_kind(kind: ProviderKind) -> Result<Self> {
        match kind {
            ProviderKind::Http => Ok(Provider::Http(HttpCompletion::new(
                HttpSettings::from_env()?,
            )?)),
            ProviderKind::Offline => Ok(Provider::Offline(CannedCompletion::new())),
        }
    }
}

impl Completion for Provider {
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        match self {
            Provider::Http(http) => http.complete(request),
            Provider::Offline(canned) => canned.complete(request),
        }
    }
}
