use anyhow::{bail, Context, Result};
use i9chat_core::{CompletionRequest, Completer};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};

use crate::auth;
use crate::config::Config;
use crate::llm_stream::{self, StreamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" | "openai-compatible" => Ok(Provider::OpenAI),
            other => bail!("unknown llm.provider {other:?} (expected gemini or openai)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub stream: bool,
    pub api_key: String,
}

/// Build the runtime LLM config from config.toml + stored keys.
/// `Ok(None)` when the selected provider has no key.
pub fn resolve_config(cfg: &Config) -> Result<Option<LlmConfig>> {
    let provider = Provider::parse(&cfg.llm.provider)?;
    let a = auth::load_auth()?;
    let key = match provider {
        Provider::Gemini => a.gemini_api_key,
        Provider::OpenAI => a.openai_api_key,
    };
    Ok(key.map(|api_key| LlmConfig {
        provider,
        model: cfg.llm.model.clone(),
        base_url: cfg.llm.base_url.trim_end_matches('/').to_string(),
        temperature: cfg.llm.temperature,
        stream: cfg.chat.stream,
        api_key,
    }))
}

/// Completion backend for the router. Without a configured model every call
/// fails, which the router turns into the apology reply.
pub struct LlmCompleter {
    cfg: Option<LlmConfig>,
}

impl LlmCompleter {
    pub fn new(cfg: Option<LlmConfig>) -> Self {
        Self { cfg }
    }

    pub fn is_configured(&self) -> bool {
        self.cfg.is_some()
    }
}

impl Completer for LlmCompleter {
    fn complete(&self, request: &CompletionRequest) -> i9chat_core::Result<String> {
        let Some(cfg) = &self.cfg else {
            return Err(i9chat_core::Error::Completion(
                "no model configured; run: i9chat auth paste-gemini-key".to_string(),
            ));
        };
        chat_complete(cfg, request).map_err(|e| i9chat_core::Error::Completion(format!("{e:#}")))
    }
}

pub fn chat_complete(config: &LlmConfig, request: &CompletionRequest) -> Result<String> {
    // The CLI uses #[tokio::main], so we're often already inside a runtime.
    // Creating a nested runtime and calling block_on will panic.
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        tokio::task::block_in_place(|| handle.block_on(chat_complete_async(config, request)))
    } else {
        let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
        rt.block_on(chat_complete_async(config, request))
    }
}

async fn chat_complete_async(config: &LlmConfig, request: &CompletionRequest) -> Result<String> {
    if config.stream {
        let mut out = String::new();
        llm_stream::stream_chat(config, request, |ev| {
            if let StreamEvent::Delta(t) = ev {
                out.push_str(&t);
            }
        })
        .await?;
        return Ok(out);
    }

    match config.provider {
        Provider::Gemini => gemini_complete(config, request).await,
        Provider::OpenAI => openai_complete(config, request).await,
    }
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiReq {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

pub(crate) fn gemini_body(config: &LlmConfig, request: &CompletionRequest) -> GeminiReq {
    GeminiReq {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.system_instruction.clone(),
            }],
        },
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: request.user_text.clone(),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: config.temperature,
            response_mime_type: request
                .expects_json()
                .then(|| "application/json".to_string()),
            response_schema: request.response_schema.clone(),
        },
    }
}

pub(crate) fn gemini_url(config: &LlmConfig, method: &str) -> String {
    format!("{}/v1beta/models/{}:{}", config.base_url, config.model, method)
}

pub(crate) fn gemini_headers(config: &LlmConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert("x-goog-api-key", HeaderValue::from_str(&config.api_key)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// candidates[0].content.parts[*].text, concatenated.
pub(crate) fn gemini_text(v: &Value) -> String {
    let mut s = String::new();
    if let Some(parts) = v
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c0| c0.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        for p in parts {
            if let Some(t) = p.get("text").and_then(|t| t.as_str()) {
                s.push_str(t);
            }
        }
    }
    s
}

async fn gemini_complete(config: &LlmConfig, request: &CompletionRequest) -> Result<String> {
    let client = reqwest::Client::new();
    let resp = client
        .post(gemini_url(config, "generateContent"))
        .headers(gemini_headers(config)?)
        .json(&gemini_body(config, request))
        .send()
        .await
        .context("gemini request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("gemini error: {status} {txt}");
    }

    let out: Value = resp.json().await.context("parse gemini response")?;
    Ok(gemini_text(&out))
}

pub(crate) fn openai_body(config: &LlmConfig, request: &CompletionRequest, stream: bool) -> Value {
    let mut body = json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": request.system_instruction },
            { "role": "user", "content": request.user_text },
        ],
        "temperature": config.temperature,
        "stream": stream,
    });
    if request.expects_json() {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

pub(crate) fn openai_headers(config: &LlmConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", config.api_key))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

async fn openai_complete(config: &LlmConfig, request: &CompletionRequest) -> Result<String> {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/v1/chat/completions", config.base_url))
        .headers(openai_headers(config)?)
        .json(&openai_body(config, request, false))
        .send()
        .await
        .context("openai request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("openai error: {status} {txt}");
    }

    let out: Value = resp.json().await.context("parse openai response")?;
    let content = out
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c0| c0.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default();

    Ok(content.to_string())
}
