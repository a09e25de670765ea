use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use i9chat_core::CompletionRequest;
use serde_json::Value;

use crate::llm::{self, LlmConfig, Provider};

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Delta(String),
    Completed,
}

/// Stream one completion, calling `on_event` for every text chunk.
pub async fn stream_chat(
    cfg: &LlmConfig,
    request: &CompletionRequest,
    mut on_event: impl FnMut(StreamEvent) + Send,
) -> Result<()> {
    let resp = match cfg.provider {
        Provider::Gemini => reqwest::Client::new()
            .post(format!("{}?alt=sse", llm::gemini_url(cfg, "streamGenerateContent")))
            .headers(llm::gemini_headers(cfg)?)
            .json(&llm::gemini_body(cfg, request))
            .send()
            .await
            .context("gemini streaming request")?,
        Provider::OpenAI => reqwest::Client::new()
            .post(format!("{}/v1/chat/completions", cfg.base_url))
            .headers(llm::openai_headers(cfg)?)
            .json(&llm::openai_body(cfg, request, true))
            .send()
            .await
            .context("openai-compatible streaming request")?,
    };

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("streaming error: {status} {txt}");
    }

    let mut stream = resp.bytes_stream();
    let mut sse = SseBuffer::default();
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("stream chunk")?;
        for data in sse.push(chunk.as_ref()) {
            if data == "[DONE]" {
                tracing::debug!(chunks, "stream done");
                on_event(StreamEvent::Completed);
                return Ok(());
            }
            let v: Value = serde_json::from_str(&data).context("parse SSE json")?;
            let text = delta_text(cfg.provider, &v);
            if !text.is_empty() {
                chunks += 1;
                on_event(StreamEvent::Delta(text));
            }
        }
    }

    tracing::debug!(chunks, "stream closed");
    on_event(StreamEvent::Completed);
    Ok(())
}

fn delta_text(provider: Provider, v: &Value) -> String {
    match provider {
        Provider::Gemini => llm::gemini_text(v),
        // choices[0].delta.content
        Provider::OpenAI => v
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c0| c0.get("delta"))
            .and_then(|d| d.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

/// Splits a server-sent-event byte stream into `data:` payloads.
/// Chunks may cut lines, and multi-byte characters, anywhere; only complete
/// lines are decoded.
#[derive(Debug, Default)]
struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = match std::str::from_utf8(&raw) {
                Ok(l) => l.trim(),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping SSE line that is not UTF-8");
                    continue;
                }
            };
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    out.push(data.to_string());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sse_buffer_handles_split_lines() {
        let mut sse = SseBuffer::default();
        assert!(sse.push(b"data: {\"a\"").is_empty());
        assert_eq!(sse.push(b":1}\n\n: keep-alive\nda"), vec!["{\"a\":1}".to_string()]);
        assert_eq!(sse.push(b"ta: [DONE]\n"), vec!["[DONE]".to_string()]);
    }

    /// Regression test: a chunk boundary inside "ã" must not corrupt the text.
    #[test]
    fn test_sse_buffer_keeps_multibyte_chars_split_across_chunks() {
        let line = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"não\"}]}}]}\n".as_bytes();
        let cut = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut sse = SseBuffer::default();
        assert!(sse.push(&line[..cut]).is_empty());
        let data = sse.push(&line[cut..]);
        assert_eq!(data.len(), 1);

        let v: Value = serde_json::from_str(&data[0]).unwrap();
        assert_eq!(delta_text(Provider::Gemini, &v), "não");
    }

    #[test]
    fn test_delta_text_per_provider() {
        let g = json!({"candidates":[{"content":{"parts":[{"text":"Olá"}]}}]});
        assert_eq!(delta_text(Provider::Gemini, &g), "Olá");
        let o = json!({"choices":[{"delta":{"content":"Oi"}}]});
        assert_eq!(delta_text(Provider::OpenAI, &o), "Oi");
        let role_only = json!({"choices":[{"delta":{"role":"assistant"}}]});
        assert_eq!(delta_text(Provider::OpenAI, &role_only), "");
    }
}
