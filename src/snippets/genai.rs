//! Gemini text generation on Vertex AI
//!
//! Requests go to
//! `{location}-aiplatform.googleapis.com/v1/projects/{p}/locations/{location}/publishers/google/models/{model}`.

use crate::gcp::client::{with_query, GcpClient};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Write;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Location override read by [`default_location`]
pub const LOCATION_ENV: &str = "GOOGLE_CLOUD_LOCATION";

/// `GOOGLE_CLOUD_LOCATION`, else `us-central1`
pub fn default_location() -> String {
    std::env::var(LOCATION_ENV)
        .ok()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "us-central1".to_string())
}

/// Which model to call and where
#[derive(Debug, Clone)]
pub struct ModelRef {
    pub project_id: String,
    pub location: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(project_id: &str, location: &str, model: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: location.to_string(),
            model: model.to_string(),
        }
    }

    fn url(&self, client: &GcpClient, method: &str) -> String {
        client.aiplatform_url(
            &self.location,
            &format!(
                "projects/{}/locations/{}/publishers/google/models/{}:{}",
                self.project_id, self.location, self.model, method
            ),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: i32,
    #[serde(default)]
    pub candidates_token_count: i32,
    #[serde(default)]
    pub total_token_count: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    #[serde(default)]
    pub total_tokens: i32,
    #[serde(default)]
    pub total_billable_characters: Option<i32>,
}

async fn generate(
    client: &GcpClient,
    model: &ModelRef,
    body: &Value,
) -> Result<GenerateContentResponse> {
    client
        .post_as(&model.url(client, "generateContent"), Some(body))
        .await
        .context("failed to generate content")
}

/// Single-turn text prompt
pub async fn generate_with_text(
    w: &mut dyn Write,
    client: &GcpClient,
    model: &ModelRef,
    prompt: &str,
) -> Result<String> {
    let body = json!({ "contents": [Content::user(prompt)] });
    let text = generate(client, model, &body).await?.text();

    writeln!(w, "{}", text)?;
    Ok(text)
}

/// Prompt with sampling and response format settings
pub async fn generate_with_config(
    w: &mut dyn Write,
    client: &GcpClient,
    model: &ModelRef,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<String> {
    let body = json!({
        "contents": [Content::user(prompt)],
        "generationConfig": config,
    });
    let text = generate(client, model, &body).await?.text();

    writeln!(w, "{}", text)?;
    Ok(text)
}

/// Prompt steered by a system instruction
pub async fn generate_with_system(
    w: &mut dyn Write,
    client: &GcpClient,
    model: &ModelRef,
    system_instruction: &str,
    prompt: &str,
) -> Result<String> {
    let body = json!({
        "systemInstruction": { "parts": [{ "text": system_instruction }] },
        "contents": [Content::user(prompt)],
    });
    let text = generate(client, model, &body).await?.text();

    writeln!(w, "{}", text)?;
    Ok(text)
}

/// Streamed generation over server-sent events (`alt=sse`). Each event's
/// text is written and flushed as soon as it arrives.
pub async fn generate_with_text_stream(
    w: &mut dyn Write,
    client: &GcpClient,
    model: &ModelRef,
    prompt: &str,
) -> Result<String> {
    let body = json!({ "contents": [Content::user(prompt)] });
    let url = with_query(&model.url(client, "streamGenerateContent"), &[("alt", "sse")])?;
    let response = client
        .post_stream(&url, &body)
        .await
        .context("failed to stream content")?;

    let mut stream = response.bytes_stream();
    let mut events = SseDecoder::default();
    let mut full = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("failed to read content stream")?;
        for data in events.push(&chunk) {
            write_stream_chunk(w, &data, &mut full)?;
        }
    }
    if let Some(data) = events.finish() {
        write_stream_chunk(w, &data, &mut full)?;
    }

    writeln!(w)?;
    Ok(full)
}

fn write_stream_chunk(w: &mut dyn Write, data: &str, full: &mut String) -> Result<()> {
    let chunk: GenerateContentResponse =
        serde_json::from_str(data).context("Unexpected stream chunk shape")?;
    let text = chunk.text();
    write!(w, "{}", text)?;
    w.flush()?;
    full.push_str(&text);
    Ok(())
}

/// Collects `data:` payloads from an event stream that arrives in arbitrary
/// byte chunks. Each `data:` line is one event.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed bytes, returning the payloads of every line completed by them
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(data) = data_payload(&line) {
                events.push(data);
            }
        }
        events
    }

    /// Payload of a trailing line the server did not terminate
    fn finish(self) -> Option<String> {
        data_payload(&self.buffer)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    line.trim_end_matches(['\r', '\n'])
        .strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
        .filter(|data| !data.is_empty())
}

/// Count the tokens a prompt would consume
pub async fn count_tokens(
    w: &mut dyn Write,
    client: &GcpClient,
    model: &ModelRef,
    prompt: &str,
) -> Result<CountTokensResponse> {
    let body = json!({ "contents": [Content::user(prompt)] });
    let response: CountTokensResponse = client
        .post_as(&model.url(client, "countTokens"), Some(&body))
        .await
        .context("failed to count tokens")?;

    writeln!(w, "Total: {}", response.total_tokens)?;
    if let Some(chars) = response.total_billable_characters {
        writeln!(w, "Billable characters: {}", chars)?;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "The sky " }, { "text": "is blue." }]
                    }
                },
                { "content": { "parts": [{ "text": "ignored" }] } },
            ]
        }))
        .unwrap();
        assert_eq!(response.text(), "The sky is blue.");
    }

    #[test]
    fn test_empty_response_has_no_text() {
        assert_eq!(GenerateContentResponse::default().text(), "");
    }

    #[test]
    fn test_generation_config_skips_unset_fields() {
        let config = GenerationConfig {
            temperature: Some(0.0),
            response_mime_type: Some("application/json".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({ "temperature": 0.0, "responseMimeType": "application/json" })
        );
    }

    #[test]
    fn test_sse_decoder_joins_split_chunks() {
        let mut events = SseDecoder::default();
        assert!(events.push(b"data: {\"a\":").is_empty());
        assert_eq!(events.push(b"1}\r\n\r\ndata: {\"b\":2}\n"), ["{\"a\":1}", "{\"b\":2}"]);
        assert!(events.finish().is_none());
    }

    #[test]
    fn test_sse_decoder_keeps_multibyte_text_across_chunks() {
        let event = "data: {\"text\":\"caf\u{e9}\"}\n".as_bytes();
        let split = event.len() - 4;

        let mut events = SseDecoder::default();
        assert!(events.push(&event[..split]).is_empty());
        assert_eq!(events.push(&event[split..]), ["{\"text\":\"caf\u{e9}\"}"]);
    }

    #[test]
    fn test_sse_decoder_skips_other_fields() {
        let mut events = SseDecoder::default();
        let found = events.push(b": keep-alive\nevent: message\ndata:{\"x\":1}\n\n");
        assert_eq!(found, ["{\"x\":1}"]);
    }

    #[test]
    fn test_sse_decoder_flushes_unterminated_event() {
        let mut events = SseDecoder::default();
        assert!(events.push(b"data: {\"last\":true}").is_empty());
        assert_eq!(events.finish().as_deref(), Some("{\"last\":true}"));
    }
}
