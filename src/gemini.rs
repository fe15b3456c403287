//! Request construction and streaming for the Gemini generateContent API.
//!
//! [`build_contents`] is a pure mapping from the conversation to the wire
//! shape; [`stream_generate`] drives one SSE request and reports progress as
//! [`StreamEvent`]s over a channel, the way the UI loop consumes them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::chat::ChatMessage;

/// Instruction substituted for a message that carries images but no text.
pub const IMAGE_ONLY_PROMPT: &str = "Describe the attached images.";

/// Inline binary payload of an image part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// One content part. The API accepts either plain text or inline binary
/// data; nothing else is ever emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

// Structures matching the streamed response chunks. Everything defaults so
// metadata-only chunks deserialize to an empty fragment.
#[derive(Debug, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ChunkContent>,
}

#[derive(Debug, Deserialize, Default)]
struct ChunkContent {
    #[serde(default)]
    parts: Vec<ChunkPart>,
}

#[derive(Debug, Deserialize, Default)]
struct ChunkPart {
    #[serde(default)]
    text: String,
}

impl GenerateChunk {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Map the conversation into the API's content list.
///
/// Per message: one inline-data part per image attachment; one text part
/// carrying the message text, with a filename note appended when non-image
/// attachments exist (their contents are never transmitted) or the default
/// instruction substituted when only images were attached. Messages that end
/// up with no parts are dropped.
pub fn build_contents(messages: &[ChatMessage]) -> Vec<Content> {
    messages.iter().filter_map(message_to_content).collect()
}

fn message_to_content(message: &ChatMessage) -> Option<Content> {
    let mut parts: Vec<Part> = message
        .files
        .iter()
        .filter(|f| f.is_image)
        .map(|f| Part::InlineData {
            inline_data: Blob {
                mime_type: f.mime_type.clone(),
                data: f.data.clone(),
            },
        })
        .collect();

    let document_names: Vec<&str> = message
        .files
        .iter()
        .filter(|f| !f.is_image)
        .map(|f| f.name.as_str())
        .collect();

    let mut text = message.content.trim().to_string();
    if !document_names.is_empty() {
        let note = format!("[Attached files: {}]", document_names.join(", "));
        if text.is_empty() {
            text = note;
        } else {
            text.push('\n');
            text.push_str(&note);
        }
    } else if text.is_empty() && !parts.is_empty() {
        text = IMAGE_ONLY_PROMPT.to_string();
    }

    if !text.is_empty() {
        parts.push(Part::Text { text });
    }

    if parts.is_empty() {
        None
    } else {
        Some(Content {
            role: message.role.as_wire().to_string(),
            parts,
        })
    }
}

/// Advisory cancellation flag shared between the UI and the stream task.
/// Flipped by the stop action and polled before each fragment is forwarded;
/// it does not interrupt an in-progress network read.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Start,
    Text { text: String },
    End,
    Error { message: String, invalid_key: bool },
}

/// Whether a failed response means the credential itself was rejected.
fn is_invalid_key(status: StatusCode, body: &str) -> bool {
    status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API key not valid")
        || body.contains("API_KEY_INVALID")
}

/// Pull the human-readable message out of an error body, falling back to the
/// raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Drive one streaming generation request.
///
/// Events are reported on `tx`: `Start` once the response headers arrive,
/// one `Text` per fragment, then `End`. Failures produce a single `Error`
/// event. Cancellation stops fragment delivery but keeps whatever was
/// already sent.
pub async fn stream_generate(
    base_url: &str,
    api_key: &str,
    model: &str,
    contents: Vec<Content>,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancelToken,
) -> Result<()> {
    let url = format!("{base_url}/v1beta/models/{model}:streamGenerateContent");
    tracing::info!("starting generation against {model} ({} contents)", contents.len());

    let client = reqwest::Client::new();
    let response = match client
        .post(&url)
        .query(&[("alt", "sse"), ("key", api_key)])
        .json(&GenerateRequest { contents })
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let _ = tx
                .send(StreamEvent::Error {
                    message: format!("request failed: {e}"),
                    invalid_key: false,
                })
                .await;
            return Err(e.into());
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let invalid_key = is_invalid_key(status, &body);
        let message = extract_error_message(&body);
        tracing::error!(%status, invalid_key, "Gemini API error: {message}");
        let _ = tx
            .send(StreamEvent::Error {
                message: message.clone(),
                invalid_key,
            })
            .await;
        anyhow::bail!("Gemini API request failed with status {status}: {message}");
    }

    let _ = tx.send(StreamEvent::Start).await;

    let mut stream = response.bytes_stream();
    // Carries any partial SSE line across chunk boundaries.
    let mut pending_line = String::new();

    'outer: while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("stream error: {e}");
                let _ = tx
                    .send(StreamEvent::Error {
                        message: format!("stream error: {e}"),
                        invalid_key: false,
                    })
                    .await;
                anyhow::bail!("stream error: {e}");
            }
        };
        pending_line.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(pos) = pending_line.find('\n') {
            let line: String = pending_line.drain(..=pos).collect();
            let line = line.trim_end();
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if cancel.is_cancelled() {
                tracing::info!("generation cancelled, dropping remaining fragments");
                break 'outer;
            }
            match serde_json::from_str::<GenerateChunk>(data) {
                Ok(chunk) => {
                    let text = chunk.text();
                    if !text.is_empty() {
                        let _ = tx.send(StreamEvent::Text { text }).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("unparseable stream chunk: {e}");
                }
            }
        }
    }

    let _ = tx.send(StreamEvent::End).await;
    Ok(())
}
