use std::path::{Path, PathBuf};

use base64::Engine;
use thiserror::Error;
use tokio::sync::mpsc;

/// Maximum number of attachments that may be pending on the composer.
pub const MAX_PENDING: usize = 3;

/// A user-supplied file encoded for inclusion in a request.
///
/// Immutable once created. `is_image` decides whether the file is sent as
/// inline binary data or only referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64-encoded file contents.
    pub data: String,
    pub is_image: bool,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("at most 3 attachments may be pending at once")]
    LimitExceeded,
    #[error("could not read {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one asynchronous file read. Completions for a batch arrive in
/// whatever order the reads finish.
#[derive(Debug)]
pub enum AttachmentEvent {
    Loaded(Attachment),
    Failed { name: String, error: String },
}

/// Gate applied before any file of a batch is read: either the whole batch
/// fits under [`MAX_PENDING`] or none of it is accepted.
pub fn check_batch(pending: usize, batch: usize) -> Result<(), AttachmentError> {
    if pending + batch > MAX_PENDING {
        Err(AttachmentError::LimitExceeded)
    } else {
        Ok(())
    }
}

/// Spawn one read task per path. Each task reports independently on `tx`.
pub fn spawn_batch(paths: Vec<PathBuf>, tx: mpsc::Sender<AttachmentEvent>) {
    for path in paths {
        let tx = tx.clone();
        tokio::spawn(async move {
            let event = match encode_file(&path).await {
                Ok(attachment) => AttachmentEvent::Loaded(attachment),
                Err(e) => {
                    tracing::warn!("failed to encode attachment {}: {}", path.display(), e);
                    AttachmentEvent::Failed {
                        name: display_name(&path),
                        error: e.to_string(),
                    }
                }
            };
            let _ = tx.send(event).await;
        });
    }
}

pub async fn encode_file(path: &Path) -> Result<Attachment, AttachmentError> {
    let name = display_name(path);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AttachmentError::Unreadable {
            name: name.clone(),
            source,
        })?;
    let mime_type = guess_mime(&name);
    let is_image = mime_type.starts_with("image/");
    tracing::debug!("encoded {} ({}, {} bytes)", name, mime_type, bytes.len());
    Ok(Attachment {
        name,
        mime_type,
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        is_image,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extension-based MIME guess. Unknown extensions fall back to a generic
/// binary type, which keeps them on the filename-note path.
pub fn guess_mime(name: &str) -> String {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" | "md" | "log" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
    .to_string()
}
