use std::path::PathBuf;

use ratatui::widgets::{Block, Borders};
use tokio::sync::mpsc;
use tui_textarea::TextArea;

use crate::attachments::{self, Attachment, AttachmentEvent};
use crate::chat::{ChatMessage, Conversation};
use crate::credentials::CredentialStore;
use crate::gemini::{build_contents, stream_generate, CancelToken, StreamEvent};
use crate::settings::SettingsPanel;

/// Composer command that attaches local files to the next message.
const ATTACH_COMMAND: &str = "/attach";

pub struct App {
    pub conversation: Conversation,
    pub pending: Vec<Attachment>,
    /// Reads spawned but not yet reported; counted against the limit so two
    /// quick batches cannot overshoot it.
    pub loading: usize,
    pub composer: TextArea<'static>,
    pub busy: bool,
    pub cancel: Option<CancelToken>,
    pub settings: SettingsPanel,
    pub status: Option<String>,
    pub scroll_offset: u16,
    pub model: String,
    base_url: String,
    store: Box<dyn CredentialStore>,
    stream_tx: mpsc::Sender<StreamEvent>,
    stream_rx: mpsc::Receiver<StreamEvent>,
    attach_tx: mpsc::Sender<AttachmentEvent>,
    attach_rx: mpsc::Receiver<AttachmentEvent>,
}

impl App {
    pub fn new(store: Box<dyn CredentialStore>, model: String, base_url: String) -> Self {
        let (stream_tx, stream_rx) = mpsc::channel(100);
        let (attach_tx, attach_rx) = mpsc::channel(100);
        let mut app = Self {
            conversation: Conversation::default(),
            pending: Vec::new(),
            loading: 0,
            composer: TextArea::default(),
            busy: false,
            cancel: None,
            settings: SettingsPanel::default(),
            status: None,
            scroll_offset: 0,
            model,
            base_url,
            store,
            stream_tx,
            stream_rx,
            attach_tx,
            attach_rx,
        };
        app.reset_composer();
        app
    }

    fn reset_composer(&mut self) {
        self.composer = TextArea::default();
        self.composer.set_block(Block::default().borders(Borders::ALL).title("Input"));
        self.composer
            .set_placeholder_text("Message Gemini, or /attach <path> to add a file");
    }

    pub fn composer_text(&self) -> String {
        self.composer.lines().join("\n")
    }

    pub fn key_configured(&self) -> bool {
        self.store.get().is_some()
    }

    /// Enter on the composer: either an /attach command or a send.
    pub fn submit(&mut self) {
        let text = self.composer_text();
        let trimmed = text.trim();
        if let Some(rest) = trimmed.strip_prefix(ATTACH_COMMAND) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                if paths.is_empty() {
                    self.status = Some(format!("Usage: {ATTACH_COMMAND} <path> [<path>...]"));
                } else {
                    self.queue_attachments(paths);
                }
                self.reset_composer();
                return;
            }
        }
        self.send_message();
    }

    /// Start one generation: push the user message and the model placeholder,
    /// then hand the request to a background task. No-op while one is already
    /// running or when nothing is ready to send.
    pub fn send_message(&mut self) {
        if self.busy {
            return;
        }
        let text = self.composer_text().trim().to_string();
        if text.is_empty() && self.pending.is_empty() {
            return;
        }
        let Some(api_key) = self.store.get() else {
            self.status =
                Some("No API key configured. Open settings (Ctrl+S) and add one.".to_string());
            return;
        };

        let files = std::mem::take(&mut self.pending);
        tracing::info!("sending message ({} chars, {} attachments)", text.len(), files.len());
        self.conversation.push(ChatMessage::user(text, files));
        self.reset_composer();
        self.conversation.push(ChatMessage::model_placeholder());
        self.busy = true;
        self.status = None;

        let cancel = CancelToken::new();
        self.cancel = Some(cancel.clone());
        let contents = build_contents(&self.conversation.messages);
        let tx = self.stream_tx.clone();
        let base_url = self.base_url.clone();
        let model = self.model.clone();
        tokio::spawn(async move {
            if let Err(e) = stream_generate(&base_url, &api_key, &model, contents, tx, cancel).await
            {
                tracing::error!("generation failed: {e:#}");
            }
        });
    }

    /// Drain stream events. Fragments append to the placeholder; errors
    /// replace it only while it is still empty.
    pub fn process_stream_events(&mut self) {
        while let Ok(event) = self.stream_rx.try_recv() {
            match event {
                StreamEvent::Start => {
                    tracing::debug!("stream started");
                }
                StreamEvent::Text { text } => {
                    self.conversation.append_to_last(&text);
                }
                StreamEvent::End => {
                    self.busy = false;
                    self.cancel = None;
                }
                StreamEvent::Error {
                    message,
                    invalid_key,
                } => {
                    let display = if invalid_key {
                        format!(
                            "The API key was rejected. Open settings (Ctrl+S) and save a valid key. ({message})"
                        )
                    } else {
                        format!("The request failed: {message}")
                    };
                    if self.conversation.last_is_empty_model() {
                        self.conversation.append_to_last(&display);
                    } else {
                        self.conversation.push(ChatMessage::model(display));
                    }
                    self.busy = false;
                    self.cancel = None;
                }
            }
        }
    }

    pub fn process_attachment_events(&mut self) {
        while let Ok(event) = self.attach_rx.try_recv() {
            self.loading = self.loading.saturating_sub(1);
            match event {
                AttachmentEvent::Loaded(attachment) => {
                    tracing::info!("attached {}", attachment.name);
                    self.pending.push(attachment);
                }
                AttachmentEvent::Failed { name, error } => {
                    self.status = Some(format!("Could not attach {name}: {error}"));
                }
            }
        }
    }

    /// Accept or reject a whole batch of attachment paths.
    pub fn queue_attachments(&mut self, paths: Vec<PathBuf>) {
        if let Err(e) = attachments::check_batch(self.pending.len() + self.loading, paths.len()) {
            self.status = Some(e.to_string());
            return;
        }
        self.loading += paths.len();
        attachments::spawn_batch(paths, self.attach_tx.clone());
    }

    pub fn remove_last_attachment(&mut self) {
        if self.pending.pop().is_some() {
            self.status = None;
        }
    }

    /// Flip the advisory cancel flag; fragments already shown stay.
    pub fn stop_generation(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
            self.status = Some("Stopping generation".to_string());
        }
    }

    pub fn new_chat(&mut self) {
        if self.busy {
            self.status = Some("Stop the running generation first (Esc)".to_string());
            return;
        }
        self.conversation.clear();
        self.pending.clear();
        self.scroll_offset = 0;
        self.status = None;
        self.reset_composer();
    }

    pub fn save_settings(&mut self) {
        self.settings.save(self.store.as_mut());
    }

    pub fn remove_saved_key(&mut self) {
        self.settings.remove(self.store.as_mut());
    }

    pub fn saved_key(&self) -> Option<String> {
        self.store.get()
    }
}
