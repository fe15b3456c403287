//! Terminal chat client for the Gemini API.
//!
//! Messages (with up to three file attachments) are transformed into a
//! `streamGenerateContent` request and the response fragments stream into
//! the transcript. The binary in `main.rs` wires these modules to a ratatui
//! event loop.

pub mod app;
pub mod attachments;
pub mod chat;
pub mod constants;
pub mod credentials;
pub mod events;
pub mod gemini;
pub mod markdown;
pub mod settings;
pub mod ui;
