//! Terminal front end for multimodal chat sessions.
//!
//! ## Provider bootstrap
//!
//! The provider is selected with `MULTIMODAL_CHAT_PROVIDER` (or `--provider`):
//!
//! - `openai` (default) talks to the hosted Responses and transcription
//!   endpoints and requires `OPENAI_API_KEY`. A missing key stops the binary
//!   before the first prompt.
//! - `mock` answers deterministically without network access.
//!
//! A `.env` file in the working directory is loaded first.
//!
//! ## Commands
//!
//! - `/image <path> [text]`, `/pdf <path> [text]` attach a local file.
//! - `/audio <path> [text]` transcribes a local recording and sends the
//!   transcript as text.
//! - `quit` / `exit` (any case) or end of input leave the loop.
//!
//! The whole conversation is resent on every turn.

pub mod app;
pub mod commands;
