//! Transport-only client primitives for the hosted model API.
//!
//! This crate owns request building, response parsing and error mapping for
//! two endpoints: the Responses endpoint (agent completion) and the audio
//! transcription endpoint. It contains no conversation state and no knowledge
//! of front ends; callers hand it ready-made JSON `input` items.
//!
//! The Responses call is issued non-streaming (`stream` is never set) and
//! resolved into a single [`ResponseReply`].

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod response;
pub mod url;

pub use client::OpenAiApiClient;
pub use config::OpenAiApiConfig;
pub use error::OpenAiApiError;
pub use payload::{ResponsesRequest, TranscriptionRequest};
pub use response::{ResponseReply, ResponseStatus};
pub use url::{normalize_base_url, responses_endpoint, transcription_endpoint};
