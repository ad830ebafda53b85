//! Multimodal chat sessions over a hosted agent-completion service.
//!
//! A raw user turn flows through three steps before it reaches the remote
//! agent:
//!
//! 1. [`classify`] decides whether the turn is plain text or carries image,
//!    audio or PDF attachments (by `/image`, `/audio`, `/pdf` command token in
//!    the terminal, by declared media type for browser uploads).
//! 2. [`encode::TurnEncoder`] turns the classified input into
//!    [`TurnContent`]: attachments become base64 content blocks, audio is
//!    transcribed and folded into the text.
//! 3. [`conversation::Conversation`] accumulates turns; the full history is
//!    resent on every call.
//!
//! [`session::ChatSession`] ties the three together with a provider handle and
//! is the only object front ends talk to. One session owns exactly one
//! conversation.
//!
//! ## Environment
//!
//! See [`config`] for the variables read at startup. The `openai` provider
//! needs `OPENAI_API_KEY`; a missing key fails session construction before any
//! remote call is attempted.

pub mod classify;
pub mod config;
pub mod conversation;
pub mod encode;
pub mod providers;
pub mod session;

pub use chat_provider::{ContentBlock, Role, Turn, TurnContent};
pub use classify::{Attachment, ClassifiedInput, ClassifyError, MediaKind, Upload};
pub use config::{ChatConfig, ConfigError};
pub use conversation::Conversation;
pub use encode::{EncodeError, TurnEncoder, AUDIO_TRANSCRIPT_PREFIX};
pub use session::{ChatSession, FailedTurnPolicy, SessionError, SessionEvent};
