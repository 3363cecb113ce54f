//! Client for a conversational site agent.
//!
//! A human begins a session about a site, then exchanges free-text turns and
//! multiple-choice picks with a remote agent. [`Conversation`] orchestrates
//! those exchanges over a [`Transport`], keeps at most one of them in flight,
//! classifies failures into [`ErrorKind`]s and mirrors the [`Session`] into a
//! [`SessionStore`].

// Public modules
pub mod chat;
pub mod classify;
pub mod client;
pub mod error;
pub mod exchange;
pub mod observability;
pub mod persist;
pub mod render;
pub mod session;
pub mod testing;
pub mod transport;
pub mod types;
pub mod validate;

// Re-exports
pub use classify::{
    AttachedError, Cause, ErrorKind, ErrorTarget, Exchange, FormField, TransportFailure, classify,
    classify_error,
};
pub use client::AgentClient;
pub use error::{Error, Result};
pub use exchange::{Conversation, Outcome};
pub use observability::register_biometrics;
pub use persist::{FileStore, KvStore, MemoryStore, SNAPSHOT_KEY, SessionStore};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{ExchangeState, Identity, Session, SessionState};
pub use transport::Transport;
pub use types::*;
pub use validate::{SiteUrl, validate_message, validate_passphrase, validate_url};
