//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley chat gateway.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates:
//! - [`SessionStore`] — `parley-memory` (Redis, in-memory)
//! - [`Provider`] — `parley-providers` (Ollama, OpenAI-compatible)
//! - [`ContextProvider`] — `parley-context` (page scraper, web search)
//!
//! The orchestrator in `parley-chat` only ever sees the traits, which keeps
//! it testable with scripted stand-ins.

pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use context::{ContextBlock, ContextKind, ContextProvider, ContextSource};
pub use error::{ChatError, ContextError, Error, ProviderError, Result, StoreError};
pub use message::{Role, Turn};
pub use provider::{GenerateRequest, GenerateResponse, Provider, SamplingOptions};
pub use session::{SessionPolicy, SessionStore, StoredHistory, session_key};
