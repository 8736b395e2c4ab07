//! Chat orchestration for Parley.
//!
//! [`prompt::assemble`] renders history and context into a single prompt;
//! [`ChatOrchestrator`] drives one request through store, context,
//! inference and persistence.

pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use orchestrator::{
    ChatOrchestrator, ChatOutcome, ChatRequest, ContextRequest, EMPTY_REPLY_FALLBACK,
};
pub use prompt::assemble;
