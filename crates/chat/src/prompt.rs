//! Prompt assembly.
//!
//! Renders, in order: the system instruction, the optional context block,
//! the conversation history, the new user message and the assistant cue.
//! Assembly is deterministic and never reorders, summarizes or truncates.

use parley_core::context::{ContextBlock, ContextKind};
use parley_core::message::{Role, Turn};

/// Instruction placed at the top of every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant with access to real-time web search results. \
Use the previous conversation and any search results or scraped content to provide \
accurate, up-to-date information. Be concise but clear, accurate, and helpful. \
If you don't know something, say so. When using search results, cite the sources.";

/// Build the prompt for one generation.
///
/// A context block with empty text is treated as absent.
pub fn assemble(history: &[Turn], context: Option<&ContextBlock>, user_message: &str) -> String {
    let mut prompt = String::with_capacity(
        SYSTEM_INSTRUCTION.len()
            + user_message.len()
            + context.map_or(0, |c| c.text.len())
            + history.iter().map(|t| t.content.len() + 12).sum::<usize>()
            + 512,
    );

    prompt.push_str(SYSTEM_INSTRUCTION);
    prompt.push('\n');

    if let Some(block) = context.filter(|c| !c.text.is_empty()) {
        push_context(&mut prompt, block);
    }

    if !history.is_empty() {
        prompt.push_str("\n--- Conversation History ---");
        for turn in history {
            prompt.push('\n');
            prompt.push_str(&speaker_label(&turn.role));
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
        }
        prompt.push_str("\n--- End of History ---\n");
    }

    prompt.push_str("\nUser: ");
    prompt.push_str(user_message);
    prompt.push_str("\n\nAssistant:");
    prompt
}

fn push_context(prompt: &mut String, block: &ContextBlock) {
    let (opening, closing) = match block.kind {
        ContextKind::ResultSet => (
            "\n--- REAL-TIME SEARCH RESULTS ---\
             \nThe following are CURRENT, UP-TO-DATE search results from the web.\
             \nUSE THIS INFORMATION to answer the user's question with the latest data:",
            "\n--- END OF SEARCH RESULTS ---\n",
        ),
        ContextKind::Generic => (
            "\n--- Web Page Content ---\
             \nHere is content scraped from a related web page. Use it if relevant, ignore if not:",
            "\n--- End of Web Page Content ---\n",
        ),
    };
    prompt.push_str(opening);
    prompt.push('\n');
    prompt.push_str(&block.text);
    prompt.push_str(closing);
}

/// `User`, `Assistant`, or the stored role name with its first letter
/// capitalized.
fn speaker_label(role: &Role) -> String {
    match role {
        Role::User => "User".into(),
        Role::Assistant => "Assistant".into(),
        Role::Other(name) => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => "Unknown".into(),
            }
        }
    }
}
