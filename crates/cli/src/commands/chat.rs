//! `parley chat` — Send a single message from the terminal.

use parley_chat::ChatRequest;
use parley_config::AppConfig;
use parley_core::context::ContextSource;

pub async fn run(
    config: AppConfig,
    session: Option<String>,
    context: Option<String>,
    source: Option<ContextSource>,
    message: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = parley_gateway::build_orchestrator(&config).await?;

    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut request = ChatRequest::new(&session_id, message);
    if let Some(reference) = context {
        request = request.with_context(reference, source);
    }

    let outcome = orchestrator.chat(&request).await;
    orchestrator.store().close().await?;
    let outcome = outcome?;

    if outcome.expired {
        eprintln!("(new session {session_id})");
    }
    println!("{}", outcome.reply);

    Ok(())
}
