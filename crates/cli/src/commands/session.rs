//! `parley history` / `parley reset` — Inspect and drop sessions.

use parley_config::AppConfig;

pub async fn history(config: AppConfig, session_id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = parley_memory::build_from_config(&config).await?;
    let turns = store.get(session_id).await;
    let ttl = store.ttl(session_id).await;
    store.close().await?;
    let (turns, ttl) = (turns?, ttl?);

    if json {
        let value = serde_json::json!({
            "session_id": session_id,
            "history": turns,
            "message_count": turns.len(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!("No history for session {session_id}");
        return Ok(());
    }

    println!("Session {session_id}: {} turn(s)", turns.len());
    if let Some(ttl) = ttl {
        println!("Expires in {}s\n", ttl.as_secs());
    }
    for turn in &turns {
        println!("[{}] {}", turn.role, turn.content);
    }

    Ok(())
}

pub async fn reset(config: AppConfig, session_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = parley_memory::build_from_config(&config).await?;
    let existed = store.reset(session_id).await;
    store.close().await?;

    if existed? {
        println!("Session {session_id} reset");
    } else {
        println!("Session {session_id} did not exist");
    }
    Ok(())
}
