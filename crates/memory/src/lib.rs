//! Session store implementations for Parley.

pub mod in_memory;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use in_memory::InMemorySessionStore;

#[cfg(feature = "redis")]
pub use redis_store::RedisSessionStore;

use parley_config::AppConfig;
use parley_core::error::StoreError;
use parley_core::session::SessionStore;
use std::sync::Arc;

/// Build the session store selected by `store.backend`.
pub async fn build_from_config(config: &AppConfig) -> Result<Arc<dyn SessionStore>, StoreError> {
    let policy = config.session_policy();
    match config.store.backend.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Ok(Arc::new(InMemorySessionStore::new(policy)))
        }
        #[cfg(feature = "redis")]
        "redis" => {
            let store = RedisSessionStore::connect(
                &config.store.redis_url,
                policy,
                config.store.connect_timeout(),
                config.store.op_timeout(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        other => Err(StoreError::Connection(format!(
            "store backend '{other}' is not available in this build"
        ))),
    }
}
