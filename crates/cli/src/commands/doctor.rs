//! `parley doctor` — Diagnose system health.

use parley_config::AppConfig;
use std::path::Path;
use tracing::warn;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Parley Doctor — System Diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    // Check config
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if !path.exists() {
        println!("  ⚠️  No config file at {}, using defaults", path.display());
    }
    let config = match AppConfig::load_with_env(&path) {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running further checks.");
            return Err("configuration invalid".into());
        }
    };

    // Check session store
    match parley_memory::build_from_config(&config).await {
        Ok(store) => {
            match store.health_check().await {
                Ok(true) => println!("  ✅ Session store reachable ({})", store.name()),
                Ok(false) | Err(_) => {
                    println!("  ❌ Session store not responding ({})", store.name());
                    issues += 1;
                }
            }
            if let Err(e) = store.close().await {
                warn!("Failed to close session store: {e}");
            }
        }
        Err(e) => {
            println!("  ❌ Session store unavailable: {e}");
            issues += 1;
        }
    }

    // Check inference backend
    match parley_providers::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!(
                "  ✅ Inference backend reachable ({} at {})",
                provider.name(),
                config.inference.base_url
            ),
            Ok(false) => {
                println!("  ❌ Inference backend returned an error ({})", config.inference.base_url);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Inference backend unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Inference backend misconfigured: {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(())
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        Err(format!("doctor found {issues} issue(s)").into())
    }
}
