//! Data command handlers.
//!
//! `get`, `set` and `watch` go through a [`SyncRegistry`] binding exactly
//! like a dashboard widget would, so they fall back to the local cache when
//! the server cannot be reached. `list` reads the server directly.

use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use tracker_core::remote::RemoteStore;
use tracker_core::sync::{DeferredSpawner, TokioSpawner};

use super::Session;

const PREVIEW_CHARS: usize = 50;

/// Interpret command-line text as JSON, or as a plain string when it is not JSON.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Handle the get command
/// Returns true when a value is known
pub fn handle_get(session: &Session, key: &str) -> bool {
    let spawner = DeferredSpawner::new();
    let registry = session.registry(Arc::new(spawner.clone()));

    session.runtime.block_on(async {
        let binding = registry.bind(key, Value::Null);
        spawner.drain().await;

        let value = binding.get();
        if value.is_null() {
            eprintln!("No value stored under '{}'", key);
            return false;
        }
        println!("{}", pretty(&value));
        true
    })
}

/// Handle the set command
/// Returns true when the server confirmed the write
pub fn handle_set(session: &Session, key: &str, raw: &str) -> bool {
    let value = parse_value(raw);
    let spawner = DeferredSpawner::new();
    let registry = session.registry(Arc::new(spawner.clone()));

    session.runtime.block_on(async {
        let binding = registry.bind(key, Value::Null);
        spawner.drain().await;

        binding.set(value.clone());
        spawner.drain().await;

        match session.remote.fetch(key).await {
            Ok(Some(row)) if row.value == value => {
                println!("✓ Saved {}", key);
                true
            }
            Ok(_) => {
                eprintln!("⚠ Saved {} locally, but the server holds a different value", key);
                false
            }
            Err(e) => {
                eprintln!("⚠ Saved {} locally; the server could not be reached: {}", key, e);
                false
            }
        }
    })
}

/// Handle the list command
pub fn handle_list(session: &Session) -> bool {
    match session.runtime.block_on(session.remote.list()) {
        Ok(entries) if entries.is_empty() => {
            println!("No data stored yet.");
            true
        }
        Ok(entries) => {
            let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
            for entry in entries {
                println!(
                    "{:width$}  {}  {}",
                    entry.key,
                    entry.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    entry.preview(PREVIEW_CHARS),
                    width = width
                );
            }
            true
        }
        Err(e) => {
            eprintln!("✗ Error listing data: {}", e);
            false
        }
    }
}

/// Handle the watch command - print every change until Ctrl+C.
pub fn handle_watch(session: &Session, key: &str) -> bool {
    session.runtime.block_on(async {
        let registry = session.registry(Arc::new(TokioSpawner::current()));
        let binding = registry.bind(key, Value::Null);

        match binding.get() {
            Value::Null => println!("Watching {} (no cached value)", key),
            value => println!("Watching {} (cached: {})", key, value),
        }

        binding.on_change(|value: Value| {
            println!("[{}] {}", Local::now().format("%H:%M:%S"), value);
        });

        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("\nStopped watching.");
                true
            }
            Err(e) => {
                eprintln!("Failed to listen for Ctrl+C: {}", e);
                false
            }
        }
    })
}
