//! Config command handlers

use tracker_core::config::Config;

use super::args::ConfigCommands;

/// Handle config subcommands.
/// Returns true on success, false on error
pub fn handle_config_command(command: Option<ConfigCommands>) -> bool {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            return false;
        }
    };

    match command {
        None | Some(ConfigCommands::Show) => {
            show_config(&config);
            true
        }
        Some(ConfigCommands::SetServer { url }) => {
            let updated = Config {
                server_url: Some(url.trim_end_matches('/').to_string()),
                ..config
            };
            save(&updated, "Server set")
        }
        Some(ConfigCommands::SetCacheDir { path }) => {
            let updated = Config {
                cache_dir: Some(path),
                ..config
            };
            save(&updated, "Cache directory set")
        }
    }
}

fn show_config(config: &Config) {
    println!("Tracker Configuration");
    println!("=====================");
    match config.server_url() {
        Ok(url) => println!("Server: {}", url),
        Err(_) => println!("Server: (not set)"),
    }
    match config.cache_dir() {
        Ok(dir) => println!("Cache directory: {}", dir.display()),
        Err(e) => println!("Cache directory: ({})", e),
    }
    if let Some(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}

fn save(config: &Config, what: &str) -> bool {
    match config.save() {
        Ok(()) => {
            println!("✓ {}", what);
            if let Some(path) = Config::config_path() {
                println!("  Config file: {}", path.display());
            }
            true
        }
        Err(e) => {
            eprintln!("✗ Error saving config: {}", e);
            false
        }
    }
}

