/// Clap argument definitions
mod args;

/// Config command handlers
mod config;

/// `get`, `set`, `list`, `watch` commands
mod data;

/// HTTP + WebSocket remote store
mod remote;

/// AI tool commands
mod tools;

use std::sync::Arc;

use clap::Parser;
use tracker_core::cache::FileCache;
use tracker_core::config::Config;
use tracker_core::sync::{SyncRegistry, TaskSpawner};

pub use args::Cli;
use args::Commands;
use remote::HttpRemoteStore;

/// Connection to the server plus the local cache, shared by data commands.
pub struct Session {
    runtime: tokio::runtime::Runtime,
    remote: Arc<HttpRemoteStore>,
    cache: Arc<FileCache>,
}

impl Session {
    /// Open a session from the config file, with an optional server override.
    fn open(server_override: Option<&str>) -> Result<Self, String> {
        let mut config = Config::load().map_err(|e| format!("Error loading config: {}", e))?;
        if let Some(server) = server_override {
            config.server_url = Some(server.to_string());
        }

        let server_url = config.server_url().map_err(|e| e.to_string())?.to_string();
        let cache_dir = config.cache_dir().map_err(|e| e.to_string())?;

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| format!("Failed to create Tokio runtime: {}", e))?;
        let remote = Arc::new(HttpRemoteStore::new(&server_url, runtime.handle().clone()));

        log::debug!("Using server {} with cache at {}", server_url, cache_dir.display());

        Ok(Self {
            runtime,
            remote,
            cache: Arc::new(FileCache::new(cache_dir)),
        })
    }

    /// A registry over this session's cache and server.
    fn registry(&self, spawner: Arc<dyn TaskSpawner>) -> Arc<SyncRegistry> {
        SyncRegistry::new(
            self.cache.clone(),
            self.remote.clone(),
            self.remote.clone(),
            spawner,
        )
    }
}

/// Main entry point for the CLI
pub fn run_cli() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let success = match cli.command {
        Commands::Config { command } => config::handle_config_command(command),
        command => match Session::open(cli.server.as_deref()) {
            Ok(session) => run_with_session(&session, command),
            Err(e) => {
                eprintln!("✗ {}", e);
                false
            }
        },
    };

    if !success {
        std::process::exit(1);
    }
}

fn run_with_session(session: &Session, command: Commands) -> bool {
    match command {
        Commands::Get { key } => data::handle_get(session, &key),
        Commands::Set { key, value } => data::handle_set(session, &key, &value),
        Commands::List => data::handle_list(session),
        Commands::Watch { key } => data::handle_watch(session, &key),
        Commands::Tools { command } => tools::handle_tools_command(session, command),
        Commands::Config { command } => config::handle_config_command(command),
    }
}
