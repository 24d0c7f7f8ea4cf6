use std::path::PathBuf;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wordbomb::prelude::*;

const ENGLISH: &str = include_str!("../data/english.txt");

#[tokio::main]
async fn main() -> Result<(), WordbombError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config_from_env();

    let mut words = WordList::new().with_dictionary("english", ENGLISH);
    if let Some(dir) = std::env::var_os("WORDBOMB_WORDLIST_DIR").map(PathBuf::from) {
        let loaded = words.load_dir(&dir)?;
        tracing::info!(dir = %dir.display(), loaded, "loaded word lists");
    }
    tracing::info!(dictionaries = ?words.dictionaries(), "dictionaries ready");

    let server = WordbombServer::<MemoryLobbyStore, WordList>::builder()
        .config(config)
        .build(MemoryLobbyStore::new(), words)
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}

fn config_from_env() -> ServerConfig {
    let mut config = ServerConfig::default();
    if let Ok(addr) = std::env::var("WORDBOMB_WS_ADDR") {
        config.ws_addr = addr;
    }
    if let Ok(addr) = std::env::var("WORDBOMB_HTTP_ADDR") {
        config.http_addr = addr;
    }
    if let Some(secs) = secs_from_env("WORDBOMB_MIN_FUSE_SECS") {
        config.lobby.fuse.min_fuse = secs;
    }
    if let Some(secs) = secs_from_env("WORDBOMB_MAX_FUSE_SECS") {
        config.lobby.fuse.max_fuse = secs;
    }
    config
}

fn secs_from_env(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid duration");
            None
        }
    }
}
