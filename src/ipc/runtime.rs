use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use std::{fs, path::PathBuf, thread};

use crate::config::AppConfig;

pub fn runtime_dir() -> Result<PathBuf> {
    // ~/.local/run
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    let dir = dirs.home_dir().join(".local").join("run");
    let _ = fs::create_dir_all(&dir);
    Ok(dir)
}

/// Feed socket the oracle writes observations to.
pub fn socket_path(cfg: &AppConfig) -> Result<PathBuf> {
    match &cfg.feed.socket {
        Some(p) => Ok(p.clone()),
        None => Ok(runtime_dir()?.join("gesturecast.sock")),
    }
}

/// Exits on SIGINT/SIGTERM, removing the feed socket first. Live
/// connections are not drained.
pub fn install_shutdown_handler(feed_socket: Option<PathBuf>) -> Result<()> {
    use signal_hook::{consts::TERM_SIGNALS, iterator::Signals};

    let mut signals = Signals::new(TERM_SIGNALS)?;
    thread::Builder::new()
        .name("gesturecast-signals".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                info!("received signal {sig}, shutting down");
                if let Some(p) = &feed_socket {
                    let _ = fs::remove_file(p);
                }
                std::process::exit(0);
            }
        })?;
    Ok(())
}
