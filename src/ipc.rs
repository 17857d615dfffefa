mod hub;
mod pipeline;
mod runtime;
mod server;

use anyhow::{Result, anyhow};
use log::info;
use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    os::unix::net::UnixStream,
    path::Path,
    thread,
    time::Duration,
};

use crate::config::AppConfig;

pub use pipeline::FeedSource;
pub use runtime::socket_path;
pub use server::run_daemon;

pub const STATUS_PATH: &str = "/status";

// Client helper: stream a recorded NDJSON session into the daemon's feed
// socket, optionally paced at `fps` lines per second.
pub fn feed_file(cfg: &AppConfig, path: &Path, fps: Option<f64>) -> Result<usize> {
    let sock = socket_path(cfg)?;
    if !sock.exists() {
        return Err(anyhow!(
            "gesturecast daemon is not running (socket missing at {})",
            sock.display()
        ));
    }
    let file = File::open(path).map_err(|e| anyhow!("failed to open {}: {e}", path.display()))?;
    let mut stream = UnixStream::connect(&sock)?;
    let pause = fps
        .filter(|f| f.is_finite() && *f > 0.0)
        .map(|f| Duration::from_secs_f64(1.0 / f));

    let mut sent = 0;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        stream.write_all(line.as_bytes())?;
        stream.write_all(b"\n")?;
        sent += 1;
        if let Some(p) = pause {
            thread::sleep(p);
        }
    }
    stream.flush()?;
    info!("fed {sent} observation(s) from {}", path.display());
    Ok(sent)
}
