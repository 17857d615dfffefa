use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::{
    fs,
    io::{self, BufRead, BufReader},
    os::unix::net::UnixListener,
    path::PathBuf,
    thread,
};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::events::GestureEvent;
use crate::input::ObservationReader;
use crate::reducer::EventReducer;

/// Where observations come from.
#[derive(Debug, Clone)]
pub enum FeedSource {
    Stdin,
    Socket(PathBuf),
}

/// Frame-thread side of the hand-off to the broadcaster. Never blocks: an
/// event that cannot be queued right now is discarded.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<GestureEvent>,
}

impl Outbox {
    pub fn new(tx: mpsc::Sender<GestureEvent>) -> Self {
        Self { tx }
    }

    pub fn offer(&self, event: GestureEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(ev)) => {
                debug!("broadcaster busy, dropping '{}' event", ev.gesture);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("broadcaster gone, dropping event");
                false
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub lines: u64,
    pub malformed: u64,
    pub handed_off: u64,
    pub discarded: u64,
}

/// Feeds every observation from `reader` through `reducer`, handing changes
/// to `outbox`. Returns once the reader is exhausted or fails.
pub fn pump<R: BufRead>(reader: R, reducer: &mut EventReducer, outbox: &Outbox) -> PumpStats {
    let mut stats = PumpStats::default();
    let mut last_ts: Option<u64> = None;

    for item in ObservationReader::new(reader) {
        stats.lines += 1;
        let obs = match item {
            Ok(obs) => obs,
            Err(e) if e.is_fatal() => {
                warn!("feed closed: {e}");
                break;
            }
            Err(e) => {
                stats.malformed += 1;
                warn!("skipping observation: {e}");
                continue;
            }
        };

        if let (Some(prev), Some(ts)) = (last_ts, obs.timestamp_ms) {
            if ts < prev {
                debug!("observation out of order: {ts} after {prev}");
            }
        }
        last_ts = obs.timestamp_ms.or(last_ts);

        if let Some(event) = reducer.process(&obs) {
            if outbox.offer(event) {
                stats.handed_off += 1;
            } else {
                stats.discarded += 1;
            }
        }
    }
    stats
}

/// A feed whose socket is already bound, ready for the frame thread.
pub enum OpenFeed {
    Stdin,
    Socket(UnixListener, PathBuf),
}

impl FeedSource {
    /// Binds the feed socket, replacing a stale one left by an earlier run.
    pub fn open(self) -> Result<OpenFeed> {
        match self {
            FeedSource::Stdin => Ok(OpenFeed::Stdin),
            FeedSource::Socket(path) => {
                if path.exists() {
                    let _ = fs::remove_file(&path);
                }
                let listener = UnixListener::bind(&path)
                    .with_context(|| format!("bind feed socket {}", path.display()))?;
                Ok(OpenFeed::Socket(listener, path))
            }
        }
    }
}

pub fn run_pipeline(feed: OpenFeed, mut reducer: EventReducer, outbox: Outbox) {
    match feed {
        OpenFeed::Stdin => {
            info!("pipeline: reading observations from stdin");
            let stats = pump(io::stdin().lock(), &mut reducer, &outbox);
            info!("pipeline: stdin closed ({stats:?}, {:?})", reducer.stats());
        }
        OpenFeed::Socket(listener, path) => {
            info!("pipeline: oracle feed on {}", path.display());

            // one producer at a time keeps reductions serial
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        info!("pipeline: oracle connected");
                        let stats = pump(BufReader::new(stream), &mut reducer, &outbox);
                        info!("pipeline: oracle disconnected ({stats:?}, {:?})", reducer.stats());
                    }
                    Err(e) => error!("feed accept failed: {e}"),
                }
            }
        }
    }
}

pub struct PipelineThread {
    _thread: thread::JoinHandle<()>,
}

impl PipelineThread {
    /// Opens `source` on the calling thread so a bad feed fails startup, then
    /// hands it to the frame thread.
    pub fn start(source: FeedSource, reducer: EventReducer, outbox: Outbox) -> Result<Self> {
        let feed = source.open()?;
        let handle = thread::Builder::new()
            .name("gesturecast-frames".into())
            .spawn(move || run_pipeline(feed, reducer, outbox))?;
        Ok(Self { _thread: handle })
    }
}
