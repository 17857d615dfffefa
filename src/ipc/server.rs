use anyhow::Result;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, info};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::hub::{self, BroadcastHub, DeliveryError, SharedHub, Subscriber};
use super::pipeline::{FeedSource, Outbox, PipelineThread};
use super::runtime::install_shutdown_handler;
use super::STATUS_PATH;
use crate::config::{AppConfig, ServerConfig};
use crate::events::GestureEvent;
use crate::reducer::EventReducer;

/// Hub-side handle of one WebSocket client: a bounded queue drained by the
/// connection's writer task.
pub struct WsSubscriber {
    tx: mpsc::Sender<String>,
}

impl Subscriber for WsSubscriber {
    fn send(&mut self, payload: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(payload.to_owned()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backlogged,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }
}

#[derive(Clone)]
struct AppState {
    hub: SharedHub<WsSubscriber>,
    backlog: usize,
}

pub fn run_daemon(cfg: AppConfig, source: FeedSource) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("gesturecast-io")
        .build()?;

    let feed_socket = match &source {
        FeedSource::Socket(p) => Some(p.clone()),
        FeedSource::Stdin => None,
    };
    install_shutdown_handler(feed_socket)?;

    // frames → broadcaster
    let (tx_evt, rx_evt) = mpsc::channel::<GestureEvent>(cfg.pipeline.handoff_capacity);

    let reducer = EventReducer::new(cfg.pipeline.landmark_tolerance);
    let _pipeline = PipelineThread::start(source, reducer, Outbox::new(tx_evt))?;

    let state = AppState {
        hub: Arc::new(Mutex::new(BroadcastHub::new())),
        backlog: cfg.pipeline.subscriber_backlog,
    };
    runtime.block_on(serve(cfg.server, state, rx_evt))
}

async fn serve(
    server: ServerConfig,
    state: AppState,
    rx_evt: mpsc::Receiver<GestureEvent>,
) -> Result<()> {
    tokio::spawn(forward_events(rx_evt, state.hub.clone()));

    let app = router(&server.path, state);
    let listener = tokio::net::TcpListener::bind((server.bind.as_str(), server.port)).await?;
    info!(
        "daemon: subscribers on ws://{}{}",
        listener.local_addr()?,
        server.path
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(ws_path: &str, state: AppState) -> Router {
    Router::new()
        .route(ws_path, get(ws_handler))
        .route(STATUS_PATH, get(status_handler))
        .with_state(state)
}

async fn forward_events(
    mut rx_evt: mpsc::Receiver<GestureEvent>,
    hub: SharedHub<WsSubscriber>,
) {
    while let Some(event) = rx_evt.recv().await {
        let mut guard = hub::lock(&hub);
        if guard.is_empty() {
            debug!("no subscribers for '{}'", event.gesture);
            continue;
        }
        let report = guard.publish(&event);
        debug!(
            "published '{}' ({} fingers) to {} subscriber(s)",
            event.gesture, event.finger_count, report.delivered
        );
        if report.pruned > 0 {
            info!(
                "pruned {} dead subscriber(s), {} left",
                report.pruned,
                guard.len()
            );
        }
    }
    info!("event hand-off closed, broadcaster idle");
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = hub::lock(&state.hub).stats();
    Json(stats)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    run_connection(sink, stream, state).await
}

/// Registers one client, pumps its queue into `sink` and unregisters it once
/// either side ends.
async fn run_connection<Si, St, E>(mut sink: Si, mut stream: St, state: AppState)
where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: Send,
    St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(state.backlog);
    let id = hub::lock(&state.hub).register(WsSubscriber { tx });
    info!("subscriber {id} connected");

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sink.send(Message::Text(payload.into())).await.is_err() {
                return;
            }
        }
        // hub dropped us
        let _ = sink.send(Message::Close(None)).await;
    });

    // subscribers have nothing to say; reading only notices the disconnect
    let mut reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    if hub::lock(&state.hub).unregister(id) {
        info!("subscriber {id} disconnected");
    } else {
        info!("subscriber {id} closed after being pruned");
    }
}
