//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS
//! - Extract the caller-supplied identity from the query string (untrusted)
//! - Own the connection: outbound queue, writer task, ping + idle timeout
//! - Feed inbound frames to the message router one at a time, in order
//! - Run the disconnect path when the socket goes away

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use crate::app_state::AppState;
use crate::realtime::Connection;
use crate::transport::codec::{decode, Frame};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> Response {
    ws.on_upgrade(move |socket| run_session(app, q, socket))
}

async fn run_session(app: AppState, q: WsQuery, socket: WebSocket) {
    let gw = app.cfg().gateway.clone();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(gw.outbound_queue);
    let conn = Connection::new(q.user_id, out_tx);

    let span = tracing::info_span!(
        "session",
        conn_id = conn.id(),
        identity = conn.identity().unwrap_or("-")
    );

    async move {
        tracing::info!("connected");
        let (mut ws_tx, mut ws_rx) = socket.split();

        // Writer: drains the outbound queue so handlers never wait on the socket.
        let writer = tokio::spawn(
            async move {
                while let Some(m) = out_rx.recv().await {
                    if ws_tx.send(m).await.is_err() {
                        break;
                    }
                }
                let _ = ws_tx.close().await;
            }
            .in_current_span(),
        );

        let router = app.router();
        let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);
        let mut ping_tick = tokio::time::interval(Duration::from_millis(gw.ping_interval_ms));
        ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                incoming = ws_rx.next() => {
                    let Some(Ok(msg)) = incoming else { break; };
                    last_activity = Instant::now();

                    match decode(msg) {
                        Frame::Envelope(decoded) => router.handle_decoded(&conn, decoded).await,
                        Frame::Ping(payload) => {
                            let _ = conn.sender().try_send(Message::Pong(payload));
                        }
                        Frame::Pong => {}
                        Frame::Close => break,
                    }
                }

                _ = ping_tick.tick() => {
                    if last_activity.elapsed() >= idle_timeout {
                        tracing::info!("idle timeout");
                        break;
                    }
                    let _ = conn.sender().try_send(Message::Ping(Vec::new()));
                }

                _ = writer_closed(&conn) => break,
            }
        }

        router.disconnect(&conn).await;
        drop(conn);

        // All senders are gone once the directory dropped its clone; give the
        // writer a moment to flush, then stop it.
        let abort = writer.abort_handle();
        if tokio::time::timeout(Duration::from_millis(gw.send_timeout_ms), writer)
            .await
            .is_err()
        {
            abort.abort();
        }
        tracing::info!("disconnected");
    }
    .instrument(span)
    .await
}

/// Resolves once the writer has stopped draining (socket write failed).
async fn writer_closed(conn: &Connection) {
    conn.sender().closed().await
}
