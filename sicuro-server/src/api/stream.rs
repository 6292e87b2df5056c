//! Log streaming over WebSocket
//!
//! Each connection runs its own [`LogTail`] on a fixed poll interval and
//! sends every delivery as a JSON text frame. Closing the connection ends the
//! stream.

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use serde::Deserialize;
use sicuro_core::domain::log::{self, LogCursor, normalize_log_name};
use std::time::Duration;
use tokio::time::{Instant, interval, interval_at};
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::tail::LogTail;

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// Cursor of the last delivery the client saw
    #[serde(rename = "lastMod")]
    pub last_mod: Option<String>,
}

impl StreamParams {
    /// Cursor to resume from; a missing or malformed value starts over
    pub fn cursor(&self) -> LogCursor {
        match self.last_mod.as_deref().map(str::trim) {
            None | Some("") => LogCursor::EPOCH,
            Some(raw) => LogCursor::decode(raw).unwrap_or_else(|| {
                warn!("Ignoring malformed cursor '{}'", raw);
                LogCursor::EPOCH
            }),
        }
    }
}

/// GET /ws/{*path}
/// Stream a job log
pub async fn stream_log(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<StreamParams>,
) -> ApiResult<Response> {
    let name = normalize_log_name(&path)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid log name '{}'", path)))?;
    let log_path = log::log_file_path(&state.scheduler.config().log_root, &name);
    let tail = LogTail::new(log_path, params.cursor());
    let poll_interval = state.config.poll_interval;
    let ping_interval = state.config.ping_interval;

    info!("Log stream for {} requested", name);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, tail, poll_interval, ping_interval)))
}

async fn handle_socket(
    mut socket: WebSocket,
    mut tail: LogTail,
    poll_interval: Duration,
    ping_interval: Duration,
) {
    let mut poll = interval(poll_interval);
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let Some(delivery) = tail.poll().await else {
                    continue;
                };
                match serde_json::to_string(&delivery) {
                    Ok(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("Log stream client disconnected during send");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode log delivery"),
                }
            }

            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    debug!("Log stream client disconnected during ping");
                    break;
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "Log stream receive error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("Log stream for {} closed", tail.path().display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_cursor() {
        let params = StreamParams {
            last_mod: Some("ff".to_string()),
        };
        assert_eq!(params.cursor(), LogCursor::from_nanos(255));

        assert_eq!(StreamParams::default().cursor(), LogCursor::EPOCH);

        let params = StreamParams {
            last_mod: Some("not-hex".to_string()),
        };
        assert_eq!(params.cursor(), LogCursor::EPOCH);
    }
}
