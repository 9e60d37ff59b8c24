//! Push adapter: the live channel delivering new lines as they appear.
//!
//! Implementations forward events through a bounded mpsc channel from a
//! spawned reader task; the event loop consumes the receiver. Dropping a
//! [`LiveSubscription`] aborts the reader, which is how the controller's
//! `CloseLive` action tears tailing down.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::DEFAULT_CHANNEL_BUFFER;
use crate::controller::FileMetadata;
use crate::protocol::{LiveMessage, LIVE_START};

/// Events surfaced from the live channel, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum LiveEvent {
    Metadata(FileMetadata),
    /// History replay is over; everything after this is tailed.
    LiveStart,
    System(String),
    Line(String),
    Batch(Vec<String>),
    /// Channel closed or failed; reason when known.
    Closed(Option<String>),
}

/// An open live channel and the task feeding it.
pub struct LiveSubscription {
    pub events: mpsc::Receiver<LiveEvent>,
    task: JoinHandle<()>,
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Trait for live channel backends
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    /// Open the channel and start delivering events.
    async fn open(&self) -> LiveSubscription;

    /// Display name for this channel
    #[allow(dead_code)]
    fn name(&self) -> String;
}

/// Live channel over a WebSocket to the viewer server.
pub struct WsChannel {
    base_url: String,
    alias: String,
}

impl WsChannel {
    pub fn new(base_url: &str, alias: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            alias: alias.to_string(),
        }
    }

    fn ws_url(&self) -> String {
        let scheme_swapped = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/ws/{}", scheme_swapped, self.alias)
    }
}

#[async_trait::async_trait]
impl LiveChannel for WsChannel {
    async fn open(&self) -> LiveSubscription {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_BUFFER);
        let url = self.ws_url();

        let task = tokio::spawn(async move {
            let (mut ws, _) = match connect_async(url).await {
                Ok(conn) => conn,
                Err(e) => {
                    let _ = tx.send(LiveEvent::Closed(Some(e.to_string()))).await;
                    return;
                }
            };

            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Text(text)) => match LiveMessage::parse(text.as_str()) {
                        Ok(msg) => {
                            if tx.send(event_from(msg)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping malformed live message");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = tx.send(LiveEvent::Closed(Some(e.to_string()))).await;
                        return;
                    }
                }
            }

            let _ = tx.send(LiveEvent::Closed(None)).await;
        });

        LiveSubscription { events: rx, task }
    }

    fn name(&self) -> String {
        self.alias.clone()
    }
}

/// Map a parsed wire message to the event the controller consumes.
fn event_from(msg: LiveMessage) -> LiveEvent {
    match msg {
        LiveMessage::Metadata {
            size,
            size_human,
            lines,
        } => LiveEvent::Metadata(FileMetadata {
            total_lines: lines,
            size_bytes: size,
            size_human,
        }),
        LiveMessage::Sys { msg } if msg == LIVE_START => LiveEvent::LiveStart,
        LiveMessage::Sys { msg } => LiveEvent::System(msg),
        LiveMessage::Log { data } => LiveEvent::Line(data),
        LiveMessage::LogBatch { data } => LiveEvent::Batch(data),
    }
}
