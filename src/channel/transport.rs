//! Transport seam between the channel client and the network

use crate::error::{Result, SwarmViewError};
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use tokio_tungstenite::tungstenite::{self, http::StatusCode, Message};
use tokio_tungstenite::connect_async;
use tracing::debug;
use url::Url;

/// Text messages received on one open connection. The stream ends when the
/// peer closes; an `Err` item means the connection failed.
pub type MessageStream = BoxStream<'static, Result<String>>;

/// Opens push channel connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<MessageStream>;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &Url) -> Result<MessageStream> {
        let (ws, response) = connect_async(url.as_str())
            .await
            .map_err(|e| handshake_error(url, e))?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let messages = ws.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(bytes)) => Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Server closed WebSocket");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(SwarmViewError::Transport(e.to_string()))),
            }
        });

        Ok(messages.boxed())
    }
}

/// A 401 during the upgrade is an auth failure, not a transport fault
fn handshake_error(url: &Url, error: tungstenite::Error) -> SwarmViewError {
    match error {
        tungstenite::Error::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            SwarmViewError::Unauthorized(format!("{} rejected the handshake", url))
        }
        e => SwarmViewError::Transport(format!("connect {}: {}", url, e)),
    }
}
