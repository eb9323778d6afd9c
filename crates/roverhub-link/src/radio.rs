//! WebSocket transport for the operator link.
//!
//! The hub is the server side: it binds once, then accepts exactly one
//! operator device at a time. Frames are JSON texts, one `{cat, value}`
//! object per frame. Reconnection replaces the connected client wholesale;
//! the listener itself stays bound for the life of the process.

use std::net::SocketAddr;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use roverhub_types::{HubError, OutgoingMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};
use tracing::{debug, info};

use crate::RadioLink;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Single-client WebSocket server implementing [`RadioLink`].
pub struct WsRadioLink {
    listener: TcpListener,
    writer: Mutex<Option<WsSink>>,
    reader: Mutex<Option<WsSource>>,
}

impl WsRadioLink {
    /// Bind the listener. No client is connected yet; call
    /// [`accept`][Self::accept] before using the link.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Radio`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, HubError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HubError::Radio(format!("bind error on {addr}: {e}")))?;
        Ok(Self {
            listener,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, HubError> {
        self.listener
            .local_addr()
            .map_err(|e| HubError::Radio(e.to_string()))
    }

    /// Block until an operator device connects and completes the
    /// WebSocket handshake. Any previous connection is discarded.
    pub async fn accept(&self) -> Result<(), HubError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| HubError::Radio(format!("accept error: {e}")))?;
        let ws = accept_async(stream)
            .await
            .map_err(|e| HubError::Radio(format!("handshake with {peer}: {e}")))?;
        info!(peer = %peer, "operator device connected");

        let (tx, rx) = ws.split();
        *self.writer.lock().await = Some(tx);
        *self.reader.lock().await = Some(rx);
        Ok(())
    }
}

#[async_trait]
impl RadioLink for WsRadioLink {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), HubError> {
        let json =
            serde_json::to_string(message).map_err(|e| HubError::Radio(e.to_string()))?;
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| HubError::Radio("no operator connected".to_string()))?;
        writer
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| HubError::Radio(format!("send failed: {e}")))
    }

    async fn receive(&self) -> Result<Option<String>, HubError> {
        let mut guard = self.reader.lock().await;
        let reader = guard
            .as_mut()
            .ok_or_else(|| HubError::Radio("no operator connected".to_string()))?;
        match reader.next().await {
            Some(Ok(Message::Text(text))) => Ok(Some(text.as_str().to_string())),
            Some(Ok(Message::Close(_))) | None => {
                Err(HubError::Radio("operator closed the connection".to_string()))
            }
            Some(Ok(other)) => {
                debug!(frame = ?other, "ignoring non-text frame");
                Ok(None)
            }
            Some(Err(e)) => Err(HubError::Radio(format!("receive failed: {e}"))),
        }
    }

    async fn reconnect(&self) -> Result<(), HubError> {
        *self.writer.lock().await = None;
        *self.reader.lock().await = None;
        self.accept().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverhub_types::Category;
    use std::sync::Arc;
    use tokio_tungstenite::connect_async;

    async fn connected_pair() -> (
        Arc<WsRadioLink>,
        WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>,
    ) {
        let link = Arc::new(
            WsRadioLink::bind("127.0.0.1:0".parse().unwrap())
                .await
                .unwrap(),
        );
        let addr = link.local_addr().unwrap();

        let server = Arc::clone(&link);
        let accept = tokio::spawn(async move { server.accept().await });
        let (client, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        accept.await.unwrap().unwrap();
        (link, client)
    }

    #[tokio::test]
    async fn send_delivers_json_frame_to_client() {
        let (link, mut client) = connected_pair().await;

        link.send(&OutgoingMessage::info("hello")).await.unwrap();

        let frame = client.next().await.unwrap().unwrap();
        let text = frame.into_text().unwrap();
        let back: OutgoingMessage = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(back.cat, Category::Info);
        assert_eq!(back.value, "hello");
    }

    #[tokio::test]
    async fn receive_yields_client_text_frames() {
        let (link, mut client) = connected_pair().await;

        client
            .send(Message::Text(r#"{"cat":"control","value":"start"}"#.into()))
            .await
            .unwrap();

        let raw = link.receive().await.unwrap().unwrap();
        assert!(raw.contains("control"));
    }

    #[tokio::test]
    async fn send_without_client_is_a_radio_fault() {
        let link = WsRadioLink::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let result = link.send(&OutgoingMessage::info("nobody home")).await;
        assert!(matches!(result, Err(HubError::Radio(_))));
    }

    #[tokio::test]
    async fn receive_reports_peer_close() {
        let (link, mut client) = connected_pair().await;
        client.close(None).await.unwrap();

        // Drain until the close surfaces; ping/pong frames may precede it.
        loop {
            match link.receive().await {
                Ok(Some(_)) | Ok(None) => continue,
                Err(HubError::Radio(_)) => break,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
