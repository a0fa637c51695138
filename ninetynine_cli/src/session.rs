use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{error::ProtocolError, Error as WsError, Message},
};
use url::Url;

use crate::error::{ProbeError, Result};
use crate::protocol::{ClientAction, Inbound};

const CLOSE_GRACE: Duration = Duration::from_secs(3);

/// What the reader task reports back.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Frame(Inbound),
    Closed(Option<String>),
    Failed(String),
}

/// A joined room. The socket's write half lives in one writer task fed by
/// `outbound`; the read half lives in the reader task, which forwards every
/// frame as a [`SessionEvent`].
pub struct RoomSession {
    outbound: mpsc::Sender<Message>,
    closed: watch::Receiver<bool>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl RoomSession {
    /// Connects and sends `join` before anything else.
    pub async fn open(
        url: &Url,
        join: &ClientAction,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        let (ws_stream, response) = connect_async(url.as_str()).await?;
        tracing::info!(status = %response.status(), "connected to {}", url);

        let (mut sink, mut stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<Message>(32);
        let (closed_tx, closed_rx) = watch::channel(false);

        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    if is_closing_error(&e) {
                        tracing::debug!("socket already closing: {}", e);
                    } else {
                        tracing::error!("failed to send frame: {}", e);
                    }
                    break;
                }
                if closing {
                    break;
                }
            }
            tracing::debug!("writer finished");
        });

        let reader = tokio::spawn(async move {
            let last = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(len = text.len(), "frame received");
                        let _ = events.send(SessionEvent::Frame(Inbound::parse(&text)));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        tracing::debug!("ignoring {} byte binary frame", bytes.len());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        break SessionEvent::Closed(reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break SessionEvent::Failed(e.to_string());
                    }
                    None => break SessionEvent::Closed(None),
                }
            };
            // Flag first, so anyone who saw the last event also sees the flag.
            let _ = closed_tx.send(true);
            let _ = events.send(last);
        });

        let session = RoomSession {
            outbound: tx,
            closed: closed_rx,
            writer,
            reader,
        };
        session.send(join).await?;
        Ok(session)
    }

    pub async fn send(&self, action: &ClientAction) -> Result<()> {
        let frame = action.to_frame()?;
        tracing::debug!(action = action.name(), "sending");
        self.outbound
            .send(Message::Text(frame))
            .await
            .map_err(|_| ProbeError::ChannelClosed)
    }

    /// Resolves once the reader has seen the socket end.
    pub async fn wait_closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|done| *done).await;
    }

    /// Sends a close frame unless the socket already ended, then waits for
    /// both tasks. The reader gets a short grace period for the server's close
    /// reply before it is aborted.
    pub async fn close(self) -> Result<()> {
        let RoomSession {
            outbound,
            closed,
            writer,
            mut reader,
        } = self;

        let already_ended = *closed.borrow();
        if already_ended {
            tracing::debug!("socket already ended, not sending close");
        } else if outbound.send(Message::Close(None)).await.is_err() {
            tracing::debug!("writer already gone");
        }
        drop(outbound);

        if let Err(e) = writer.await {
            tracing::warn!("writer task failed: {}", e);
        }

        match tokio::time::timeout(CLOSE_GRACE, &mut reader).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("reader task failed: {}", e),
            Err(_) => {
                tracing::warn!("server did not answer close, dropping connection");
                reader.abort();
            }
        }
        Ok(())
    }
}

/// Errors that only mean the peer got to closing first.
fn is_closing_error(e: &WsError) -> bool {
    matches!(
        e,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::SendAfterClosing)
    )
}
