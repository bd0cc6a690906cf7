use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::hub::ConnId;

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one inbound text frame from the given connection
    async fn handle_message(&self, conn_id: ConnId, message: String);
}

/// Per-connection transport limits and deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub max_message_bytes: usize,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub write_wait: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 512,
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
            write_wait: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("no frame received within the read deadline")]
    ReadTimeout,
    #[error("write did not complete within the write deadline")]
    WriteTimeout,
    #[error("frame of {0} bytes exceeds the size limit")]
    MessageTooLarge(usize),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Reads frames until the peer closes, errors, or goes quiet for longer than
/// `pong_wait`. Text frames are passed to the handler in arrival order.
pub async fn read_loop<S, E>(
    mut stream: S,
    conn_id: ConnId,
    handler: Arc<dyn MessageHandler>,
    config: ConnectionConfig,
) -> Result<(), SocketError>
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: Display,
{
    loop {
        let frame = time::timeout(config.pong_wait, stream.next())
            .await
            .map_err(|_| SocketError::ReadTimeout)?;

        match frame {
            None => return Ok(()),
            Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            Some(Ok(Message::Text(text))) => {
                if text.len() > config.max_message_bytes {
                    return Err(SocketError::MessageTooLarge(text.len()));
                }
                debug!(conn_id = %conn_id, message = %text, "Received message");
                handler.handle_message(conn_id, text).await;
            }
            Some(Ok(Message::Close(_))) => return Ok(()),
            // Pongs only matter for resetting the read deadline above.
            Some(Ok(_)) => {}
        }
    }
}

/// Drains the outbound queue onto the socket and pings every `ping_period`.
///
/// When the queue's sender is dropped the loop sends a close frame and exits.
pub async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<String>,
    config: ConnectionConfig,
) -> Result<(), SocketError>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    let mut ticker = time::interval_at(Instant::now() + config.ping_period, config.ping_period);

    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(text) => send_within(&mut sink, Message::Text(text), config.write_wait).await?,
                None => {
                    let _ = send_within(&mut sink, Message::Close(None), config.write_wait).await;
                    return Ok(());
                }
            },
            _ = ticker.tick() => {
                send_within(&mut sink, Message::Ping(Vec::new()), config.write_wait).await?;
            }
        }
    }
}

async fn send_within<S>(sink: &mut S, message: Message, deadline: Duration) -> Result<(), SocketError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match time::timeout(deadline, sink.send(message)).await {
        Err(_) => Err(SocketError::WriteTimeout),
        Ok(Err(e)) => Err(SocketError::SendFailed(e.to_string())),
        Ok(Ok(())) => Ok(()),
    }
}

/// One live socket: a reader task and a writer task fed by the hub through
/// a bounded outbound queue.
pub struct Connection<S> {
    pub conn_id: ConnId,
    socket: S,
    outbound_receiver: mpsc::Receiver<String>,
    message_handler: Arc<dyn MessageHandler>,
    config: ConnectionConfig,
}

impl<S, E> Connection<S>
where
    S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + 'static,
    E: Display + Send + 'static,
{
    pub fn new(
        conn_id: ConnId,
        socket: S,
        outbound_receiver: mpsc::Receiver<String>,
        message_handler: Arc<dyn MessageHandler>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            conn_id,
            socket,
            outbound_receiver,
            message_handler,
            config,
        }
    }

    /// Runs both halves until either one stops, then stops the other.
    ///
    /// Each half runs in its own task so a panic in message handling is
    /// contained here and reported, rather than unwinding into the caller.
    pub async fn run(self) {
        let conn_id = self.conn_id;
        let (sink, stream) = self.socket.split();

        let mut reader = tokio::spawn(read_loop(
            stream,
            conn_id,
            self.message_handler,
            self.config.clone(),
        ));
        let mut writer = tokio::spawn(write_loop(sink, self.outbound_receiver, self.config));

        tokio::select! {
            finished = &mut reader => {
                writer.abort();
                report(conn_id, "reader", finished);
            }
            finished = &mut writer => {
                reader.abort();
                report(conn_id, "writer", finished);
            }
        }
    }
}

fn report(conn_id: ConnId, half: &'static str, finished: Result<Result<(), SocketError>, JoinError>) {
    match finished {
        Ok(Ok(())) => info!(conn_id = %conn_id, half, "WebSocket connection closed cleanly"),
        Ok(Err(e)) => warn!(conn_id = %conn_id, half, error = %e, "WebSocket connection error"),
        Err(e) if e.is_panic() => {
            error!(conn_id = %conn_id, half, "WebSocket task panicked")
        }
        Err(_) => debug!(conn_id = %conn_id, half, "WebSocket task cancelled"),
    }
}
