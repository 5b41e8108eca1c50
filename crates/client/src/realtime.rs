//! Realtime updates pushed by the server.
//!
//! A single [`RealtimeDispatcher`] consumes the inbound message stream and
//! merges each message into the matching gallery collection by key. Its
//! lifetime is tied to the signed-in session through [`RealtimeHandle`].

use std::sync::Arc;

use futures::{SinkExt, Stream, StreamExt};
use lumen_core::realtime::{ClientCommand, RealtimeMessage};
use lumen_core::types::{DbId, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::collection::GalleryCollections;
use crate::error::RealtimeError;
use crate::notify::{Notifier, Toast};

/// The raw realtime socket.
pub type RealtimeSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes realtime messages to gallery collections.
pub struct RealtimeDispatcher {
    collections: Arc<GalleryCollections>,
    notifier: Notifier,
    viewer: UserId,
}

impl RealtimeDispatcher {
    /// * `viewer` - the signed-in user; star changes are viewer-relative.
    pub fn new(collections: Arc<GalleryCollections>, notifier: Notifier, viewer: UserId) -> Self {
        Self {
            collections,
            notifier,
            viewer,
        }
    }

    /// Apply one message. Returns `true` if a collection changed.
    pub fn dispatch(&self, message: &RealtimeMessage) -> bool {
        if let RealtimeMessage::Notification { title, body, .. } = message {
            self.notifier.notify(Toast::info(title.clone(), body.clone()));
            return false;
        }

        let Some(gallery_id) = message.gallery_id() else {
            return false;
        };
        match self.collections.get(gallery_id) {
            Some(collection) => collection.apply_realtime(message, Some(self.viewer.as_str())),
            None => {
                tracing::trace!(gallery_id, "Realtime message for a gallery that is not open");
                false
            }
        }
    }

    /// Dispatch every message from `messages` until it ends or `cancel` fires.
    pub async fn run<S>(self, messages: S, cancel: CancellationToken)
    where
        S: Stream<Item = RealtimeMessage> + Send,
    {
        tokio::pin!(messages);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = messages.next() => match next {
                    Some(message) => {
                        self.dispatch(&message);
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Realtime dispatcher stopped");
    }

    /// Drive a realtime socket: decode text frames and dispatch them, and
    /// forward subscription commands to the server.
    async fn run_socket(
        self,
        socket: RealtimeSocket,
        mut commands: mpsc::UnboundedReceiver<ClientCommand>,
        cancel: CancellationToken,
    ) {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                Some(command) = commands.recv() => {
                    if let Err(e) = send_command(&mut sink, &command).await {
                        tracing::error!(error = %e, "Failed to send realtime command");
                        break;
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<RealtimeMessage>(&text) {
                                Ok(message) => {
                                    self.dispatch(&message);
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "Ignoring malformed realtime message");
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Server closed realtime connection");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/Pong handled by tungstenite; binary unused.
                        }
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Realtime receive error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
        tracing::debug!("Realtime socket closed");
    }
}

async fn send_command<S>(sink: &mut S, command: &ClientCommand) -> Result<(), RealtimeError>
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(command).map_err(|e| RealtimeError::Protocol(e.to_string()))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| RealtimeError::Connection(e.to_string()))
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// The socket URL with `token` as an encoded query parameter.
pub fn socket_url(ws_url: &str, token: &str) -> Result<reqwest::Url, RealtimeError> {
    let mut url = reqwest::Url::parse(ws_url)
        .map_err(|e| RealtimeError::Connection(format!("Invalid realtime URL {ws_url}: {e}")))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Open the realtime socket, authenticating with the session token.
pub async fn connect(ws_url: &str, token: &str) -> Result<RealtimeSocket, RealtimeError> {
    let url = socket_url(ws_url, token)?;
    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| RealtimeError::Connection(format!("Failed to connect to {ws_url}: {e}")))?;
    tracing::info!(url = %ws_url, "Realtime connected");
    Ok(socket)
}

/// A running dispatcher. Dropping the handle does not stop it; call
/// [`RealtimeHandle::stop`].
pub struct RealtimeHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RealtimeHandle {
    /// Run `dispatcher` over a connected socket, subscribed to `galleries`.
    pub fn spawn_socket(
        dispatcher: RealtimeDispatcher,
        socket: RealtimeSocket,
        galleries: impl IntoIterator<Item = DbId>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        for gallery_id in galleries {
            let _ = commands.send(ClientCommand::Subscribe { gallery_id });
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(dispatcher.run_socket(socket, rx, cancel.clone()));
        Self {
            commands,
            cancel,
            task,
        }
    }

    /// Run `dispatcher` over an already-decoded message stream. Subscription
    /// commands are accepted and discarded.
    pub fn spawn_stream<S>(dispatcher: RealtimeDispatcher, messages: S) -> Self
    where
        S: Stream<Item = RealtimeMessage> + Send + 'static,
    {
        let (commands, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(dispatcher.run(messages, cancel.clone()));
        Self {
            commands,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self, gallery_id: DbId) {
        let _ = self.commands.send(ClientCommand::Subscribe { gallery_id });
    }

    pub fn unsubscribe(&self, gallery_id: DbId) {
        let _ = self.commands.send(ClientCommand::Unsubscribe { gallery_id });
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the dispatcher and wait for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Realtime task ended abnormally");
        }
    }
}
