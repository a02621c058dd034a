//! mpv JSON IPC client
//!
//! One background task reads lines from the player and routes replies to
//! waiting requests or notifications to the tracker; another writes queued
//! requests. Handles are cheap to clone and share the same connection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::connection::PlayerConnection;
use crate::error::IpcError;
use crate::messages::{Incoming, MpvMessage, MpvRequest};
use crate::notifications::PlayerNotification;

/// Prefix of Windows named pipe paths
pub const PIPE_PREFIX: &str = r"\\.\pipe\";

type PendingReply = oneshot::Sender<Result<Value, IpcError>>;

/// State shared between client handles and the reader task
#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<u64, PendingReply>>,
    closed: AtomicBool,
}

impl Shared {
    fn take_pending(&self, request_id: u64) -> Option<PendingReply> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_id)
    }

    /// Mark the connection closed and fail every waiting request
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let drained: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, tx) in drained {
            let _ = tx.send(Err(IpcError::ConnectionClosed));
        }
    }
}

/// Removes a request's pending entry when its future completes or is dropped
struct PendingGuard<'a> {
    shared: &'a Shared,
    request_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.take_pending(self.request_id);
    }
}

struct ClientInner {
    endpoint: String,
    next_request_id: AtomicU64,
    shared: Arc<Shared>,
    outgoing: mpsc::UnboundedSender<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl ClientInner {
    async fn request(&self, request: MpvRequest) -> Result<Value, IpcError> {
        let request_id = request.request_id;
        let line = request.to_line()?;

        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id, tx);
        let _pending = PendingGuard {
            shared: &self.shared,
            request_id,
        };

        // Checked after registering so a concurrent close cannot strand us.
        if self.shared.closed.load(Ordering::SeqCst) || self.outgoing.send(line).is_err() {
            return Err(IpcError::ConnectionClosed);
        }
        trace!(request_id, "Sent player request");

        rx.await.map_err(|_| IpcError::ConnectionClosed)?
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Client for an mpv JSON IPC server
#[derive(Clone)]
pub struct MpvClient {
    inner: Arc<ClientInner>,
}

impl MpvClient {
    /// Connect to the player listening on a named channel.
    ///
    /// Returns the client and the stream of notifications it receives.
    pub async fn connect(
        channel: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlayerNotification>), IpcError> {
        let endpoint = resolve_endpoint(channel);
        debug!(endpoint = %endpoint, "Connecting to player");
        let stream = open_stream(&endpoint).await?;
        Ok(Self::from_stream(stream, endpoint))
    }

    /// Wrap an already-open stream. Must be called inside a tokio runtime.
    pub fn from_stream<S>(
        stream: S,
        endpoint: String,
    ) -> (Self, mpsc::UnboundedReceiver<PlayerNotification>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        let reader_task = tokio::spawn(read_loop(reader, Arc::clone(&shared), notify_tx));
        let writer_task = tokio::spawn(write_loop(writer, outgoing_rx));

        let client = Self {
            inner: Arc::new(ClientInner {
                endpoint,
                next_request_id: AtomicU64::new(1),
                shared,
                outgoing: outgoing_tx,
                tasks: vec![reader_task, writer_task],
            }),
        };
        (client, notify_rx)
    }

    /// Get the endpoint this client is connected to
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Whether the player side has gone away
    pub fn is_closed(&self) -> bool {
        self.inner.shared.closed.load(Ordering::SeqCst)
    }

    /// Send a raw command and wait for its reply
    pub fn command(
        &self,
        command: Vec<Value>,
    ) -> impl Future<Output = Result<Value, IpcError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let request_id = inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        async move { inner.request(MpvRequest::new(command, request_id)).await }
    }
}

impl PlayerConnection for MpvClient {
    fn get_property(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Value, IpcError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let request_id = inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = MpvRequest::get_property(name, request_id);
        async move { inner.request(request).await }
    }

    fn disconnect(&self) {
        debug!(endpoint = %self.inner.endpoint, "Disconnecting from player");
        for task in &self.inner.tasks {
            task.abort();
        }
        self.inner.shared.close();
    }
}

async fn read_loop<R>(
    reader: R,
    shared: Arc<Shared>,
    notify_tx: mpsc::UnboundedSender<PlayerNotification>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                handle_line(&line, &shared, &notify_tx);
            }
            Ok(None) => {
                debug!("Player closed the connection");
                break;
            }
            Err(e) => {
                warn!("Player connection read error: {}", e);
                break;
            }
        }
    }

    shared.close();
    let _ = notify_tx.send(PlayerNotification::Close);
}

fn handle_line(
    line: &str,
    shared: &Shared,
    notify_tx: &mpsc::UnboundedSender<PlayerNotification>,
) {
    let message = match MpvMessage::parse(line) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring malformed player message: {}", e);
            return;
        }
    };

    match message.classify() {
        Incoming::Reply { request_id, result } => match shared.take_pending(request_id) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => trace!(request_id, "Reply for abandoned request"),
        },
        Incoming::Notification(notification) => {
            trace!(kind = notification.notification_type(), "Player notification");
            // The tracker may already be gone; nothing to do then.
            let _ = notify_tx.send(notification);
        }
        Incoming::Ignored => {}
    }
}

async fn write_loop<W>(mut writer: W, mut outgoing: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outgoing.recv().await {
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = result {
            warn!("Player connection write error: {}", e);
            break;
        }
    }
}

/// Turn a named channel into a platform endpoint.
///
/// On Windows bare names become named pipes. Elsewhere anything containing
/// a path separator is used as-is and bare names live in the temp directory.
pub fn resolve_endpoint(channel: &str) -> String {
    if cfg!(windows) {
        if channel.starts_with(PIPE_PREFIX) {
            channel.to_string()
        } else {
            format!("{}{}", PIPE_PREFIX, channel)
        }
    } else if channel.contains('/') {
        channel.to_string()
    } else {
        std::env::temp_dir()
            .join(channel)
            .to_string_lossy()
            .into_owned()
    }
}

fn connect_error(endpoint: &str, e: std::io::Error) -> IpcError {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
            IpcError::PlayerNotRunning(endpoint.to_string())
        }
        _ => IpcError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        },
    }
}

#[cfg(unix)]
async fn open_stream(endpoint: &str) -> Result<tokio::net::UnixStream, IpcError> {
    tokio::net::UnixStream::connect(endpoint)
        .await
        .map_err(|e| connect_error(endpoint, e))
}

#[cfg(windows)]
async fn open_stream(
    endpoint: &str,
) -> Result<tokio::net::windows::named_pipe::NamedPipeClient, IpcError> {
    tokio::net::windows::named_pipe::ClientOptions::new()
        .open(endpoint)
        .map_err(|e| connect_error(endpoint, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn test_resolve_endpoint() {
        if cfg!(windows) {
            assert_eq!(resolve_endpoint("MPVControllPipe"), r"\\.\pipe\MPVControllPipe");
            assert_eq!(resolve_endpoint(r"\\.\pipe\x"), r"\\.\pipe\x");
        } else {
            assert_eq!(resolve_endpoint("/tmp/mpvsocket"), "/tmp/mpvsocket");
            let resolved = resolve_endpoint("MPVControllPipe");
            assert!(resolved.ends_with("MPVControllPipe"));
            assert!(resolved.contains('/'));
        }
    }

    #[tokio::test]
    async fn test_get_property_roundtrip() {
        let (client_side, server_side) = duplex(4096);
        let (client, _notifications) = MpvClient::from_stream(client_side, "test".to_string());

        let server = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server_side);
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["command"][1], "playback-time");
            let reply = serde_json::json!({
                "data": 42.5,
                "request_id": request["request_id"],
                "error": "success"
            });
            write
                .write_all(format!("{}\n", reply).as_bytes())
                .await
                .unwrap();
            // Keep the stream open until the client has read the reply.
            lines.next_line().await.ok();
        });

        let value = client.get_property("playback-time").await.unwrap();
        assert_eq!(value, serde_json::json!(42.5));
        client.disconnect();
        server.abort();
    }

    #[tokio::test]
    async fn test_notifications_and_close() {
        let (client_side, mut server_side) = duplex(4096);
        let (client, mut notifications) =
            MpvClient::from_stream(client_side, "test".to_string());

        server_side
            .write_all(b"{\"event\":\"seek\"}\n{\"event\":\"pause\"}\n")
            .await
            .unwrap();
        assert_eq!(notifications.recv().await, Some(PlayerNotification::Seek));

        drop(server_side);
        assert_eq!(notifications.recv().await, Some(PlayerNotification::Close));
        assert!(client.is_closed());
        assert!(matches!(
            client.get_property("playback-time").await,
            Err(IpcError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_aborted_request_releases_pending_entry() {
        let (client_side, server_side) = duplex(4096);
        let (client, _notifications) = MpvClient::from_stream(client_side, "test".to_string());
        let pending_len = || client.inner.shared.pending.lock().unwrap().len();

        let request = tokio::spawn(client.get_property("playback-time"));

        // Once the player has seen the request, its reply slot is registered.
        let (read, _write) = tokio::io::split(server_side);
        let mut lines = BufReader::new(read).lines();
        lines.next_line().await.unwrap().unwrap();
        assert_eq!(pending_len(), 1);

        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());
        assert_eq!(pending_len(), 0);
        assert!(!client.is_closed());
    }

    #[tokio::test]
    async fn test_pending_request_fails_on_close() {
        let (client_side, server_side) = duplex(4096);
        let (client, _notifications) = MpvClient::from_stream(client_side, "test".to_string());

        let request = client.get_property("playback-time");
        let closer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            drop(server_side);
        });

        assert!(matches!(request.await, Err(IpcError::ConnectionClosed)));
        closer.await.unwrap();
    }
}
