//! TCP connection to the debuggee's V8 debugger agent.
//!
//! Each front-end session owns one [`DebuggeeConnection`].  It is the
//! production [`WireClient`]: requests are written with the next sequence
//! number and parked in a pending map until the reader task sees the
//! response whose `request_seq` matches.
//!
//! # Streaming protocol
//!
//! TCP is a *stream* protocol: one `read()` may return part of a frame or
//! several frames at once.  The reader accumulates bytes and calls
//! [`decode_frame`] in a loop until `InsufficientData` says it needs more.
//!
//! # Lifecycle
//!
//! ```text
//! connect()  ── TCP connect ── read `Type: connect` handshake
//!            ── spawn reader ── `version` probe (learns `running`)
//! request()  ── write frame ── await oneshot keyed by seq
//! close()    ── abort reader ── fail every pending request with Closed
//! ```
//!
//! Events (`break`, `exception`, `afterCompile`) and the loss of the
//! connection are forwarded to the session as [`BackendNotice`]s.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use inspector_core::protocol::{
    decode_frame, encode_request, CodecError, SequenceCounter, WireEvent, WireMessage,
    WireRequest, WireResponse,
};

use crate::application::ports::{WireClient, WireError};

/// How long the debuggee gets to send its handshake after the TCP connect.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Something the debuggee did that nobody asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendNotice {
    Event(WireEvent),
    /// The debuggee closed the connection (or it broke).  Not sent for an
    /// explicit [`WireClient::close`].
    Closed { reason: String },
}

type PendingReply = oneshot::Sender<Result<Value, WireError>>;

/// State shared between the connection handle and its reader task.
#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<u64, PendingReply>>,
    running: AtomicBool,
    seq: SequenceCounter,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, PendingReply>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn complete(&self, response: WireResponse) {
        if let Some(running) = response.running {
            self.running.store(running, Ordering::SeqCst);
        }
        let Some(reply) = self.pending().remove(&response.request_seq) else {
            debug!(request_seq = response.request_seq, "response for unknown request");
            return;
        };
        let result = if response.success {
            Ok(response.body.unwrap_or(Value::Null))
        } else {
            Err(WireError::rejected(
                response.message.unwrap_or_else(|| "request failed".to_string()),
            ))
        };
        // The requester may have gone away; nothing to do then.
        let _ = reply.send(result);
    }

    fn fail_all(&self) {
        for (_, reply) in self.pending().drain() {
            let _ = reply.send(Err(WireError::Closed));
        }
    }
}

type Writer = Arc<tokio::sync::Mutex<OwnedWriteHalf>>;

/// An open link: the write half plus the task reading the other half.
struct Link {
    writer: Writer,
    reader_task: JoinHandle<()>,
    /// Cleared before pending requests are failed, by whichever side ends
    /// the link first.
    alive: Arc<AtomicBool>,
}

impl Link {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// A [`WireClient`] over a TCP connection to the debuggee.
pub struct DebuggeeConnection {
    addr: SocketAddr,
    session_id: String,
    notices: mpsc::UnboundedSender<BackendNotice>,
    link: tokio::sync::Mutex<Option<Link>>,
    shared: Arc<Shared>,
}

impl DebuggeeConnection {
    /// Creates an unconnected handle.  Nothing touches the network until
    /// [`WireClient::connect`].
    pub fn new(
        addr: SocketAddr,
        session_id: impl Into<String>,
        notices: mpsc::UnboundedSender<BackendNotice>,
    ) -> Self {
        Self {
            addr,
            session_id: session_id.into(),
            notices,
            link: tokio::sync::Mutex::new(None),
            shared: Arc::new(Shared::default()),
        }
    }

    async fn writer(&self) -> Result<(Writer, Arc<AtomicBool>), WireError> {
        match &*self.link.lock().await {
            Some(link) if link.is_alive() => Ok((Arc::clone(&link.writer), Arc::clone(&link.alive))),
            Some(_) => Err(WireError::Closed),
            None => Err(WireError::NotConnected),
        }
    }
}

#[async_trait]
impl WireClient for DebuggeeConnection {
    async fn connect(&self) -> Result<(), WireError> {
        {
            let mut link = self.link.lock().await;
            if link.as_ref().is_some_and(Link::is_alive) {
                return Ok(());
            }

            let stream = TcpStream::connect(self.addr)
                .await
                .map_err(|e| WireError::Transport(format!("cannot connect to {}: {e}", self.addr)))?;
            let (mut read_half, write_half) = stream.into_split();

            let mut recv_buf = Vec::with_capacity(4096);
            let version = timeout(HANDSHAKE_TIMEOUT, read_handshake(&mut read_half, &mut recv_buf))
                .await
                .map_err(|_| WireError::Transport("debuggee sent no handshake".to_string()))??;
            info!(
                "session {}: attached to debuggee at {} (V8 {})",
                self.session_id,
                self.addr,
                version.as_deref().unwrap_or("unknown")
            );

            let alive = Arc::new(AtomicBool::new(true));
            let reader_task = tokio::spawn(read_backend_frames(
                read_half,
                recv_buf,
                ReaderContext {
                    shared: Arc::clone(&self.shared),
                    alive: Arc::clone(&alive),
                    notices: self.notices.clone(),
                    session_id: self.session_id.clone(),
                },
            ));
            *link = Some(Link {
                writer: Arc::new(tokio::sync::Mutex::new(write_half)),
                reader_task,
                alive,
            });
        }

        // The probe's response carries the initial `running` flag.
        self.request("version", None).await?;
        Ok(())
    }

    async fn close(&self) {
        let link = self.link.lock().await.take();
        if let Some(link) = link {
            link.alive.store(false, Ordering::SeqCst);
            link.reader_task.abort();
            let _ = link.writer.lock().await.shutdown().await;
            debug!("session {}: debuggee connection closed", self.session_id);
        }
        self.shared.fail_all();
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    async fn request(&self, command: &str, arguments: Option<Value>) -> Result<Value, WireError> {
        let (writer, alive) = self.writer().await?;

        let seq = self.shared.seq.next();
        let bytes = encode_request(&WireRequest::new(seq, command, arguments))
            .map_err(|e| WireError::Malformed(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending().insert(seq, tx);
        if !alive.load(Ordering::SeqCst) {
            // The link went down before the request was parked; nobody is
            // left to fail it.
            self.shared.pending().remove(&seq);
            return Err(WireError::Closed);
        }

        if let Err(e) = writer.lock().await.write_all(&bytes).await {
            self.shared.pending().remove(&seq);
            return Err(WireError::Transport(format!("write failed: {e}")));
        }
        debug!(seq, command, "request sent");

        rx.await.unwrap_or(Err(WireError::Closed))
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Reads until the handshake frame has arrived and removes it from `buf`.
///
/// Returns the `V8-Version` header if present.  Bytes after the handshake
/// stay in `buf` for the reader task.
async fn read_handshake(
    read_half: &mut OwnedReadHalf,
    buf: &mut Vec<u8>,
) -> Result<Option<String>, WireError> {
    let mut read_tmp = vec![0u8; 4096];
    loop {
        match decode_frame(buf) {
            Ok((frame, consumed)) => {
                if !frame.is_handshake() {
                    return Err(WireError::Malformed(
                        "first frame from debuggee is not a handshake".to_string(),
                    ));
                }
                buf.drain(..consumed);
                return Ok(frame.header("V8-Version").map(str::to_string));
            }
            Err(CodecError::InsufficientData { .. }) => {}
            Err(e) => return Err(WireError::Malformed(e.to_string())),
        }

        match read_half.read(&mut read_tmp).await {
            Ok(0) => return Err(WireError::Closed),
            Ok(n) => buf.extend_from_slice(&read_tmp[..n]),
            Err(e) => return Err(WireError::Transport(e.to_string())),
        }
    }
}

struct ReaderContext {
    shared: Arc<Shared>,
    alive: Arc<AtomicBool>,
    notices: mpsc::UnboundedSender<BackendNotice>,
    session_id: String,
}

/// Reads frames until the debuggee goes away, completing pending requests
/// and forwarding events.
async fn read_backend_frames(mut read_half: OwnedReadHalf, mut recv_buf: Vec<u8>, ctx: ReaderContext) {
    let ReaderContext {
        shared,
        alive,
        notices,
        session_id,
    } = ctx;
    let mut read_tmp = vec![0u8; 4096];

    let reason = 'read: loop {
        loop {
            match decode_frame(&recv_buf) {
                Ok((frame, consumed)) => {
                    recv_buf.drain(..consumed);
                    match frame.message() {
                        Ok(Some(WireMessage::Response(response))) => shared.complete(response),
                        Ok(Some(WireMessage::Event(event))) => {
                            if matches!(event.event.as_str(), "break" | "exception") {
                                shared.running.store(false, Ordering::SeqCst);
                            }
                            debug!("session {session_id}: debuggee event `{}`", event.event);
                            if notices.send(BackendNotice::Event(event)).is_err() {
                                break 'read "session ended".to_string();
                            }
                        }
                        Ok(Some(WireMessage::Request(request))) => {
                            debug!("session {session_id}: ignoring request `{}` from debuggee", request.command);
                        }
                        Ok(None) => {}
                        Err(e) => warn!("session {session_id}: undecodable frame body: {e}"),
                    }
                }
                Err(CodecError::InsufficientData { .. }) => break,
                Err(e) => {
                    warn!("session {session_id}: corrupt stream from debuggee: {e}");
                    break 'read format!("protocol error: {e}");
                }
            }
        }

        match read_half.read(&mut read_tmp).await {
            Ok(0) => break "debuggee closed the connection".to_string(),
            Ok(n) => recv_buf.extend_from_slice(&read_tmp[..n]),
            Err(e) => break format!("read failed: {e}"),
        }
    };

    info!("session {session_id}: debuggee link down: {reason}");
    alive.store(false, Ordering::SeqCst);
    shared.fail_all();
    let _ = notices.send(BackendNotice::Closed { reason });
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_core::protocol::codec::encode_message;
    use serde_json::json;
    use tokio::net::TcpListener;

    const HANDSHAKE: &[u8] =
        b"Type: connect\r\nV8-Version: 3.28.71.19\r\nProtocol-Version: 1\r\nContent-Length: 0\r\n\r\n";

    fn response(request: &WireRequest, success: bool, body: Value) -> Vec<u8> {
        let message = WireMessage::Response(WireResponse {
            seq: 100 + request.seq,
            request_seq: request.seq,
            command: Some(request.command.clone()),
            success,
            message: (!success).then(|| "boom".to_string()),
            body: Some(body),
            running: Some(request.command != "suspend"),
        });
        encode_message(&message).unwrap()
    }

    /// A debuggee that answers every request with `{"echo": command}`, fails
    /// `fail`, and hangs up after `hang_up_after` requests.
    async fn fake_debuggee(hang_up_after: usize) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(HANDSHAKE).await.unwrap();
            let mut buf = Vec::new();
            let mut tmp = [0u8; 1024];
            let mut served = 0;
            while served < hang_up_after {
                let n = stream.read(&mut tmp).await.unwrap();
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&tmp[..n]);
                while let Ok((frame, consumed)) = decode_frame(&buf) {
                    buf.drain(..consumed);
                    let Ok(Some(WireMessage::Request(req))) = frame.message() else { continue };
                    let ok = req.command != "fail";
                    let bytes = response(&req, ok, json!({ "echo": req.command }));
                    stream.write_all(&bytes).await.unwrap();
                    served += 1;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_request_before_connect_is_not_connected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new("127.0.0.1:9".parse().unwrap(), "t", tx);

        assert_eq!(conn.request("version", None).await, Err(WireError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_probes_version_and_routes_responses() {
        // Arrange
        let addr = fake_debuggee(10).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);

        // Act
        conn.connect().await.unwrap();
        let body = conn.request("scripts", Some(json!({"types": 4}))).await.unwrap();

        // Assert
        assert_eq!(body, json!({"echo": "scripts"}));
        assert!(conn.is_running());
    }

    #[tokio::test]
    async fn test_connect_twice_is_a_no_op() {
        let addr = fake_debuggee(10).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);

        conn.connect().await.unwrap();
        conn.connect().await.unwrap();

        // The fake serves one accept; a second connect would time out on the handshake.
        assert!(conn.request("suspend", None).await.is_ok());
        assert!(!conn.is_running());
    }

    #[tokio::test]
    async fn test_rejection_carries_backend_message() {
        let addr = fake_debuggee(10).await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);
        conn.connect().await.unwrap();

        let result = conn.request("fail", None).await;

        assert_eq!(result, Err(WireError::rejected("boom")));
    }

    #[tokio::test]
    async fn test_backend_hang_up_sends_closed_notice_and_fails_requests() {
        // Arrange: the debuggee serves only the version probe
        let addr = fake_debuggee(1).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);
        conn.connect().await.unwrap();

        // Act
        let notice = rx.recv().await.unwrap();
        let result = conn.request("scripts", None).await;

        // Assert
        assert!(matches!(notice, BackendNotice::Closed { .. }));
        assert_eq!(result, Err(WireError::Closed));
    }

    #[tokio::test]
    async fn test_oversized_frame_takes_link_down() {
        // Arrange: answer the version probe with an absurd Content-Length
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(HANDSHAKE).await.unwrap();
            let mut tmp = [0u8; 1024];
            let _ = stream.read(&mut tmp).await.unwrap();
            stream
                .write_all(b"Content-Length: 18446744073709551615\r\n\r\n{}")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);

        // Act
        let result = conn.connect().await;
        let notice = rx.recv().await.unwrap();

        // Assert
        assert_eq!(result, Err(WireError::Closed));
        let BackendNotice::Closed { reason } = notice else {
            panic!("expected a closed notice, got {notice:?}");
        };
        assert!(reason.starts_with("protocol error"), "{reason}");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_sends_no_notice() {
        let addr = fake_debuggee(10).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);
        conn.connect().await.unwrap();

        conn.close().await;
        conn.close().await;

        assert_eq!(conn.request("version", None).await, Err(WireError::NotConnected));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = DebuggeeConnection::new(addr, "t", tx);

        let result = conn.connect().await;

        assert!(matches!(result, Err(WireError::Transport(_))));
    }
}
