//! Gateway client
//!
//! One tokio task owns the whole session: the socket, the compression
//! context, the heartbeat timer, and the state machine. Socket frames,
//! heartbeat ticks, and external commands are serialized through a
//! single `select!`, so no field is ever raced. Reconnection is an
//! explicit loop transition guarded by one cancellable delay.

use crate::compression::Inflater;
use crate::protocol::{
    is_resumable_close, GatewayMessage, IdentifyPayload, OpCode, ResumePayload,
};
use crate::session::{SessionState, SessionStatus};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parley_common::ClientConfig;
use parley_core::{EventSink, Notice};
use parley_rest::RestDispatcher;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant as TokioInstant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Protocol version negotiated in the connection URL
const GATEWAY_VERSION: u8 = 10;

/// Close code telling the server we intend to resume
const RESUME_CLOSE_CODE: u16 = 4000;

/// Close code for a final, non-resumable teardown
const FINAL_CLOSE_CODE: u16 = 1000;

/// Close code used when a zombie connection is force-closed
const ZOMBIE_CLOSE_CODE: u16 = 4009;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// External commands accepted by the session task
enum Command {
    Disconnect { resume: bool },
}

/// What to do after the current step
enum Flow {
    Continue,
    Reconnect,
    Shutdown,
}

/// Why a connection ended
enum ConnectionOutcome {
    Reconnect,
    Shutdown,
}

/// Observation surface shared with [`GatewayHandle`]
#[derive(Debug)]
struct SharedStatus {
    status: parking_lot::RwLock<SessionStatus>,
    /// Millisecond latency; `u64::MAX` while unknown
    latency_ms: AtomicU64,
}

impl SharedStatus {
    fn new() -> Self {
        Self {
            status: parking_lot::RwLock::new(SessionStatus::Idle),
            latency_ms: AtomicU64::new(u64::MAX),
        }
    }

    fn set_latency(&self, latency: Option<Duration>) {
        let ms = latency.map_or(u64::MAX, |l| l.as_millis() as u64);
        self.latency_ms.store(ms, Ordering::Relaxed);
    }
}

/// Handle to a running gateway session
///
/// The session reconnects on its own forever; only [`disconnect`]
/// stops the cycle.
///
/// [`disconnect`]: GatewayHandle::disconnect
pub struct GatewayHandle {
    shared: Arc<SharedStatus>,
    cmd_tx: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl GatewayHandle {
    /// Current lifecycle status
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.shared.status.read()
    }

    /// Round-trip time of the most recently acknowledged heartbeat
    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        match self.shared.latency_ms.load(Ordering::Relaxed) {
            u64::MAX => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Tear the session down
    ///
    /// `resume: true` closes with a code that keeps the session
    /// resumable server-side; `false` ends it for good and clears the
    /// stored identity.
    pub async fn disconnect(&self, resume: bool) {
        let _ = self.cmd_tx.send(Command::Disconnect { resume }).await;
    }

    /// Wait for the session task to finish
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// The gateway session task
pub struct GatewayClient {
    config: ClientConfig,
    rest: RestDispatcher,
    sink: Arc<dyn EventSink>,
    state: SessionState,
    shared: Arc<SharedStatus>,
    cmd_rx: mpsc::Receiver<Command>,
}

impl GatewayClient {
    /// Spawn the session task and return its handle
    ///
    /// The task immediately starts connecting: it discovers the gateway
    /// URL through the REST dispatcher (unless a resume URL is stored),
    /// opens the socket, and drives the opcode state machine until
    /// [`GatewayHandle::disconnect`] is called.
    #[must_use]
    pub fn spawn(
        config: ClientConfig,
        rest: RestDispatcher,
        sink: Arc<dyn EventSink>,
    ) -> GatewayHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let shared = Arc::new(SharedStatus::new());

        let client = Self {
            config,
            rest,
            sink,
            state: SessionState::new(),
            shared: Arc::clone(&shared),
            cmd_rx,
        };
        let task = tokio::spawn(client.run());

        GatewayHandle {
            shared,
            cmd_tx,
            task,
        }
    }

    async fn run(mut self) {
        loop {
            match self.run_connection().await {
                ConnectionOutcome::Shutdown => break,
                ConnectionOutcome::Reconnect => {
                    self.set_status(SessionStatus::Disconnected);
                    self.set_status(SessionStatus::Reconnecting);

                    let delay = self.config.reconnect_delay;
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "Reconnecting after delay");

                    // A single cancellable wait: disconnect() lands here
                    // instead of racing a timer callback.
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        cmd = self.cmd_rx.recv() => {
                            if let Some(Command::Disconnect { resume: false }) = cmd {
                                self.state.clear_identity();
                            }
                            break;
                        }
                    }
                }
            }
        }

        self.set_status(SessionStatus::Disconnected);
        tracing::info!("Gateway session terminated");
    }

    /// Drive one socket from connect to close
    async fn run_connection(&mut self) -> ConnectionOutcome {
        self.state.reset_connection();
        self.shared.set_latency(None);
        self.set_status(SessionStatus::Connecting);

        let base_url = match self.state.resume_url() {
            Some(url) => url.to_string(),
            None => match self.rest.get_gateway().await {
                Ok(info) => info.url,
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to discover gateway URL");
                    self.sink
                        .on_notice(Notice::warning(format!("gateway discovery failed: {err}")))
                        .await;
                    return ConnectionOutcome::Reconnect;
                }
            },
        };

        let url = format!(
            "{}/?v={GATEWAY_VERSION}&encoding=json&compress=zlib-stream",
            base_url.trim_end_matches('/')
        );
        tracing::debug!(url = %url, "Connecting to gateway");

        let (ws, _response) = match connect_async(&url).await {
            Ok(pair) => pair,
            Err(err) => {
                // A connect attempt that dies before a socket exists is
                // treated exactly like a closed socket.
                tracing::warn!(error = %err, "Gateway connection failed");
                return ConnectionOutcome::Reconnect;
            }
        };

        self.set_status(SessionStatus::Handshaking);
        tracing::debug!("Connection opened; waiting for HELLO");

        let (mut ws_tx, mut ws_rx) = ws.split();
        // Decompressor state does not survive a socket replacement
        let mut inflater = Inflater::new();
        let mut heartbeat: Option<Interval> = None;

        loop {
            let flow = tokio::select! {
                frame = ws_rx.next() => match frame {
                    Some(Ok(message)) => {
                        self.handle_frame(&mut ws_tx, &mut heartbeat, &mut inflater, message)
                            .await
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "WebSocket transport error");
                        Flow::Reconnect
                    }
                    None => {
                        tracing::debug!("WebSocket stream ended");
                        Flow::Reconnect
                    }
                },
                Some(()) = heartbeat_tick(&mut heartbeat) => {
                    self.send_heartbeat(&mut ws_tx, false).await
                }
                cmd = self.cmd_rx.recv() => {
                    let resume = match cmd {
                        Some(Command::Disconnect { resume }) => resume,
                        // Handle dropped: stop without touching identity
                        None => true,
                    };
                    tracing::debug!(resume, "Disconnecting on external request");
                    let code = if resume { RESUME_CLOSE_CODE } else { FINAL_CLOSE_CODE };
                    let _ = ws_tx
                        .send(Message::Close(Some(CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: "client disconnect".into(),
                        })))
                        .await;
                    if !resume {
                        self.state.clear_identity();
                    }
                    Flow::Shutdown
                }
            };

            match flow {
                Flow::Continue => {}
                Flow::Reconnect => return ConnectionOutcome::Reconnect,
                Flow::Shutdown => return ConnectionOutcome::Shutdown,
            }
        }
    }

    /// Decode one WebSocket frame into protocol handling
    async fn handle_frame(
        &mut self,
        ws_tx: &mut WsSink,
        heartbeat: &mut Option<Interval>,
        inflater: &mut Inflater,
        message: Message,
    ) -> Flow {
        match message {
            Message::Text(text) => self.handle_text(ws_tx, heartbeat, &text).await,
            Message::Binary(data) => match inflater.feed(&data) {
                Ok(Some(text)) => self.handle_text(ws_tx, heartbeat, &text).await,
                Ok(None) => {
                    tracing::debug!("Empty decompression result; skipping frame");
                    Flow::Continue
                }
                Err(err) => {
                    // One corrupt frame must not kill the connection
                    tracing::warn!(error = %err, "Dropping undecompressable frame");
                    self.sink
                        .on_notice(Notice::warning(format!("dropped frame: {err}")))
                        .await;
                    Flow::Continue
                }
            },
            Message::Close(frame) => self.handle_close(frame.as_ref()),
            Message::Ping(_) | Message::Pong(_) => Flow::Continue,
            Message::Frame(_) => Flow::Continue,
        }
    }

    async fn handle_text(
        &mut self,
        ws_tx: &mut WsSink,
        heartbeat: &mut Option<Interval>,
        text: &str,
    ) -> Flow {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to parse gateway frame; dropping it");
                self.sink
                    .on_notice(Notice::warning(format!("unparseable frame: {err}")))
                    .await;
                return Flow::Continue;
            }
        };

        self.handle_packet(ws_tx, heartbeat, message).await
    }

    async fn handle_packet(
        &mut self,
        ws_tx: &mut WsSink,
        heartbeat: &mut Option<Interval>,
        message: GatewayMessage,
    ) -> Flow {
        self.state.observe_sequence(message.s);

        let Some(op) = message.opcode() else {
            tracing::debug!(op = message.op, "Received unknown opcode");
            return Flow::Continue;
        };

        match op {
            OpCode::Hello => {
                let Some(hello) = message.as_hello() else {
                    tracing::warn!("HELLO carried no heartbeat interval; dropping it");
                    return Flow::Continue;
                };
                // A zero period would panic the timer
                let interval = Duration::from_millis(hello.heartbeat_interval.max(1));
                tracing::debug!(
                    heartbeat_interval_ms = hello.heartbeat_interval,
                    "Received HELLO"
                );

                self.state.heartbeat_interval = Some(interval);
                self.state.ack_pending = false;
                *heartbeat = Some(start_heartbeat(interval));

                self.identify_or_resume(ws_tx).await
            }

            OpCode::HeartbeatAck => {
                self.state.note_heartbeat_ack(Instant::now());
                self.shared.set_latency(self.state.latency);
                tracing::trace!(
                    latency_ms = self.state.latency.map_or(0, |l| l.as_millis() as u64),
                    "Received heartbeat ACK"
                );
                Flow::Continue
            }

            // Server asked for an immediate heartbeat, out of band
            OpCode::Heartbeat => self.send_heartbeat(ws_tx, true).await,

            OpCode::Dispatch => {
                self.handle_dispatch(message).await;
                Flow::Continue
            }

            OpCode::InvalidSession => {
                let resumable = message.invalid_session_resumable();
                tracing::warn!(resumable, "Session invalidated by server");

                if resumable {
                    // Back off briefly, then re-identify on this socket
                    let delay =
                        Duration::from_millis(rand::thread_rng().gen_range(1_000..5_000));
                    tokio::time::sleep(delay).await;
                    self.send_identify(ws_tx).await
                } else {
                    self.state.clear_identity();
                    Flow::Reconnect
                }
            }

            OpCode::Reconnect => {
                tracing::warn!("Server requested reconnect");
                Flow::Reconnect
            }

            OpCode::Identify | OpCode::Resume => {
                tracing::debug!(op = %op, "Ignoring client-only opcode from server");
                Flow::Continue
            }
        }
    }

    async fn handle_dispatch(&mut self, message: GatewayMessage) {
        let Some((event, sequence, data)) = message.into_dispatch() else {
            tracing::warn!("DISPATCH frame without event type; dropping it");
            return;
        };

        // READY is intercepted to capture session identity before the
        // event is forwarded like any other.
        if event == "READY" {
            let session_id = data
                .get("session_id")
                .and_then(serde_json::Value::as_str)
                .map(String::from);
            let resume_url = data
                .get("resume_gateway_url")
                .and_then(serde_json::Value::as_str)
                .map(String::from);

            tracing::info!(
                session_id = session_id.as_deref().unwrap_or("<none>"),
                "Session ready"
            );
            self.state.record_ready(session_id, resume_url);
            self.set_status(SessionStatus::Ready);
        }

        self.sink
            .on_dispatch(&event, sequence.unwrap_or(0), data)
            .await;
    }

    fn handle_close(&mut self, frame: Option<&CloseFrame<'_>>) -> Flow {
        let code = frame.map_or(1006, |f| u16::from(f.code));
        let resumable = is_resumable_close(code);
        tracing::debug!(code, resumable, "Socket closed by server");

        if !resumable {
            tracing::debug!("Session is not resumable; clearing identity");
            self.state.clear_identity();
        }
        Flow::Reconnect
    }

    async fn identify_or_resume(&mut self, ws_tx: &mut WsSink) -> Flow {
        if self.state.can_resume() {
            self.send_resume(ws_tx).await
        } else {
            self.send_identify(ws_tx).await
        }
    }

    async fn send_identify(&mut self, ws_tx: &mut WsSink) -> Flow {
        self.set_status(SessionStatus::Identifying);
        tracing::debug!("Sending IDENTIFY");

        let payload = IdentifyPayload::new(self.config.token.clone(), self.config.intents);
        self.deliver(ws_tx, OpCode::Identify, GatewayMessage::identify(&payload))
            .await
    }

    async fn send_resume(&mut self, ws_tx: &mut WsSink) -> Flow {
        let Some(session_id) = self.state.session_id().map(String::from) else {
            return self.send_identify(ws_tx).await;
        };

        self.set_status(SessionStatus::Resuming);
        tracing::debug!(
            session_id = %session_id,
            sequence = ?self.state.sequence,
            "Attempting to RESUME session"
        );

        let payload = ResumePayload {
            token: self.config.token.clone(),
            session_id,
            seq: self.state.sequence,
        };
        self.deliver(ws_tx, OpCode::Resume, GatewayMessage::resume(&payload))
            .await
    }

    async fn send_heartbeat(&mut self, ws_tx: &mut WsSink, ignore_pending: bool) -> Flow {
        if !ignore_pending && self.state.ack_pending {
            // Zombie connection: the previous heartbeat was never ACKed.
            // The pending heartbeat is not sent.
            tracing::warn!("Heartbeat ACK missing; closing zombie connection");
            let _ = ws_tx
                .send(Message::Close(Some(CloseFrame {
                    code: WsCloseCode::from(ZOMBIE_CLOSE_CODE),
                    reason: "heartbeat ack timeout".into(),
                })))
                .await;
            return Flow::Reconnect;
        }

        tracing::trace!(sequence = ?self.state.sequence, "Sending heartbeat");
        let flow = self
            .deliver(
                ws_tx,
                OpCode::Heartbeat,
                GatewayMessage::heartbeat(self.state.sequence),
            )
            .await;
        if matches!(flow, Flow::Continue) {
            self.state.note_heartbeat_sent(Instant::now());
        }
        flow
    }

    /// Send a payload, enforcing the status/opcode legality table
    async fn deliver(&mut self, ws_tx: &mut WsSink, op: OpCode, message: GatewayMessage) -> Flow {
        if !self.state.status.may_send(op) {
            tracing::warn!(
                status = %self.state.status,
                op = %op,
                "Dropping payload that is illegal in the current status"
            );
            return Flow::Continue;
        }

        let json = match message.to_json() {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize payload; dropping it");
                return Flow::Continue;
            }
        };

        match ws_tx.send(Message::Text(json)).await {
            Ok(()) => Flow::Continue,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to send payload");
                Flow::Reconnect
            }
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.state.status = status;
        *self.shared.status.write() = status;
    }
}

/// Schedule heartbeats: first tick after a random jitter in
/// `[0, interval)`, then every `interval`. The jitter keeps a fleet of
/// clients from heartbeating in lockstep.
fn start_heartbeat(interval: Duration) -> Interval {
    let jitter = interval.mul_f64(rand::random::<f64>());
    let mut timer = interval_at(TokioInstant::now() + jitter, interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Await the next heartbeat tick, if a timer is armed
async fn heartbeat_tick(heartbeat: &mut Option<Interval>) -> Option<()> {
    match heartbeat.as_mut() {
        Some(interval) => {
            interval.tick().await;
            Some(())
        }
        None => None,
    }
}
