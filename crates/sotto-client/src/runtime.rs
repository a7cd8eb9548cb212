//! The connection task.
//!
//! One tokio task owns all of it: the core state machine, the control link,
//! the UDP socket, the reconciliation tick, and the reconnect timer. Facade
//! calls arrive as [`Command`]s; transport tasks report in over channels.
//! Nothing else touches a socket, which is what makes the teardown and
//! reconnect paths single-threaded and race-free.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sotto_core::{Client, ClientAction, ClientEvent};
use sotto_proto::{ControlMessage, ProtocolError};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::audio::AudioOutput;
use crate::client::{ClientConfig, ConnectionInfo};
use crate::error::TransportError;
use crate::transport::{self, LinkEvent};
use crate::udp;

/// Delay before the first dial attempt.
const INITIAL_DIAL_DELAY: Duration = Duration::from_millis(50);

/// Fixed delay between reconnect attempts. Intentionally not exponential:
/// the expected failure mode is intermittent unreachability, not overload.
const REDIAL_DELAY: Duration = Duration::from_millis(2500);

/// Reconciliation tick period; also the initial delay after activation.
const TICK_PERIOD: Duration = Duration::from_millis(500);

/// Requests from the facade to the connection task.
pub(crate) enum Command {
    /// Arm the state machine towards a server.
    Connect {
        /// `host:port` to dial.
        address: String,
        /// Username to authenticate with.
        username: String,
        /// Resolved once the server sync completes.
        done: oneshot::Sender<ConnectionInfo>,
    },
    /// Tear the connection down.
    Disconnect {
        /// Resolved once the socket has closed.
        done: oneshot::Sender<()>,
    },
    /// Forward an event (desired-state mutation or voice) to the core.
    Event(ClientEvent),
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Idle,
    Connecting,
    TlsHandshaking,
    Active,
    Failed,
}

/// Millisecond wall clock fed to the core with every event.
fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

pub(crate) struct Runtime {
    core: Arc<Mutex<Client>>,
    info: Arc<Mutex<ConnectionInfo>>,
    config: ClientConfig,
    output: Arc<dyn AudioOutput>,
    positions: crossbeam_channel::Sender<(u32, [f32; 3])>,

    commands: mpsc::UnboundedReceiver<Command>,
    link_events: mpsc::Receiver<(u64, LinkEvent)>,
    link_events_tx: mpsc::Sender<(u64, LinkEvent)>,
    datagrams: mpsc::Receiver<Vec<u8>>,

    udp: Arc<UdpSocket>,
    udp_task: JoinHandle<()>,

    state: ConnState,
    address: Option<(String, u16)>,
    server_addr: Option<SocketAddr>,
    writer: Option<mpsc::Sender<Vec<u8>>>,
    link_tasks: Vec<JoinHandle<()>>,
    link_gen: u64,
    dial_at: Option<Instant>,
    tick: tokio::time::Interval,

    pending_connect: Option<oneshot::Sender<ConnectionInfo>>,
    pending_disconnects: Vec<oneshot::Sender<()>>,
}

impl Runtime {
    /// Build the runtime and spawn its task plus the UDP receiver.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime (the UDP socket registers
    /// with the reactor).
    pub(crate) fn spawn(
        config: ClientConfig,
        core: Arc<Mutex<Client>>,
        info: Arc<Mutex<ConnectionInfo>>,
        output: Arc<dyn AudioOutput>,
        positions: crossbeam_channel::Sender<(u32, [f32; 3])>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> std::io::Result<JoinHandle<()>> {
        let udp = udp::bind_voice_socket()?;
        let (datagrams_tx, datagrams) = mpsc::channel(256);
        let udp_task = udp::spawn_receiver(udp.clone(), datagrams_tx);

        let (link_events_tx, link_events) = mpsc::channel(64);

        let mut tick = tokio::time::interval(TICK_PERIOD);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let runtime = Self {
            core,
            info,
            config,
            output,
            positions,
            commands,
            link_events,
            link_events_tx,
            datagrams,
            udp,
            udp_task,
            state: ConnState::Idle,
            address: None,
            server_addr: None,
            writer: None,
            link_tasks: Vec::new(),
            link_gen: 0,
            dial_at: None,
            tick,
            pending_connect: None,
            pending_disconnects: Vec::new(),
        };

        Ok(tokio::spawn(runtime.run()))
    }

    async fn run(mut self) {
        loop {
            let dial_at = self.dial_at;
            let dial_timer = async move {
                match dial_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    self.on_command(command);
                }
                Some((generation, event)) = self.link_events.recv() => {
                    if generation == self.link_gen {
                        self.on_link_event(event);
                    }
                }
                Some(datagram) = self.datagrams.recv() => {
                    self.feed(ClientEvent::Datagram { data: datagram, now_ms: now_ms() });
                }
                _ = self.tick.tick(), if self.state == ConnState::Active => {
                    self.feed(ClientEvent::Tick { now_ms: now_ms() });
                }
                () = dial_timer, if dial_at.is_some() => {
                    self.dial_at = None;
                    self.dial().await;
                }
            }
        }

        // Facade dropped: tear everything down.
        self.teardown_link();
        self.udp_task.abort();
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect { address, username, done } => {
                let Some((host, port)) = parse_address(&address) else {
                    warn!(%address, "connect refused: invalid address");
                    drop(done);
                    return;
                };

                {
                    let mut info = lock(&self.info);
                    info.address = address;
                    info.username.clone_from(&username);
                }

                self.address = Some((host, port));
                self.pending_connect = Some(done);
                self.feed(ClientEvent::ConnectRequested { username });
                self.dial_at = Some(Instant::now() + INITIAL_DIAL_DELAY);
            }
            Command::Disconnect { done } => {
                self.dial_at = None;
                self.address = None;
                self.server_addr = None;

                if self.writer.is_some() {
                    // Dropping the writer sends close-notify; the link
                    // reports closed and resolves the handle.
                    self.writer = None;
                    self.pending_disconnects.push(done);
                } else {
                    let _ = done.send(());
                }

                self.feed(ClientEvent::ConnectionLost);
                self.state = ConnState::Idle;
                *lock(&self.info) = ConnectionInfo::default();
            }
            Command::Event(event) => self.feed(event),
        }
    }

    async fn dial(&mut self) {
        let Some((host, port)) = self.address.clone() else {
            return;
        };
        if lock(&self.info).is_connecting {
            return;
        }

        self.teardown_link();
        self.state = ConnState::Connecting;
        lock(&self.info).is_connecting = true;

        match self.try_dial(&host, port).await {
            Ok(()) => {
                self.state = ConnState::Active;
                {
                    let mut info = lock(&self.info);
                    info.is_connecting = false;
                    info.is_connected = true;
                }

                // The reconciler must not run before activation; restart
                // the interval so the first tick lands a full period out.
                self.tick = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
                self.tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

                self.feed(ClientEvent::TlsActivated { now_ms: now_ms() });
            }
            Err(e) => {
                debug!(%e, %host, port, "dial failed");
                self.state = ConnState::Failed;
                {
                    let mut info = lock(&self.info);
                    info.is_connecting = false;
                    info.is_connected = false;
                }
                self.dial_at = Some(Instant::now() + REDIAL_DELAY);
            }
        }
    }

    async fn try_dial(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| TransportError::Connection(format!("resolve {host}:{port}: {e}")))?
            .next()
            .ok_or_else(|| TransportError::Connection(format!("no addresses for {host}")))?;

        self.state = ConnState::TlsHandshaking;
        let mode = self.config.tls_mode;
        let server_name = self.config.server_name.clone();

        let tls = tokio::time::timeout(
            self.config.connect_timeout,
            transport::connect_tls(host, addr, mode, server_name.as_deref()),
        )
        .await
        .map_err(|_| {
            TransportError::Connection(format!(
                "timed out after {:?}",
                self.config.connect_timeout
            ))
        })??;

        self.link_gen += 1;
        let (writer, tasks) = transport::spawn_link(tls, self.link_gen, self.link_events_tx.clone());
        self.writer = Some(writer);
        self.link_tasks = tasks;

        // Voice goes to the same endpoint the control channel dialed.
        self.server_addr = Some(addr);

        Ok(())
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Frame(frame) => match ControlMessage::decode(frame.ty, frame.payload) {
                Ok(message) => self.feed(ClientEvent::Control { message, now_ms: now_ms() }),
                Err(ProtocolError::UnknownType(ty)) => {
                    trace!(ty, "skipping unhandled control message");
                }
                Err(e) => {
                    warn!(%e, ty = frame.ty, "dropping connection on malformed control message");
                    self.fail_link();
                }
            },
            LinkEvent::Closed(reason) => {
                if self.state == ConnState::Idle {
                    // Requested disconnect completed.
                    debug!(%reason, "link closed after disconnect");
                    self.teardown_link();
                    for done in self.pending_disconnects.drain(..) {
                        let _ = done.send(());
                    }
                } else {
                    debug!(%reason, "link lost");
                    self.fail_link();
                }
            }
        }
    }

    /// Drop the current link and schedule a redial.
    fn fail_link(&mut self) {
        self.teardown_link();
        self.state = ConnState::Failed;
        self.feed(ClientEvent::ConnectionLost);

        {
            let mut info = lock(&self.info);
            info.is_connecting = false;
            info.is_connected = false;
        }

        if self.address.is_some() {
            info!("reconnecting in {REDIAL_DELAY:?}");
            self.dial_at = Some(Instant::now() + REDIAL_DELAY);
        }
    }

    fn teardown_link(&mut self) {
        self.writer = None;
        for task in self.link_tasks.drain(..) {
            task.abort();
        }
    }

    /// Feed one event to the core and execute the resulting actions. The
    /// lock is held only across the pure state transition, never across
    /// I/O.
    fn feed(&mut self, event: ClientEvent) {
        let actions = {
            let mut core = lock(&self.core);
            core.handle(event)
        };

        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: ClientAction) {
        match action {
            ClientAction::SendControl(message) => {
                if let Some(writer) = &self.writer {
                    if writer.try_send(message.encode_frame()).is_err() {
                        warn!("control queue full, dropping outbound message");
                    }
                }
            }
            ClientAction::SendDatagram(data) => {
                if let Some(target) = self.server_addr {
                    udp::send_datagram(&self.udp, target, &data);
                }
            }
            ClientAction::VoiceFrame { user, sequence, payload, terminator } => {
                self.output.on_voice(&user, sequence, &payload, terminator);
            }
            ClientAction::Position { session, position } => {
                let _ = self.positions.send((session, position));
            }
            ClientAction::Distance { user, distance } => {
                self.output.on_distance(&user, distance);
            }
            ClientAction::Synced { session } => {
                debug!(session, "connection complete");
                if let Some(done) = self.pending_connect.take() {
                    let _ = done.send(lock(&self.info).clone());
                }
            }
            ClientAction::Reconnect => self.fail_link(),
        }
    }
}

/// Lock helper that survives poisoning; state stays usable because every
/// mutation is a small atomic step.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Split `host:port` / `[v6]:port` into host and port.
pub(crate) fn parse_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let (host, port) = rest.split_once("]:")?;
        (host, port)
    } else {
        address.rsplit_once(':')?
    };

    if host.is_empty() {
        return None;
    }

    Some((host.to_string(), port.parse().ok()?))
}
