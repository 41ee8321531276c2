//! TCP accept loop, per-connection reader/writer tasks, and the tick
//! scheduler that paces the started game.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::{sleep, timeout_at, Instant};

use shared::{Layout, Message, STALL_TIMEOUT};

use crate::registry::{ConnectionRegistry, SlotId};
use crate::session::{Session, SessionPhase};

/// Events delivered from the accept and reader tasks to the session loop.
#[derive(Debug)]
pub enum ServerEvent {
    Accepted {
        stream: TcpStream,
        addr: SocketAddr,
    },
    /// A decoded non-batched line from a connection.
    Immediate {
        slot: SlotId,
        message: Message,
    },
    Disconnected {
        slot: SlotId,
    },
}

/// The server: listener, shared registry, session state, and the event
/// channel everything funnels into.
pub struct Server {
    listener: Arc<TcpListener>,
    registry: Arc<RwLock<ConnectionRegistry>>,
    /// Pinged whenever a connection reports a batch or goes away, waking the
    /// tick barrier to re-check.
    reports: Arc<Notify>,
    session: Session,
    tick_interval: Duration,
    advertised: String,

    server_tx: mpsc::UnboundedSender<ServerEvent>,
    server_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        tick_interval: Duration,
        capacity: usize,
        layout: Layout,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = Arc::new(TcpListener::bind(addr).await?);
        let advertised = listener.local_addr()?.to_string();
        info!("listening on {}", advertised);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            registry: Arc::new(RwLock::new(ConnectionRegistry::new(capacity))),
            reports: Arc::new(Notify::new()),
            session: Session::new(layout, capacity),
            tick_interval,
            advertised,
            server_tx,
            server_rx,
        })
    }

    /// The address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> &str {
        &self.advertised
    }

    /// Runs the session to completion: lobby, started game, and shutdown
    /// once the last connection has left.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor();

        loop {
            while let Ok(event) = self.server_rx.try_recv() {
                self.handle_event(event).await;
            }

            let empty = self.registry.read().await.is_empty();
            if self.session.phase() == SessionPhase::Ended && empty {
                break;
            }

            if self.session.phase() == SessionPhase::Started && !empty {
                self.run_tick().await;
            } else {
                match self.server_rx.recv().await {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                }
            }
        }

        info!("session over, shutting down");
        Ok(())
    }

    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if server_tx
                            .send(ServerEvent::Accepted { stream, addr })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("accept failed: {}", e);
                        sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    async fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Accepted { stream, addr } => self.handle_accept(stream, addr).await,
            ServerEvent::Immediate { slot, message } => self.handle_immediate(slot, message).await,
            ServerEvent::Disconnected { slot } => self.handle_disconnect(slot).await,
        }
    }

    async fn handle_accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        if !self.session.can_accept() {
            info!("rejecting connection from {}", addr);
            reject(stream);
            return;
        }

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let slot = match self.registry.write().await.add(line_tx) {
            Some(slot) => slot,
            None => {
                reject(stream);
                return;
            }
        };
        self.session.connection_opened(slot);

        let (read_half, write_half) = stream.into_split();
        spawn_writer(slot, write_half, line_rx);
        spawn_reader(
            slot,
            read_half,
            Arc::clone(&self.registry),
            Arc::clone(&self.reports),
            self.server_tx.clone(),
        );

        let greeting = Message::ServerIp {
            addr: self.advertised.clone(),
        };
        self.registry.read().await.send_to(slot, &greeting.encode());
        info!("connection {} accepted from {}", slot, addr);
    }

    async fn handle_immediate(&mut self, slot: SlotId, message: Message) {
        match message {
            Message::NewPlayer(record) => {
                info!("player '{}' joined on connection {}", record.name, slot);
                let snapshot = self.session.player_joined(slot, record.clone());
                let registry = self.registry.read().await;
                registry.send_to(slot, &Message::AllPlayers(snapshot).encode());
                registry.broadcast(&Message::NewPlayer(record).encode(), Some(slot));
            }
            Message::StartGame => {
                if self.session.try_start() {
                    self.registry
                        .read()
                        .await
                        .broadcast(&Message::StartGame.encode(), None);
                }
            }
            other => {
                warn!("unexpected message from connection {}: {:?}", slot, other);
            }
        }
    }

    async fn handle_disconnect(&mut self, slot: SlotId) {
        let remaining = self.registry.read().await.len();
        if let Some(index) = self.session.connection_closed(slot, remaining) {
            info!("connection {} left (player index {})", slot, index);
            if remaining > 0 {
                self.registry
                    .read()
                    .await
                    .broadcast(&Message::PlayerLeft { index }.encode(), None);
            }
        }
    }

    /// One tick: wait for every connection to report (dropping the ones that
    /// stall), hold the minimum tick period, apply the drained batches in
    /// wire order, and close with the end-of-update marker.
    async fn run_tick(&mut self) {
        let tick_start = Instant::now();

        for slot in self.wait_for_reports().await {
            warn!("connection {} stalled past the report deadline", slot);
            self.drop_stalled(slot).await;
        }

        let elapsed = tick_start.elapsed();
        if elapsed < self.tick_interval {
            sleep(self.tick_interval - elapsed).await;
        }

        let drained = self.registry.write().await.drain_all();
        for (slot, actions) in drained {
            for action in actions {
                if let Some(echo) = self.session.apply_action(slot, &action) {
                    // Everyone gets the validated outcome, the originator
                    // included: its mirror applies its own accepted actions
                    // the same way peers do.
                    self.registry.read().await.broadcast(&echo.encode(), None);
                }
            }
        }
        self.session.advance_world();

        self.registry
            .read()
            .await
            .broadcast(&Message::EndPlayerUpdate.encode(), None);
        debug!("tick complete in {:?}", tick_start.elapsed());
    }

    /// Blocks until every live connection has reported this tick's batch, or
    /// until the stall deadline passes. Returns the slots still silent at
    /// the deadline. A connection that disconnects mid-wait pings the same
    /// notifier, so the barrier re-checks rather than waiting on the dead.
    async fn wait_for_reports(&self) -> Vec<SlotId> {
        let deadline = Instant::now() + STALL_TIMEOUT;
        loop {
            // Arm the notification before checking so a report landing
            // between the check and the await is not lost.
            let notified = self.reports.notified();
            {
                let registry = self.registry.read().await;
                if registry.is_empty() || registry.all_reported() {
                    return Vec::new();
                }
            }
            if timeout_at(deadline, notified).await.is_err() {
                return self.registry.read().await.unreported_slots();
            }
        }
    }

    /// Removes a stalled connection. Its reader task notices the missing
    /// registry entry on its next line and shuts itself down.
    async fn drop_stalled(&mut self, slot: SlotId) {
        if self.registry.write().await.remove(slot).is_none() {
            return;
        }
        let remaining = self.registry.read().await.len();
        if let Some(index) = self.session.connection_closed(slot, remaining) {
            self.registry
                .read()
                .await
                .broadcast(&Message::PlayerLeft { index }.encode(), None);
        }
    }
}

/// Sends the rejection line and closes the stream, off the session loop.
fn reject(mut stream: TcpStream) {
    tokio::spawn(async move {
        let line = format!("{}\n", Message::Rejected.encode());
        let _ = stream.write_all(line.as_bytes()).await;
        let _ = stream.shutdown().await;
    });
}

/// Writer task: drains the connection's outbound channel in order. Ends when
/// the channel closes (connection removed) or the peer stops accepting
/// writes; dropping the write half closes the socket.
fn spawn_writer(slot: SlotId, mut write_half: OwnedWriteHalf, mut line_rx: mpsc::UnboundedReceiver<String>) {
    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err()
                || write_half.write_all(b"\n").await.is_err()
            {
                debug!("write to connection {} failed", slot);
                break;
            }
        }
    });
}

/// Reader task: decodes lines, merges batched updates into the registry, and
/// forwards everything else to the session loop. Runs until EOF, an I/O
/// error, or the scheduler has dropped the connection.
fn spawn_reader(
    slot: SlotId,
    read_half: OwnedReadHalf,
    registry: Arc<RwLock<ConnectionRegistry>>,
    reports: Arc<Notify>,
    server_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match Message::decode(line.trim_end()) {
                    Ok(Message::PlayerUpdate(actions)) => {
                        let mut registry = registry.write().await;
                        match registry.connection_mut(slot) {
                            Some(connection) => connection.merge_actions(actions),
                            None => break,
                        }
                        drop(registry);
                        reports.notify_waiters();
                    }
                    Ok(message) => {
                        if server_tx
                            .send(ServerEvent::Immediate { slot, message })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("ignoring malformed line from connection {}: {}", slot, e);
                    }
                },
                Ok(None) => {
                    debug!("connection {} closed by peer", slot);
                    break;
                }
                Err(e) => {
                    debug!("read from connection {} failed: {}", slot, e);
                    break;
                }
            }
        }

        let removed = registry.write().await.remove(slot).is_some();
        reports.notify_waiters();
        if removed {
            let _ = server_tx.send(ServerEvent::Disconnected { slot });
        }
    });
}
