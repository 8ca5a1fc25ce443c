//! Communication session management
//!
//! This module defines the trait for tunneling messages between a session
//! and its connected clients, and the [`Session`] type that ties one game
//! to the connection registry: it serialises actions against the game,
//! broadcasts the resulting snapshots, and runs the question countdown.

use std::{future::Future, sync::Arc, time::Duration};

use log::{debug, info};
use thiserror::Error;
use tokio::{
    sync::Mutex,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::{
    constants::protocol::TICK_MILLIS,
    game::{Game, IncomingMessage, OutgoingMessage, Snapshot, Status},
    game_id::SessionCode,
    watcher::{ClientId, ConnectionId, Registry, Role},
};

/// Errors produced when a tunnel cannot deliver a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TunnelError {
    /// The client side of the tunnel is gone
    #[error("tunnel is closed")]
    Closed,
    /// The client is not keeping up and its outbound queue is full
    #[error("tunnel is full")]
    Full,
}

/// Trait for sending messages through a communication tunnel
///
/// This trait abstracts the communication mechanism used to send messages
/// to connected clients. Implementations might use WebSockets, Server-Sent
/// Events, or other real-time communication protocols. Tunnels are cloned
/// out of the registry before sending, so cloning must be cheap.
pub trait Tunnel: Clone + Send + Sync + 'static {
    /// Sends already serialized text to the client
    fn send_text(&self, text: Arc<str>) -> impl Future<Output = Result<(), TunnelError>> + Send;

    /// Serializes and sends a single message to the client
    fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> impl Future<Output = Result<(), TunnelError>> + Send {
        self.send_text(message.to_message().into())
    }

    /// Closes the communication tunnel
    ///
    /// This method should be called when the session is torn down while
    /// the client is still connected.
    fn close(self);
}

/// A live session: one game plus the connections watching it
///
/// All mutations go through the game lock, and each is followed by its
/// broadcast before the lock is released, so clients observe snapshots in
/// the order the actions were applied.
pub struct Session<T> {
    code: SessionCode,
    game: Mutex<Game>,
    registry: Arc<Registry<T>>,
}

impl<T: Tunnel> Session<T> {
    /// Wraps `game` so it can be driven by connections in `registry`
    pub fn new(game: Game, registry: Arc<Registry<T>>) -> Arc<Self> {
        Arc::new(Self {
            code: game.code(),
            game: Mutex::new(game),
            registry,
        })
    }

    /// The code clients use to reach this session
    pub fn code(&self) -> SessionCode {
        self.code
    }

    /// The current snapshot of the game
    pub async fn snapshot(&self) -> Snapshot {
        self.game.lock().await.state()
    }

    /// Registers a connection and sends it the current snapshot
    ///
    /// Both steps happen under the game lock, so every broadcast the new
    /// connection sees afterwards is newer than its initial snapshot.
    pub async fn attach(&self, client_id: ClientId, role: Role, tunnel: T) -> ConnectionId {
        let game = self.game.lock().await;
        let connection_id = self
            .registry
            .connect(self.code, client_id.clone(), role, tunnel.clone());

        if let Err(e) = tunnel
            .send_message(&OutgoingMessage::state(game.state()))
            .await
        {
            debug!("{}: initial state to {client_id} failed: {e}", self.code);
        }
        connection_id
    }

    /// Applies one client action and broadcasts the resulting snapshot
    ///
    /// Actions sent by the wrong role are ignored, but still answered with
    /// a broadcast like every other action.
    pub async fn handle(self: &Arc<Self>, client_id: &ClientId, role: Role, message: IncomingMessage) {
        let mut game = self.game.lock().await;

        let timer = match (role, message) {
            (Role::Host, IncomingMessage::StartGame) => game.start_game(),
            (Role::Host, IncomingMessage::NextQuestion) => game.next_question(),
            (Role::Host, IncomingMessage::SkipTimer) => {
                game.skip_timer();
                None
            }
            (Role::Host, IncomingMessage::Reset) => {
                game.reset_game();
                let removed = game.prune_participants(&self.registry.participant_ids(&self.code));
                if removed > 0 {
                    debug!("{}: pruned {removed} disconnected participants", self.code);
                }
                None
            }
            (Role::Participant, IncomingMessage::Join { name, color }) => {
                game.add_participant(client_id, name.as_deref(), color.as_deref());
                None
            }
            (Role::Participant, IncomingMessage::SubmitAnswer { answer_id }) => {
                game.submit_answer(client_id, answer_id);
                None
            }
            (
                Role::Host,
                message @ (IncomingMessage::Join { .. } | IncomingMessage::SubmitAnswer { .. }),
            )
            | (
                Role::Participant,
                message @ (IncomingMessage::StartGame
                | IncomingMessage::NextQuestion
                | IncomingMessage::SkipTimer
                | IncomingMessage::Reset),
            ) => {
                debug!("{}: {role:?} {client_id} may not send {message:?}", self.code);
                None
            }
        };

        if let Some(token) = timer {
            tokio::spawn(Arc::clone(self).run_timer(token));
        }

        self.registry
            .broadcast(&self.code, &OutgoingMessage::state(game.state()))
            .await;
    }

    /// Handles the last connection of a client going away
    ///
    /// A participant leaving the lobby is dropped from the roster unless
    /// another of its connections is still open. Once the game has started
    /// the roster entry is kept so the participant can reconnect.
    pub async fn on_disconnect(&self, client_id: &ClientId, role: Role) {
        if role != Role::Participant
            || self.registry.is_participant_connected(&self.code, client_id)
        {
            return;
        }

        let mut game = self.game.lock().await;
        if game.status() == Status::Waiting && game.remove_participant(client_id) {
            debug!("{}: {client_id} left the lobby", self.code);
            self.registry
                .broadcast(&self.code, &OutgoingMessage::state(game.state()))
                .await;
        }
    }

    /// Counts the open question down once per tick until it closes
    ///
    /// Every decrement is broadcast as a tick. When the countdown reaches
    /// zero the question is closed, scored and the new snapshot broadcast.
    /// The loop exits silently as soon as `token` is cancelled, which
    /// happens whenever a newer countdown starts or the game leaves the
    /// question by other means.
    pub async fn run_timer(self: Arc<Self>, token: CancellationToken) {
        let period = Duration::from_millis(TICK_MILLIS);
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            {
                let mut game = self.game.lock().await;
                if token.is_cancelled() {
                    return;
                }
                if game.time_remaining() == 0 {
                    if game.finish_question() {
                        debug!("{}: countdown expired", self.code);
                        self.registry
                            .broadcast(&self.code, &OutgoingMessage::state(game.state()))
                            .await;
                    }
                    return;
                }
            }

            tokio::select! {
                () = token.cancelled() => return,
                _ = interval.tick() => {}
            }

            let mut game = self.game.lock().await;
            if token.is_cancelled() {
                return;
            }
            let Some(time_remaining) = game.tick() else {
                return;
            };
            self.registry
                .broadcast(&self.code, &OutgoingMessage::Tick { time_remaining })
                .await;
        }
    }

    /// Stops any running countdown ahead of the session being dropped
    pub async fn shutdown(&self) {
        let mut game = self.game.lock().await;
        game.stop_timer();
        info!("{}: session shut down", self.code);
    }
}
