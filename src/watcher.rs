//! Connection bookkeeping for live sessions
//!
//! This module tracks which connections are open for each session, which
//! of them belongs to the host, and which belongs to each participant. It
//! owns no game state: it only knows how to reach the clients of a session
//! and how to fan a message out to all of them.

use std::{collections::HashMap, fmt::Display, sync::Arc};

use dashmap::DashMap;
use derive_where::derive_where;
use futures::future::join_all;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{game::OutgoingMessage, game_id::SessionCode, session::Tunnel};
use crate::constants::protocol::HOST_CLIENT_ID;

/// The opaque identifier a client presents when connecting
///
/// Participants choose their own identifier (usually a random string kept
/// in local storage) so that a reconnect maps back onto the same roster
/// entry. The identifier `host` is reserved for the host.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ClientId(String);

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl ClientId {
    /// The role this identifier connects as
    pub fn role(&self) -> Role {
        if self.0 == HOST_CLIENT_ID {
            Role::Host
        } else {
            Role::Participant
        }
    }
}

/// Identifies one physical connection
///
/// A client may hold several connections at once (a reconnect racing the
/// close of the old socket, or two tabs), so connections are tracked
/// separately from client identifiers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The side of the game a connection is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Drives the game: starts it, advances questions, skips timers, resets
    Host,
    /// Joins the roster and answers questions
    Participant,
}

/// A single registered connection
#[derive(Debug, Clone)]
struct Connection<T> {
    client_id: ClientId,
    tunnel: T,
}

/// Connections belonging to one session
#[derive(Debug)]
#[derive_where(Default)]
pub struct Watchers<T> {
    /// Every live connection of the session
    connections: HashMap<ConnectionId, Connection<T>>,
    /// The most recent connection of each participant
    participants: HashMap<ClientId, ConnectionId>,
    /// The most recent host connection
    host: Option<ConnectionId>,
}

impl<T: Tunnel> Watchers<T> {
    /// Registers a connection
    ///
    /// A second host connection replaces the host reference without
    /// closing the first one; the same holds for a participant reconnecting
    /// under the same client ID.
    pub fn add_watcher(&mut self, client_id: ClientId, role: Role, tunnel: T) -> ConnectionId {
        let connection_id = ConnectionId::new();
        match role {
            Role::Host => {
                self.host = Some(connection_id);
            }
            Role::Participant => {
                self.participants.insert(client_id.clone(), connection_id);
            }
        }
        self.connections.insert(connection_id, Connection { client_id, tunnel });
        connection_id
    }

    /// Removes a connection, returning whether it was registered
    ///
    /// Host and participant references are only cleared when they still
    /// point at this connection, so a late close of a replaced socket
    /// cannot unregister its successor.
    pub fn remove_watcher(&mut self, connection_id: ConnectionId) -> bool {
        let Some(connection) = self.connections.remove(&connection_id) else {
            return false;
        };

        if self.host == Some(connection_id) {
            self.host = None;
        }
        if self.participants.get(&connection.client_id) == Some(&connection_id) {
            self.participants.remove(&connection.client_id);
        }
        true
    }

    /// Clones out every live tunnel so it can be used without holding the registry
    fn tunnels(&self) -> Vec<(ConnectionId, T)> {
        self.connections
            .iter()
            .map(|(id, connection)| (*id, connection.tunnel.clone()))
            .collect()
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Whether a host connection is registered
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// Whether `client_id` has a live participant connection
    pub fn has_participant(&self, client_id: &ClientId) -> bool {
        self.participants.contains_key(client_id)
    }

    /// Client IDs of every participant with a live connection
    pub fn participant_ids(&self) -> impl Iterator<Item = &ClientId> {
        self.participants.keys()
    }
}

/// Process-wide connection registry keyed by session code
///
/// Entries are created lazily by the first connection to a session and
/// removed only when the session itself is deleted.
#[derive_where(Default)]
pub struct Registry<T> {
    sessions: DashMap<SessionCode, Watchers<T>>,
}

impl<T: Tunnel> Registry<T> {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for `code`
    pub fn connect(
        &self,
        code: SessionCode,
        client_id: ClientId,
        role: Role,
        tunnel: T,
    ) -> ConnectionId {
        let connection_id = self
            .sessions
            .entry(code)
            .or_default()
            .add_watcher(client_id.clone(), role, tunnel);
        debug!("{code}: {role:?} {client_id} connected as {connection_id}");
        connection_id
    }

    /// Unregisters a connection; unknown sessions and connections are ignored
    pub fn disconnect(&self, code: &SessionCode, connection_id: ConnectionId) {
        if let Some(mut watchers) = self.sessions.get_mut(code) {
            if watchers.remove_watcher(connection_id) {
                debug!("{code}: connection {connection_id} disconnected");
            }
        }
    }

    /// Forgets the entry of `code` if it holds no connections
    pub fn remove_if_empty(&self, code: &SessionCode) {
        self.sessions.remove_if(code, |_, watchers| watchers.is_empty());
    }

    /// Sends `message` to every connection of `code` concurrently
    ///
    /// Membership is snapshotted before any send starts, so connections
    /// joining or leaving mid-broadcast do not disturb delivery. A failed
    /// send is logged and skipped; the connection stays registered until
    /// its own disconnect is handled. Returns the number of successful sends.
    pub async fn broadcast(&self, code: &SessionCode, message: &OutgoingMessage) -> usize {
        let tunnels = match self.sessions.get(code) {
            Some(watchers) => watchers.tunnels(),
            None => return 0,
        };
        if tunnels.is_empty() {
            return 0;
        }

        let text: Arc<str> = message.to_message().into();
        let results = join_all(
            tunnels
                .iter()
                .map(|(_, tunnel)| tunnel.send_text(Arc::clone(&text))),
        )
        .await;

        let mut delivered = 0;
        for ((connection_id, _), result) in tunnels.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => debug!("{code}: send to {connection_id} failed: {e}"),
            }
        }
        delivered
    }

    /// Client IDs of every participant currently connected to `code`
    pub fn participant_ids(&self, code: &SessionCode) -> Vec<ClientId> {
        self.sessions
            .get(code)
            .map(|watchers| watchers.participant_ids().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `client_id` still has a live participant connection to `code`
    pub fn is_participant_connected(&self, code: &SessionCode, client_id: &ClientId) -> bool {
        self.sessions
            .get(code)
            .is_some_and(|watchers| watchers.has_participant(client_id))
    }

    /// Whether a host is connected to `code`
    pub fn has_host(&self, code: &SessionCode) -> bool {
        self.sessions.get(code).is_some_and(|watchers| watchers.has_host())
    }

    /// Number of live connections to `code`
    pub fn connection_count(&self, code: &SessionCode) -> usize {
        self.sessions.get(code).map_or(0, |watchers| watchers.len())
    }

    /// Drops every connection of `code` and closes their tunnels
    pub fn remove_session(&self, code: &SessionCode) {
        let Some((_, watchers)) = self.sessions.remove(code) else {
            return;
        };
        for (_, tunnel) in watchers.tunnels() {
            tunnel.close();
        }
    }
}
