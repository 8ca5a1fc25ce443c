//! Registry of live sessions keyed by session code

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use derive_where::derive_where;
use log::{debug, info};
use thiserror::Error;

use super::{
    constants::session_code::MAX_ATTEMPTS,
    game::Game,
    game_id::SessionCode,
    quiz::config::Quiz,
    session::{Session, Tunnel},
    settings::Settings,
    watcher::{ClientId, ConnectionId, Registry, Role},
};

/// Errors produced by the directory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No free session code was found
    #[error("could not allocate a free session code")]
    CodesExhausted,
}

/// Owns every live session and the connection registry they share
#[derive_where(Default)]
pub struct Directory<T> {
    sessions: DashMap<SessionCode, Arc<Session<T>>>,
    registry: Arc<Registry<T>>,
}

impl<T: Tunnel> Directory<T> {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection registry shared by all sessions
    pub fn registry(&self) -> &Arc<Registry<T>> {
        &self.registry
    }

    /// Starts a new session in the lobby and returns its code
    ///
    /// # Errors
    ///
    /// Returns [`Error::CodesExhausted`] if every attempted code is taken.
    pub fn create(&self, quiz: Quiz, settings: Settings) -> Result<SessionCode, Error> {
        for _ in 0..MAX_ATTEMPTS {
            let code = SessionCode::new();
            if let Entry::Vacant(entry) = self.sessions.entry(code) {
                let title = quiz.title.clone();
                entry.insert(Session::new(
                    Game::new(code, quiz, settings),
                    Arc::clone(&self.registry),
                ));
                info!("{code}: session created for \"{title}\"");
                return Ok(code);
            }
        }
        Err(Error::CodesExhausted)
    }

    /// Looks up a live session
    pub fn get(&self, code: &SessionCode) -> Option<Arc<Session<T>>> {
        self.sessions.get(code).map(|session| Arc::clone(&session))
    }

    /// Attaches a connection to the session `code`
    ///
    /// Returns the session together with the new connection, or `None` if
    /// there is no such session. A session deleted while the connection
    /// was being attached counts as missing, and the connection is
    /// unregistered again.
    pub async fn connect(
        &self,
        code: &SessionCode,
        client_id: ClientId,
        role: Role,
        tunnel: T,
    ) -> Option<(Arc<Session<T>>, ConnectionId)> {
        let session = self.get(code)?;
        let connection_id = session.attach(client_id, role, tunnel).await;
        self.confirm(code, connection_id)
            .then_some((session, connection_id))
    }

    /// Checks that `code` is still live after `connection_id` was registered
    ///
    /// [`Directory::delete`] removes the session before dropping its
    /// connections, so a connection registered before that point is torn
    /// down by the delete and one registered after it is removed here.
    fn confirm(&self, code: &SessionCode, connection_id: ConnectionId) -> bool {
        if self.sessions.contains_key(code) {
            return true;
        }
        debug!("{code}: session deleted while {connection_id} was connecting");
        self.registry.disconnect(code, connection_id);
        self.registry.remove_if_empty(code);
        false
    }

    /// Tears a session down, returning whether it existed
    ///
    /// The countdown is stopped and every connection of the session is
    /// closed and forgotten.
    pub async fn delete(&self, code: &SessionCode) -> bool {
        let Some((_, session)) = self.sessions.remove(code) else {
            return false;
        };
        session.shutdown().await;
        self.registry.remove_session(code);
        info!("{code}: session deleted");
        true
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no live sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
