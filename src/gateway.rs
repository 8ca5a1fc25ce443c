//! HTTP and WebSocket surface of the server
//!
//! Sessions are created and deleted over plain HTTP. Clients then connect
//! to `/ws/{code}/{client_id}`; the client ID `host` marks the host, any
//! other value a participant. Each socket is split into a reader, which
//! feeds actions to the session, and a writer task fed by the connection's
//! [`WsTunnel`].

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use garde::Validate;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::mpsc::{self, error::TrySendError},
};

use super::{
    constants::protocol::{OUTBOUND_QUEUE_CAPACITY, SESSION_NOT_FOUND_CODE, SESSION_NOT_FOUND_REASON},
    directory::{self, Directory},
    game::IncomingMessage,
    game_id::SessionCode,
    quiz::config::Quiz,
    session::{Tunnel, TunnelError},
    settings::Settings,
    watcher::ClientId,
};

/// Shared state of every handler
pub type AppState = Arc<Directory<WsTunnel>>;

/// Errors returned by the HTTP endpoints
#[derive(Error, Debug)]
pub enum Error {
    /// No live session has the requested code
    #[error("session not found")]
    NotFound,
    /// The quiz failed validation
    #[error("invalid quiz: {0}")]
    InvalidQuiz(String),
    /// The settings failed validation
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    /// The session could not be created
    #[error(transparent)]
    Directory(#[from] directory::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidQuiz(_) | Self::InvalidSettings(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Directory(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Something the writer task should put on the socket
#[derive(Debug)]
enum Frame {
    Text(Arc<str>),
    Close,
}

/// Tunnel backed by the writer task of one WebSocket connection
///
/// Sending only queues the frame, so a slow client never holds up a
/// broadcast to the rest of its session. Once a client falls
/// [`OUTBOUND_QUEUE_CAPACITY`] frames behind, further frames are dropped
/// until it catches up.
#[derive(Debug, Clone)]
pub struct WsTunnel {
    sender: mpsc::Sender<Frame>,
}

impl WsTunnel {
    /// Creates a tunnel and the receiving end its writer task drains
    fn channel() -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (Self { sender }, receiver)
    }
}

impl Tunnel for WsTunnel {
    fn send_text(&self, text: Arc<str>) -> impl Future<Output = Result<(), TunnelError>> + Send {
        std::future::ready(self.sender.try_send(Frame::Text(text)).map_err(|e| match e {
            TrySendError::Full(_) => TunnelError::Full,
            TrySendError::Closed(_) => TunnelError::Closed,
        }))
    }

    fn close(self) {
        // Closed or stalled writers are left to end on their own.
        let _ = self.sender.try_send(Frame::Close);
    }
}

fn not_found_frame() -> CloseFrame {
    CloseFrame {
        code: SESSION_NOT_FOUND_CODE,
        reason: Utf8Bytes::from_static(SESSION_NOT_FOUND_REASON),
    }
}

/// Body of `POST /sessions`
#[derive(Debug, Deserialize)]
pub struct CreateSession {
    /// The quiz to play
    pub quiz: Quiz,
    /// Session settings; defaults apply when omitted
    #[serde(default)]
    pub settings: Settings,
}

/// Response of `POST /sessions`
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    /// Code clients connect with
    pub code: SessionCode,
}

/// Builds the router with all routes
pub fn router(directory: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route(
            "/sessions/{code}",
            get(session_state).delete(delete_session),
        )
        .route("/ws/{code}/{client_id}", get(ws_handler))
        .with_state(directory)
}

/// Binds `address` and serves until Ctrl-C
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(address: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(AppState::default()))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health(State(directory): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": directory.len(),
    }))
}

async fn create_session(
    State(directory): State<AppState>,
    Json(request): Json<CreateSession>,
) -> Result<(StatusCode, Json<Created>), Error> {
    request
        .quiz
        .validate()
        .map_err(|report| Error::InvalidQuiz(report.to_string()))?;
    request
        .settings
        .validate()
        .map_err(|report| Error::InvalidSettings(report.to_string()))?;

    let code = directory.create(request.quiz, request.settings)?;
    Ok((StatusCode::CREATED, Json(Created { code })))
}

async fn session_state(
    State(directory): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let session = code
        .parse::<SessionCode>()
        .ok()
        .and_then(|code| directory.get(&code))
        .ok_or(Error::NotFound)?;
    Ok(Json(session.snapshot().await))
}

async fn delete_session(
    State(directory): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, Error> {
    let code = code.parse::<SessionCode>().map_err(|_| Error::NotFound)?;
    if directory.delete(&code).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound)
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(directory): State<AppState>,
    Path((code, client_id)): Path<(String, String)>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, directory, code, ClientId::from(client_id)))
}

/// Drives one WebSocket connection until either side closes it
async fn handle_socket(socket: WebSocket, directory: AppState, code: String, client_id: ClientId) {
    let Ok(code) = code.parse::<SessionCode>() else {
        info!("rejecting {client_id}: no session {code}");
        reject(socket, &client_id).await;
        return;
    };

    let role = client_id.role();
    let (mut sink, mut stream) = socket.split();
    let (tunnel, mut receiver) = WsTunnel::channel();

    // Writer task: ends once every tunnel clone is dropped or a close is requested
    tokio::spawn(async move {
        while let Some(frame) = receiver.recv().await {
            let message = match frame {
                Frame::Text(text) => Message::Text(text.to_string().into()),
                Frame::Close => {
                    let _ = sink.send(Message::Close(Some(not_found_frame()))).await;
                    break;
                }
            };
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let Some((session, connection_id)) = directory
        .connect(&code, client_id.clone(), role, tunnel.clone())
        .await
    else {
        info!("rejecting {client_id}: no session {code}");
        tunnel.close();
        return;
    };
    drop(tunnel);
    info!("{code}: {role:?} {client_id} connected");

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<IncomingMessage>(text.as_str()) {
                Ok(message) => session.handle(&client_id, role, message).await,
                Err(e) => debug!("{code}: ignoring message from {client_id}: {e}"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    directory.registry().disconnect(&code, connection_id);
    session.on_disconnect(&client_id, role).await;
    info!("{code}: {role:?} {client_id} disconnected");
}

/// Closes a socket that asked for an unknown session
async fn reject(mut socket: WebSocket, client_id: &ClientId) {
    if let Err(e) = socket.send(Message::Close(Some(not_found_frame()))).await {
        debug!("failed to close socket of {client_id}: {e}");
    }
}
