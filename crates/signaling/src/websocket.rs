//! WebSocket-Transport – Axum-Routen fuer Clients
//!
//! `GET /ws` wird zu einer WebSocket-Verbindung hochgestuft, jede
//! Verbindung laeuft in einem eigenen Task (`connection`). `GET /` liefert
//! eine kurze Info mit dem aktuellen Session-Zustand.

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::watch;

use crate::connection::{verbindung_verarbeiten, VerbindungsEinstellungen};
use crate::runtime::SessionHandle;
use crate::session::SessionStatus;

/// Gemeinsamer Zustand aller Transport-Handler
#[derive(Clone)]
pub struct TransportState {
    pub session: SessionHandle,
    /// Queue-Groesse, Ping-Intervall und Timeout pro Verbindung
    pub verbindung: VerbindungsEinstellungen,
    pub shutdown_rx: watch::Receiver<bool>,
    /// Anzeigename des Dienstes
    pub name: String,
}

/// Antwort von `GET /`
#[derive(Debug, Serialize)]
pub struct InfoAntwort {
    pub name: String,
    pub version: &'static str,
    /// `None` wenn die Session nicht mehr laeuft
    pub session: Option<SessionStatus>,
}

pub fn router(state: TransportState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/", get(info_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<TransportState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        verbindung_verarbeiten(socket, state.session, state.verbindung, state.shutdown_rx)
    })
}

async fn info_handler(State(state): State<TransportState>) -> Json<InfoAntwort> {
    Json(InfoAntwort {
        name: state.name,
        version: env!("CARGO_PKG_VERSION"),
        session: state.session.status().await,
    })
}
