//! buzzer-signaling – Session-Koordinator und WebSocket-Transport
//!
//! Dieser Crate implementiert die Quiz-Session: Teilnehmer-Registry,
//! Buzz-Queue, Befehlsausfuehrung und die Verteilung der abgeleiteten
//! Ansichten an Hosts.
//!
//! ## Architektur
//!
//! ```text
//! Axum-Router (/ws, /)
//!     |
//!     v
//! verbindung_verarbeiten (pro Verbindung ein Task)
//!     |  SessionEreignis ueber mpsc
//!     v
//! SessionRuntime (genau ein Task, besitzt die Session)
//!     |
//!     +-- MessageDispatcher  (join, buzz, reset, start, ...)
//!     +-- LivenessMonitor    (raeumt geschlossene Verbindungen ab)
//!
//! ParticipantRegistry – Wer ist da, mit welcher Rolle und Punktzahl
//! BuzzQueue           – Reihenfolge der Buzzes
//! EventBroadcaster    – Spieleranzahl und Rangliste an alle Hosts
//! ```

pub mod broadcast;
pub mod buzz_queue;
pub mod connection;
pub mod dispatcher;
pub mod liveness;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod websocket;

// Bequeme Re-Exporte
pub use broadcast::{ClientSender, EventBroadcaster};
pub use buzz_queue::BuzzQueue;
pub use connection::VerbindungsEinstellungen;
pub use dispatcher::MessageDispatcher;
pub use liveness::LivenessMonitor;
pub use registry::{Participant, ParticipantRegistry};
pub use runtime::{session_starten, SessionEreignis, SessionHandle};
pub use session::{Abgangsursache, Session, SessionStatus};
pub use websocket::{router, TransportState};
