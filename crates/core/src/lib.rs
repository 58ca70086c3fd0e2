//! buzzer-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Protokoll, Session und
//! Server gemeinsam nutzen.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, SessionError};
pub use types::{ConnectionId, ParticipantId, Role};
