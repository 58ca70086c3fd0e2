//! Gemeinsame Identifikationstypen fuer den Buzzer
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Teilnehmer-Identitaet (vom Client vergeben) und Verbindungs-ID
//! (vom Server vergeben) zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identitaet eines Teilnehmers
///
/// Wird vom Client beim Join mitgebracht (`playerId`) und ist waehrend
/// der Lebenszeit des Teilnehmers eindeutig.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eindeutige ID einer Transport-Verbindung (WebSocket)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Rolle eines Teilnehmers, nach dem Join unveraenderlich
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
}

impl Role {
    pub fn ist_host(self) -> bool {
        matches!(self, Role::Host)
    }

    /// Label fuer Logs und Metriken
    pub fn als_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Player => "player",
        }
    }
}
