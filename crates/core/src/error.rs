//! Fehlertypen fuer die Buzzer-Session
//!
//! Kein Fehler ist fatal fuer den Prozess. Jeder Fehler bleibt auf die
//! ausloesende Verbindung beschraenkt und wird dort als `error`-Nachricht
//! mit dem Display-Text gemeldet.

use thiserror::Error;

use crate::types::ParticipantId;

/// Result-Alias fuer Session-Operationen
pub type Result<T> = std::result::Result<T, SessionError>;

/// Alle Fehler die ein Client durch einen Befehl ausloesen kann
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Join mit einer bereits registrierten Identitaet
    #[error("Spieler {name} existiert bereits")]
    DuplicateIdentity { id: ParticipantId, name: String },

    /// Nicht-leeres Host-Geheimnis, das nicht passt
    #[error("Ungueltiger Zugangsschluessel")]
    InvalidCredential,

    /// Unbekannter Nachrichtentyp
    #[error("Unbekannter Nachrichtentyp: {0}")]
    UnknownCommand(String),

    /// Umschlag oder Payload nicht dekodierbar
    #[error("Ungueltiges Nachrichtenformat: {0}")]
    MalformedEnvelope(String),

    /// Positionsabfrage fuer eine Identitaet ohne Buzz
    #[error("Spieler {0} nicht in der Buzz-Liste")]
    UnknownIdentity(ParticipantId),

    /// Hosts stehen nie in der Buzz-Queue
    #[error("Hosts koennen nicht buzzern")]
    HostCannotBuzz,
}

impl SessionError {
    /// Erstellt einen Formatfehler
    pub fn format(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }

    /// Kurzes, stabiles Label fuer Metriken
    pub fn art(&self) -> &'static str {
        match self {
            Self::DuplicateIdentity { .. } => "duplicate_identity",
            Self::InvalidCredential => "invalid_credential",
            Self::UnknownCommand(_) => "unknown_command",
            Self::MalformedEnvelope(_) => "malformed_envelope",
            Self::UnknownIdentity(_) => "unknown_identity",
            Self::HostCannotBuzz => "host_cannot_buzz",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehlermeldungen_sind_lesbar() {
        let e = SessionError::DuplicateIdentity {
            id: ParticipantId::from("p1"),
            name: "Alice".into(),
        };
        assert_eq!(e.to_string(), "Spieler Alice existiert bereits");

        let e = SessionError::UnknownCommand("tanzen".into());
        assert!(e.to_string().contains("tanzen"));

        let e = SessionError::UnknownIdentity(ParticipantId::from("p9"));
        assert!(e.to_string().contains("p9"));
    }

    #[test]
    fn fehler_art_labels() {
        assert_eq!(SessionError::InvalidCredential.art(), "invalid_credential");
        assert_eq!(SessionError::format("x").art(), "malformed_envelope");
        assert_eq!(SessionError::HostCannotBuzz.art(), "host_cannot_buzz");
    }
}
