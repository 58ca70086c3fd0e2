//! Control-Protokoll (WebSocket-Textframes)
//!
//! Definiert alle Nachrichten die zwischen Client und Server ausgetauscht
//! werden.
//!
//! ## Design
//! - Umschlag `{ "type": string, "data": any }`, Format fest fuer
//!   Kompatibilitaet mit bestehenden Clients
//! - Eingehend: zweistufige Dekodierung (Umschlag, dann Payload), damit
//!   unbekannte Typen von kaputten Payloads unterscheidbar bleiben
//! - Ausgehend: adjacently tagged Enum via serde

use buzzer_core::{ParticipantId, Result, SessionError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Umschlag
// ---------------------------------------------------------------------------

/// Roher Nachrichten-Umschlag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub typ: String,
    /// Fehlt bei Befehlen ohne Payload
    #[serde(default)]
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Eingehende Payloads
// ---------------------------------------------------------------------------

/// Beitritt zur Session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub player_id: ParticipantId,
    pub player_name: String,
    /// Host-Geheimnis; fehlt oder leer fuer Spieler
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Bereitschaftssignal (nur informativ)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
    #[serde(default)]
    pub player_id: Option<ParticipantId>,
    #[serde(default)]
    pub player_name: Option<String>,
}

/// Buzzer gedrueckt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuzzRequest {
    pub player_id: ParticipantId,
    pub player_name: String,
}

/// Positionsabfrage in der Buzz-Queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRequest {
    pub player_id: ParticipantId,
}

/// Punkte eines Spielers anpassen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustScoreRequest {
    pub player_id: ParticipantId,
    pub delta: i64,
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Alle Befehle die ein Client senden kann
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join(JoinRequest),
    Ready(ReadyRequest),
    Buzz(BuzzRequest),
    GetPosition(PositionRequest),
    GetBuzzList,
    Reset,
    Start,
    GetLeaderboard,
    AdjustScore(AdjustScoreRequest),
}

impl Command {
    /// Dekodiert einen Textframe zu einem Befehl
    pub fn dekodieren(text: &str) -> Result<Self> {
        let umschlag: Envelope =
            serde_json::from_str(text).map_err(|e| SessionError::format(e.to_string()))?;
        Self::aus_umschlag(umschlag)
    }

    /// Dekodiert die Payload eines bereits gelesenen Umschlags
    pub fn aus_umschlag(umschlag: Envelope) -> Result<Self> {
        let Envelope { typ, data } = umschlag;
        let befehl = match typ.as_str() {
            "join" => Command::Join(payload(data)?),
            "ready" => Command::Ready(payload_oder_standard(data)?),
            "buzz" => Command::Buzz(payload(data)?),
            "getPosition" => Command::GetPosition(payload(data)?),
            "getBuzzList" => Command::GetBuzzList,
            "reset" => Command::Reset,
            "start" => Command::Start,
            "getLeaderboard" => Command::GetLeaderboard,
            "adjustScore" => Command::AdjustScore(payload(data)?),
            _ => return Err(SessionError::UnknownCommand(typ)),
        };
        Ok(befehl)
    }

    /// Name des Befehls wie er auf der Leitung steht
    pub fn name(&self) -> &'static str {
        match self {
            Command::Join(_) => "join",
            Command::Ready(_) => "ready",
            Command::Buzz(_) => "buzz",
            Command::GetPosition(_) => "getPosition",
            Command::GetBuzzList => "getBuzzList",
            Command::Reset => "reset",
            Command::Start => "start",
            Command::GetLeaderboard => "getLeaderboard",
            Command::AdjustScore(_) => "adjustScore",
        }
    }
}

fn payload<T: DeserializeOwned>(data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| SessionError::format(e.to_string()))
}

fn payload_oder_standard<T: DeserializeOwned + Default>(data: serde_json::Value) -> Result<T> {
    if data.is_null() {
        return Ok(T::default());
    }
    payload(data)
}

// ---------------------------------------------------------------------------
// Ausgehende Payloads
// ---------------------------------------------------------------------------

/// Ein Eintrag der Buzz-Queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuzzEvent {
    pub player_id: ParticipantId,
    /// Anzeigename zum Zeitpunkt des Buzz
    pub player_name: String,
    /// Unix-Zeit in Millisekunden
    pub timestamp: i64,
}

/// Ein Eintrag der Rangliste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub player_id: ParticipantId,
    pub player_name: String,
    /// Immer `false`, bleibt fuer bestehende Clients im Format
    pub is_host: bool,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCountPayload {
    pub client_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDisconnectedPayload {
    pub player_id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPayload {
    pub position: usize,
}

/// Leere Payload, serialisiert als `{}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leer {}

// ---------------------------------------------------------------------------
// ServerMessage
// ---------------------------------------------------------------------------

/// Alle Nachrichten die der Server an Clients sendet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Error(ErrorPayload),
    ClientCount(ClientCountPayload),
    Leaderboard(Vec<LeaderboardEntry>),
    HostDisconnected(HostDisconnectedPayload),
    Buzz(BuzzEvent),
    Position(PositionPayload),
    BuzzList(Vec<BuzzEvent>),
    Reset(Leer),
    Start(Leer),
}

impl ServerMessage {
    /// Erstellt eine Fehler-Antwort
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn client_count(client_count: usize) -> Self {
        Self::ClientCount(ClientCountPayload { client_count })
    }

    pub fn host_disconnected(player_id: ParticipantId) -> Self {
        Self::HostDisconnected(HostDisconnectedPayload { player_id })
    }

    pub fn position(position: usize) -> Self {
        Self::Position(PositionPayload { position })
    }

    pub fn reset() -> Self {
        Self::Reset(Leer {})
    }

    pub fn start() -> Self {
        Self::Start(Leer {})
    }

    /// Name des Nachrichtentyps wie er auf der Leitung steht
    pub fn typ(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::ClientCount(_) => "clientCount",
            Self::Leaderboard(_) => "leaderboard",
            Self::HostDisconnected(_) => "hostDisconnected",
            Self::Buzz(_) => "buzz",
            Self::Position(_) => "position",
            Self::BuzzList(_) => "buzzList",
            Self::Reset(_) => "reset",
            Self::Start(_) => "start",
        }
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl From<&SessionError> for ServerMessage {
    fn from(fehler: &SessionError) -> Self {
        Self::error(fehler.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
