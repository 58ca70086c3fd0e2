//! Event-Broadcaster – Sendet abgeleitete Ansichten an Hosts
//!
//! Der Broadcaster haelt keinen eigenen Zustand. Er leitet aus der
//! aktuellen Registry zwei Ansichten ab (Anzahl aktiver Spieler und
//! Rangliste) und schiebt sie in die Send-Queues der Hosts.
//!
//! ## Selektives Broadcasting
//! - An alle Hosts: `an_hosts_senden`
//! - An alle Spieler: `an_spieler_senden`
//! - An eine Verbindung: `ClientSender::senden`
//!
//! Sendefehler (Queue voll oder geschlossen) werden hier nur geloggt.
//! Geschlossene Verbindungen raeumt der Liveness-Monitor ab.

use buzzer_core::ConnectionId;
use buzzer_protocol::{LeaderboardEntry, ServerMessage};
use tokio::sync::mpsc;

use crate::registry::ParticipantRegistry;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer Verbindung
///
/// Der Session-Kern sieht nur dieses Handle, nie den Socket selbst.
#[derive(Clone, Debug)]
pub struct ClientSender {
    verbindung: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
}

impl ClientSender {
    pub fn neu(verbindung: ConnectionId, tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { verbindung, tx }
    }

    /// Erstellt eine neue Verbindung mit Send-Queue der gegebenen Groesse
    pub fn kanal(groesse: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(groesse);
        (Self::neu(ConnectionId::new(), tx), rx)
    }

    pub fn verbindung(&self) -> ConnectionId {
        self.verbindung
    }

    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(verworfen)) => {
                tracing::warn!(
                    verbindung = %self.verbindung,
                    typ = verworfen.typ(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    verbindung = %self.verbindung,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }

    /// `false` sobald die Empfangsseite der Verbindung weg ist
    pub fn ist_offen(&self) -> bool {
        !self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Projektion der Registry auf Host-Ansichten
pub struct EventBroadcaster<'a> {
    registry: &'a ParticipantRegistry,
}

impl<'a> EventBroadcaster<'a> {
    pub fn neu(registry: &'a ParticipantRegistry) -> Self {
        Self { registry }
    }

    /// Rangliste: nur Spieler, absteigend nach Punkten, bei Gleichstand
    /// in Beitrittsreihenfolge
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut eintraege: Vec<LeaderboardEntry> = self
            .registry
            .all_players()
            .into_iter()
            .map(|p| LeaderboardEntry {
                player_id: p.id.clone(),
                player_name: p.name.clone(),
                is_host: false,
                delta: p.delta,
            })
            .collect();
        // sort_by ist stabil
        eintraege.sort_by(|a, b| b.delta.cmp(&a.delta));
        eintraege
    }

    /// Anzahl aktiver Spieler (ohne Hosts)
    pub fn active_player_count(&self) -> usize {
        self.registry.count_active_players()
    }

    /// Sendet eine Nachricht an alle Hosts
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_hosts_senden(&self, nachricht: ServerMessage) -> usize {
        self.registry
            .all_hosts()
            .into_iter()
            .filter(|host| host.sender.senden(nachricht.clone()))
            .count()
    }

    /// Sendet eine Nachricht an alle Spieler
    pub fn an_spieler_senden(&self, nachricht: ServerMessage) -> usize {
        self.registry
            .all_players()
            .into_iter()
            .filter(|spieler| spieler.sender.senden(nachricht.clone()))
            .count()
    }

    /// Berechnet die Rangliste neu und sendet sie an alle Hosts
    pub fn leaderboard_senden(&self) -> usize {
        self.an_hosts_senden(ServerMessage::Leaderboard(self.leaderboard()))
    }

    /// Sendet die Anzahl aktiver Spieler an alle Hosts
    pub fn client_count_senden(&self) -> usize {
        self.an_hosts_senden(ServerMessage::client_count(self.active_player_count()))
    }

    /// Sendet beide abgeleiteten Ansichten
    pub fn ansichten_senden(&self) {
        self.client_count_senden();
        self.leaderboard_senden();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
