//! Teilnehmer-Registry – Wer ist in der Session, mit welcher Rolle
//!
//! Haelt alle registrierten Teilnehmer mit Rolle, Punktestand und dem
//! Send-Handle ihrer Verbindung. Erzwingt die Eindeutigkeit der
//! Identitaet. Die Registry selbst sendet nichts; Broadcasts loest die
//! Session nach jeder Aenderung aus.

use buzzer_core::{ConnectionId, ParticipantId, Result, Role, SessionError};
use std::collections::HashMap;

use crate::broadcast::ClientSender;

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// Ein registrierter Teilnehmer
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
    /// Kumulierte Punkte, startet bei 0
    pub delta: i64,
    pub sender: ClientSender,
    /// Beitrittsreihenfolge, nur fuer stabile Sortierung
    seq: u64,
}

impl Participant {
    pub fn beitritts_seq(&self) -> u64 {
        self.seq
    }
}

// ---------------------------------------------------------------------------
// ParticipantRegistry
// ---------------------------------------------------------------------------

/// Verwaltet alle Teilnehmer der Session
pub struct ParticipantRegistry {
    teilnehmer: HashMap<ParticipantId, Participant>,
    /// Leer = Host-Rolle deaktiviert
    host_secret: String,
    naechste_seq: u64,
}

impl ParticipantRegistry {
    /// Erstellt eine leere Registry mit dem gegebenen Host-Geheimnis
    pub fn neu(host_secret: impl Into<String>) -> Self {
        Self {
            teilnehmer: HashMap::new(),
            host_secret: host_secret.into(),
            naechste_seq: 0,
        }
    }

    /// Bestimmt die Rolle fuer einen Zugangsschluessel
    ///
    /// Fehlend oder leer ergibt `Player`, exakter Treffer `Host`,
    /// alles andere ist `InvalidCredential`.
    pub fn rolle_pruefen(&self, credential: Option<&str>) -> Result<Role> {
        match credential {
            None | Some("") => Ok(Role::Player),
            Some(schluessel) if !self.host_secret.is_empty() && schluessel == self.host_secret => {
                Ok(Role::Host)
            }
            Some(_) => Err(SessionError::InvalidCredential),
        }
    }

    /// Registriert einen neuen Teilnehmer mit Punktestand 0
    pub fn join(
        &mut self,
        id: ParticipantId,
        name: String,
        credential: Option<&str>,
        sender: ClientSender,
    ) -> Result<Participant> {
        if self.teilnehmer.contains_key(&id) {
            return Err(SessionError::DuplicateIdentity { id, name });
        }
        let role = self.rolle_pruefen(credential)?;

        let teilnehmer = Participant {
            id: id.clone(),
            name,
            role,
            delta: 0,
            sender,
            seq: self.naechste_seq,
        };
        self.naechste_seq += 1;
        self.teilnehmer.insert(id, teilnehmer.clone());
        Ok(teilnehmer)
    }

    /// Addiert `delta` auf den Punktestand
    ///
    /// Unbekannte Identitaeten werden still ignoriert (`None`), sonst
    /// kommt der neue Punktestand zurueck.
    pub fn adjust_score(&mut self, id: &ParticipantId, delta: i64) -> Option<i64> {
        let teilnehmer = self.teilnehmer.get_mut(id)?;
        teilnehmer.delta = teilnehmer.delta.saturating_add(delta);
        Some(teilnehmer.delta)
    }

    /// Setzt alle Punktestaende auf 0
    pub fn reset_scores(&mut self) {
        self.teilnehmer.values_mut().for_each(|t| t.delta = 0);
    }

    /// Entfernt einen Teilnehmer
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.teilnehmer.remove(id)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.teilnehmer.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.teilnehmer.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.teilnehmer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teilnehmer.is_empty()
    }

    /// Anzahl der registrierten Nicht-Hosts
    pub fn count_active_players(&self) -> usize {
        self.teilnehmer
            .values()
            .filter(|t| !t.role.ist_host())
            .count()
    }

    /// Alle Hosts in Beitrittsreihenfolge
    pub fn all_hosts(&self) -> Vec<&Participant> {
        self.nach_rolle(Role::Host)
    }

    /// Alle Spieler in Beitrittsreihenfolge
    pub fn all_players(&self) -> Vec<&Participant> {
        self.nach_rolle(Role::Player)
    }

    /// Identitaeten die ueber die gegebene Verbindung beigetreten sind
    pub fn ids_fuer_verbindung(&self, verbindung: ConnectionId) -> Vec<ParticipantId> {
        self.teilnehmer
            .values()
            .filter(|t| t.sender.verbindung() == verbindung)
            .map(|t| t.id.clone())
            .collect()
    }

    /// Identitaeten deren Verbindung nicht mehr offen ist
    pub fn closed_connections(&self) -> Vec<ParticipantId> {
        self.teilnehmer
            .values()
            .filter(|t| !t.sender.ist_offen())
            .map(|t| t.id.clone())
            .collect()
    }

    fn nach_rolle(&self, role: Role) -> Vec<&Participant> {
        let mut auswahl: Vec<&Participant> = self
            .teilnehmer
            .values()
            .filter(|t| t.role == role)
            .collect();
        auswahl.sort_by_key(|t| t.seq);
        auswahl
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
