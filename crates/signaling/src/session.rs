//! Session-Zustand – Registry und Buzz-Queue unter einem Besitzer
//!
//! Die Session existiert genau einmal pro Prozess und wird ausschliesslich
//! vom Session-Task veraendert (siehe `runtime`). Dadurch sehen Befehle
//! nie einen halb aktualisierten Zustand und es braucht keine Locks.

use buzzer_core::{ConnectionId, ParticipantId};
use buzzer_observability::BuzzerMetrics;
use buzzer_protocol::ServerMessage;
use serde::Serialize;

use crate::broadcast::EventBroadcaster;
use crate::buzz_queue::BuzzQueue;
use crate::registry::{Participant, ParticipantRegistry};

/// Warum ein Teilnehmer die Session verlassen hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abgangsursache {
    /// Transport hat das Schliessen gemeldet
    Geschlossen,
    /// Vom Liveness-Monitor als tot erkannt
    Liveness,
}

impl Abgangsursache {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Geschlossen => "closed",
            Self::Liveness => "liveness",
        }
    }
}

/// Momentaufnahme fuer Info-Endpunkt und Tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub teilnehmer: usize,
    pub spieler: usize,
    pub hosts: usize,
    pub buzzes: usize,
}

/// Der gesamte Zustand einer Quiz-Session
pub struct Session {
    pub registry: ParticipantRegistry,
    pub buzzes: BuzzQueue,
    metriken: Option<BuzzerMetrics>,
}

impl Session {
    pub fn neu(host_secret: impl Into<String>) -> Self {
        Self {
            registry: ParticipantRegistry::neu(host_secret),
            buzzes: BuzzQueue::neu(),
            metriken: None,
        }
    }

    /// Haengt Prometheus-Metriken an die Session
    pub fn mit_metriken(mut self, metriken: BuzzerMetrics) -> Self {
        self.metriken = Some(metriken);
        self
    }

    pub fn metriken(&self) -> Option<&BuzzerMetrics> {
        self.metriken.as_ref()
    }

    pub fn broadcaster(&self) -> EventBroadcaster<'_> {
        EventBroadcaster::neu(&self.registry)
    }

    /// Abgangsroutine fuer einen Teilnehmer
    ///
    /// Entfernt ihn aus der Registry und alle seine Buzzes aus der Queue.
    /// War er Host, bekommen die verbleibenden Hosts `hostDisconnected`.
    /// Danach gehen Spieleranzahl und Rangliste an alle Hosts.
    pub fn teilnehmer_entfernen(
        &mut self,
        id: &ParticipantId,
        ursache: Abgangsursache,
    ) -> Option<Participant> {
        let teilnehmer = self.registry.remove(id)?;
        let entfernte_buzzes = self.buzzes.remove_all_for(id);

        tracing::info!(
            player_id = %teilnehmer.id,
            name = %teilnehmer.name,
            rolle = teilnehmer.role.als_str(),
            ursache = ursache.als_str(),
            entfernte_buzzes,
            "Teilnehmer hat die Session verlassen"
        );

        let broadcaster = self.broadcaster();
        if teilnehmer.role.ist_host() {
            broadcaster.an_hosts_senden(ServerMessage::host_disconnected(teilnehmer.id.clone()));
        }
        broadcaster.ansichten_senden();

        if let Some(metriken) = &self.metriken {
            metriken
                .departures_total
                .with_label_values(&[ursache.als_str()])
                .inc();
        }
        self.teilnehmer_metriken_aktualisieren();

        Some(teilnehmer)
    }

    /// Entfernt alle Identitaeten einer geschlossenen Verbindung
    pub fn verbindung_geschlossen(&mut self, verbindung: ConnectionId) -> Vec<Participant> {
        self.registry
            .ids_fuer_verbindung(verbindung)
            .into_iter()
            .filter_map(|id| self.teilnehmer_entfernen(&id, Abgangsursache::Geschlossen))
            .collect()
    }

    pub fn status(&self) -> SessionStatus {
        let spieler = self.registry.count_active_players();
        let teilnehmer = self.registry.len();
        SessionStatus {
            teilnehmer,
            spieler,
            hosts: teilnehmer - spieler,
            buzzes: self.buzzes.len(),
        }
    }

    /// Uebertraegt die Teilnehmerzahlen auf die Gauges
    pub fn teilnehmer_metriken_aktualisieren(&self) {
        if let Some(metriken) = &self.metriken {
            let status = self.status();
            metriken.teilnehmer_setzen(status.hosts, status.spieler);
        }
    }
}
