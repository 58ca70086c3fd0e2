//! Liveness-Monitor – Raeumt tote Verbindungen periodisch ab
//!
//! Normalerweise meldet der Transport das Schliessen sofort. Der Monitor
//! faengt die Faelle ab, in denen diese Meldung fehlt: jede Identitaet
//! deren Send-Queue geschlossen ist, durchlaeuft die Abgangsroutine.

use buzzer_core::ParticipantId;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::session::{Abgangsursache, Session};

/// Standard-Pruefintervall
pub const STANDARD_INTERVALL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct LivenessMonitor {
    intervall: Duration,
}

impl LivenessMonitor {
    pub fn neu(intervall: Duration) -> Self {
        Self { intervall }
    }

    pub fn intervall(&self) -> Duration {
        self.intervall
    }

    /// Timer fuer die Session-Schleife, erster Tick nach einem Intervall
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.intervall, self.intervall);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Entfernt alle Teilnehmer mit geschlossener Verbindung
    pub fn pruefen(&self, session: &mut Session) -> Vec<ParticipantId> {
        let tote = session.registry.closed_connections();
        if !tote.is_empty() {
            tracing::debug!(anzahl = tote.len(), "Liveness-Pruefung: tote Verbindungen gefunden");
        }
        tote.into_iter()
            .filter(|id| {
                session
                    .teilnehmer_entfernen(id, Abgangsursache::Liveness)
                    .is_some()
            })
            .collect()
    }
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::neu(STANDARD_INTERVALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ClientSender;
    use buzzer_protocol::ServerMessage;

    const GEHEIM: &str = "paw tuah";

    #[test]
    fn geschlossene_verbindungen_werden_entfernt() {
        let mut session = Session::neu(GEHEIM);
        let (host, mut host_rx) = ClientSender::kanal(16);
        let (spieler, spieler_rx) = ClientSender::kanal(16);
        session.registry.join("h1".into(), "Bob".into(), Some(GEHEIM), host).unwrap();
        session.registry.join("p1".into(), "Alice".into(), None, spieler).unwrap();
        session.buzzes.record_buzz("p1".into(), "Alice".into());
        drop(spieler_rx);

        let entfernt = LivenessMonitor::default().pruefen(&mut session);

        assert_eq!(entfernt, vec![ParticipantId::from("p1")]);
        assert_eq!(session.registry.len(), 1);
        assert!(session.buzzes.is_empty());
        assert_eq!(host_rx.try_recv().unwrap(), ServerMessage::client_count(0));
    }

    #[test]
    fn offene_verbindungen_bleiben() {
        let mut session = Session::neu(GEHEIM);
        let (spieler, _rx) = ClientSender::kanal(16);
        session.registry.join("p1".into(), "Alice".into(), None, spieler).unwrap();

        assert!(LivenessMonitor::default().pruefen(&mut session).is_empty());
        assert_eq!(session.registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_feuert_erst_nach_einem_intervall() {
        let monitor = LivenessMonitor::neu(Duration::from_secs(10));
        let start = Instant::now();
        let mut ticker = monitor.ticker();

        ticker.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
        ticker.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(20));
    }
}
