//! Message-Dispatcher – Fuehrt Befehle gegen die Session aus
//!
//! Der Dispatcher dekodiert eingehende Textframes zu `Command`-Werten und
//! fuehrt sie vollstaendig aus, inklusive aller Broadcasts, bevor der
//! naechste Befehl an der Reihe ist.
//!
//! ## Fehlerbehandlung
//! Jeder Fehler bleibt bei der ausloesenden Verbindung: er wird als
//! `error`-Nachricht an den Absender gesendet und aendert keinen Zustand.

use buzzer_core::{Result, SessionError};
use buzzer_protocol::control::{
    AdjustScoreRequest, BuzzRequest, JoinRequest, PositionRequest, ReadyRequest,
};
use buzzer_protocol::{Command, ServerMessage};

use crate::broadcast::ClientSender;
use crate::session::Session;

/// Zentraler Message-Dispatcher, besitzt die Session
pub struct MessageDispatcher {
    session: Session,
}

impl MessageDispatcher {
    pub fn neu(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Verarbeitet einen rohen Textframe eines Clients
    pub fn dispatch(&mut self, absender: &ClientSender, text: &str) {
        let ergebnis =
            Command::dekodieren(text).and_then(|befehl| self.ausfuehren(befehl, absender));

        if let Err(fehler) = ergebnis {
            tracing::warn!(
                verbindung = %absender.verbindung(),
                art = fehler.art(),
                "Befehl abgelehnt: {fehler}"
            );
            if let Some(metriken) = self.session.metriken() {
                metriken.errors_total.with_label_values(&[fehler.art()]).inc();
            }
            absender.senden(ServerMessage::from(&fehler));
        }
    }

    /// Fuehrt einen bereits dekodierten Befehl aus
    pub fn ausfuehren(&mut self, befehl: Command, absender: &ClientSender) -> Result<()> {
        if let Some(metriken) = self.session.metriken() {
            metriken
                .commands_total
                .with_label_values(&[befehl.name()])
                .inc();
        }

        match befehl {
            Command::Join(req) => self.join(req, absender),
            Command::Ready(req) => {
                self.ready(req);
                Ok(())
            }
            Command::Buzz(req) => self.buzz(req),
            Command::GetPosition(req) => self.position(req, absender),
            Command::GetBuzzList => {
                absender.senden(ServerMessage::BuzzList(self.session.buzzes.snapshot().to_vec()));
                Ok(())
            }
            Command::Reset => {
                self.reset();
                Ok(())
            }
            Command::Start => {
                self.start();
                Ok(())
            }
            Command::GetLeaderboard => {
                self.session.broadcaster().leaderboard_senden();
                Ok(())
            }
            Command::AdjustScore(req) => {
                self.punkte_anpassen(req);
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Einzelne Befehle
    // -----------------------------------------------------------------------

    fn join(&mut self, req: JoinRequest, absender: &ClientSender) -> Result<()> {
        let teilnehmer = self.session.registry.join(
            req.player_id,
            req.player_name,
            req.api_key.as_deref(),
            absender.clone(),
        )?;

        tracing::info!(
            player_id = %teilnehmer.id,
            name = %teilnehmer.name,
            rolle = teilnehmer.role.als_str(),
            verbindung = %absender.verbindung(),
            "Teilnehmer beigetreten"
        );

        // Hosts stehen nie in der Buzz-Queue, auch nicht mit Buzzes von vor dem Join
        if teilnehmer.role.ist_host() {
            let entfernt = self.session.buzzes.remove_all_for(&teilnehmer.id);
            if entfernt > 0 {
                tracing::debug!(
                    player_id = %teilnehmer.id,
                    entfernt,
                    "Buzzes des neuen Hosts verworfen"
                );
            }
        }

        self.session.broadcaster().ansichten_senden();
        self.session.teilnehmer_metriken_aktualisieren();
        Ok(())
    }

    fn ready(&mut self, req: ReadyRequest) {
        tracing::info!(
            player_id = req.player_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
            name = req.player_name.as_deref().unwrap_or("-"),
            "Spieler ist bereit"
        );
        self.session.broadcaster().client_count_senden();
    }

    fn buzz(&mut self, req: BuzzRequest) -> Result<()> {
        if self
            .session
            .registry
            .get(&req.player_id)
            .is_some_and(|t| t.role.ist_host())
        {
            return Err(SessionError::HostCannotBuzz);
        }

        let event = self.session.buzzes.record_buzz(req.player_id, req.player_name);
        tracing::info!(
            player_id = %event.player_id,
            name = %event.player_name,
            position = self.session.buzzes.len(),
            "Buzz"
        );
        if let Some(metriken) = self.session.metriken() {
            metriken.buzzes_total.inc();
        }

        self.session
            .broadcaster()
            .an_hosts_senden(ServerMessage::Buzz(event));
        Ok(())
    }

    fn position(&self, req: PositionRequest, absender: &ClientSender) -> Result<()> {
        let position = self
            .session
            .buzzes
            .position_of(&req.player_id)
            .ok_or(SessionError::UnknownIdentity(req.player_id))?;
        absender.senden(ServerMessage::position(position));
        Ok(())
    }

    fn reset(&mut self) {
        self.session.buzzes.clear();
        self.session
            .broadcaster()
            .an_spieler_senden(ServerMessage::reset());
        tracing::info!("Runde zurueckgesetzt");
    }

    fn start(&mut self) {
        self.session.buzzes.clear();
        self.session.registry.reset_scores();

        let broadcaster = self.session.broadcaster();
        broadcaster.leaderboard_senden();
        broadcaster.an_hosts_senden(ServerMessage::start());
        tracing::info!("Spiel gestartet");
    }

    fn punkte_anpassen(&mut self, req: AdjustScoreRequest) {
        match self.session.registry.adjust_score(&req.player_id, req.delta) {
            Some(neuer_stand) => {
                tracing::info!(
                    player_id = %req.player_id,
                    delta = req.delta,
                    punkte = neuer_stand,
                    "Punkte angepasst"
                );
                self.session.broadcaster().leaderboard_senden();
            }
            None => {
                tracing::debug!(
                    player_id = %req.player_id,
                    "Punkte fuer unbekannten Spieler ignoriert"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
