//! Session-Runtime – Der Task, dem die Session gehoert
//!
//! Verbindungs-Tasks schicken Ereignisse ueber einen mpsc-Kanal. Die
//! Runtime arbeitet jedes Ereignis samt aller Broadcasts vollstaendig ab,
//! bevor sie das naechste annimmt. Der Liveness-Timer laeuft in derselben
//! Schleife und kann daher nie mit einem Befehl ueberlappen.

use buzzer_core::ConnectionId;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::broadcast::ClientSender;
use crate::dispatcher::MessageDispatcher;
use crate::liveness::LivenessMonitor;
use crate::session::{Session, SessionStatus};

/// Groesse der Ereignis-Queue zur Session
const EREIGNIS_QUEUE_GROESSE: usize = 1024;

/// Ereignisse von den Verbindungen an die Session
#[derive(Debug)]
pub enum SessionEreignis {
    /// Ein Text- oder Binaerframe eines Clients
    Nachricht { absender: ClientSender, text: String },
    /// Transport hat die Verbindung geschlossen
    Getrennt { verbindung: ConnectionId },
    /// Abfrage des aktuellen Zustands
    Status { antwort: oneshot::Sender<SessionStatus> },
}

/// Klonbares Handle zur laufenden Session
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEreignis>,
}

impl SessionHandle {
    /// Leitet einen Frame an die Session weiter
    ///
    /// Gibt `false` zurueck wenn die Session nicht mehr laeuft.
    pub async fn nachricht_zustellen(&self, absender: ClientSender, text: String) -> bool {
        self.tx
            .send(SessionEreignis::Nachricht { absender, text })
            .await
            .is_ok()
    }

    pub async fn verbindung_getrennt(&self, verbindung: ConnectionId) -> bool {
        self.tx
            .send(SessionEreignis::Getrennt { verbindung })
            .await
            .is_ok()
    }

    /// Fragt den aktuellen Zustand ab, `None` wenn die Session beendet ist
    pub async fn status(&self) -> Option<SessionStatus> {
        let (antwort, rx) = oneshot::channel();
        self.tx.send(SessionEreignis::Status { antwort }).await.ok()?;
        rx.await.ok()
    }

    pub fn ist_beendet(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Ereignisschleife der Session
pub struct SessionRuntime {
    dispatcher: MessageDispatcher,
    monitor: LivenessMonitor,
    rx: mpsc::Receiver<SessionEreignis>,
}

impl SessionRuntime {
    /// Laeuft bis der Shutdown-Kanal `true` meldet oder alle Handles weg sind
    pub async fn ausfuehren(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = self.monitor.ticker();
        tracing::info!(
            liveness_sek = self.monitor.intervall().as_secs(),
            "Session gestartet"
        );

        loop {
            tokio::select! {
                ereignis = self.rx.recv() => {
                    match ereignis {
                        Some(ereignis) => self.verarbeiten(ereignis),
                        None => {
                            tracing::debug!("Alle Session-Handles geschlossen");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    let entfernt = self.monitor.pruefen(self.dispatcher.session_mut());
                    if !entfernt.is_empty() {
                        tracing::info!(anzahl = entfernt.len(), "Tote Verbindungen entfernt");
                    }
                }

                geaendert = shutdown_rx.changed() => {
                    if geaendert.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Shutdown-Signal – Session wird beendet");
                        break;
                    }
                }
            }
        }

        let status = self.dispatcher.session().status();
        tracing::info!(
            teilnehmer = status.teilnehmer,
            buzzes = status.buzzes,
            "Session beendet"
        );
    }

    fn verarbeiten(&mut self, ereignis: SessionEreignis) {
        match ereignis {
            SessionEreignis::Nachricht { absender, text } => {
                self.dispatcher.dispatch(&absender, &text);
            }
            SessionEreignis::Getrennt { verbindung } => {
                let entfernt = self.dispatcher.session_mut().verbindung_geschlossen(verbindung);
                tracing::debug!(
                    %verbindung,
                    identitaeten = entfernt.len(),
                    "Verbindung abgemeldet"
                );
            }
            SessionEreignis::Status { antwort } => {
                let _ = antwort.send(self.dispatcher.session().status());
            }
        }
    }
}

/// Startet die Session in einem eigenen Task
pub fn session_starten(
    session: Session,
    liveness_intervall: Duration,
    shutdown_rx: watch::Receiver<bool>,
) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(EREIGNIS_QUEUE_GROESSE);
    let runtime = SessionRuntime {
        dispatcher: MessageDispatcher::neu(session),
        monitor: LivenessMonitor::neu(liveness_intervall),
        rx,
    };
    let task = tokio::spawn(runtime.ausfuehren(shutdown_rx));
    (SessionHandle { tx }, task)
}
