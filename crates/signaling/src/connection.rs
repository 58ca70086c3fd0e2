//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung bekommt einen eigenen tokio-Task. Der Task liest Frames
//! und reicht sie an die Session weiter, und er schreibt alles aus der
//! Send-Queue der Verbindung als JSON-Textframes zurueck.
//!
//! ## Keepalive
//! - Server sendet alle `ping_intervall` einen Ping
//! - Jeder empfangene Frame (auch Pong) schiebt die Frist nach vorne
//! - Ohne Frame innerhalb von `timeout` wird die Verbindung getrennt

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::broadcast::ClientSender;
use crate::runtime::SessionHandle;

/// Abstand der Keepalive-Pings
pub const PING_INTERVALL: Duration = Duration::from_secs(30);

/// Standard-Timeout fuer inaktive Verbindungen
pub const STANDARD_TIMEOUT: Duration = Duration::from_secs(90);

/// Parameter einer einzelnen Verbindung
#[derive(Debug, Clone, Copy)]
pub struct VerbindungsEinstellungen {
    /// Ausgehende Nachrichten, bevor verworfen wird
    pub queue_groesse: usize,
    pub ping_intervall: Duration,
    /// Maximale Zeit ohne empfangenen Frame
    pub timeout: Duration,
}

impl Default for VerbindungsEinstellungen {
    fn default() -> Self {
        Self {
            queue_groesse: 64,
            ping_intervall: PING_INTERVALL,
            timeout: STANDARD_TIMEOUT,
        }
    }
}

/// Verarbeitet eine WebSocket-Verbindung bis zum Schliessen
///
/// Laeuft bis der Client trennt, ein Fehler auftritt, die Verbindung
/// verstummt oder der Shutdown-Kanal `true` meldet. Danach wird die
/// Session informiert.
pub async fn verbindung_verarbeiten(
    socket: WebSocket,
    session: SessionHandle,
    einstellungen: VerbindungsEinstellungen,
    shutdown_rx: watch::Receiver<bool>,
) {
    let (schreiber, leser) = socket.split();
    verbindung_betreiben(leser, schreiber, session, einstellungen, shutdown_rx).await;
}

async fn verbindung_betreiben<L, S, E>(
    mut leser: L,
    mut schreiber: S,
    session: SessionHandle,
    einstellungen: VerbindungsEinstellungen,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    L: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let (sender, mut sende_rx) = ClientSender::kanal(einstellungen.queue_groesse);
    let verbindung = sender.verbindung();

    tracing::info!(%verbindung, "Neue Verbindung");

    let mut ping = tokio::time::interval_at(
        Instant::now() + einstellungen.ping_intervall,
        einstellungen.ping_intervall,
    );
    let frist = tokio::time::sleep(einstellungen.timeout);
    tokio::pin!(frist);

    loop {
        tokio::select! {
            // Eingehender Frame vom Client
            frame = leser.next() => {
                let nachricht = match frame {
                    Some(Ok(nachricht)) => nachricht,
                    Some(Err(e)) => {
                        tracing::warn!(%verbindung, fehler = %e, "Frame-Lesefehler");
                        break;
                    }
                    None => {
                        tracing::info!(%verbindung, "Verbindung vom Client getrennt");
                        break;
                    }
                };
                frist.as_mut().reset(Instant::now() + einstellungen.timeout);

                let text = match nachricht {
                    Message::Text(text) => text,
                    Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Message::Ping(_) | Message::Pong(_) => continue,
                    Message::Close(_) => {
                        tracing::info!(%verbindung, "Verbindung vom Client geschlossen");
                        break;
                    }
                };

                tracing::trace!(%verbindung, bytes = text.len(), "Nachricht empfangen");
                if !session.nachricht_zustellen(sender.clone(), text).await {
                    tracing::warn!(%verbindung, "Session nicht mehr erreichbar");
                    break;
                }
            }

            // Ausgehende Nachricht aus der Send-Queue
            Some(ausgehend) = sende_rx.recv() => {
                let json = match ausgehend.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(%verbindung, fehler = %e, "Serialisierung fehlgeschlagen");
                        continue;
                    }
                };
                if let Err(e) = schreiber.send(Message::Text(json)).await {
                    tracing::warn!(%verbindung, fehler = %e, "Senden fehlgeschlagen");
                    break;
                }
            }

            // Keepalive-Ping
            _ = ping.tick() => {
                if let Err(e) = schreiber.send(Message::Ping(Vec::new())).await {
                    tracing::warn!(%verbindung, fehler = %e, "Ping-Senden fehlgeschlagen");
                    break;
                }
            }

            // Keine Lebenszeichen mehr
            _ = &mut frist => {
                tracing::warn!(
                    %verbindung,
                    timeout_sek = einstellungen.timeout.as_secs(),
                    "Verbindungs-Timeout"
                );
                break;
            }

            // Shutdown-Signal
            geaendert = shutdown_rx.changed() => {
                if geaendert.is_err() || *shutdown_rx.borrow() {
                    tracing::info!(%verbindung, "Shutdown-Signal – Verbindung wird getrennt");
                    let _ = schreiber.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    // Queue schliessen, damit `ist_offen` sofort false liefert
    drop(sende_rx);
    session.verbindung_getrennt(verbindung).await;
    tracing::debug!(%verbindung, "Verbindungs-Task beendet");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::session_starten;
    use crate::session::Session;
    use buzzer_protocol::ServerMessage;
    use futures_util::{sink, stream};
    use std::convert::Infallible;
    use std::pin::Pin;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    const GEHEIM: &str = "paw tuah";

    type Leser = Pin<Box<dyn Stream<Item = Result<Message, Infallible>> + Send>>;
    type Schreiber = Pin<Box<dyn Sink<Message, Error = Infallible> + Send>>;

    /// Client-Seite: Frames hinein, Frames heraus
    struct TestClient {
        eingang: mpsc::UnboundedSender<Message>,
        ausgang: mpsc::UnboundedReceiver<Message>,
        task: JoinHandle<()>,
    }

    impl TestClient {
        fn senden(&self, nachricht: Message) {
            self.eingang.send(nachricht).unwrap();
        }

        /// Naechste Server-Nachricht, Pings werden uebersprungen
        async fn naechste(&mut self) -> Option<Message> {
            while let Some(nachricht) = self.ausgang.recv().await {
                if !matches!(nachricht, Message::Ping(_)) {
                    return Some(nachricht);
                }
            }
            None
        }
    }

    fn einstellungen() -> VerbindungsEinstellungen {
        VerbindungsEinstellungen {
            queue_groesse: 16,
            ping_intervall: Duration::from_secs(30),
            timeout: Duration::from_secs(90),
        }
    }

    fn verbinden(session: &SessionHandle, shutdown_rx: watch::Receiver<bool>) -> TestClient {
        let (eingang, eingang_rx) = mpsc::unbounded_channel::<Message>();
        let leser: Leser = Box::pin(stream::unfold(eingang_rx, |mut rx| async move {
            rx.recv().await.map(|nachricht| (Ok::<_, Infallible>(nachricht), rx))
        }));

        let (ausgang_tx, ausgang) = mpsc::unbounded_channel::<Message>();
        let schreiber: Schreiber = Box::pin(sink::unfold(
            ausgang_tx,
            |tx: mpsc::UnboundedSender<Message>, nachricht: Message| async move {
                let _ = tx.send(nachricht);
                Ok::<_, Infallible>(tx)
            },
        ));

        let task = tokio::spawn(verbindung_betreiben(
            leser,
            schreiber,
            session.clone(),
            einstellungen(),
            shutdown_rx,
        ));
        TestClient {
            eingang,
            ausgang,
            task,
        }
    }

    fn join(id: &str, key: Option<&str>) -> String {
        let mut data = serde_json::json!({"playerId": id, "playerName": id});
        if let Some(key) = key {
            data["apiKey"] = serde_json::json!(key);
        }
        serde_json::json!({"type": "join", "data": data}).to_string()
    }

    fn session() -> (SessionHandle, watch::Sender<bool>, watch::Receiver<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Liveness selten, damit nur der Verbindungs-Timeout wirkt
        let (handle, _task) = session_starten(
            Session::neu(GEHEIM),
            Duration::from_secs(3600),
            shutdown_rx.clone(),
        );
        (handle, shutdown_tx, shutdown_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn stiller_client_wird_nach_timeout_getrennt() {
        let (handle, _shutdown_tx, shutdown_rx) = session();
        let (host, mut host_rx) = ClientSender::kanal(64);
        handle.nachricht_zustellen(host, join("h1", Some(GEHEIM))).await;

        let client = verbinden(&handle, shutdown_rx);
        client.senden(Message::Text(join("p1", None)));
        let start = Instant::now();
        let TestClient { eingang, task, .. } = client;

        task.await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(90));
        assert_eq!(handle.status().await.map(|s| s.teilnehmer), Some(1));
        let mut letzte_anzahl = None;
        while let Ok(n) = host_rx.try_recv() {
            if let ServerMessage::ClientCount(p) = n {
                letzte_anzahl = Some(p.client_count);
            }
        }
        assert_eq!(letzte_anzahl, Some(0));
        drop(eingang);
    }

    #[tokio::test(start_paused = true)]
    async fn pong_haelt_verbindung_offen() {
        let (handle, _shutdown_tx, shutdown_rx) = session();
        let client = verbinden(&handle, shutdown_rx);
        client.senden(Message::Text(join("p1", None)));

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(60)).await;
            client.senden(Message::Pong(Vec::new()));
        }
        assert!(!client.task.is_finished());
        assert_eq!(handle.status().await.map(|s| s.spieler), Some(1));

        // Pongs bleiben aus
        let TestClient { eingang, task, .. } = client;
        task.await.unwrap();
        assert_eq!(handle.status().await.map(|s| s.spieler), Some(0));
        drop(eingang);
    }

    #[tokio::test(start_paused = true)]
    async fn binaerframes_und_json_antworten() {
        let (handle, _shutdown_tx, shutdown_rx) = session();
        let mut client = verbinden(&handle, shutdown_rx);

        client.senden(Message::Binary(join("p1", None).into_bytes()));
        let buzz = r#"{"type":"buzz","data":{"playerId":"p1","playerName":"p1"}}"#;
        client.senden(Message::Binary(buzz.as_bytes().to_vec()));
        let position = r#"{"type":"getPosition","data":{"playerId":"p1"}}"#;
        client.senden(Message::Text(position.into()));

        match client.naechste().await {
            Some(Message::Text(json)) => {
                assert_eq!(ServerMessage::from_json(&json).unwrap(), ServerMessage::position(1));
            }
            andere => panic!("Erwartet Textframe, erhalten {andere:?}"),
        }

        client.senden(Message::Close(None));
        client.task.await.unwrap();
        assert_eq!(handle.status().await.map(|s| s.teilnehmer), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn ungueltiges_utf8_wird_ersetzt_statt_getrennt() {
        let (handle, _shutdown_tx, shutdown_rx) = session();
        let mut client = verbinden(&handle, shutdown_rx);

        client.senden(Message::Binary(vec![0xff, 0xfe, b'{']));

        match client.naechste().await {
            Some(Message::Text(json)) => {
                assert!(matches!(ServerMessage::from_json(&json), Ok(ServerMessage::Error(_))));
            }
            andere => panic!("Erwartet Fehler-Textframe, erhalten {andere:?}"),
        }
        assert!(!client.task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_sendet_close_frame() {
        let (handle, shutdown_tx, shutdown_rx) = session();
        let mut client = verbinden(&handle, shutdown_rx);

        shutdown_tx.send(true).unwrap();

        assert!(matches!(client.naechste().await, Some(Message::Close(None))));
        client.task.await.unwrap();
    }
}
