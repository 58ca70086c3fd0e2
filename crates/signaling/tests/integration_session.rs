//! Integration-Tests fuer die laufende Session (Runtime + Dispatcher)

use buzzer_protocol::{LeaderboardEntry, ServerMessage};
use buzzer_signaling::{session_starten, ClientSender, Session, SessionHandle};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const GEHEIM: &str = "paw tuah";

struct Client {
    sender: ClientSender,
    rx: mpsc::Receiver<ServerMessage>,
}

impl Client {
    fn neu() -> Self {
        let (sender, rx) = ClientSender::kanal(64);
        Self { sender, rx }
    }

    async fn senden(&self, session: &SessionHandle, wert: serde_json::Value) {
        assert!(
            session
                .nachricht_zustellen(self.sender.clone(), wert.to_string())
                .await,
            "Session sollte laufen"
        );
    }

    async fn join(&self, session: &SessionHandle, id: &str, name: &str, key: Option<&str>) {
        let mut data = json!({"playerId": id, "playerName": name});
        if let Some(key) = key {
            data["apiKey"] = json!(key);
        }
        self.senden(session, json!({"type": "join", "data": data})).await;
    }

    fn empfangen(&mut self) -> Vec<ServerMessage> {
        let mut nachrichten = Vec::new();
        while let Ok(n) = self.rx.try_recv() {
            nachrichten.push(n);
        }
        nachrichten
    }
}

/// Wartet bis alle vorher gesendeten Ereignisse verarbeitet sind
async fn synchronisieren(session: &SessionHandle) {
    session.status().await.expect("Session sollte laufen");
}

fn starten() -> (SessionHandle, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (handle, _task) =
        session_starten(Session::neu(GEHEIM), Duration::from_secs(10), shutdown_rx);
    (handle, shutdown_tx)
}

fn buzz(id: &str, name: &str) -> serde_json::Value {
    json!({"type": "buzz", "data": {"playerId": id, "playerName": name}})
}

fn rangliste(nachrichten: &[ServerMessage]) -> Vec<LeaderboardEntry> {
    nachrichten
        .iter()
        .rev()
        .find_map(|n| match n {
            ServerMessage::Leaderboard(e) => Some(e.clone()),
            _ => None,
        })
        .expect("Rangliste erwartet")
}

#[tokio::test]
async fn quizrunde_von_join_bis_start() {
    let (session, _shutdown) = starten();
    let mut host = Client::neu();
    let mut alice = Client::neu();
    let mut carl = Client::neu();

    host.join(&session, "h1", "Bob", Some(GEHEIM)).await;
    alice.join(&session, "p1", "Alice", None).await;
    carl.join(&session, "p2", "Carl", None).await;
    synchronisieren(&session).await;
    host.empfangen();

    carl.senden(&session, buzz("p2", "Carl")).await;
    alice.senden(&session, buzz("p1", "Alice")).await;
    alice
        .senden(&session, json!({"type": "getPosition", "data": {"playerId": "p1"}}))
        .await;
    synchronisieren(&session).await;

    assert_eq!(alice.empfangen(), vec![ServerMessage::position(2)]);
    let buzzes: Vec<String> = host
        .empfangen()
        .into_iter()
        .filter_map(|n| match n {
            ServerMessage::Buzz(e) => Some(e.player_name),
            _ => None,
        })
        .collect();
    assert_eq!(buzzes, vec!["Carl", "Alice"]);

    host.senden(&session, json!({"type": "adjustScore", "data": {"playerId": "p2", "delta": 200}}))
        .await;
    host.senden(&session, json!({"type": "adjustScore", "data": {"playerId": "p1", "delta": -100}}))
        .await;
    synchronisieren(&session).await;

    let stand = rangliste(&host.empfangen());
    let reihenfolge: Vec<(&str, i64)> =
        stand.iter().map(|e| (e.player_name.as_str(), e.delta)).collect();
    assert_eq!(reihenfolge, vec![("Carl", 200), ("Alice", -100)]);

    host.senden(&session, json!({"type": "reset"})).await;
    synchronisieren(&session).await;
    assert_eq!(alice.empfangen(), vec![ServerMessage::reset()]);
    assert_eq!(carl.empfangen(), vec![ServerMessage::reset()]);
    assert_eq!(session.status().await.map(|s| s.buzzes), Some(0));

    host.senden(&session, json!({"type": "start"})).await;
    synchronisieren(&session).await;
    let nachrichten = host.empfangen();
    assert!(rangliste(&nachrichten).iter().all(|e| e.delta == 0));
    assert_eq!(nachrichten.last(), Some(&ServerMessage::start()));
}

#[tokio::test]
async fn host_abgang_wird_anderen_hosts_gemeldet() {
    let (session, _shutdown) = starten();
    let h1 = Client::neu();
    let mut h2 = Client::neu();

    h1.join(&session, "h1", "Bob", Some(GEHEIM)).await;
    h2.join(&session, "h2", "Dora", Some(GEHEIM)).await;
    synchronisieren(&session).await;
    h2.empfangen();

    session.verbindung_getrennt(h1.sender.verbindung()).await;
    synchronisieren(&session).await;

    let nachrichten = h2.empfangen();
    assert_eq!(nachrichten[0], ServerMessage::host_disconnected("h1".into()));
    assert_eq!(session.status().await.map(|s| s.hosts), Some(1));
}

#[tokio::test]
async fn spieler_abgang_entfernt_seine_buzzes() {
    let (session, _shutdown) = starten();
    let mut host = Client::neu();
    let alice = Client::neu();
    let carl = Client::neu();

    host.join(&session, "h1", "Bob", Some(GEHEIM)).await;
    alice.join(&session, "p1", "Alice", None).await;
    carl.join(&session, "p2", "Carl", None).await;
    alice.senden(&session, buzz("p1", "Alice")).await;
    carl.senden(&session, buzz("p2", "Carl")).await;
    session.verbindung_getrennt(alice.sender.verbindung()).await;
    synchronisieren(&session).await;
    host.empfangen();

    host.senden(&session, json!({"type": "getBuzzList"})).await;
    synchronisieren(&session).await;

    match host.empfangen().as_slice() {
        [ServerMessage::BuzzList(liste)] => {
            assert_eq!(liste.len(), 1);
            assert_eq!(liste[0].player_id.as_str(), "p2");
        }
        andere => panic!("Erwartet buzzList, erhalten {andere:?}"),
    }
}

#[tokio::test]
async fn fehler_bleiben_bei_der_verbindung() {
    let (session, _shutdown) = starten();
    let mut host = Client::neu();
    let mut stoerer = Client::neu();

    host.join(&session, "h1", "Bob", Some(GEHEIM)).await;
    synchronisieren(&session).await;
    host.empfangen();

    stoerer.senden(&session, json!({"type": "tanzen"})).await;
    stoerer.join(&session, "h1", "Bob", None).await;
    stoerer.join(&session, "x", "Eve", Some("falsch")).await;
    synchronisieren(&session).await;

    let fehler = stoerer.empfangen();
    assert_eq!(fehler.len(), 3);
    assert!(fehler.iter().all(|n| matches!(n, ServerMessage::Error(_))));
    assert!(host.empfangen().is_empty());
    assert_eq!(session.status().await.map(|s| s.teilnehmer), Some(1));
}

#[tokio::test]
async fn shutdown_beendet_die_session() {
    let (session, shutdown) = starten();
    shutdown.send(true).unwrap();

    for _ in 0..100 {
        if session.ist_beendet() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(session.status().await.is_none());
}
