//! Buzz-Queue – Reihenfolge der Buzzer-Druecke
//!
//! Haelt die Buzzes in Ankunftsreihenfolge. Zeitstempel werden beim
//! Aufzeichnen vergeben und sind nie kleiner als der vorherige, auch
//! wenn die Systemuhr zurueckspringt.

use buzzer_core::ParticipantId;
use buzzer_protocol::BuzzEvent;

/// Geordnete Liste aller Buzzes seit dem letzten `reset`/`start`
#[derive(Debug, Default)]
pub struct BuzzQueue {
    eintraege: Vec<BuzzEvent>,
    letzter_zeitstempel: i64,
}

impl BuzzQueue {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Haengt einen Buzz mit aktuellem Zeitstempel an
    ///
    /// Mehrfache Buzzes derselben Identitaet werden alle aufgezeichnet.
    pub fn record_buzz(&mut self, id: ParticipantId, name: String) -> BuzzEvent {
        let jetzt = chrono::Utc::now().timestamp_millis();
        self.aufzeichnen_mit_zeit(id, name, jetzt)
    }

    fn aufzeichnen_mit_zeit(&mut self, id: ParticipantId, name: String, zeit_ms: i64) -> BuzzEvent {
        let timestamp = zeit_ms.max(self.letzter_zeitstempel);
        self.letzter_zeitstempel = timestamp;

        let event = BuzzEvent {
            player_id: id,
            player_name: name,
            timestamp,
        };
        self.eintraege.push(event.clone());
        event
    }

    /// 1-basierter Rang des ersten Buzz dieser Identitaet
    pub fn position_of(&self, id: &ParticipantId) -> Option<usize> {
        self.eintraege
            .iter()
            .position(|e| &e.player_id == id)
            .map(|index| index + 1)
    }

    /// Alle Buzzes in Ankunftsreihenfolge
    pub fn snapshot(&self) -> &[BuzzEvent] {
        &self.eintraege
    }

    /// Leert die Queue. Der Zeitstempel-Boden bleibt erhalten.
    pub fn clear(&mut self) {
        self.eintraege.clear();
    }

    /// Entfernt alle Buzzes einer Identitaet und gibt die Anzahl zurueck
    pub fn remove_all_for(&mut self, id: &ParticipantId) -> usize {
        let vorher = self.eintraege.len();
        self.eintraege.retain(|e| &e.player_id != id);
        vorher - self.eintraege.len()
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(queue: &BuzzQueue) -> Vec<&str> {
        queue.snapshot().iter().map(|e| e.player_id.as_str()).collect()
    }

    #[test]
    fn ankunftsreihenfolge_ergibt_positionen() {
        let mut queue = BuzzQueue::neu();
        queue.record_buzz("a".into(), "A".into());
        queue.record_buzz("b".into(), "B".into());
        queue.record_buzz("c".into(), "C".into());

        assert_eq!(queue.position_of(&"a".into()), Some(1));
        assert_eq!(queue.position_of(&"b".into()), Some(2));
        assert_eq!(queue.position_of(&"c".into()), Some(3));
        assert_eq!(queue.position_of(&"x".into()), None);
        assert_eq!(ids(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn doppelter_buzz_zaehlt_erste_position() {
        let mut queue = BuzzQueue::neu();
        queue.record_buzz("a".into(), "A".into());
        queue.record_buzz("b".into(), "B".into());
        queue.record_buzz("a".into(), "A".into());

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.position_of(&"a".into()), Some(1));
    }

    #[test]
    fn zeitstempel_fallen_nie() {
        let mut queue = BuzzQueue::neu();
        let erster = queue.aufzeichnen_mit_zeit("a".into(), "A".into(), 5_000);
        let zweiter = queue.aufzeichnen_mit_zeit("b".into(), "B".into(), 4_000);
        let dritter = queue.aufzeichnen_mit_zeit("c".into(), "C".into(), 6_000);

        assert_eq!(erster.timestamp, 5_000);
        assert_eq!(zweiter.timestamp, 5_000);
        assert_eq!(dritter.timestamp, 6_000);
    }

    #[test]
    fn echte_uhr_liefert_monotone_zeitstempel() {
        let mut queue = BuzzQueue::neu();
        let a = queue.record_buzz("a".into(), "A".into());
        let b = queue.record_buzz("b".into(), "B".into());
        assert!(b.timestamp >= a.timestamp);
        assert!(a.timestamp > 0);
    }

    #[test]
    fn leeren_und_entfernen() {
        let mut queue = BuzzQueue::neu();
        queue.record_buzz("a".into(), "A".into());
        queue.record_buzz("b".into(), "B".into());
        queue.record_buzz("a".into(), "A".into());

        assert_eq!(queue.remove_all_for(&"a".into()), 2);
        assert_eq!(ids(&queue), vec!["b"]);
        assert_eq!(queue.position_of(&"b".into()), Some(1));
        assert_eq!(queue.remove_all_for(&"a".into()), 0);

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.snapshot().is_empty());
    }
}
