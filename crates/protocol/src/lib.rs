//! buzzer-protocol – Nachrichtenformat zwischen Client und Server
//!
//! Jede Nachricht ist ein JSON-Umschlag `{ "type": ..., "data": ... }`.
//! Eingehende Umschlaege werden zu einem typsicheren [`Command`]
//! dekodiert, ausgehende Nachrichten sind [`ServerMessage`]-Varianten.

pub mod control;

pub use control::{BuzzEvent, Command, Envelope, LeaderboardEntry, ServerMessage};
