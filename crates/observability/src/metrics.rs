//! Prometheus-kompatible Metriken fuer den Buzzer
//!
//! Registrierte Metriken:
//! - `buzzer_participants` – Gauge (role): Registrierte Teilnehmer
//! - `buzzer_buzzes_total` – Counter: Aufgezeichnete Buzzes
//! - `buzzer_commands_total` – Counter (command): Verarbeitete Befehle
//! - `buzzer_errors_total` – Counter (kind): Fehler-Antworten an Clients
//! - `buzzer_departures_total` – Counter (cause): Entfernte Teilnehmer

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Buzzer-Prometheus-Metriken
#[derive(Clone)]
pub struct BuzzerMetrics {
    pub registry: Arc<Registry>,
    pub participants: IntGaugeVec,
    pub buzzes_total: IntCounter,
    pub commands_total: IntCounterVec,
    pub errors_total: IntCounterVec,
    pub departures_total: IntCounterVec,
}

impl BuzzerMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let participants = IntGaugeVec::new(
            Opts::new("buzzer_participants", "Anzahl registrierter Teilnehmer"),
            &["role"],
        )?;
        registry.register(Box::new(participants.clone()))?;

        let buzzes_total = IntCounter::with_opts(Opts::new(
            "buzzer_buzzes_total",
            "Gesamtanzahl aufgezeichneter Buzzes",
        ))?;
        registry.register(Box::new(buzzes_total.clone()))?;

        let commands_total = IntCounterVec::new(
            Opts::new("buzzer_commands_total", "Gesamtanzahl verarbeiteter Befehle"),
            &["command"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("buzzer_errors_total", "Gesamtanzahl Fehler-Antworten"),
            &["kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let departures_total = IntCounterVec::new(
            Opts::new("buzzer_departures_total", "Gesamtanzahl entfernter Teilnehmer"),
            &["cause"],
        )?;
        registry.register(Box::new(departures_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            participants,
            buzzes_total,
            commands_total,
            errors_total,
            departures_total,
        })
    }

    /// Setzt die Teilnehmer-Gauges auf den aktuellen Stand
    pub fn teilnehmer_setzen(&self, hosts: usize, spieler: usize) {
        self.participants
            .with_label_values(&["host"])
            .set(hosts as i64);
        self.participants
            .with_label_values(&["player"])
            .set(spieler as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: BuzzerMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<BuzzerMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
