//! buzzer-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::{Context, Result};
use axum::Router;
use buzzer_observability::{observability_router, BuzzerMetrics, HealthState};
use buzzer_signaling::{session_starten, Session, TransportState};
use config::ServerConfig;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Health-Zustand anlegen
    /// 2. Session-Task starten
    /// 3. HTTP/WebSocket-Listener binden
    /// 4. Auf Ctrl-C warten, dann Session und Verbindungen beenden
    pub async fn starten(self) -> Result<()> {
        let metriken = BuzzerMetrics::neu()?;
        let health = HealthState::neu();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let host_secret = self.config.host_secret();
        if host_secret.is_empty() {
            tracing::warn!(
                "Kein Host-Geheimnis konfiguriert – Host-Rolle deaktiviert ({} setzen)",
                config::HOST_SECRET_ENV
            );
        }

        let session = Session::neu(host_secret).mit_metriken(metriken.clone());
        let (handle, session_task) = session_starten(
            session,
            self.config.liveness_intervall(),
            shutdown_rx.clone(),
        );

        // Health meldet 503 sobald der Session-Task endet
        let health_waechter = health.clone();
        tokio::spawn(async move {
            if let Err(e) = session_task.await {
                tracing::error!(fehler = %e, "Session-Task abgebrochen");
            }
            health_waechter.session_status_setzen(false);
        });

        let transport = TransportState {
            session: handle,
            verbindung: self.config.verbindung(),
            shutdown_rx,
            name: self.config.server.name.clone(),
        };
        let app = app_bauen(transport, metriken, health);

        let adresse = self.config.bind_adresse();
        let listener = tokio::net::TcpListener::bind(&adresse)
            .await
            .with_context(|| format!("Bind auf {adresse} fehlgeschlagen"))?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %adresse,
            liveness_sek = self.config.session.liveness_intervall_sek,
            timeout_sek = self.config.session.verbindungs_timeout_sek,
            "Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)..."
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
                }
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            })
            .await
            .context("HTTP-Server beendet mit Fehler")?;

        Ok(())
    }
}

/// Baut den vollstaendigen Router: WebSocket, Info, Health und Metriken
pub fn app_bauen(
    transport: TransportState,
    metriken: BuzzerMetrics,
    health: HealthState,
) -> Router {
    buzzer_signaling::router(transport)
        .merge(observability_router(metriken, health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
