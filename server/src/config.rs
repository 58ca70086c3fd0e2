//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use buzzer_observability::logging::{log_format_gueltig, log_level_gueltig};
use buzzer_signaling::connection::{VerbindungsEinstellungen, PING_INTERVALL};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ueberschreibt `session.host_secret`
pub const HOST_SECRET_ENV: &str = "BUZZER_HOST_SECRET";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Quiz-Session
    pub session: SessionEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename, erscheint in `GET /`
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Buzzer Server".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Ein Port fuer WebSocket, Info, Health und Metriken
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 25503,
        }
    }
}

/// Einstellungen der Quiz-Session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEinstellungen {
    /// Zugangsschluessel fuer Hosts (leer = keine Hosts moeglich)
    pub host_secret: String,
    /// Abstand der Liveness-Pruefung in Sekunden
    pub liveness_intervall_sek: u64,
    /// Ausgehende Nachrichten pro Verbindung, bevor verworfen wird
    pub send_queue_groesse: usize,
    /// Verbindung ohne empfangenen Frame wird nach dieser Zeit getrennt
    pub verbindungs_timeout_sek: u64,
}

impl Default for SessionEinstellungen {
    fn default() -> Self {
        Self {
            host_secret: String::new(),
            liveness_intervall_sek: 10,
            send_queue_groesse: 64,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    /// Parst eine Konfiguration aus einem TOML-String
    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Prueft Werte, die serde nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.session.liveness_intervall_sek == 0 {
            anyhow::bail!("session.liveness_intervall_sek muss groesser als 0 sein");
        }
        if self.session.send_queue_groesse == 0 {
            anyhow::bail!("session.send_queue_groesse muss groesser als 0 sein");
        }
        // Sonst trennt der Timeout Clients, bevor sie auf einen Ping antworten koennen
        if self.verbindungs_timeout() <= PING_INTERVALL {
            anyhow::bail!(
                "session.verbindungs_timeout_sek muss groesser als {} sein",
                PING_INTERVALL.as_secs()
            );
        }
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Unbekanntes Log-Format '{}'", self.logging.format);
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Host-Geheimnis, die Umgebungsvariable hat Vorrang
    pub fn host_secret(&self) -> String {
        std::env::var(HOST_SECRET_ENV).unwrap_or_else(|_| self.session.host_secret.clone())
    }

    pub fn liveness_intervall(&self) -> Duration {
        Duration::from_secs(self.session.liveness_intervall_sek)
    }

    pub fn verbindungs_timeout(&self) -> Duration {
        Duration::from_secs(self.session.verbindungs_timeout_sek)
    }

    /// Parameter fuer jede WebSocket-Verbindung
    pub fn verbindung(&self) -> VerbindungsEinstellungen {
        VerbindungsEinstellungen {
            queue_groesse: self.session.send_queue_groesse,
            ping_intervall: PING_INTERVALL,
            timeout: self.verbindungs_timeout(),
        }
    }
}
