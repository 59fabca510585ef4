//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte; die Verbindungsparameter fuer PostgreSQL koennen zusaetzlich
//! ueber `COMMONS_DB_*`-Umgebungsvariablen gesetzt werden, die Vorrang vor
//! der Datei haben.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use commons_db::{DatabaseBackend, DatabaseConfig};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Datenbank-Einstellungen
    pub datenbank: DatenbankEinstellungen,
    /// Schluessel-Abruf
    pub abruf: AbrufEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Datenbank-Einstellungen
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatenbankEinstellungen {
    /// Datenbank-Typ: "postgres" oder "sqlite"
    pub typ: String,
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    /// Verbindungs-URL, nur fuer SQLite
    pub url: String,
    /// Maximale Verbindungspool-Groesse
    pub max_verbindungen: u32,
    /// Verbindungsversuche beim Start
    pub verbindungs_versuche: u32,
    /// Wartezeit vor dem zweiten Versuch in Millisekunden
    pub retry_basis_ms: u64,
}

impl Default for DatenbankEinstellungen {
    fn default() -> Self {
        Self {
            typ: "postgres".into(),
            host: String::new(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            port: 5432,
            url: "sqlite://commons.db".into(),
            max_verbindungen: 10,
            verbindungs_versuche: 5,
            retry_basis_ms: 1000,
        }
    }
}

impl std::fmt::Debug for DatenbankEinstellungen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatenbankEinstellungen")
            .field("typ", &self.typ)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("url", &self.url)
            .field("max_verbindungen", &self.max_verbindungen)
            .finish_non_exhaustive()
    }
}

/// Einstellungen fuer den Schluessel-Abruf
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbrufEinstellungen {
    /// Frist fuer einen kompletten Abruf in Sekunden
    pub frist_sekunden: u64,
}

impl Default for AbrufEinstellungen {
    fn default() -> Self {
        Self {
            frist_sekunden: commons_db::STANDARD_FRIST.as_secs(),
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
    /// Laedt die Konfiguration aus einer TOML-Datei und wendet danach die
    /// Umgebungsvariablen an. Fehlt die Datei, gelten die Standardwerte.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!("Konfigurationsdatei '{pfad}' nicht lesbar: {e}"))
            }
        };

        config.umgebung_anwenden(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Ueberschreibt die Verbindungsparameter mit gesetzten Variablen
    pub fn umgebung_anwenden<F>(&mut self, variable: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.datenbank;
        if let Some(host) = variable("COMMONS_DB_HOST") {
            db.host = host;
        }
        if let Some(database) = variable("COMMONS_DB_DATABASE") {
            db.database = database;
        }
        if let Some(user) = variable("COMMONS_DB_USER") {
            db.user = user;
        }
        if let Some(password) = variable("COMMONS_DB_PASSWORD") {
            db.password = password;
        }
        if let Some(port) = variable("COMMONS_DB_PORT") {
            db.port = port
                .parse()
                .with_context(|| format!("COMMONS_DB_PORT ist kein gueltiger Port: '{port}'"))?;
        }
        Ok(())
    }

    /// Uebersetzt die Datenbank-Einstellungen fuer `commons-db`
    pub fn datenbank_config(&self) -> anyhow::Result<DatabaseConfig> {
        let db = &self.datenbank;
        let backend: DatabaseBackend = db.typ.parse()?;
        Ok(DatabaseConfig {
            backend,
            host: db.host.clone(),
            database: db.database.clone(),
            user: db.user.clone(),
            password: db.password.clone(),
            port: db.port,
            url: db.url.clone(),
            max_verbindungen: db.max_verbindungen,
            verbindungs_versuche: db.verbindungs_versuche,
            retry_basis: Duration::from_millis(db.retry_basis_ms),
        })
    }

    /// Frist fuer einen Schluessel-Abruf
    pub fn abruf_frist(&self) -> Duration {
        Duration::from_secs(self.abruf.frist_sekunden)
    }
}
