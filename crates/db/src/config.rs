//! Konfiguration fuer die Datenbankverbindung
//!
//! PostgreSQL wird aus Einzelparametern (Host, Datenbank, Benutzer, Passwort,
//! Port) angesprochen, SQLite ueber eine URL.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::error::DbError;

/// Unterstuetzte Datenbank-Backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// SQLite – fuer Single-Instance-Betrieb und Tests
    Sqlite,
    /// PostgreSQL – Produktionsbetrieb
    Postgres,
}

impl std::fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "SQLite"),
            Self::Postgres => write!(f, "PostgreSQL"),
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = DbError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(DbError::Konfiguration(format!(
                "Unbekanntes Datenbank-Backend: {other}"
            ))),
        }
    }
}

/// Konfiguration fuer die Datenbankverbindung
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Ausgewaehltes Backend
    pub backend: DatabaseBackend,
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    /// Verbindungs-URL, nur fuer SQLite (z.B. "sqlite://commons.db")
    pub url: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen (= offener Transaktionen)
    pub max_verbindungen: u32,
    /// Anzahl Verbindungsversuche beim Start (mindestens 1)
    pub verbindungs_versuche: u32,
    /// Wartezeit vor dem zweiten Versuch; verdoppelt sich danach
    pub retry_basis: Duration,
}

// Das Passwort taucht nie in Debug-Ausgaben auf
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("url", &self.url)
            .field("max_verbindungen", &self.max_verbindungen)
            .field("verbindungs_versuche", &self.verbindungs_versuche)
            .field("retry_basis", &self.retry_basis)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Postgres,
            host: String::new(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            port: 5432,
            url: "sqlite://commons.db".into(),
            max_verbindungen: 10,
            verbindungs_versuche: 5,
            retry_basis: Duration::from_secs(1),
        }
    }
}

impl DatabaseConfig {
    /// Prueft ob alle Verbindungsparameter gesetzt sind
    pub fn pruefen(&self) -> Result<(), DbError> {
        let fehlt = |feld: &str| -> Result<(), DbError> {
            Err(DbError::Konfiguration(format!("{feld} ist leer")))
        };
        match self.backend {
            DatabaseBackend::Sqlite if self.url.is_empty() => fehlt("datenbank.url"),
            DatabaseBackend::Sqlite => Ok(()),
            DatabaseBackend::Postgres => {
                if self.host.is_empty() {
                    fehlt("datenbank.host")
                } else if self.database.is_empty() {
                    fehlt("datenbank.database")
                } else if self.user.is_empty() {
                    fehlt("datenbank.user")
                } else if self.password.is_empty() {
                    fehlt("datenbank.password")
                } else if self.port == 0 {
                    fehlt("datenbank.port")
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Baut die Verbindungs-URL; Benutzer und Passwort werden percent-kodiert
    pub fn verbindungs_url(&self) -> Result<String, DbError> {
        self.pruefen()?;
        Ok(match self.backend {
            DatabaseBackend::Sqlite => self.url.clone(),
            DatabaseBackend::Postgres => format!(
                "postgres://{}/{}?sslmode=disable&user={}&password={}&port={}",
                self.host,
                self.database,
                utf8_percent_encode(&self.user, NON_ALPHANUMERIC),
                utf8_percent_encode(&self.password, NON_ALPHANUMERIC),
                self.port,
            ),
        })
    }
}
