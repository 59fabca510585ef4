//! Fehlertypen fuer das Datenbank-Crate

use thiserror::Error;

/// Datenbank-Fehlertypen
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Ungueltige Datenbank-Konfiguration: {0}")]
    Konfiguration(String),

    #[error("Keine Verbindung zur Datenbank: {0}")]
    Verbindung(#[source] sqlx::Error),

    #[error("Transaktion konnte nicht begonnen werden: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("Commit der Transaktion fehlgeschlagen: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("Fehler waehrend der Transaktion ({ursache}); Rollback fehlgeschlagen: {rollback}")]
    RollbackFehlgeschlagen {
        ursache: String,
        #[source]
        rollback: sqlx::Error,
    },

    #[error("Eindeutigkeitsverletzung: {0}")]
    Eindeutigkeit(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Zeitlimit fuer den Abruf ueberschritten")]
    Zeitlimit,

    #[error("SQLx-Fehler: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration-Fehler: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub fn ungueltige_daten(msg: impl Into<String>) -> Self {
        Self::UngueltigeDaten(msg.into())
    }

    /// Gibt true zurueck wenn ein neuer Verbindungsversuch sinnvoll ist.
    /// Abgelehnte Anmeldung, fehlende Datenbank oder falsche Konfiguration
    /// aendern sich durch Warten nicht.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Verbindung(
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Protocol(_)
            )
        )
    }

    /// Gibt true zurueck wenn es sich um einen Eindeutigkeitsfehler handelt
    pub fn ist_eindeutigkeit(&self) -> bool {
        matches!(self, Self::Eindeutigkeit(_))
            || matches!(self, Self::Sqlx(sqlx::Error::Database(e)) if e.is_unique_violation())
    }
}

/// Ordnet Fehler beim Holen einer Pool-Verbindung ein: alles, was vor dem
/// eigentlichen BEGIN scheitert, ist ein Verbindungsproblem.
pub(crate) fn begin_fehler(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => DbError::Verbindung(e),
        e => DbError::Begin(e),
    }
}
