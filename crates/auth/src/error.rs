//! Fehlertypen fuer Token-Ausgabe und Meldungsannahme

use chrono::{DateTime, Utc};
use thiserror::Error;

use commons_core::{ValidierungsFehler, Zeitfenster};
use commons_db::DbError;

/// Alle moeglichen Fehler beim Ausstellen und Einreichen
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Validierung ---
    #[error("Ungueltige Anfrage: {0}")]
    Validierung(#[from] ValidierungsFehler),

    // --- Autorisierung ---
    #[error("api_key ist keiner Gesundheitsbehoerde zugeordnet")]
    ApiKeyUnbekannt,

    #[error("authorization_key ist unbekannt")]
    AutorisierungUnbekannt,

    // --- Zeitfenster ---
    #[error("Eintrag {index} mit Zeitpunkt {} liegt ausserhalb des erlaubten Fensters {fenster}", zeitpunkt.to_rfc3339())]
    AusserhalbFenster {
        index: usize,
        zeitpunkt: DateTime<Utc>,
        fenster: Zeitfenster,
    },

    // --- Datenbank ---
    #[error("Datenbankfehler: {0}")]
    Datenbank(#[from] DbError),
}

/// Result-Alias fuer den Auth-Service
pub type AuthResult<T> = Result<T, AuthError>;
