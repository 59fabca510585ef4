//! commons-core – Gemeinsame Typen, Nachrichten und Validierung
//!
//! Dieses Crate stellt die Bausteine bereit, die von allen anderen
//! Commons-Crates gemeinsam genutzt werden: die Anfrage-/Antwort-Formen an der
//! Schnittstelle, die 16-Byte-Schluesseltypen, ENIN-Zeitrechnung und die
//! zustandslose Validierungsschicht.

pub mod error;
pub mod nachrichten;
pub mod types;
pub mod validierung;

// Re-Exporte fuer bequemen Zugriff
pub use error::ValidierungsFehler;
pub use nachrichten::{
    AddReportResponse, GetDiagnosisKeyResponse, GetKeyRequest, HistoricalRange, Report,
    TimestampedTek, TokenRequest, TokenResponse,
};
pub use types::{ApiKey, AuthorizationKey, Enin, Tek, Zeitfenster};
pub use validierung::{
    bericht_pruefen, schluessel_anfrage_pruefen, token_anfrage_pruefen, BerichtsEintrag,
    GepruefteTokenAnfrage, GepruefterBericht, SchluesselFilter, Zeitraum,
};
