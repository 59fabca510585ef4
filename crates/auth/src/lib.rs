//! commons-auth – Token-Ausgabe und Meldungsannahme
//!
//! Dieses Crate implementiert:
//! - TokenAussteller (API-Key pruefen, Einmal-Token mit Zeitfenster anlegen)
//! - MeldungsService (Token pruefen, Schluessel atomar und fenstergeprueft speichern)

pub mod aussteller;
pub mod error;
pub mod meldung;

// Bequeme Re-Exporte
pub use aussteller::{zufalls_token, TokenAussteller, TokenErzeuger};
pub use error::{AuthError, AuthResult};
pub use meldung::{MeldungsErgebnis, MeldungsService};
