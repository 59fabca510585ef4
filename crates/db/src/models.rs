//! Datenbankmodelle fuer Commons
//!
//! Diese Typen repraesentieren Datensaetze aus den drei Tabellen
//! `health_authorities`, `authorization_keys` und `reported_keys`.

use commons_core::{ApiKey, AuthorizationKey, Enin, Tek, TimestampedTek, Zeitfenster};

/// Schluesseltyp fuer Tokens, die nach einer Diagnose ausgegeben werden
pub const KEY_TYPE_DIAGNOSED: &str = "DIAGNOSED";

// ---------------------------------------------------------------------------
// Gesundheitsbehoerden
// ---------------------------------------------------------------------------

/// Gesundheitsbehoerde (nur lesend fuer den Dienst)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthAuthorityRecord {
    pub authority_id: Vec<u8>,
    pub name: String,
    pub api_key: ApiKey,
}

// ---------------------------------------------------------------------------
// Autorisierungs-Tokens
// ---------------------------------------------------------------------------

/// Einmal-Token mit erlaubtem Zeitfenster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationKeyRecord {
    pub authorization_key: AuthorizationKey,
    pub api_key: ApiKey,
    pub key_type: String,
    pub fenster: Zeitfenster,
}

/// Daten zum Anlegen eines neuen Tokens
#[derive(Debug, Clone)]
pub struct NeuerAuthorizationKey<'a> {
    pub authorization_key: AuthorizationKey,
    pub api_key: &'a ApiKey,
    pub key_type: &'a str,
    pub fenster: Zeitfenster,
}

// ---------------------------------------------------------------------------
// Gemeldete Schluessel
// ---------------------------------------------------------------------------

/// Ein gemeldeter TEK, wie ihn der Abruf liefert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemeldeterSchluessel {
    pub tek: Tek,
    pub enin: Enin,
}

impl From<GemeldeterSchluessel> for TimestampedTek {
    fn from(s: GemeldeterSchluessel) -> Self {
        TimestampedTek {
            tek: s.tek.to_vec(),
            enin: s.enin.0,
        }
    }
}
