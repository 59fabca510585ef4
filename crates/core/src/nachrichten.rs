//! Anfrage- und Antwortformen an der Schnittstelle
//!
//! Diese Typen bilden den Vertrag mit dem Transport ab (gRPC/HTTP-Gateway).
//! Bytefelder sind hier noch ungeprueft (`Vec<u8>`); erst die
//! Validierungsschicht macht daraus die 16-Byte-Newtypes. Leere Felder
//! bedeuten "nicht gesetzt".

use serde::{Deserialize, Serialize};

/// Anfrage einer Gesundheitsbehoerde nach einem Einmal-Token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub api_key: Vec<u8>,
    /// RFC3339-Zeitstempel
    pub permitted_range_start: String,
    /// RFC3339-Zeitstempel
    pub permitted_range_end: String,
}

/// Antwort auf [`TokenRequest`]: entweder Token oder Fehlertext
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    pub authorization_key: Vec<u8>,
    pub error: String,
}

impl TokenResponse {
    pub fn token(authorization_key: Vec<u8>) -> Self {
        Self {
            authorization_key,
            error: String::new(),
        }
    }

    pub fn fehler(error: impl Into<String>) -> Self {
        Self {
            authorization_key: Vec::new(),
            error: error.into(),
        }
    }
}

/// Ein TEK mit seiner Intervallnummer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampedTek {
    pub tek: Vec<u8>,
    pub enin: u32,
}

/// Meldung eines Patienten: Token plus Liste von TEKs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub authorization_key: Vec<u8>,
    pub reports: Vec<TimestampedTek>,
}

/// Antwort auf [`Report`]; `error` ist bei Erfolg leer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddReportResponse {
    pub error: String,
}

impl AddReportResponse {
    pub fn fehler(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }

    pub fn ist_erfolgreich(&self) -> bool {
        self.error.is_empty()
    }
}

/// Historischer Zeitraum fuer den Abruf
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalRange {
    /// RFC3339; wird als *obere* Grenze des Rueckblicks verwendet
    pub start_date: String,
    pub days: u32,
}

/// Filter fuer den Abruf gemeldeter Schluessel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetKeyRequest {
    /// Opake Behoerden-ID
    pub hak: Vec<u8>,
    /// 0 = nicht gesetzt
    pub enin: u32,
    pub hrange: Option<HistoricalRange>,
}

/// Ein Element des Abruf-Streams: Datensatz oder abschliessender Fehler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetDiagnosisKeyResponse {
    pub record: Option<TimestampedTek>,
    pub error: String,
}

impl GetDiagnosisKeyResponse {
    pub fn datensatz(record: TimestampedTek) -> Self {
        Self {
            record: Some(record),
            error: String::new(),
        }
    }

    pub fn fehler(error: impl Into<String>) -> Self {
        Self {
            record: None,
            error: error.into(),
        }
    }
}
