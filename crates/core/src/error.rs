//! Fehlertypen der Validierungsschicht
//!
//! Jede Anfrageform hat eigene, spezifische Ablehnungsgruende.

use thiserror::Error;

/// Gruende, aus denen eine Anfrage vor jedem Datenbankzugriff abgelehnt wird
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidierungsFehler {
    // --- TokenRequest ---
    #[error("api_key fehlt")]
    ApiKeyFehlt,

    #[error("api_key hat falsche Laenge: {0} Bytes statt 16")]
    ApiKeyLaenge(usize),

    #[error("permitted_range_start ist kein RFC3339-Zeitstempel: '{0}'")]
    FensterStartUngueltig(String),

    #[error("permitted_range_end ist kein RFC3339-Zeitstempel: '{0}'")]
    FensterEndeUngueltig(String),

    #[error("permitted_range_end liegt vor permitted_range_start")]
    FensterUmgekehrt,

    #[error("Zeitfenster enthaelt keine ganze Sekunde")]
    FensterOhneSekunde,

    // --- Report ---
    #[error("authorization_key fehlt")]
    AutorisierungFehlt,

    #[error("authorization_key hat falsche Laenge: {0} Bytes statt 16")]
    AutorisierungLaenge(usize),

    #[error("Report enthaelt keine Eintraege")]
    KeineEintraege,

    #[error("Eintrag {index} ist ungueltig: TEK hat {laenge} Bytes statt 16")]
    TekLaenge { index: usize, laenge: usize },

    #[error("Eintrag {index} ist ungueltig: ENIN ist 0")]
    EninNull { index: usize },

    // --- GetKeyRequest ---
    #[error("GetKeyRequest definiert keine Filter")]
    KeineFilter,

    #[error("GetKeyRequest.hrange ist leer")]
    ZeitraumLeer,

    #[error("hrange.start_date ist kein RFC3339-Zeitstempel: '{0}'")]
    StartDatumUngueltig(String),
}

impl ValidierungsFehler {
    /// Index des betroffenen Report-Eintrags, falls der Fehler einen betrifft
    pub fn eintrag_index(&self) -> Option<usize> {
        match self {
            Self::TekLaenge { index, .. } | Self::EninNull { index } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = ValidierungsFehler::TekLaenge { index: 3, laenge: 15 };
        assert_eq!(e.to_string(), "Eintrag 3 ist ungueltig: TEK hat 15 Bytes statt 16");
    }

    #[test]
    fn eintrag_index_nur_bei_eintraegen() {
        assert_eq!(ValidierungsFehler::EninNull { index: 2 }.eintrag_index(), Some(2));
        assert_eq!(ValidierungsFehler::KeineFilter.eintrag_index(), None);
    }
}
