//! Validierungsschicht
//!
//! Zustandslose Pruefungen fuer jede eingehende Anfrageform. Keine Funktion
//! hier beruehrt die Datenbank. Bei Erfolg entsteht ein gepruefter Wert mit
//! starken Typen, sodass nachgelagerte Schichten nie ungepruefte Eingaben
//! sehen.

use chrono::{DateTime, Utc};

use crate::error::ValidierungsFehler;
use crate::nachrichten::{GetKeyRequest, Report, TokenRequest};
use crate::types::{ApiKey, AuthorizationKey, Enin, Tek, Zeitfenster};

/// Gepruefte Token-Anfrage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GepruefteTokenAnfrage {
    pub api_key: ApiKey,
    pub fenster: Zeitfenster,
}

/// Ein geprueftes TEK/ENIN-Paar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BerichtsEintrag {
    pub tek: Tek,
    pub enin: Enin,
}

/// Gepruefte Meldung; Eintraege in Einreichungsreihenfolge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GepruefterBericht {
    pub authorization_key: AuthorizationKey,
    pub eintraege: Vec<BerichtsEintrag>,
}

/// Historischer Zeitraum nach der Pruefung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zeitraum {
    /// Trotz des Namens die *obere* Grenze des Rueckblicks; `None` = jetzt
    pub start_datum: Option<DateTime<Utc>>,
    /// Anzahl Tage des Rueckblicks; 0 wird wie 1 behandelt
    pub tage: u32,
}

/// Gepruefter Filtersatz; mindestens ein Filter ist gesetzt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchluesselFilter {
    pub authority: Option<Vec<u8>>,
    pub enin: Option<Enin>,
    pub zeitraum: Option<Zeitraum>,
}

fn rfc3339(wert: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(wert)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Prueft einen [`TokenRequest`]
pub fn token_anfrage_pruefen(
    anfrage: &TokenRequest,
) -> Result<GepruefteTokenAnfrage, ValidierungsFehler> {
    if anfrage.api_key.is_empty() {
        return Err(ValidierungsFehler::ApiKeyFehlt);
    }
    let api_key = ApiKey::aus_bytes(&anfrage.api_key)
        .ok_or(ValidierungsFehler::ApiKeyLaenge(anfrage.api_key.len()))?;

    let start = rfc3339(&anfrage.permitted_range_start).ok_or_else(|| {
        ValidierungsFehler::FensterStartUngueltig(anfrage.permitted_range_start.clone())
    })?;
    let ende = rfc3339(&anfrage.permitted_range_end).ok_or_else(|| {
        ValidierungsFehler::FensterEndeUngueltig(anfrage.permitted_range_end.clone())
    })?;

    let fenster = Zeitfenster::neu(start, ende)
        .ok_or(ValidierungsFehler::FensterUmgekehrt)?
        .auf_ganze_sekunden()
        .ok_or(ValidierungsFehler::FensterOhneSekunde)?;

    Ok(GepruefteTokenAnfrage { api_key, fenster })
}

/// Prueft einen [`Report`]; Fehler in Eintraegen nennen deren Index
pub fn bericht_pruefen(bericht: &Report) -> Result<GepruefterBericht, ValidierungsFehler> {
    if bericht.authorization_key.is_empty() {
        return Err(ValidierungsFehler::AutorisierungFehlt);
    }
    let authorization_key = AuthorizationKey::aus_bytes(&bericht.authorization_key).ok_or(
        ValidierungsFehler::AutorisierungLaenge(bericht.authorization_key.len()),
    )?;

    if bericht.reports.is_empty() {
        return Err(ValidierungsFehler::KeineEintraege);
    }

    let eintraege = bericht
        .reports
        .iter()
        .enumerate()
        .map(|(index, eintrag)| {
            let tek = Tek::aus_bytes(&eintrag.tek).ok_or(ValidierungsFehler::TekLaenge {
                index,
                laenge: eintrag.tek.len(),
            })?;
            if eintrag.enin == 0 {
                return Err(ValidierungsFehler::EninNull { index });
            }
            Ok(BerichtsEintrag {
                tek,
                enin: Enin(eintrag.enin),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GepruefterBericht {
        authorization_key,
        eintraege,
    })
}

/// Prueft einen [`GetKeyRequest`]
pub fn schluessel_anfrage_pruefen(
    anfrage: &GetKeyRequest,
) -> Result<SchluesselFilter, ValidierungsFehler> {
    if anfrage.hak.is_empty() && anfrage.enin == 0 && anfrage.hrange.is_none() {
        return Err(ValidierungsFehler::KeineFilter);
    }

    let zeitraum = match &anfrage.hrange {
        None => None,
        Some(bereich) if bereich.start_date.is_empty() && bereich.days == 0 => {
            return Err(ValidierungsFehler::ZeitraumLeer);
        }
        Some(bereich) => {
            let start_datum = if bereich.start_date.is_empty() {
                None
            } else {
                Some(rfc3339(&bereich.start_date).ok_or_else(|| {
                    ValidierungsFehler::StartDatumUngueltig(bereich.start_date.clone())
                })?)
            };
            Some(Zeitraum {
                start_datum,
                tage: bereich.days,
            })
        }
    };

    Ok(SchluesselFilter {
        authority: (!anfrage.hak.is_empty()).then(|| anfrage.hak.clone()),
        enin: (anfrage.enin != 0).then_some(Enin(anfrage.enin)),
        zeitraum,
    })
}
