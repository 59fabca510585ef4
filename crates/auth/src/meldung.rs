//! Annahme von Schluessel-Meldungen
//!
//! Eine Meldung wird ganz oder gar nicht uebernommen: liegt ein Eintrag
//! ausserhalb des Fensters seines Tokens, wird die gesamte Arbeitseinheit
//! zurueckgerollt, auch bereits eingefuegte Eintraege.

use tracing::{info, warn, Instrument, Span};

use commons_core::{bericht_pruefen, GepruefterBericht, Report};
use commons_db::{Arbeitseinheit, Datenbank};

use crate::error::{AuthError, AuthResult};

/// Ergebnis einer angenommenen Meldung
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeldungsErgebnis {
    /// Neu gespeicherte Schluessel
    pub eingefuegt: usize,
    /// Bereits bekannte Schluessel
    pub ignoriert: usize,
}

/// Nimmt Meldungen diagnostizierter Patienten entgegen
#[derive(Debug, Clone)]
pub struct MeldungsService {
    db: Datenbank,
    span: Span,
}

impl MeldungsService {
    pub fn neu(db: Datenbank, span: Span) -> Self {
        Self { db, span }
    }

    /// Prueft die Meldung und speichert alle Eintraege in einer Transaktion
    pub async fn bericht_hinzufuegen(&self, bericht: &Report) -> AuthResult<MeldungsErgebnis> {
        self.pruefen_und_speichern(bericht)
            .instrument(self.span.clone())
            .await
    }

    async fn pruefen_und_speichern(&self, bericht: &Report) -> AuthResult<MeldungsErgebnis> {
        let geprueft = bericht_pruefen(bericht).map_err(|e| {
            warn!(fehler = %e, "Meldung abgelehnt");
            e
        })?;

        let mut einheit = self.db.beginnen().await?;
        let ergebnis = eintraege_schreiben(&mut einheit, &geprueft).await;
        let ergebnis = einheit.abschliessen(ergebnis).await?;

        info!(
            token = %geprueft.authorization_key,
            eingefuegt = ergebnis.eingefuegt,
            ignoriert = ergebnis.ignoriert,
            "Meldung gespeichert"
        );
        Ok(ergebnis)
    }
}

async fn eintraege_schreiben(
    einheit: &mut Arbeitseinheit,
    bericht: &GepruefterBericht,
) -> AuthResult<MeldungsErgebnis> {
    let fenster = einheit
        .fenster_laden(&bericht.authorization_key)
        .await?
        .ok_or_else(|| {
            warn!(token = %bericht.authorization_key, "Meldung mit unbekanntem Token");
            AuthError::AutorisierungUnbekannt
        })?;

    let mut ergebnis = MeldungsErgebnis::default();
    for (index, eintrag) in bericht.eintraege.iter().enumerate() {
        let zeitpunkt = eintrag.enin.zeitpunkt();
        if !fenster.enthaelt(zeitpunkt) {
            warn!(index, enin = %eintrag.enin, fenster = %fenster, "Eintrag ausserhalb des Fensters");
            return Err(AuthError::AusserhalbFenster {
                index,
                zeitpunkt,
                fenster,
            });
        }

        if einheit
            .gemeldeten_schluessel_einfuegen(&eintrag.tek, zeitpunkt, &bericht.authorization_key)
            .await?
        {
            ergebnis.eingefuegt += 1;
        } else {
            ergebnis.ignoriert += 1;
        }
    }

    Ok(ergebnis)
}
