//! Diagnose-Dienst: die drei Anfragewege an einer Stelle
//!
//! Schreibende Anfragen liefern immer eine Antwort; ein Fehler steht als Text
//! im `error`-Feld. Der Abruf liefert Datensaetze, hoechstens einen
//! Fehlerdatensatz und endet danach.

use std::time::Duration;

use chrono::Utc;
use tracing::{info_span, warn};

use commons_auth::{MeldungsService, TokenAussteller};
use commons_core::{
    schluessel_anfrage_pruefen, AddReportResponse, GetDiagnosisKeyResponse, GetKeyRequest,
    Report, TokenRequest, TokenResponse, ValidierungsFehler,
};
use commons_db::{Datenbank, Praedikat, SchluesselStream};

/// Fassade ueber Ausgabe, Meldung und Abruf
#[derive(Debug, Clone)]
pub struct DiagnoseDienst {
    db: Datenbank,
    aussteller: TokenAussteller,
    meldungen: MeldungsService,
    frist: Duration,
}

impl DiagnoseDienst {
    pub fn neu(db: Datenbank, frist: Duration) -> Self {
        Self {
            aussteller: TokenAussteller::neu(db.clone(), info_span!("token_ausgabe")),
            meldungen: MeldungsService::neu(db.clone(), info_span!("meldung")),
            db,
            frist,
        }
    }

    /// Stellt ein Einmal-Token fuer eine Gesundheitsbehoerde aus
    pub async fn authorization_token(&self, anfrage: &TokenRequest) -> TokenResponse {
        match self.aussteller.token_ausstellen(anfrage).await {
            Ok(token) => TokenResponse::token(token.to_vec()),
            Err(e) => TokenResponse::fehler(e.to_string()),
        }
    }

    /// Nimmt eine Meldung an; leeres `error` bedeutet Erfolg
    pub async fn add_report(&self, bericht: &Report) -> AddReportResponse {
        match self.meldungen.bericht_hinzufuegen(bericht).await {
            Ok(_) => AddReportResponse::default(),
            Err(e) => AddReportResponse::fehler(e.to_string()),
        }
    }

    /// Startet einen Abruf gemeldeter Schluessel.
    ///
    /// Eine ungueltige Anfrage erreicht die Datenbank nie; der Stream
    /// liefert dann nur den Ablehnungsgrund.
    pub fn diagnosis_keys(&self, anfrage: &GetKeyRequest) -> AntwortStream {
        let zustand = match schluessel_anfrage_pruefen(anfrage) {
            Ok(filter) => {
                let praedikat = Praedikat::aus_filter(&filter, Utc::now());
                Zustand::Abruf(self.db.schluessel_streamen(praedikat, self.frist))
            }
            Err(e) => {
                warn!(fehler = %e, "Schluessel-Abruf abgelehnt");
                Zustand::Abgelehnt(Some(e))
            }
        };
        AntwortStream { zustand }
    }

    pub fn frist(&self) -> Duration {
        self.frist
    }

    /// Schliesst den Datenbank-Pool
    pub async fn schliessen(&self) {
        self.db.schliessen().await;
    }
}

enum Zustand {
    Abgelehnt(Option<ValidierungsFehler>),
    Abruf(SchluesselStream),
}

/// Antworten eines Abrufs in Liefer-Reihenfolge
pub struct AntwortStream {
    zustand: Zustand,
}

impl AntwortStream {
    /// Naechste Antwort; `None` am Ende
    pub async fn naechste(&mut self) -> Option<GetDiagnosisKeyResponse> {
        match &mut self.zustand {
            Zustand::Abgelehnt(fehler) => fehler
                .take()
                .map(|e| GetDiagnosisKeyResponse::fehler(e.to_string())),
            Zustand::Abruf(stream) => stream.naechster().await.map(|eintrag| match eintrag {
                Ok(schluessel) => GetDiagnosisKeyResponse::datensatz(schluessel.into()),
                Err(e) => GetDiagnosisKeyResponse::fehler(e.to_string()),
            }),
        }
    }

    /// Beendet den Abruf; weitere Aufrufe von `naechste` liefern `None`
    pub fn abbrechen(&mut self) {
        match &mut self.zustand {
            Zustand::Abgelehnt(fehler) => *fehler = None,
            Zustand::Abruf(stream) => stream.abbrechen(),
        }
    }

    /// Liest alle restlichen Antworten
    pub async fn sammeln(mut self) -> Vec<GetDiagnosisKeyResponse> {
        let mut antworten = Vec::new();
        while let Some(antwort) = self.naechste().await {
            antworten.push(antwort);
        }
        antworten
    }
}
