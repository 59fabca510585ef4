//! Schluessel-Stream: Abruf gemeldeter Schluessel mit Frist
//!
//! Ein Produzenten-Task haelt eine Nur-Lese-Transaktion und schiebt Zeile fuer
//! Zeile durch einen Kanal mit genau einem Platz. Der Verbraucher zieht mit
//! [`SchluesselStream::naechster`]; solange er nicht zieht, wartet der
//! Produzent. Die Frist gilt fuer den ganzen Abruf. Laeuft sie ab oder tritt
//! ein Fehler auf, kommt genau ein `Err` und danach nur noch `None`.
//!
//! Die Transaktion wird nie committet. Wird der Stream vorzeitig verworfen,
//! bricht der Produzent ab und die Verbindung kehrt mit Rollback in den Pool
//! zurueck.

use std::time::Duration;

use futures::TryStreamExt;
use sqlx::any::AnyRow;
use sqlx::Row;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use commons_core::{Enin, Tek};

use crate::abfrage::{Parameter, Praedikat};
use crate::error::DbError;
use crate::models::GemeldeterSchluessel;
use crate::pool::Datenbank;
use crate::DbResult;

/// Standardfrist fuer einen Abruf
pub const STANDARD_FRIST: Duration = Duration::from_secs(120);

type Eintrag = DbResult<GemeldeterSchluessel>;

/// Endliche, nicht wiederholbare Folge gemeldeter Schluessel
pub struct SchluesselStream {
    empfaenger: mpsc::Receiver<Eintrag>,
    produzent: JoinHandle<()>,
    frist: Instant,
    beendet: bool,
}

impl Datenbank {
    /// Startet den Abruf aller Schluessel, die `praedikat` erfuellen.
    ///
    /// Die Reihenfolge ist aufsteigend nach Intervall, dann nach TEK.
    pub fn schluessel_streamen(&self, praedikat: Praedikat, frist: Duration) -> SchluesselStream {
        let (sender, empfaenger) = mpsc::channel(1);
        let frist = Instant::now() + frist;
        let span = tracing::info_span!(
            "schluessel_abruf",
            bedingungen = praedikat.bedingungen().len(),
            join = praedikat.join().is_some()
        );

        let produzent =
            tokio::spawn(produzieren(self.clone(), praedikat, sender, frist).instrument(span));

        SchluesselStream {
            empfaenger,
            produzent,
            frist,
            beendet: false,
        }
    }
}

impl SchluesselStream {
    /// Naechster Schluessel; `None` sobald der Stream erschoepft ist
    pub async fn naechster(&mut self) -> Option<Eintrag> {
        if self.beendet {
            return None;
        }

        match tokio::time::timeout_at(self.frist, self.empfaenger.recv()).await {
            Ok(Some(Ok(schluessel))) => Some(Ok(schluessel)),
            Ok(Some(Err(e))) => {
                self.abbrechen();
                Some(Err(e))
            }
            Ok(None) => {
                self.beendet = true;
                None
            }
            Err(_) => {
                warn!("Frist fuer den Schluessel-Abruf abgelaufen");
                self.abbrechen();
                Some(Err(DbError::Zeitlimit))
            }
        }
    }

    /// Beendet den Abruf vorzeitig; die Transaktion wird zurueckgerollt
    pub fn abbrechen(&mut self) {
        self.beendet = true;
        self.empfaenger.close();
        self.produzent.abort();
    }

    pub fn ist_beendet(&self) -> bool {
        self.beendet
    }

    /// Liest alle restlichen Schluessel; bricht beim ersten Fehler ab
    pub async fn sammeln(mut self) -> DbResult<Vec<GemeldeterSchluessel>> {
        let mut schluessel = Vec::new();
        while let Some(eintrag) = self.naechster().await {
            schluessel.push(eintrag?);
        }
        Ok(schluessel)
    }
}

impl Drop for SchluesselStream {
    fn drop(&mut self) {
        self.produzent.abort();
    }
}

async fn produzieren(
    db: Datenbank,
    praedikat: Praedikat,
    sender: mpsc::Sender<Eintrag>,
    frist: Instant,
) {
    let fehler = match tokio::time::timeout_at(frist, zeilen_senden(&db, &praedikat, &sender)).await
    {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(_) => DbError::Zeitlimit,
    };

    warn!(fehler = %fehler, "Schluessel-Abruf abgebrochen");
    // Der Verbraucher kann bereits weg sein
    let _ = sender.send(Err(fehler)).await;
}

async fn zeilen_senden(
    db: &Datenbank,
    praedikat: &Praedikat,
    sender: &mpsc::Sender<Eintrag>,
) -> DbResult<()> {
    let mut einheit = db.beginnen_lesend().await?;
    let sql = praedikat.sql();
    debug!(sql = %sql, "Abfrage gestartet");

    let mut abfrage = sqlx::query(&sql);
    for parameter in praedikat.parameter() {
        abfrage = match parameter {
            Parameter::Bytes(bytes) => abfrage.bind(bytes.clone()),
            Parameter::Zeitpunkt(zeitpunkt) => abfrage.bind(zeitpunkt.timestamp()),
        };
    }

    let mut gesendet = 0u64;
    {
        let mut zeilen = abfrage.fetch(einheit.verbindung());
        while let Some(zeile) = zeilen.try_next().await? {
            let schluessel = zeile_zu_schluessel(&zeile)?;
            if sender.send(Ok(schluessel)).await.is_err() {
                debug!(gesendet, "Verbraucher hat den Abruf verlassen");
                break;
            }
            gesendet += 1;
        }
    }

    // Nur gelesen; nichts zu committen
    einheit.zuruecksetzen().await?;
    debug!(gesendet, "Abfrage abgeschlossen");
    Ok(())
}

fn zeile_zu_schluessel(zeile: &AnyRow) -> DbResult<GemeldeterSchluessel> {
    let tek: Vec<u8> = zeile.try_get("tek")?;
    let sekunden: i64 = zeile.try_get("enin")?;

    Ok(GemeldeterSchluessel {
        tek: Tek::aus_bytes(&tek).ok_or_else(|| {
            DbError::ungueltige_daten(format!("TEK mit {} Bytes gespeichert", tek.len()))
        })?,
        enin: Enin::aus_sekunden(sekunden).ok_or_else(|| {
            DbError::ungueltige_daten(format!("Zeitstempel {sekunden} ergibt kein Intervall"))
        })?,
    })
}
