//! Arbeitseinheit: eine Pool-Verbindung mit offener Transaktion
//!
//! Eine [`Arbeitseinheit`] wird ueber [`Datenbank::beginnen`] erworben und
//! endet auf genau einem von drei Wegen:
//! - [`Arbeitseinheit::abschliessen`] mit `Ok` → Commit
//! - [`Arbeitseinheit::abschliessen`] mit `Err` → Rollback
//! - Drop ohne Abschluss (frueher Return, abgebrochener Task) → Rollback,
//!   sobald die Verbindung in den Pool zurueckkehrt
//!
//! Ein Commit passiert nie implizit.
//!
//! [`Datenbank::beginnen`]: crate::pool::Datenbank::beginnen

use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyConnection, Row, Transaction};

use commons_core::types::zeitpunkt_aus_sekunden;
use commons_core::{ApiKey, AuthorizationKey, Tek, Zeitfenster};

use crate::error::DbError;
use crate::models::{HealthAuthorityRecord, NeuerAuthorizationKey};
use crate::DbResult;

/// Transaktionsgebundener Zugriff auf die Datenbank
pub struct Arbeitseinheit {
    tx: Transaction<'static, Any>,
}

impl Arbeitseinheit {
    pub(crate) fn neu(tx: Transaction<'static, Any>) -> Self {
        Self { tx }
    }

    /// Direkter Zugriff auf die Verbindung innerhalb der Transaktion
    pub fn verbindung(&mut self) -> &mut AnyConnection {
        &mut self.tx
    }

    /// Schliesst die Einheit anhand des Ergebnisses der Arbeit ab.
    ///
    /// `Ok` wird committet, ein Commit-Fehler wird zu [`DbError::Commit`].
    /// `Err` wird zurueckgerollt und unveraendert weitergegeben; schlaegt auch
    /// der Rollback fehl, entsteht [`DbError::RollbackFehlgeschlagen`] mit
    /// beiden Ursachen.
    pub async fn abschliessen<T, E>(self, ergebnis: Result<T, E>) -> Result<T, E>
    where
        E: From<DbError> + fmt::Display,
    {
        match ergebnis {
            Ok(wert) => {
                self.tx
                    .commit()
                    .await
                    .map_err(|e| E::from(DbError::Commit(e)))?;
                Ok(wert)
            }
            Err(fehler) => match self.tx.rollback().await {
                Ok(()) => Err(fehler),
                Err(rollback) => {
                    tracing::error!(
                        ursache = %fehler,
                        rollback = %rollback,
                        "Rollback fehlgeschlagen"
                    );
                    Err(E::from(DbError::RollbackFehlgeschlagen {
                        ursache: fehler.to_string(),
                        rollback,
                    }))
                }
            },
        }
    }

    /// Verwirft alle Aenderungen der Einheit
    pub async fn zuruecksetzen(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Gesundheitsbehoerden
    // -----------------------------------------------------------------------

    /// Sucht die Behoerde zum gegebenen API-Key
    pub async fn authority_per_api_key(
        &mut self,
        api_key: &ApiKey,
    ) -> DbResult<Option<HealthAuthorityRecord>> {
        let row = sqlx::query(
            "SELECT authority_id, name, api_key FROM health_authorities WHERE api_key = $1",
        )
        .bind(api_key.to_vec())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|r| row_to_authority(&r)).transpose()
    }

    /// Legt eine Behoerde an (Provisionierung ausserhalb der Anfragewege)
    pub async fn authority_einfuegen(&mut self, authority: &HealthAuthorityRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO health_authorities (authority_id, name, api_key) VALUES ($1, $2, $3)",
        )
        .bind(authority.authority_id.clone())
        .bind(authority.name.clone())
        .bind(authority.api_key.to_vec())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DbError::Eindeutigkeit(format!("Behoerde '{}' existiert bereits", authority.name))
            }
            e => DbError::Sqlx(e),
        })?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Autorisierungs-Tokens
    // -----------------------------------------------------------------------

    /// Fuegt ein Token ein (insert-or-ignore auf dem Token-Wert).
    /// Gibt `true` zurueck wenn eine neue Zeile entstanden ist.
    pub async fn authorization_key_einfuegen(
        &mut self,
        neu: &NeuerAuthorizationKey<'_>,
    ) -> DbResult<bool> {
        let betroffen = sqlx::query(
            "INSERT INTO authorization_keys
               (authorization_key, api_key, key_type, permitted_start, permitted_end)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (authorization_key) DO NOTHING",
        )
        .bind(neu.authorization_key.to_vec())
        .bind(neu.api_key.to_vec())
        .bind(neu.key_type.to_string())
        .bind(neu.fenster.start().timestamp())
        .bind(neu.fenster.ende().timestamp())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(betroffen > 0)
    }

    /// Laedt das erlaubte Zeitfenster eines Tokens
    pub async fn fenster_laden(
        &mut self,
        authorization_key: &AuthorizationKey,
    ) -> DbResult<Option<Zeitfenster>> {
        let row = sqlx::query(
            "SELECT permitted_start, permitted_end FROM authorization_keys
             WHERE authorization_key = $1",
        )
        .bind(authorization_key.to_vec())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|r| row_to_fenster(&r)).transpose()
    }

    // -----------------------------------------------------------------------
    // Gemeldete Schluessel
    // -----------------------------------------------------------------------

    /// Fuegt einen gemeldeten Schluessel ein (insert-or-ignore auf dem TEK).
    /// Gibt `true` zurueck wenn eine neue Zeile entstanden ist.
    pub async fn gemeldeten_schluessel_einfuegen(
        &mut self,
        tek: &Tek,
        zeitpunkt: DateTime<Utc>,
        authorization_key: &AuthorizationKey,
    ) -> DbResult<bool> {
        let betroffen = sqlx::query(
            "INSERT INTO reported_keys (tek, enin, authorization_key)
             VALUES ($1, $2, $3)
             ON CONFLICT (tek) DO NOTHING",
        )
        .bind(tek.to_vec())
        .bind(zeitpunkt.timestamp())
        .bind(authorization_key.to_vec())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(betroffen > 0)
    }
}

pub(crate) fn row_to_authority(row: &AnyRow) -> DbResult<HealthAuthorityRecord> {
    let api_key: Vec<u8> = row.try_get("api_key")?;
    let api_key = ApiKey::aus_bytes(&api_key).ok_or_else(|| {
        DbError::ungueltige_daten(format!("api_key mit {} Bytes gespeichert", api_key.len()))
    })?;

    Ok(HealthAuthorityRecord {
        authority_id: row.try_get("authority_id")?,
        name: row.try_get("name")?,
        api_key,
    })
}

pub(crate) fn row_to_fenster(row: &AnyRow) -> DbResult<Zeitfenster> {
    let start: i64 = row.try_get("permitted_start")?;
    let ende: i64 = row.try_get("permitted_end")?;
    Zeitfenster::neu(zeitpunkt_aus_sekunden(start), zeitpunkt_aus_sekunden(ende))
        .ok_or_else(|| DbError::ungueltige_daten(format!("Fenster [{start}, {ende}] ist umgekehrt")))
}
