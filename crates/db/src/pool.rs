//! Connection Pool fuer PostgreSQL oder SQLite
//!
//! Beide Backends laufen ueber den `Any`-Treiber von sqlx und teilen damit
//! denselben Code. Der Pool ist die einzige geteilte, veraenderliche
//! Ressource; seine Groesse begrenzt die Anzahl offener Transaktionen.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use commons_core::{ApiKey, AuthorizationKey};

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::error::{begin_fehler, DbError};
use crate::models::{AuthorizationKeyRecord, HealthAuthorityRecord};
use crate::transaktion::{row_to_fenster, Arbeitseinheit};
use crate::DbResult;

/// Obergrenze fuer die Wartezeit zwischen zwei Verbindungsversuchen
const MAX_WARTEZEIT: Duration = Duration::from_secs(30);

/// Wrapper um den Connection Pool
#[derive(Debug, Clone)]
pub struct Datenbank {
    pub(crate) pool: AnyPool,
    backend: DatabaseBackend,
}

impl Datenbank {
    /// Baut den Pool auf, wiederholt bei Fehlschlag mit Backoff und fuehrt
    /// danach die Migrationen aus.
    pub async fn verbinden(config: &DatabaseConfig) -> DbResult<Self> {
        let url = config.verbindungs_url()?;
        sqlx::any::install_default_drivers();

        let optionen = AnyPoolOptions::new().max_connections(config.max_verbindungen);
        let pool = mit_wiederholung(
            config.verbindungs_versuche,
            config.retry_basis,
            DbError::ist_wiederholbar,
            || {
                let optionen = optionen.clone();
                let url = url.as_str();
                async move { optionen.connect(url).await.map_err(DbError::Verbindung) }
            },
        )
        .await?;

        match config.backend {
            DatabaseBackend::Postgres => info!(
                host = %config.host,
                database = %config.database,
                max_verbindungen = config.max_verbindungen,
                "Mit PostgreSQL verbunden"
            ),
            DatabaseBackend::Sqlite => info!(
                url = %config.url,
                max_verbindungen = config.max_verbindungen,
                "SQLite-Pool geoeffnet"
            ),
        }

        let db = Self {
            pool,
            backend: config.backend,
        };
        db.migrationen_ausfuehren().await?;

        Ok(db)
    }

    /// Erstellt eine In-Memory-Datenbank fuer Tests
    pub async fn in_memory() -> DbResult<Self> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            // In-Memory benoetigt genau 1 persistente Verbindung
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(DbError::Verbindung)?;

        let db = Self {
            pool,
            backend: DatabaseBackend::Sqlite,
        };
        db.migrationen_ausfuehren().await?;
        Ok(db)
    }

    /// Fuehrt alle ausstehenden Migrationen des Backends aus
    pub async fn migrationen_ausfuehren(&self) -> DbResult<()> {
        match self.backend {
            DatabaseBackend::Sqlite => sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?,
            DatabaseBackend::Postgres => {
                sqlx::migrate!("./migrations/postgres").run(&self.pool).await?
            }
        }
        info!(backend = %self.backend, "Datenbank-Migrationen abgeschlossen");
        Ok(())
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// Gibt den internen Pool zurueck (fuer Tests)
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Schliesst alle Verbindungen
    pub async fn schliessen(&self) {
        self.pool.close().await;
        info!("Datenbank-Pool geschlossen");
    }

    /// Holt eine Verbindung und beginnt eine Transaktion
    pub async fn beginnen(&self) -> DbResult<Arbeitseinheit> {
        let tx = self.pool.begin().await.map_err(begin_fehler)?;
        Ok(Arbeitseinheit::neu(tx))
    }

    /// Wie [`Datenbank::beginnen`], aber als Nur-Lese-Transaktion
    pub async fn beginnen_lesend(&self) -> DbResult<Arbeitseinheit> {
        let mut einheit = self.beginnen().await?;
        // SQLite kennt keinen Nur-Lese-Modus pro Transaktion
        if self.backend == DatabaseBackend::Postgres {
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(einheit.verbindung())
                .await
                .map_err(DbError::Begin)?;
        }
        Ok(einheit)
    }

    /// Legt eine Gesundheitsbehoerde an und gibt sie zurueck.
    ///
    /// Behoerden werden vom Betreiber provisioniert; kein Anfrageweg fuehrt
    /// hierher.
    pub async fn authority_anlegen(
        &self,
        name: &str,
        api_key: ApiKey,
    ) -> DbResult<HealthAuthorityRecord> {
        let authority = HealthAuthorityRecord {
            authority_id: Uuid::new_v4().as_bytes().to_vec(),
            name: name.to_string(),
            api_key,
        };

        let mut einheit = self.beginnen().await?;
        let ergebnis = einheit.authority_einfuegen(&authority).await;
        einheit.abschliessen(ergebnis).await?;

        info!(name = %authority.name, "Gesundheitsbehoerde angelegt");
        Ok(authority)
    }

    /// Laedt ein Token mit seinem Fenster
    pub async fn authorization_key_laden(
        &self,
        authorization_key: &AuthorizationKey,
    ) -> DbResult<Option<AuthorizationKeyRecord>> {
        let row = sqlx::query(
            "SELECT authorization_key, api_key, key_type, permitted_start, permitted_end
             FROM authorization_keys WHERE authorization_key = $1",
        )
        .bind(authorization_key.to_vec())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> DbResult<AuthorizationKeyRecord> {
            let api_key: Vec<u8> = r.try_get("api_key")?;
            Ok(AuthorizationKeyRecord {
                authorization_key: *authorization_key,
                api_key: ApiKey::aus_bytes(&api_key)
                    .ok_or_else(|| DbError::ungueltige_daten("api_key hat falsche Laenge"))?,
                key_type: r.try_get("key_type")?,
                fenster: row_to_fenster(&r)?,
            })
        })
        .transpose()
    }

    /// Anzahl aller Tokens
    pub async fn authorization_keys_zaehlen(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM authorization_keys")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    /// Anzahl aller gemeldeten Schluessel
    pub async fn gemeldete_schluessel_zaehlen(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM reported_keys")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }
}

/// Fuehrt `versuch` bis zu `versuche`-mal aus. Vor jedem weiteren Versuch
/// wird gewartet, beginnend mit `basis` und danach verdoppelt (gedeckelt).
/// Fehler, fuer die `wiederholbar` false liefert, beenden sofort.
pub(crate) async fn mit_wiederholung<T, E, W, F, Fut>(
    versuche: u32,
    basis: Duration,
    wiederholbar: W,
    mut versuch: F,
) -> Result<T, E>
where
    W: Fn(&E) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let versuche = versuche.max(1);
    let mut wartezeit = basis;
    let mut nr = 1;

    loop {
        match versuch().await {
            Ok(wert) => return Ok(wert),
            Err(e) if !wiederholbar(&e) => {
                warn!(versuch = nr, fehler = %e, "Datenbankfehler ist nicht voruebergehend");
                return Err(e);
            }
            Err(e) if nr < versuche => {
                warn!(
                    versuch = nr,
                    max = versuche,
                    wartezeit_ms = wartezeit.as_millis() as u64,
                    fehler = %e,
                    "Datenbank nicht erreichbar, neuer Versuch folgt"
                );
                tokio::time::sleep(wartezeit).await;
                wartezeit = (wartezeit * 2).min(MAX_WARTEZEIT);
                nr += 1;
            }
            Err(e) => {
                warn!(versuche, fehler = %e, "Datenbank nach allen Versuchen nicht erreichbar");
                return Err(e);
            }
        }
    }
}
