//! commons-db – Datenschicht
//!
//! Ein Connection Pool (PostgreSQL oder SQLite ueber den `Any`-Treiber),
//! transaktionsgebundene Arbeitseinheiten, der Praedikat-Baukasten fuer den
//! Schluessel-Abruf und der Schluessel-Stream selbst.

pub mod abfrage;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod stream;
pub mod transaktion;

pub use abfrage::{Bedingung, Parameter, Praedikat, Vergleich};
pub use config::{DatabaseBackend, DatabaseConfig};
pub use error::DbError;
pub use models::{
    AuthorizationKeyRecord, GemeldeterSchluessel, HealthAuthorityRecord, NeuerAuthorizationKey,
    KEY_TYPE_DIAGNOSED,
};
pub use pool::Datenbank;
pub use stream::{SchluesselStream, STANDARD_FRIST};
pub use transaktion::Arbeitseinheit;

/// Ergebnistyp fuer alle Datenbankoperationen
pub type DbResult<T> = Result<T, DbError>;
