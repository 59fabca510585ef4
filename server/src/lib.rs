//! commons-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;
pub mod dienst;

use anyhow::{Context, Result};
use commons_db::Datenbank;
use config::ServerConfig;
use dienst::DiagnoseDienst;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Verbindet die Datenbank (mit Wiederholung), migriert und baut den Dienst
    pub async fn dienst_aufbauen(&self) -> Result<DiagnoseDienst> {
        let db_config = self.config.datenbank_config()?;
        tracing::info!(
            backend = %db_config.backend,
            versuche = db_config.verbindungs_versuche,
            "Datenbankverbindung wird hergestellt"
        );

        let db = Datenbank::verbinden(&db_config)
            .await
            .context("Datenbank nicht erreichbar")?;

        Ok(DiagnoseDienst::neu(db, self.config.abruf_frist()))
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Datenbankverbindung herstellen und Migrationen ausfuehren
    /// 2. Diagnose-Dienst aufbauen
    /// 3. Auf Ctrl-C warten
    /// 4. Pool schliessen
    pub async fn starten(self) -> Result<()> {
        let dienst = self.dienst_aufbauen().await?;

        tracing::info!(
            frist_sekunden = dienst.frist().as_secs(),
            "Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)..."
        );
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        dienst.schliessen().await;
        Ok(())
    }
}
