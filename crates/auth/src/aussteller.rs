//! Ausgabe von Einmal-Tokens an Gesundheitsbehoerden
//!
//! Eine Behoerde weist sich mit ihrem API-Key aus und erhaelt ein zufaelliges
//! 128-Bit-Token, mit dem ein diagnostizierter Patient innerhalb des
//! angefragten Zeitfensters Schluessel einreichen darf.

use tracing::{debug, info, warn, Instrument, Span};

use commons_core::types::hex;
use commons_core::{token_anfrage_pruefen, AuthorizationKey, GepruefteTokenAnfrage, TokenRequest};
use commons_db::{Arbeitseinheit, Datenbank, NeuerAuthorizationKey, KEY_TYPE_DIAGNOSED};

use crate::error::{AuthError, AuthResult};

/// Erzeugt einen neuen Token-Wert
pub type TokenErzeuger = fn() -> AuthorizationKey;

/// 16 Bytes aus dem kryptographisch sicheren Zufallsgenerator
pub fn zufalls_token() -> AuthorizationKey {
    AuthorizationKey::from(rand::random::<[u8; 16]>())
}

/// Stellt Autorisierungs-Tokens aus
#[derive(Debug, Clone)]
pub struct TokenAussteller {
    db: Datenbank,
    span: Span,
    erzeuger: TokenErzeuger,
}

impl TokenAussteller {
    pub fn neu(db: Datenbank, span: Span) -> Self {
        Self {
            db,
            span,
            erzeuger: zufalls_token,
        }
    }

    /// Ersetzt den Zufallsgenerator (fuer Tests)
    pub fn mit_erzeuger(mut self, erzeuger: TokenErzeuger) -> Self {
        self.erzeuger = erzeuger;
        self
    }

    /// Prueft die Anfrage und legt ein neues Token an.
    ///
    /// Kollidiert das Token mit einem bestehenden, bleibt der bestehende
    /// Datensatz unveraendert und der Aufruf gilt trotzdem als erfolgreich.
    pub async fn token_ausstellen(&self, anfrage: &TokenRequest) -> AuthResult<AuthorizationKey> {
        self.pruefen_und_ausstellen(anfrage)
            .instrument(self.span.clone())
            .await
    }

    async fn pruefen_und_ausstellen(&self, anfrage: &TokenRequest) -> AuthResult<AuthorizationKey> {
        let geprueft = token_anfrage_pruefen(anfrage).map_err(|e| {
            warn!(fehler = %e, "Token-Anfrage abgelehnt");
            e
        })?;

        let mut einheit = self.db.beginnen().await?;
        let ergebnis = self.ausstellen(&mut einheit, &geprueft).await;
        einheit.abschliessen(ergebnis).await
    }

    async fn ausstellen(
        &self,
        einheit: &mut Arbeitseinheit,
        anfrage: &GepruefteTokenAnfrage,
    ) -> AuthResult<AuthorizationKey> {
        let authority = einheit
            .authority_per_api_key(&anfrage.api_key)
            .await?
            .ok_or_else(|| {
                warn!("Token-Anfrage mit unbekanntem api_key");
                AuthError::ApiKeyUnbekannt
            })?;

        let token = (self.erzeuger)();
        let neu = einheit
            .authorization_key_einfuegen(&NeuerAuthorizationKey {
                authorization_key: token,
                api_key: &anfrage.api_key,
                key_type: KEY_TYPE_DIAGNOSED,
                fenster: anfrage.fenster,
            })
            .await?;

        if !neu {
            debug!(token = %token, "Token existierte bereits");
        }
        info!(
            authority = %hex(&authority.authority_id),
            fenster = %anfrage.fenster,
            "Token ausgestellt"
        );

        Ok(token)
    }
}
