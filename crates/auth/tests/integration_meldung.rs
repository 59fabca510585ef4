//! Integration-Tests fuer den MeldungsService (In-Memory SQLite)

use chrono::{TimeZone, Utc};
use commons_auth::{AuthError, MeldungsErgebnis, MeldungsService, TokenAussteller};
use commons_core::{
    ApiKey, AuthorizationKey, Report, TimestampedTek, TokenRequest, ValidierungsFehler,
};
use commons_db::Datenbank;
use tracing::Span;

/// 2021-01-01 00:00 UTC
const FENSTER_START: u32 = 2_682_432;
/// 2021-01-08 00:00 UTC
const FENSTER_ENDE: u32 = FENSTER_START + 7 * 144;

async fn aufbauen() -> (Datenbank, MeldungsService, AuthorizationKey) {
    let db = Datenbank::in_memory().await.expect("In-Memory DB konnte nicht erstellt werden");
    db.authority_anlegen("Gesundheitsamt", ApiKey::from([0x4b; 16]))
        .await
        .unwrap();

    let token = TokenAussteller::neu(db.clone(), Span::none())
        .token_ausstellen(&TokenRequest {
            api_key: vec![0x4b; 16],
            permitted_range_start: "2021-01-01T00:00:00Z".into(),
            permitted_range_end: "2021-01-08T00:00:00Z".into(),
        })
        .await
        .unwrap();

    let service = MeldungsService::neu(db.clone(), Span::none());
    (db, service, token)
}

fn eintrag(tek: u8, enin: u32) -> TimestampedTek {
    TimestampedTek {
        tek: vec![tek; 16],
        enin,
    }
}

fn bericht(token: AuthorizationKey, eintraege: Vec<TimestampedTek>) -> Report {
    Report {
        authorization_key: token.to_vec(),
        reports: eintraege,
    }
}

#[tokio::test]
async fn meldung_im_fenster_wird_vollstaendig_gespeichert() {
    let (db, service, token) = aufbauen().await;

    let ergebnis = service
        .bericht_hinzufuegen(&bericht(
            token,
            vec![eintrag(1, FENSTER_START), eintrag(2, FENSTER_START + 144), eintrag(3, FENSTER_ENDE)],
        ))
        .await
        .unwrap();

    assert_eq!(
        ergebnis,
        MeldungsErgebnis {
            eingefuegt: 3,
            ignoriert: 0
        }
    );
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 3);
}

#[tokio::test]
async fn ein_eintrag_ausserhalb_verwirft_die_ganze_meldung() {
    let (db, service, token) = aufbauen().await;

    let e = service
        .bericht_hinzufuegen(&bericht(
            token,
            vec![
                eintrag(1, FENSTER_START),
                eintrag(2, FENSTER_START + 1),
                eintrag(3, FENSTER_ENDE + 1),
                eintrag(4, FENSTER_START + 2),
            ],
        ))
        .await
        .unwrap_err();

    match e {
        AuthError::AusserhalbFenster {
            index,
            zeitpunkt,
            fenster,
        } => {
            assert_eq!(index, 2);
            assert_eq!(zeitpunkt, Utc.with_ymd_and_hms(2021, 1, 8, 0, 10, 0).unwrap());
            assert_eq!(fenster.ende(), Utc.with_ymd_and_hms(2021, 1, 8, 0, 0, 0).unwrap());
        }
        andere => panic!("Unerwarteter Fehler: {andere}"),
    }
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);
}

#[tokio::test]
async fn eintrag_vor_dem_fenster() {
    let (db, service, token) = aufbauen().await;

    let e = service
        .bericht_hinzufuegen(&bericht(token, vec![eintrag(1, FENSTER_START - 1)]))
        .await
        .unwrap_err();

    assert!(matches!(e, AuthError::AusserhalbFenster { index: 0, .. }));
    assert!(e.to_string().contains("Eintrag 0"));
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);
}

#[tokio::test]
async fn erneute_meldung_ist_wirkungslos() {
    let (db, service, token) = aufbauen().await;
    let meldung = bericht(token, vec![eintrag(1, FENSTER_START), eintrag(2, FENSTER_START + 1)]);

    service.bericht_hinzufuegen(&meldung).await.unwrap();
    let zweites = service.bericht_hinzufuegen(&meldung).await.unwrap();

    assert_eq!(
        zweites,
        MeldungsErgebnis {
            eingefuegt: 0,
            ignoriert: 2
        }
    );
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 2);
}

#[tokio::test]
async fn doppelter_tek_in_einer_meldung() {
    let (db, service, token) = aufbauen().await;

    let ergebnis = service
        .bericht_hinzufuegen(&bericht(
            token,
            vec![eintrag(5, FENSTER_START), eintrag(5, FENSTER_START + 3)],
        ))
        .await
        .unwrap();

    assert_eq!(ergebnis.eingefuegt, 1);
    assert_eq!(ergebnis.ignoriert, 1);
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 1);
}

#[tokio::test]
async fn unbekanntes_token() {
    let (db, service, _) = aufbauen().await;

    let e = service
        .bericht_hinzufuegen(&bericht(
            AuthorizationKey::from([0xee; 16]),
            vec![eintrag(1, FENSTER_START)],
        ))
        .await
        .unwrap_err();

    assert!(matches!(e, AuthError::AutorisierungUnbekannt));
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);
}

#[tokio::test]
async fn ungueltiger_eintrag_nennt_index() {
    let (db, service, token) = aufbauen().await;

    let e = service
        .bericht_hinzufuegen(&bericht(
            token,
            vec![eintrag(1, FENSTER_START), TimestampedTek { tek: vec![2; 8], enin: FENSTER_START }],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        e,
        AuthError::Validierung(ValidierungsFehler::TekLaenge { index: 1, laenge: 8 })
    ));
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);
}

#[tokio::test]
async fn leere_meldung() {
    let (_, service, token) = aufbauen().await;
    let e = service.bericht_hinzufuegen(&bericht(token, vec![])).await.unwrap_err();
    assert!(matches!(e, AuthError::Validierung(ValidierungsFehler::KeineEintraege)));
}

#[tokio::test]
async fn fensterstart_mit_bruchteil_sekunde() {
    let (db, service, _) = aufbauen().await;
    let token = TokenAussteller::neu(db.clone(), Span::none())
        .token_ausstellen(&TokenRequest {
            api_key: vec![0x4b; 16],
            permitted_range_start: "2021-01-02T00:00:00.500Z".into(),
            permitted_range_end: "2021-01-08T00:00:00Z".into(),
        })
        .await
        .unwrap();
    // 2021-01-02 00:00:00, eine halbe Sekunde vor dem Fensterstart
    let tag_2 = FENSTER_START + 144;

    let e = service
        .bericht_hinzufuegen(&bericht(token, vec![eintrag(1, tag_2)]))
        .await
        .unwrap_err();

    match e {
        AuthError::AusserhalbFenster { index, fenster, .. } => {
            assert_eq!(index, 0);
            assert_eq!(fenster.start(), Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 1).unwrap());
        }
        andere => panic!("Unerwarteter Fehler: {andere}"),
    }
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);

    let ergebnis = service
        .bericht_hinzufuegen(&bericht(token, vec![eintrag(1, tag_2 + 1)]))
        .await
        .unwrap();
    assert_eq!(ergebnis.eingefuegt, 1);
}
