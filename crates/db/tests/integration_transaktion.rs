//! Integration-Tests fuer Arbeitseinheiten (In-Memory SQLite)

use chrono::{Duration, TimeZone, Utc};
use commons_core::{ApiKey, AuthorizationKey, Tek, Zeitfenster};
use commons_db::{
    Datenbank, DbError, HealthAuthorityRecord, NeuerAuthorizationKey, KEY_TYPE_DIAGNOSED,
};

async fn db() -> Datenbank {
    Datenbank::in_memory().await.expect("In-Memory DB konnte nicht erstellt werden")
}

fn fenster() -> Zeitfenster {
    let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    Zeitfenster::neu(start, start + Duration::days(14)).unwrap()
}

async fn token_anlegen(db: &Datenbank, api_key: &ApiKey, token: AuthorizationKey) {
    let mut einheit = db.beginnen().await.unwrap();
    let ergebnis = einheit
        .authorization_key_einfuegen(&NeuerAuthorizationKey {
            authorization_key: token,
            api_key,
            key_type: KEY_TYPE_DIAGNOSED,
            fenster: fenster(),
        })
        .await;
    assert!(einheit.abschliessen(ergebnis).await.unwrap());
}

#[tokio::test]
async fn behoerde_anlegen_und_finden() {
    let db = db().await;
    let api_key = ApiKey::from([1; 16]);
    let angelegt = db.authority_anlegen("Gesundheitsamt Nord", api_key).await.unwrap();
    assert_eq!(angelegt.authority_id.len(), 16);

    let mut einheit = db.beginnen().await.unwrap();
    let gefunden = einheit.authority_per_api_key(&api_key).await.unwrap();
    let unbekannt = einheit.authority_per_api_key(&ApiKey::from([2; 16])).await.unwrap();
    einheit.zuruecksetzen().await.unwrap();

    assert_eq!(gefunden, Some(angelegt));
    assert_eq!(unbekannt, None);
}

#[tokio::test]
async fn api_key_ist_eindeutig() {
    let db = db().await;
    let api_key = ApiKey::from([3; 16]);
    db.authority_anlegen("Erste", api_key).await.unwrap();

    let e = db.authority_anlegen("Zweite", api_key).await.unwrap_err();
    assert!(matches!(e, DbError::Eindeutigkeit(_)));
    assert!(e.ist_eindeutigkeit());
}

#[tokio::test]
async fn token_wird_committet() {
    let db = db().await;
    let api_key = ApiKey::from([4; 16]);
    db.authority_anlegen("Amt", api_key).await.unwrap();

    let token = AuthorizationKey::from([9; 16]);
    token_anlegen(&db, &api_key, token).await;

    let record = db.authorization_key_laden(&token).await.unwrap().unwrap();
    assert_eq!(record.api_key, api_key);
    assert_eq!(record.key_type, KEY_TYPE_DIAGNOSED);
    assert_eq!(record.fenster, fenster());
    assert_eq!(db.authorization_keys_zaehlen().await.unwrap(), 1);
}

#[tokio::test]
async fn doppeltes_token_wird_ignoriert() {
    let db = db().await;
    let api_key = ApiKey::from([5; 16]);
    db.authority_anlegen("Amt", api_key).await.unwrap();
    let token = AuthorizationKey::from([7; 16]);
    token_anlegen(&db, &api_key, token).await;

    let mut einheit = db.beginnen().await.unwrap();
    let neu = einheit
        .authorization_key_einfuegen(&NeuerAuthorizationKey {
            authorization_key: token,
            api_key: &api_key,
            key_type: KEY_TYPE_DIAGNOSED,
            fenster: fenster(),
        })
        .await;
    let neu = einheit.abschliessen(neu).await.unwrap();

    assert!(!neu);
    assert_eq!(db.authorization_keys_zaehlen().await.unwrap(), 1);
}

#[tokio::test]
async fn fehler_fuehrt_zu_rollback() {
    let db = db().await;
    let api_key = ApiKey::from([6; 16]);
    db.authority_anlegen("Amt", api_key).await.unwrap();
    let token = AuthorizationKey::from([8; 16]);
    token_anlegen(&db, &api_key, token).await;

    let mut einheit = db.beginnen().await.unwrap();
    let eingefuegt = einheit
        .gemeldeten_schluessel_einfuegen(&Tek::from([1; 16]), fenster().start(), &token)
        .await
        .unwrap();
    assert!(eingefuegt);

    let ergebnis: Result<(), DbError> = Err(DbError::ungueltige_daten("Eintrag 1 abgelehnt"));
    let e = einheit.abschliessen(ergebnis).await.unwrap_err();

    assert!(matches!(e, DbError::UngueltigeDaten(ref m) if m == "Eintrag 1 abgelehnt"));
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);
}

#[tokio::test]
async fn drop_ohne_abschluss_verwirft_alles() {
    let db = db().await;
    let api_key = ApiKey::from([10; 16]);
    db.authority_anlegen("Amt", api_key).await.unwrap();
    let token = AuthorizationKey::from([11; 16]);
    token_anlegen(&db, &api_key, token).await;

    {
        let mut einheit = db.beginnen().await.unwrap();
        einheit
            .gemeldeten_schluessel_einfuegen(&Tek::from([2; 16]), fenster().start(), &token)
            .await
            .unwrap();
    }

    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 0);
}

#[tokio::test]
async fn schluessel_einfuegen_ist_idempotent() {
    let db = db().await;
    let api_key = ApiKey::from([12; 16]);
    db.authority_anlegen("Amt", api_key).await.unwrap();
    let token = AuthorizationKey::from([13; 16]);
    token_anlegen(&db, &api_key, token).await;

    let tek = Tek::from([3; 16]);
    let mut einheit = db.beginnen().await.unwrap();
    let erstes = einheit.gemeldeten_schluessel_einfuegen(&tek, fenster().start(), &token).await;
    let zweites = einheit.gemeldeten_schluessel_einfuegen(&tek, fenster().ende(), &token).await;
    einheit.abschliessen(Ok::<_, DbError>(())).await.unwrap();

    assert!(erstes.unwrap());
    assert!(!zweites.unwrap());
    assert_eq!(db.gemeldete_schluessel_zaehlen().await.unwrap(), 1);
}

#[tokio::test]
async fn fenster_laden() {
    let db = db().await;
    let api_key = ApiKey::from([14; 16]);
    db.authority_anlegen("Amt", api_key).await.unwrap();
    let token = AuthorizationKey::from([15; 16]);
    token_anlegen(&db, &api_key, token).await;

    let mut einheit = db.beginnen().await.unwrap();
    let vorhanden = einheit.fenster_laden(&token).await.unwrap();
    let fehlt = einheit.fenster_laden(&AuthorizationKey::from([0; 16])).await.unwrap();
    einheit.zuruecksetzen().await.unwrap();

    assert_eq!(vorhanden, Some(fenster()));
    assert_eq!(fehlt, None);
}

#[tokio::test]
async fn behoerde_direkt_einfuegen() {
    let db = db().await;
    let authority = HealthAuthorityRecord {
        authority_id: vec![0xab; 16],
        name: "Amt Sued".into(),
        api_key: ApiKey::from([16; 16]),
    };

    let mut einheit = db.beginnen().await.unwrap();
    let ergebnis = einheit.authority_einfuegen(&authority).await;
    einheit.abschliessen(ergebnis).await.unwrap();

    let mut einheit = db.beginnen_lesend().await.unwrap();
    let gefunden = einheit.authority_per_api_key(&authority.api_key).await.unwrap();
    einheit.zuruecksetzen().await.unwrap();
    assert_eq!(gefunden, Some(authority));
}
