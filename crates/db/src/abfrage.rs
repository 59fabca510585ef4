//! Abfrage-Praedikate fuer den Abruf gemeldeter Schluessel
//!
//! Ein [`Praedikat`] ist eine geordnete Liste von Bedingungen, jede mit genau
//! einem gebundenen Wert. Der Positionsindex eines Werts (`$1`, `$2`, ...)
//! wird beim Anhaengen vergeben und entspricht immer seiner Stelle in
//! [`Praedikat::parameter`]. Alles hier ist rein und ohne Datenbank testbar.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use commons_core::types::zeitpunkt_aus_sekunden;
use commons_core::SchluesselFilter;

const SEKUNDEN_PRO_TAG: i64 = 86_400;

/// Join von gemeldeten Schluesseln ueber Tokens zu den Behoerden
const JOIN_BEHOERDEN: &str = "JOIN authorization_keys ak ON ak.authorization_key = rk.authorization_key \
     JOIN health_authorities ha ON ha.api_key = ak.api_key";

/// Ein gebundener Wert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Bytes(Vec<u8>),
    /// Wird als Unix-Sekunden gebunden
    Zeitpunkt(DateTime<Utc>),
}

/// Vergleichsoperator einer Bedingung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vergleich {
    Gleich,
    Ab,
    Bis,
}

impl Vergleich {
    fn als_sql(self) -> &'static str {
        match self {
            Self::Gleich => "=",
            Self::Ab => ">=",
            Self::Bis => "<=",
        }
    }
}

/// Eine Bedingung `spalte <op> $index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bedingung {
    pub spalte: &'static str,
    pub vergleich: Vergleich,
    /// 1-basierter Positionsindex des gebundenen Werts
    pub index: usize,
}

impl fmt::Display for Bedingung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ${}", self.spalte, self.vergleich.als_sql(), self.index)
    }
}

/// Geordnete Bedingungen plus gebundene Werte plus optionaler Join
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Praedikat {
    bedingungen: Vec<Bedingung>,
    parameter: Vec<Parameter>,
    join: Option<&'static str>,
}

impl Praedikat {
    /// Uebersetzt einen geprueften Filtersatz.
    ///
    /// `jetzt` ersetzt ein fehlendes `start_datum` des historischen Zeitraums.
    /// Reihenfolge der Bedingungen: Behoerde, Intervall, Zeitraum.
    pub fn aus_filter(filter: &SchluesselFilter, jetzt: DateTime<Utc>) -> Self {
        let mut praedikat = Self::default();

        if let Some(authority) = &filter.authority {
            praedikat.join = Some(JOIN_BEHOERDEN);
            praedikat.bedingung(
                "ha.authority_id",
                Vergleich::Gleich,
                Parameter::Bytes(authority.clone()),
            );
        }

        // Ein einzelnes Intervall deckt den Tag ab seinem Beginn ab
        if let Some(enin) = filter.enin {
            let von = enin.zeitpunkt();
            praedikat.zeitbereich(von, von + Duration::hours(24));
        }

        // Das "start_datum" ist die obere Grenze des Rueckblicks
        if let Some(zeitraum) = filter.zeitraum {
            let bis = auf_tag_abrunden(zeitraum.start_datum.unwrap_or(jetzt));
            // Ueber den darstellbaren Bereich hinaus heisst: alles bis `bis`
            let von = bis
                .checked_sub_signed(Duration::days(i64::from(zeitraum.tage.max(1))))
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            praedikat.zeitbereich(von, bis);
        }

        praedikat
    }

    /// Haengt eine Bedingung an; der Index ergibt sich aus der Anzahl der
    /// bis dahin gebundenen Werte.
    pub fn bedingung(&mut self, spalte: &'static str, vergleich: Vergleich, wert: Parameter) {
        self.parameter.push(wert);
        self.bedingungen.push(Bedingung {
            spalte,
            vergleich,
            index: self.parameter.len(),
        });
    }

    fn zeitbereich(&mut self, von: DateTime<Utc>, bis: DateTime<Utc>) {
        self.bedingung("rk.enin", Vergleich::Ab, Parameter::Zeitpunkt(von));
        self.bedingung("rk.enin", Vergleich::Bis, Parameter::Zeitpunkt(bis));
    }

    pub fn bedingungen(&self) -> &[Bedingung] {
        &self.bedingungen
    }

    pub fn parameter(&self) -> &[Parameter] {
        &self.parameter
    }

    pub fn join(&self) -> Option<&'static str> {
        self.join
    }

    pub fn ist_leer(&self) -> bool {
        self.bedingungen.is_empty()
    }

    /// Alle Bedingungen, mit AND verknuepft
    pub fn where_klausel(&self) -> String {
        self.bedingungen
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Vollstaendige Abfrage mit `$n`-Platzhaltern
    pub fn sql(&self) -> String {
        let mut sql = String::from("SELECT rk.tek, rk.enin FROM reported_keys rk");
        if let Some(join) = self.join {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.ist_leer() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_klausel());
        }
        sql.push_str(" ORDER BY rk.enin, rk.tek");
        sql
    }
}

/// Schneidet auf den Beginn des UTC-Tages ab
fn auf_tag_abrunden(zeitpunkt: DateTime<Utc>) -> DateTime<Utc> {
    let sekunden = zeitpunkt.timestamp();
    zeitpunkt_aus_sekunden(sekunden - sekunden.rem_euclid(SEKUNDEN_PRO_TAG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use commons_core::{Enin, Zeitraum};

    fn zeit(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn filter() -> SchluesselFilter {
        SchluesselFilter {
            authority: None,
            enin: None,
            zeitraum: None,
        }
    }

    #[test]
    fn enin_wird_zu_24_stunden() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                enin: Some(Enin(2_682_576)),
                ..filter()
            },
            zeit(2030, 1, 1, 0, 0),
        );

        assert_eq!(praedikat.where_klausel(), "rk.enin >= $1 AND rk.enin <= $2");
        assert_eq!(
            praedikat.parameter(),
            &[
                Parameter::Zeitpunkt(zeit(2021, 1, 2, 0, 0)),
                Parameter::Zeitpunkt(zeit(2021, 1, 3, 0, 0)),
            ]
        );
        assert_eq!(praedikat.join(), None);
    }

    #[test]
    fn zeitraum_ohne_datum_nutzt_jetzt() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                zeitraum: Some(Zeitraum {
                    start_datum: None,
                    tage: 7,
                }),
                ..filter()
            },
            zeit(2021, 3, 10, 15, 42),
        );

        assert_eq!(
            praedikat.parameter(),
            &[
                Parameter::Zeitpunkt(zeit(2021, 3, 3, 0, 0)),
                Parameter::Zeitpunkt(zeit(2021, 3, 10, 0, 0)),
            ]
        );
    }

    #[test]
    fn startdatum_ist_obere_grenze() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                zeitraum: Some(Zeitraum {
                    start_datum: Some(zeit(2021, 1, 8, 13, 30)),
                    tage: 2,
                }),
                ..filter()
            },
            zeit(2030, 1, 1, 0, 0),
        );

        assert_eq!(
            praedikat.parameter(),
            &[
                Parameter::Zeitpunkt(zeit(2021, 1, 6, 0, 0)),
                Parameter::Zeitpunkt(zeit(2021, 1, 8, 0, 0)),
            ]
        );
    }

    #[test]
    fn null_tage_zaehlt_als_ein_tag() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                zeitraum: Some(Zeitraum {
                    start_datum: Some(zeit(2021, 1, 8, 0, 0)),
                    tage: 0,
                }),
                ..filter()
            },
            zeit(2030, 1, 1, 0, 0),
        );

        assert_eq!(
            praedikat.parameter()[0],
            Parameter::Zeitpunkt(zeit(2021, 1, 7, 0, 0))
        );
    }

    #[test]
    fn riesiger_rueckblick_wird_begrenzt() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                zeitraum: Some(Zeitraum {
                    start_datum: None,
                    tage: u32::MAX,
                }),
                ..filter()
            },
            zeit(2021, 1, 8, 9, 0),
        );

        assert_eq!(
            praedikat.parameter(),
            &[
                Parameter::Zeitpunkt(DateTime::<Utc>::MIN_UTC),
                Parameter::Zeitpunkt(zeit(2021, 1, 8, 0, 0)),
            ]
        );
    }

    #[test]
    fn behoerde_fuegt_join_hinzu() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                authority: Some(vec![0xaa, 0xbb]),
                ..filter()
            },
            zeit(2030, 1, 1, 0, 0),
        );

        assert_eq!(praedikat.where_klausel(), "ha.authority_id = $1");
        assert_eq!(praedikat.parameter(), &[Parameter::Bytes(vec![0xaa, 0xbb])]);
        assert_eq!(praedikat.join(), Some(JOIN_BEHOERDEN));
    }

    #[test]
    fn alle_filter_in_fester_reihenfolge() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                authority: Some(vec![1]),
                enin: Some(Enin(2_682_576)),
                zeitraum: Some(Zeitraum {
                    start_datum: None,
                    tage: 14,
                }),
            },
            zeit(2021, 1, 20, 8, 0),
        );

        assert_eq!(
            praedikat.where_klausel(),
            "ha.authority_id = $1 AND rk.enin >= $2 AND rk.enin <= $3 \
             AND rk.enin >= $4 AND rk.enin <= $5"
        );
        assert_eq!(praedikat.parameter().len(), 5);
        for (position, bedingung) in praedikat.bedingungen().iter().enumerate() {
            assert_eq!(bedingung.index, position + 1);
        }
        assert_eq!(
            praedikat.parameter()[3],
            Parameter::Zeitpunkt(zeit(2021, 1, 6, 0, 0))
        );
    }

    #[test]
    fn sql_mit_join_vor_where() {
        let praedikat = Praedikat::aus_filter(
            &SchluesselFilter {
                authority: Some(vec![1]),
                enin: Some(Enin(1)),
                ..filter()
            },
            zeit(2030, 1, 1, 0, 0),
        );

        let sql = praedikat.sql();
        assert!(sql.starts_with("SELECT rk.tek, rk.enin FROM reported_keys rk JOIN"));
        let join = sql.find("JOIN health_authorities").unwrap();
        let wo = sql.find(" WHERE ").unwrap();
        assert!(join < wo);
        assert!(sql.ends_with("ORDER BY rk.enin, rk.tek"));
    }

    #[test]
    fn manuelle_bedingung_bekommt_naechsten_index() {
        let mut praedikat = Praedikat::default();
        assert!(praedikat.ist_leer());
        praedikat.bedingung("rk.tek", Vergleich::Gleich, Parameter::Bytes(vec![1; 16]));
        praedikat.bedingung("rk.enin", Vergleich::Bis, Parameter::Zeitpunkt(zeit(2021, 1, 1, 0, 0)));
        assert_eq!(praedikat.where_klausel(), "rk.tek = $1 AND rk.enin <= $2");
    }

    #[test]
    fn tag_abrunden() {
        assert_eq!(auf_tag_abrunden(zeit(2021, 1, 8, 23, 59)), zeit(2021, 1, 8, 0, 0));
        assert_eq!(auf_tag_abrunden(zeit(2021, 1, 8, 0, 0)), zeit(2021, 1, 8, 0, 0));
    }
}
