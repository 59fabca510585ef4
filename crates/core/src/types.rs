//! Schluessel- und Zeittypen fuer Commons
//!
//! Alle 16-Byte-Werte verwenden das Newtype-Pattern, damit API-Key,
//! Autorisierungs-Token und TEK zur Compilezeit nicht verwechselt werden
//! koennen. Die Laenge ist durch `[u8; 16]` garantiert.

use chrono::{DateTime, Utc};
use std::fmt;

/// Laenge aller Schluessel (API-Key, Autorisierungs-Token, TEK) in Bytes
pub const SCHLUESSEL_LAENGE: usize = 16;

/// Dauer eines ENIN-Intervalls in Sekunden (10 Minuten)
pub const ENIN_SEKUNDEN: i64 = 600;

macro_rules! schluessel_typ {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; SCHLUESSEL_LAENGE]);

        impl $name {
            /// Uebernimmt genau 16 Bytes, sonst `None`
            pub fn aus_bytes(bytes: &[u8]) -> Option<Self> {
                <[u8; SCHLUESSEL_LAENGE]>::try_from(bytes).ok().map(Self)
            }

            pub fn as_bytes(&self) -> &[u8; SCHLUESSEL_LAENGE] {
                &self.0
            }

            pub fn to_vec(&self) -> Vec<u8> {
                self.0.to_vec()
            }
        }

        impl From<[u8; SCHLUESSEL_LAENGE]> for $name {
            fn from(bytes: [u8; SCHLUESSEL_LAENGE]) -> Self {
                Self(bytes)
            }
        }
    };
}

schluessel_typ!(
    /// Geheimer API-Key einer Gesundheitsbehoerde
    ApiKey
);

schluessel_typ!(
    /// Einmal-Token, das eine Meldung innerhalb eines Zeitfensters erlaubt
    AuthorizationKey
);

schluessel_typ!(
    /// Temporary Exposure Key eines Geraets
    Tek
);

// API-Keys sind Geheimnisse und erscheinen nie im Klartext in Logs
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Debug for AuthorizationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorizationKey({self})")
    }
}

impl fmt::Display for AuthorizationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex_schreiben(f, &self.0)
    }
}

impl fmt::Debug for Tek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tek({self})")
    }
}

impl fmt::Display for Tek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex_schreiben(f, &self.0)
    }
}

/// Schreibt Bytes als Kleinbuchstaben-Hex
pub fn hex_schreiben(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
}

/// Hex-Darstellung beliebiger Bytes (z.B. Behoerden-IDs fuer Logs)
pub fn hex(bytes: &[u8]) -> String {
    struct Hex<'a>(&'a [u8]);
    impl fmt::Display for Hex<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            hex_schreiben(f, self.0)
        }
    }
    Hex(bytes).to_string()
}

/// Exposure Notification Interval Number: 10-Minuten-Intervalle seit der Unix-Epoche
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Enin(pub u32);

impl Enin {
    /// Beginn des Intervalls in Sekunden seit der Epoche
    pub fn sekunden(self) -> i64 {
        i64::from(self.0) * ENIN_SEKUNDEN
    }

    /// Beginn des Intervalls als UTC-Zeitpunkt
    pub fn zeitpunkt(self) -> DateTime<Utc> {
        zeitpunkt_aus_sekunden(self.sekunden())
    }

    /// Rechnet einen gespeicherten Zeitstempel (Sekunden) zurueck in eine ENIN.
    /// Liefert `None` fuer Werte ausserhalb des u32-Bereichs.
    pub fn aus_sekunden(sekunden: i64) -> Option<Self> {
        u32::try_from(sekunden.div_euclid(ENIN_SEKUNDEN)).ok().map(Self)
    }
}

impl fmt::Display for Enin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wandelt Unix-Sekunden in einen UTC-Zeitpunkt.
///
/// Jede `Enin` liegt im darstellbaren Bereich von chrono; der Fallback auf die
/// Epoche greift nur fuer beliebige Fremdwerte.
pub fn zeitpunkt_aus_sekunden(sekunden: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(sekunden, 0).unwrap_or_default()
}

/// Inklusives Zeitfenster `[start, ende]` mit `start <= ende`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zeitfenster {
    start: DateTime<Utc>,
    ende: DateTime<Utc>,
}

impl Zeitfenster {
    /// Erstellt ein Fenster; `None` wenn `ende` vor `start` liegt
    pub fn neu(start: DateTime<Utc>, ende: DateTime<Utc>) -> Option<Self> {
        (start <= ende).then_some(Self { start, ende })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn ende(&self) -> DateTime<Utc> {
        self.ende
    }

    /// Rastet das Fenster auf ganze Sekunden ein: der Start wird auf-, das
    /// Ende abgerundet. `None` wenn danach keine ganze Sekunde uebrig bleibt.
    pub fn auf_ganze_sekunden(&self) -> Option<Self> {
        let mut start = self.start.timestamp();
        if self.start.timestamp_subsec_nanos() > 0 {
            start += 1;
        }
        Self::neu(
            zeitpunkt_aus_sekunden(start),
            zeitpunkt_aus_sekunden(self.ende.timestamp()),
        )
    }

    /// Prueft ob `zeitpunkt` im Fenster liegt (beide Grenzen eingeschlossen)
    pub fn enthaelt(&self, zeitpunkt: DateTime<Utc>) -> bool {
        self.start <= zeitpunkt && zeitpunkt <= self.ende
    }
}

impl fmt::Display for Zeitfenster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.ende.to_rfc3339())
    }
}
