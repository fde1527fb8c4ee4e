use std::fmt::Debug;
use std::hash::Hash;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

/// A classification produced by a signature index lookup.
///
/// Every category has a `NONE` sentinel meaning "no range matched". It is
/// never stored in an index.
pub trait Category: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    const NONE: Self;

    /// Decodes a raw code as stored in a signature table.
    fn from_code(code: u16) -> Option<Self>;

    fn code(self) -> u16;

    fn name(self) -> &'static str;
}

/// Geolocation category, keyed by ISO 3166-1 numeric country code.
#[repr(u16)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    FromPrimitive,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Country {
    None = 0,
    Afghanistan = 4,
    Albania = 8,
    Algeria = 12,
    Argentina = 32,
    Australia = 36,
    Austria = 40,
    Bangladesh = 50,
    Belgium = 56,
    Brazil = 76,
    Bulgaria = 100,
    Belarus = 112,
    Canada = 124,
    Chile = 152,
    China = 156,
    Colombia = 170,
    Cuba = 192,
    Czechia = 203,
    Denmark = 208,
    Finland = 246,
    France = 250,
    Germany = 276,
    Greece = 300,
    HongKong = 344,
    Hungary = 348,
    India = 356,
    Indonesia = 360,
    Iran = 364,
    Iraq = 368,
    Ireland = 372,
    Israel = 376,
    Italy = 380,
    Japan = 392,
    Kazakhstan = 398,
    NorthKorea = 408,
    SouthKorea = 410,
    Libya = 434,
    Mexico = 484,
    Netherlands = 528,
    NewZealand = 554,
    Nigeria = 566,
    Norway = 578,
    Pakistan = 586,
    Poland = 616,
    Portugal = 620,
    Romania = 642,
    Russia = 643,
    SaudiArabia = 682,
    Singapore = 702,
    VietNam = 704,
    SouthAfrica = 710,
    Spain = 724,
    Sweden = 752,
    Switzerland = 756,
    Syria = 760,
    Thailand = 764,
    Turkey = 792,
    Ukraine = 804,
    Egypt = 818,
    UnitedKingdom = 826,
    UnitedStates = 840,
    Venezuela = 862,
}

impl Category for Country {
    const NONE: Self = Country::None;

    fn from_code(code: u16) -> Option<Self> {
        Country::from_u16(code)
    }

    fn code(self) -> u16 {
        self as u16
    }

    fn name(self) -> &'static str {
        self.into()
    }
}

/// Coarse reputation grouping that policy is configured against.
#[repr(u16)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    FromPrimitive,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReputationGroup {
    Compromised = 10,
    Malicious = 20,
    Tor = 30,
}

impl ReputationGroup {
    /// Floors a raw reputation code to the group sharing its tens digit.
    pub fn floor(code: u16) -> Option<Self> {
        ReputationGroup::from_u16((code / 10) * 10)
    }
}

/// Threat reputation category of a remote host.
#[repr(u16)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    FromPrimitive,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Reputation {
    None = 0,
    Compromised = 10,
    CompromisedHost = 11,
    Malicious = 20,
    MaliciousHost = 21,
    CommandControl = 22,
    Tor = 30,
    TorEntry = 31,
    TorExit = 32,
}

impl Reputation {
    /// Group this category is configured under. `None` has no group.
    pub fn group(self) -> Option<ReputationGroup> {
        match self {
            Reputation::None => None,
            Reputation::Compromised | Reputation::CompromisedHost => {
                Some(ReputationGroup::Compromised)
            }
            Reputation::Malicious | Reputation::MaliciousHost | Reputation::CommandControl => {
                Some(ReputationGroup::Malicious)
            }
            Reputation::Tor | Reputation::TorEntry | Reputation::TorExit => {
                Some(ReputationGroup::Tor)
            }
        }
    }
}

impl Category for Reputation {
    const NONE: Self = Reputation::None;

    fn from_code(code: u16) -> Option<Self> {
        Reputation::from_u16(code)
    }

    fn code(self) -> u16 {
        self as u16
    }

    fn name(self) -> &'static str {
        self.into()
    }
}
