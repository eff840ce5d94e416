//! musical key and mode of a track
//!
//! Stored as small integers in the catalog (0 is unknown) and parsed from chat
//! as names like `Am`, `Bb`, `f#minor`.
use num::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum Key {
    #[default]
    Unknown = 0,
    A,
    ASharp,
    B,
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
}

#[derive(FromPrimitive, ToPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum Mode {
    #[default]
    Unknown = 0,
    Minor,
    Major,
}

impl TryFrom<u32> for Key {
    type Error = String;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        FromPrimitive::from_u32(v).ok_or(format!("unknown key {}", v))
    }
}

impl From<Key> for u32 {
    fn from(k: Key) -> u32 {
        ToPrimitive::to_u32(&k).unwrap_or(0)
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;
    fn try_from(v: u32) -> Result<Self, Self::Error> {
        FromPrimitive::from_u32(v).ok_or(format!("unknown mode {}", v))
    }
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> u32 {
        ToPrimitive::to_u32(&m).unwrap_or(0)
    }
}

impl Key {
    pub fn name(&self) -> &'static str {
        match self {
            Key::Unknown => "unknown",
            Key::A => "A",
            Key::ASharp => "A#",
            Key::B => "B",
            Key::C => "C",
            Key::CSharp => "C#",
            Key::D => "D",
            Key::DSharp => "D#",
            Key::E => "E",
            Key::F => "F",
            Key::FSharp => "F#",
            Key::G => "G",
            Key::GSharp => "G#",
        }
    }
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Key::Unknown => &[],
            Key::A => &["a"],
            Key::ASharp => &["a#", "bb"],
            Key::B => &["b"],
            Key::C => &["c"],
            Key::CSharp => &["c#", "db"],
            Key::D => &["d"],
            Key::DSharp => &["d#", "eb"],
            Key::E => &["e", "fb"],
            Key::F => &["f", "e#"],
            Key::FSharp => &["f#", "gb"],
            Key::G => &["g"],
            Key::GSharp => &["g#", "ab"],
        }
    }
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Unknown => "",
            Mode::Minor => "minor",
            Mode::Major => "major",
        }
    }
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Mode::Unknown => &[],
            Mode::Minor => &["minor", "m"],
            Mode::Major => &["major", ""],
        }
    }
}

const KEYS: [Key; 12] = [
    Key::A,
    Key::ASharp,
    Key::B,
    Key::C,
    Key::CSharp,
    Key::D,
    Key::DSharp,
    Key::E,
    Key::F,
    Key::FSharp,
    Key::G,
    Key::GSharp,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMode {
    pub key: Key,
    pub mode: Mode,
}

impl KeyMode {
    /// parse `Am`, `C#`, `bbminor` and friends.  No mode suffix means major.
    pub fn by_name(name: &str) -> Option<KeyMode> {
        let name = name.trim().to_lowercase();
        for key in KEYS.iter() {
            for key_alias in key.aliases() {
                if let Some(rest) = name.strip_prefix(key_alias) {
                    for mode in [Mode::Minor, Mode::Major] {
                        if mode.aliases().contains(&rest) {
                            return Some(KeyMode { key: *key, mode });
                        }
                    }
                }
            }
        }
        None
    }
}

impl fmt::Display for KeyMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.key.name(), self.mode.name())
    }
}

#[cfg(test)]
mod test_key {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(KeyMode::by_name("Am"), Some(KeyMode { key: Key::A, mode: Mode::Minor }));
        assert_eq!(KeyMode::by_name("A"), Some(KeyMode { key: Key::A, mode: Mode::Major }));
        assert_eq!(KeyMode::by_name("bbminor"), Some(KeyMode { key: Key::ASharp, mode: Mode::Minor }));
        assert_eq!(KeyMode::by_name("F#"), Some(KeyMode { key: Key::FSharp, mode: Mode::Major }));
        assert_eq!(KeyMode::by_name("E#m"), Some(KeyMode { key: Key::F, mode: Mode::Minor }));
        assert_eq!(KeyMode::by_name("Dbmajor"), Some(KeyMode { key: Key::CSharp, mode: Mode::Major }));
    }

    #[test]
    fn reject_garbage() {
        assert_eq!(KeyMode::by_name("H"), None);
        assert_eq!(KeyMode::by_name("10m"), None);
        assert_eq!(KeyMode::by_name(""), None);
        assert_eq!(KeyMode::by_name("amx"), None);
    }

    #[test]
    fn numbers_round_trip_through_serde() {
        let key: Key = serde_json::from_str("3").unwrap();
        assert_eq!(key, Key::B);
        assert_eq!(serde_json::to_string(&Mode::Minor).unwrap(), "1");
        assert!(serde_json::from_str::<Key>("13").is_err());
    }

    #[test]
    fn display() {
        let km = KeyMode { key: Key::GSharp, mode: Mode::Minor };
        assert_eq!(km.to_string(), "G# minor");
    }
}
