//! Track, tag and playlist records as kept by the catalog
//!
//! All times are in microseconds.  A track is loopable when `loop_end > loop_start`.
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

use super::key::{Key, KeyMode, Mode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Track {
    pub id: u32,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub length: u64,
    #[serde(default)]
    pub loop_start: u64,
    #[serde(default)]
    pub loop_end: u64,
    pub bpm: u32,
    pub bpi: u32,
    #[serde(default)]
    pub key: Key,
    #[serde(default)]
    pub mode: Mode,
}

const TRIM_CHARS: &[char] = &['\0', ' ', '\n'];

impl Track {
    /// strip the padding id3 tags like to leave around text fields
    pub fn clean_text(&mut self) {
        self.title = self.title.trim_matches(TRIM_CHARS).to_string();
        self.artist = self.artist.trim_matches(TRIM_CHARS).to_string();
        self.album = self.album.trim_matches(TRIM_CHARS).to_string();
    }
    pub fn has_loop(&self) -> bool {
        self.loop_end > self.loop_start
    }
    pub fn loop_length(&self) -> u64 {
        self.loop_end.saturating_sub(self.loop_start)
    }
    /// natural length of the file
    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.length)
    }
    /// how long the track runs when the loop window is replayed `repeats` times
    pub fn duration_with_repeats(&self, repeats: u32) -> Duration {
        Duration::from_micros(
            self.length
                .saturating_add(self.loop_length().saturating_mul(repeats as u64)),
        )
    }
    /// (60s / bpm) * bpi, zero when the tempo is not set
    pub fn interval_duration(&self) -> Duration {
        if self.bpm == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(60_000_000 * self.bpi as u64 / self.bpm as u64)
    }
    pub fn key_mode(&self) -> KeyMode {
        KeyMode {
            key: self.key,
            mode: self.mode,
        }
    }
    /// true when the track carries any of the tag ids
    pub fn has_any_tag(&self, tag_ids: &[u32]) -> bool {
        self.tags.iter().any(|t| tag_ids.contains(&t.id))
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}, {} BPM)", self.title, self.key_mode(), self.bpm)?;
        if !self.artist.is_empty() {
            write!(f, " by {}", self.artist)?;
        }
        if !self.album.is_empty() {
            write!(f, " ({})", self.album)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub track_id: u32,
    #[serde(default)]
    pub repeats: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<PlaylistTrack>,
}

#[cfg(test)]
mod test_track {
    use super::*;

    fn blues() -> Track {
        Track {
            id: 3,
            title: "Slow Blues\0\0 ".to_string(),
            artist: " Nobody\n".to_string(),
            length: 180_000_000,
            loop_start: 10_000_000,
            loop_end: 170_000_000,
            bpm: 120,
            bpi: 4,
            key: Key::A,
            mode: Mode::Minor,
            tags: vec![Tag { id: 2, name: "blues".to_string() }],
            ..Default::default()
        }
    }

    #[test]
    fn display_after_cleanup() {
        let mut track = blues();
        track.clean_text();
        assert_eq!(track.to_string(), "Slow Blues (A minor, 120 BPM) by Nobody");
        track.album = "Jams".to_string();
        assert_eq!(track.to_string(), "Slow Blues (A minor, 120 BPM) by Nobody (Jams)");
    }

    #[test]
    fn timing() {
        let track = blues();
        assert_eq!(track.interval_duration(), Duration::from_secs(2));
        assert!(track.has_loop());
        assert_eq!(track.duration_with_repeats(3), Duration::from_secs(180 + 3 * 160));
        let endless = Track {
            length: u64::MAX / 2,
            loop_end: u64::MAX / 2,
            ..blues()
        };
        assert_eq!(endless.duration_with_repeats(4), Duration::from_micros(u64::MAX));
        let no_tempo = Track { bpm: 0, ..blues() };
        assert_eq!(no_tempo.interval_duration(), Duration::ZERO);
    }

    #[test]
    fn tags() {
        let track = blues();
        assert!(track.has_any_tag(&[5, 2]));
        assert!(!track.has_any_tag(&[5]));
        assert!(!track.has_any_tag(&[]));
    }

    #[test]
    fn parse_from_catalog_json() {
        let data = r#"{ "id": 1, "file_path": "a.wav", "title": "t", "length": 1000,
                        "bpm": 90, "bpi": 8, "key": 4, "mode": 2 }"#;
        let track: Track = serde_json::from_str(data).unwrap();
        assert_eq!(track.key, Key::C);
        assert_eq!(track.mode, Mode::Major);
        assert!(!track.has_loop());
        assert!(track.tags.is_empty());
    }
}
