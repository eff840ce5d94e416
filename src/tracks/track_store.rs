//! lookup boundary between the session manager and track persistence
//!
//! The bot only ever reads tracks, so the store is a handful of synchronous
//! lookups.  [`CatalogStore`] keeps the whole catalog in memory and is loaded from
//! a json file shaped like
//!
//! ```json
//! { "tags": [ { "id": 1, "name": "blues" } ],
//!   "tracks": [ { "id": 1, "file_path": "blues.wav", "length": 180000000, "bpm": 120, "bpi": 4 } ],
//!   "playlists": [ { "id": 1, "name": "warmup", "tracks": [ { "track_id": 1, "repeats": 2 } ] } ] }
//! ```
use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

use log::info;
use serde::{Deserialize, Serialize};

use crate::common::{box_error::BoxError, dj_error::DjError};

use super::track::{Playlist, Tag, Track};

#[cfg_attr(test, automock)]
pub trait TrackStore: Send + Sync {
    fn track(&self, id: u32) -> Result<Track, DjError>;
    fn playlist(&self, id: u32) -> Result<Playlist, DjError>;
    fn tag_by_name(&self, name: &str) -> Result<Tag, DjError>;
    /// upper bound used for random draws: every track id is below this
    fn count_tracks(&self) -> Result<u32, DjError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    tracks: Vec<Track>,
    #[serde(default)]
    playlists: Vec<Playlist>,
}

#[derive(Debug, Default)]
pub struct CatalogStore {
    tags: Vec<Tag>,
    tracks: HashMap<u32, Track>,
    playlists: HashMap<u32, Playlist>,
}

impl CatalogStore {
    pub fn new() -> CatalogStore {
        CatalogStore::default()
    }

    pub fn from_file(path: &str) -> Result<CatalogStore, BoxError> {
        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_json_str(&raw)?;
        info!(
            "catalog {} loaded: {} tracks, {} playlists, {} tags",
            path,
            store.tracks.len(),
            store.playlists.len(),
            store.tags.len()
        );
        Ok(store)
    }

    pub fn from_json_str(data: &str) -> Result<CatalogStore, BoxError> {
        let file: CatalogFile = serde_json::from_str(data)?;
        let mut store = CatalogStore::new();
        store.tags = file.tags;
        for track in file.tracks {
            store.add_track(track);
        }
        for playlist in file.playlists {
            store.add_playlist(playlist);
        }
        Ok(store)
    }

    pub fn add_track(&mut self, mut track: Track) {
        track.clean_text();
        self.tracks.insert(track.id, track);
    }

    pub fn add_playlist(&mut self, playlist: Playlist) {
        self.playlists.insert(playlist.id, playlist);
    }

    pub fn add_tag(&mut self, tag: Tag) {
        self.tags.push(tag);
    }
}

impl TrackStore for CatalogStore {
    fn track(&self, id: u32) -> Result<Track, DjError> {
        self.tracks
            .get(&id)
            .cloned()
            .ok_or(DjError::NotFound(format!("track {}", id)))
    }

    fn playlist(&self, id: u32) -> Result<Playlist, DjError> {
        self.playlists
            .get(&id)
            .cloned()
            .ok_or(DjError::NotFound(format!("playlist {}", id)))
    }

    fn tag_by_name(&self, name: &str) -> Result<Tag, DjError> {
        self.tags
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or(DjError::NotFound(format!("tag {}", name)))
    }

    fn count_tracks(&self) -> Result<u32, DjError> {
        // ids need not be dense, so report one past the highest id
        Ok(self.tracks.keys().max().map(|id| id + 1).unwrap_or(0))
    }
}
