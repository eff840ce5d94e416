//! Session orchestrator.
//!
//! Turns chat commands into player calls.  Every public operation returns
//! the one localized sentence that should go back to the chat (possibly
//! empty).  When a track ends on its own the player calls back into
//! [`JamManager::on_playback_end`], which advances a playlist or goes idle.
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::{debug, error, info, warn};
use rand::Rng;

use crate::{
    common::{
        dj_error::DjError,
        messages::{MessageCatalog, MessageId},
    },
    player::{PlaybackEnd, PlaybackEndFn, Player},
    tracks::{
        key::KeyMode,
        track::{Playlist, Track},
        track_store::TrackStore,
    },
};

use super::{command::JamCommand, notifier::Notifier, queue_manager::QueueManager};

/// random draws before giving up
pub const RANDOM_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JamMode {
    Idle,
    PlayingTrack,
    PlayingPlaylist,
}

impl fmt::Display for JamMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JamMode::Idle => write!(f, "idle"),
            JamMode::PlayingTrack => write!(f, "track"),
            JamMode::PlayingPlaylist => write!(f, "playlist"),
        }
    }
}

/// How many times the loop window must replay for the track to last
/// `requested`.  Zero when the track has no loop or is long enough already.
pub fn count_repeats(track: &Track, requested: Duration) -> u32 {
    let requested = requested.as_micros();
    let length = track.length as u128;
    if !track.has_loop() || length >= requested {
        return 0;
    }
    let tail = length.saturating_sub(track.loop_end as u128);
    let fill = requested.saturating_sub(track.loop_start as u128 + tail);
    (fill / track.loop_length() as u128).min(u32::MAX as u128) as u32
}

pub type SharedJamManager = Arc<Mutex<JamManager>>;

pub fn lock_manager(shared: &Mutex<JamManager>) -> MutexGuard<'_, JamManager> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct JamManager {
    bot_name: String,
    mode: JamMode,
    playing: bool,
    track: Option<Track>,
    repeats: u32,
    playlist: Option<Playlist>,
    playlist_pos: usize,
    player: Box<dyn Player>,
    store: Arc<dyn TrackStore>,
    catalog: Arc<MessageCatalog>,
    notifier: Arc<dyn Notifier>,
    queue: Option<Arc<QueueManager>>,
}

impl JamManager {
    pub fn new(
        bot_name: &str,
        player: Box<dyn Player>,
        store: Arc<dyn TrackStore>,
        catalog: Arc<MessageCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> JamManager {
        JamManager {
            bot_name: bot_name.to_string(),
            mode: JamMode::Idle,
            playing: false,
            track: None,
            repeats: 0,
            playlist: None,
            playlist_pos: 0,
            player,
            store,
            catalog,
            notifier,
            queue: None,
        }
    }

    pub fn set_queue(&mut self, queue: Arc<QueueManager>) {
        self.queue = Some(queue);
    }

    /// Move into a mutex and route the player's end callback back to us.
    pub fn into_shared(self) -> SharedJamManager {
        let shared = Arc::new(Mutex::new(self));
        let weak = Arc::downgrade(&shared);
        let on_end: PlaybackEndFn = Arc::new(move |end| {
            if let Some(manager) = weak.upgrade() {
                lock_manager(&manager).on_playback_end(end);
            }
        });
        lock_manager(&shared).player.set_on_end(on_end);
        shared
    }

    pub fn mode(&self) -> JamMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    pub fn current_playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    fn text(&self, id: MessageId) -> String {
        self.catalog.text(id)
    }

    fn format(&self, id: MessageId, args: &[&dyn fmt::Display]) -> String {
        self.catalog.format(id, args)
    }

    fn stop_playback(&mut self) {
        self.player.stop();
        self.playing = false;
        if let Some(queue) = &self.queue {
            queue.on_stop();
        }
    }

    fn go_idle(&mut self) {
        self.mode = JamMode::Idle;
        self.playing = false;
        if let Some(queue) = &self.queue {
            queue.on_stop();
        }
    }

    fn start_player(&mut self) -> Result<(), DjError> {
        self.player.start()?;
        self.playing = true;
        if let (Some(queue), Some(track)) = (&self.queue, &self.track) {
            queue.on_start(track.duration_with_repeats(self.repeats), track.interval_duration());
        }
        Ok(())
    }

    fn play_track(&mut self, track: Track, repeats: u32, mode: JamMode) -> Result<(), DjError> {
        self.track = None;
        self.mode = JamMode::Idle;
        self.player.load_track(&track)?;
        self.player.set_repeats(repeats);
        info!("{} mode, track {} with {} repeats", mode, track.id, repeats);
        self.track = Some(track);
        self.repeats = repeats;
        self.mode = mode;
        self.start_player()
    }

    /// sentence for a failure that has no more specific message
    fn failure(&self, err: &DjError) -> String {
        match err {
            DjError::Internal(_) | DjError::SourceUnavailable(_) | DjError::InvalidInput(_) => {
                error!("{}", err)
            }
            _ => debug!("{}", err),
        }
        self.catalog.error_message(err)
    }

    fn playing_track_text(&self) -> String {
        match &self.track {
            Some(track) => self.format(MessageId::PlayingTrack, &[track]),
            None => self.text(MessageId::ErrorTrackNotSelected),
        }
    }

    pub fn play_random(&mut self, key: Option<KeyMode>, duration: Option<Duration>, tags: &[String]) -> String {
        self.stop_playback();
        let mut tag_ids = vec![];
        for name in tags {
            match self.store.tag_by_name(name) {
                Ok(tag) => tag_ids.push(tag.id),
                Err(e) if e.is_not_found() => return self.format(MessageId::ErrorTagNotFound, &[name]),
                Err(e) => return self.failure(&e),
            }
        }
        let count = match self.store.count_tracks() {
            Ok(count) => count,
            Err(e) => return self.failure(&e),
        };
        if count == 0 {
            return self.text(MessageId::CantStartRandomTrack);
        }
        let mut rng = rand::thread_rng();
        for _ in 0..RANDOM_ATTEMPTS {
            let id = rng.gen_range(0..count);
            let track = match self.store.track(id) {
                Ok(track) => track,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return self.failure(&e),
            };
            if let Some(km) = key {
                if track.key != km.key {
                    continue;
                }
            }
            if !tag_ids.is_empty() && !track.has_any_tag(&tag_ids) {
                continue;
            }
            let repeats = duration.map(|d| count_repeats(&track, d)).unwrap_or(0);
            self.playlist = None;
            return match self.play_track(track, repeats, JamMode::PlayingTrack) {
                Ok(()) => self.playing_track_text(),
                Err(e) => self.failure(&e),
            };
        }
        warn!("no track matched after {} draws", RANDOM_ATTEMPTS);
        self.failure(&DjError::Exhausted)
    }

    pub fn start_track(&mut self, id: u32) -> String {
        self.stop_playback();
        let track = match self.store.track(id) {
            Ok(track) => track,
            Err(e) if e.is_not_found() => return self.format(MessageId::ErrorTrackNotFound, &[&id]),
            Err(e) => return self.failure(&e),
        };
        self.playlist = None;
        match self.play_track(track, 0, JamMode::PlayingTrack) {
            Ok(()) => self.playing_track_text(),
            Err(e) => self.failure(&e),
        }
    }

    pub fn start_playlist(&mut self, id: u32) -> String {
        self.stop_playback();
        let playlist = match self.store.playlist(id) {
            Ok(playlist) => playlist,
            Err(e) if e.is_not_found() => return self.format(MessageId::ErrorPlaylistNotFound, &[&id]),
            Err(e) => return self.failure(&e),
        };
        let first = match playlist.tracks.first() {
            Some(entry) => *entry,
            None => return self.format(MessageId::ErrorPlaylistIsEmpty, &[&id]),
        };
        let track = match self.store.track(first.track_id) {
            Ok(track) => track,
            Err(e) if e.is_not_found() => return self.format(MessageId::ErrorTrackNotFound, &[&first.track_id]),
            Err(e) => return self.failure(&e),
        };
        let name = playlist.name.clone();
        self.playlist = Some(playlist);
        self.playlist_pos = 0;
        match self.play_track(track, first.repeats, JamMode::PlayingPlaylist) {
            Ok(()) => self.format(MessageId::PlaylistStarted, &[&name]),
            Err(e) => self.failure(&e),
        }
    }

    /// Load the playlist entry after the current one.  `Ok(None)` when the
    /// current entry is the last, `Err` carries the sentence for the chat.
    fn advance(&mut self) -> Result<Option<String>, String> {
        let (entry, pos) = match &self.playlist {
            Some(playlist) => match playlist.tracks.get(self.playlist_pos + 1) {
                Some(entry) => (*entry, self.playlist_pos + 1),
                None => return Ok(None),
            },
            None => return Ok(None),
        };
        self.player.stop();
        self.playing = false;
        let track = match self.store.track(entry.track_id) {
            Ok(track) => track,
            Err(e) if e.is_not_found() => {
                warn!("playlist entry {} points at missing track {}", pos, entry.track_id);
                return Err(self.format(MessageId::ErrorTrackNotFound, &[&entry.track_id]));
            }
            Err(e) => return Err(self.failure(&e)),
        };
        self.playlist_pos = pos;
        match self.play_track(track, entry.repeats, JamMode::PlayingPlaylist) {
            Ok(()) => Ok(Some(self.playing_track_text())),
            Err(e) => Err(self.failure(&e)),
        }
    }

    pub fn next(&mut self) -> String {
        if self.mode != JamMode::PlayingPlaylist {
            return self.text(MessageId::NextOnlyInPlaylist);
        }
        match self.advance() {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("next: already at the last playlist entry");
                String::new()
            }
            Err(text) => text,
        }
    }

    /// stop streaming, the track stays selected
    pub fn stop(&mut self) -> String {
        self.stop_playback();
        info!("playback stopped");
        self.text(MessageId::PlaybackStopped)
    }

    /// start the selected track again
    pub fn start(&mut self) -> String {
        if self.track.is_none() {
            return self.text(MessageId::ErrorTrackNotSelected);
        }
        if self.player.playing() {
            return self.text(MessageId::AlreadyStarted);
        }
        self.player.set_repeats(self.repeats);
        match self.start_player() {
            Ok(()) => {
                if self.mode == JamMode::Idle {
                    self.mode = JamMode::PlayingTrack;
                }
                self.playing_track_text()
            }
            Err(e) => self.failure(&e),
        }
    }

    pub fn help(&self) -> String {
        let name: &dyn fmt::Display = &self.bot_name;
        self.format(MessageId::Help, &[name; 9])
    }

    pub fn playing_status(&self) -> String {
        if !self.playing {
            return self.text(MessageId::NothingPlaying);
        }
        let track = self.playing_track_text();
        match (&self.mode, &self.playlist) {
            (JamMode::PlayingPlaylist, Some(playlist)) => {
                format!("{}, {}", self.format(MessageId::PlaylistPlaying, &[&playlist.name]), track)
            }
            _ => track,
        }
    }

    pub fn queue_list(&self) -> String {
        let users = match &self.queue {
            Some(queue) => queue.users(),
            None => vec![],
        };
        if users.is_empty() {
            return self.text(MessageId::QueueEmpty);
        }
        self.format(MessageId::QueueList, &[&users.join(", ")])
    }

    /// Run one chat command.  A leading bot name is dropped.
    pub fn command(&mut self, text: &str) -> String {
        let text = text.trim();
        let body = match text.split_once(char::is_whitespace) {
            Some((first, rest)) if first.eq_ignore_ascii_case(&self.bot_name) => rest,
            _ if text.eq_ignore_ascii_case(&self.bot_name) => "",
            _ => text,
        };
        let cmd = match JamCommand::parse(body) {
            Ok(cmd) => cmd,
            Err(e) => {
                debug!("bad command '{}': {}", text, e);
                return self.format(MessageId::UnableToRecognizeCommand, &[&self.bot_name]);
            }
        };
        debug!("command: {}", cmd);
        match cmd {
            JamCommand::Random { key, duration, tags } => self.play_random(key, duration, &tags),
            JamCommand::Track(id) => self.start_track(id),
            JamCommand::Playlist(id) => self.start_playlist(id),
            JamCommand::Stop => self.stop(),
            JamCommand::Play => self.start(),
            JamCommand::Next => self.next(),
            JamCommand::Help => self.help(),
            JamCommand::Playing => self.playing_status(),
            JamCommand::Queue => self.queue_list(),
        }
    }

    /// called from the player's pacing thread when a run ends on its own
    pub fn on_playback_end(&mut self, end: PlaybackEnd) {
        if self.player.playing() {
            // a newer run already replaced the one that ended
            debug!("ignoring stale end: {:?}", end);
            return;
        }
        self.playing = false;
        match end {
            PlaybackEnd::Completed if self.mode == JamMode::PlayingPlaylist => match self.advance() {
                Ok(Some(text)) => self.notifier.send_message(&text),
                Ok(None) => {
                    let name = self.playlist.as_ref().map(|p| p.name.clone()).unwrap_or_default();
                    info!("playlist {} finished", name);
                    self.notifier
                        .send_message(&self.format(MessageId::PlaylistFinished, &[&name]));
                    self.go_idle();
                }
                Err(text) => {
                    self.notifier.send_message(&text);
                    self.go_idle();
                }
            },
            PlaybackEnd::Completed => self.go_idle(),
            PlaybackEnd::Failed(reason) => {
                error!("playback failed: {}", reason);
                let title = self.track.as_ref().map(|t| t.title.clone()).unwrap_or_default();
                self.notifier
                    .send_message(&self.format(MessageId::TrackInterrupted, &[&title]));
                self.go_idle();
            }
        }
    }
}
