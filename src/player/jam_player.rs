//! The audio streaming engine.
//!
//! `start()` spawns two threads per run:
//!
//! * the decode thread reads the source into a [`SampleBuffer`] and reports
//!   ready once three intervals are buffered (or the source ran out first)
//! * the pacing thread waits for each interval deadline, slices the buffer
//!   with a [`LoopCursor`], encodes the slice and transmits it
//!
//! A stop request is a single slot channel checked at every deadline, so a
//! stop takes effect within one interval.
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError, SyncSender, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};
use simple_error::bail;

use crate::{
    common::{
        box_error::BoxError,
        dj_error::DjError,
        get_micro_time,
        stream_time_stat::{MicroTimer, StreamTimeStat},
    },
    tracks::track::Track,
};

use super::{
    interval::{AudioInterval, IntervalWriter},
    interval_encoder::IntervalEncoder,
    loop_cursor::{IntervalTiming, LoopCursor},
    sample_buffer::SampleBuffer,
    sample_source::{SampleSource, SourceLoader},
    PlaybackEnd, PlaybackEndFn, Player,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum StreamEnd {
    Completed,
    Stopped,
}

/// handles into one streaming run
struct PlaybackRun {
    stop_tx: SyncSender<()>,
    cancelled: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
}

pub struct JamPlayer {
    tracks_path: PathBuf,
    channel_index: u8,
    loader: Arc<dyn SourceLoader>,
    encoder: Arc<dyn IntervalEncoder>,
    writer: Arc<dyn IntervalWriter>,
    track: Option<Track>,
    source: Option<Box<dyn SampleSource>>,
    repeats: u32,
    on_end: Option<PlaybackEndFn>,
    run: Option<PlaybackRun>,
}

impl JamPlayer {
    pub fn new(
        tracks_path: &str,
        loader: Arc<dyn SourceLoader>,
        encoder: Arc<dyn IntervalEncoder>,
        writer: Arc<dyn IntervalWriter>,
    ) -> JamPlayer {
        JamPlayer {
            tracks_path: PathBuf::from(tracks_path),
            channel_index: 0,
            loader,
            encoder,
            writer,
            track: None,
            source: None,
            repeats: 0,
            on_end: None,
            run: None,
        }
    }

    pub fn set_channel_index(&mut self, channel_index: u8) {
        self.channel_index = channel_index;
    }

    pub fn get_repeats(&self) -> u32 {
        self.repeats
    }

    pub fn get_track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.tracks_path.join(path)
        }
    }

    fn open_source(&self, track: &Track) -> Result<Box<dyn SampleSource>, DjError> {
        let path = self.resolve(&track.file_path);
        self.loader
            .open(&path)
            .map_err(|e| DjError::SourceUnavailable(format!("{}: {}", path.display(), e)))
    }
}

impl Player for JamPlayer {
    fn load_track(&mut self, track: &Track) -> Result<(), DjError> {
        self.stop();
        self.track = None;
        self.source = None;
        self.repeats = 0;
        let source = self.open_source(track)?;
        // reject tracks we could never pace before anyone asks to start them
        IntervalTiming::new(source.sample_rate(), track)?;
        info!("loaded track {}: {}", track.id, track);
        self.track = Some(track.clone());
        self.source = Some(source);
        Ok(())
    }

    fn set_repeats(&mut self, repeats: u32) {
        self.repeats = repeats;
    }

    fn start(&mut self) -> Result<(), DjError> {
        if self.playing() {
            return Err(DjError::Busy);
        }
        let track = self.track.clone().ok_or(DjError::NoSelection)?;
        // a finished run consumed the decoder, open the file again
        let source = match self.source.take() {
            Some(source) => source,
            None => self.open_source(&track)?,
        };
        let timing = IntervalTiming::new(source.sample_rate(), &track)?;
        let buffer = Arc::new(SampleBuffer::new());
        let cancelled = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(true));

        let (ready_tx, ready_rx) = mpsc::channel();
        {
            let buffer = buffer.clone();
            let cancelled = cancelled.clone();
            thread::Builder::new()
                .name(format!("dj_decode_{}", track.id))
                .spawn(move || decode(source, &buffer, &timing, ready_tx, &cancelled))
                .map_err(|e| DjError::Internal(format!("decode thread: {}", e)))?;
        }
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(DjError::SourceUnavailable(reason)),
            Err(_) => return Err(DjError::Internal("decode thread exited before pre-roll".to_string())),
        }

        let (stop_tx, stop_rx) = mpsc::sync_channel(1);
        let pacer = Pacer {
            buffer,
            timing,
            repeats: self.repeats,
            channel_index: self.channel_index,
            encoder: self.encoder.clone(),
            writer: self.writer.clone(),
        };
        let on_end = self.on_end.clone();
        let run_cancelled = cancelled.clone();
        let run_playing = playing.clone();
        let track_id = track.id;
        let spawned = thread::Builder::new()
            .name(format!("dj_pace_{}", track_id))
            .spawn(move || {
                let result = pacer.run(&stop_rx);
                let stopped = run_cancelled.swap(true, Ordering::SeqCst);
                run_playing.store(false, Ordering::SeqCst);
                let end = match result {
                    Ok(StreamEnd::Stopped) => None,
                    Ok(StreamEnd::Completed) if !stopped => {
                        info!("track {} finished", track_id);
                        Some(PlaybackEnd::Completed)
                    }
                    Ok(StreamEnd::Completed) => None,
                    Err(e) if !stopped => {
                        error!("track {} streaming failed: {}", track_id, e);
                        Some(PlaybackEnd::Failed(e.to_string()))
                    }
                    Err(e) => {
                        warn!("track {} failed after stop: {}", track_id, e);
                        None
                    }
                };
                match (end, on_end) {
                    (Some(end), Some(on_end)) => on_end(end),
                    _ => debug!("track {} run over", track_id),
                }
            });
        if let Err(e) = spawned {
            cancelled.store(true, Ordering::SeqCst);
            return Err(DjError::Internal(format!("pacing thread: {}", e)));
        }
        info!("streaming track {} with {} repeats", track.id, self.repeats);
        self.run = Some(PlaybackRun {
            stop_tx,
            cancelled,
            playing,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            run.cancelled.store(true, Ordering::SeqCst);
            run.playing.store(false, Ordering::SeqCst);
            // a full slot means a stop is already pending
            let _ = run.stop_tx.try_send(());
            debug!("stop requested");
        }
    }

    fn playing(&self) -> bool {
        match &self.run {
            Some(run) => run.playing.load(Ordering::SeqCst),
            None => false,
        }
    }

    fn set_on_end(&mut self, on_end: PlaybackEndFn) {
        self.on_end = Some(on_end);
    }
}

impl Drop for JamPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// decode thread body
fn decode(
    mut source: Box<dyn SampleSource>,
    buffer: &SampleBuffer,
    timing: &IntervalTiming,
    ready_tx: mpsc::Sender<Result<(), String>>,
    cancelled: &AtomicBool,
) {
    let pre_roll = timing.pre_roll_frames();
    let mut ready_sent = false;
    loop {
        if cancelled.load(Ordering::SeqCst) {
            buffer.finish();
            break;
        }
        match source.read_frames(timing.interval_frames) {
            Ok(Some(chunk)) => {
                buffer.append(chunk);
                if !ready_sent && buffer.len() >= pre_roll {
                    let _ = ready_tx.send(Ok(()));
                    ready_sent = true;
                }
            }
            Ok(None) => {
                buffer.finish();
                debug!("decoded {} frames", buffer.len());
                break;
            }
            Err(e) => {
                let reason = format!("decode error: {}", e);
                error!("{}", reason);
                buffer.fail(&reason);
                if !ready_sent {
                    let _ = ready_tx.send(Err(reason));
                }
                return;
            }
        }
    }
    if !ready_sent {
        let _ = ready_tx.send(Ok(()));
    }
}

/// pacing thread state
struct Pacer {
    buffer: Arc<SampleBuffer>,
    timing: IntervalTiming,
    repeats: u32,
    channel_index: u8,
    encoder: Arc<dyn IntervalEncoder>,
    writer: Arc<dyn IntervalWriter>,
}

impl Pacer {
    fn run(&self, stop_rx: &mpsc::Receiver<()>) -> Result<StreamEnd, BoxError> {
        let mut cursor = LoopCursor::new(&self.timing, self.repeats);
        let mut timer = MicroTimer::new(get_micro_time(), self.timing.interval.as_micros());
        let mut lateness = StreamTimeStat::new(16);
        let mut tick: u128 = 1;
        loop {
            let (available, complete) = self.buffer.wait_for(cursor.frames_wanted());
            if let Some(reason) = self.buffer.failure() {
                bail!("{}", reason);
            }
            let slice = cursor.next_slice(available, complete);
            let frames = self.buffer.copy_segments(&slice.segments);
            let blocks = self.encoder.encode_interval(self.timing.sample_rate, &frames)?;
            let mut audio = AudioInterval::new(AudioInterval::new_guid(), self.channel_index, blocks);

            let deadline = timer.deadline();
            if wait_for_tick(stop_rx, deadline) {
                debug!("stopped before interval {}", tick);
                return Ok(StreamEnd::Stopped);
            }
            // next deadline is one interval after this one
            timer.reset(deadline);
            lateness.add_sample(timer.since(get_micro_time()) as f64);
            audio.transmit(self.writer.as_ref())?;
            debug!("interval {} {} late: {}", tick, audio, lateness);
            tick += 1;
            if slice.last {
                return Ok(StreamEnd::Completed);
            }
        }
    }
}

/// sleep until `deadline`.  Returns true when a stop arrived first.
fn wait_for_tick(stop_rx: &mpsc::Receiver<()>, deadline: u128) -> bool {
    let now = get_micro_time();
    if deadline > now {
        let wait = Duration::from_micros((deadline - now) as u64);
        return !matches!(stop_rx.recv_timeout(wait), Err(RecvTimeoutError::Timeout));
    }
    !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

#[cfg(test)]
mod test_jam_player {
    use super::*;
    use crate::player::{
        interval::{IntervalGuid, INTERVAL_FLAG_FINAL},
        interval_encoder::PcmBlockEncoder,
        sample_source::{MemorySource, MockSourceLoader},
    };
    use std::sync::Mutex;

    /// writer that remembers every call
    #[derive(Default)]
    struct RecordingWriter {
        calls: Mutex<Vec<(IntervalGuid, Option<(usize, u8)>)>>,
    }

    impl IntervalWriter for RecordingWriter {
        fn interval_begin(&self, guid: IntervalGuid, _channel_index: u8) -> Result<(), BoxError> {
            self.calls.lock().unwrap().push((guid, None));
            Ok(())
        }
        fn interval_write(&self, guid: IntervalGuid, data: &[u8], flags: u8) -> Result<(), BoxError> {
            self.calls.lock().unwrap().push((guid, Some((data.len(), flags))));
            Ok(())
        }
    }

    impl RecordingWriter {
        fn intervals(&self) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| c.1.is_none()).count()
        }
        /// bytes written with the final flag counted per interval
        fn final_flags(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c.1, Some((_, INTERVAL_FLAG_FINAL))))
                .count()
        }
        fn bytes(&self) -> usize {
            self.calls.lock().unwrap().iter().filter_map(|c| c.1).map(|c| c.0).sum()
        }
    }

    /// 1000 frames a second, 600 bpm and 1 beat per interval gives 100 ms
    /// intervals of 100 frames
    fn fast_track(frames: u64) -> Track {
        Track {
            id: 3,
            file_path: "fast.wav".to_string(),
            length: frames * 1000,
            bpm: 600,
            bpi: 1,
            ..Default::default()
        }
    }

    fn memory(frames: usize) -> Box<dyn SampleSource> {
        Box::new(MemorySource::new(1000, vec![0.25; frames], vec![-0.25; frames]))
    }

    fn loader_for(frames: usize) -> Arc<dyn SourceLoader> {
        let mut loader = MockSourceLoader::new();
        loader.expect_open().returning(move |_| Ok(memory(frames)));
        Arc::new(loader)
    }

    fn player(loader: Arc<dyn SourceLoader>, writer: Arc<RecordingWriter>) -> JamPlayer {
        JamPlayer::new("tracks", loader, Arc::new(PcmBlockEncoder::new(1 << 16)), writer)
    }

    fn wait_for_end(rx: &mpsc::Receiver<PlaybackEnd>) -> PlaybackEnd {
        rx.recv_timeout(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn start_without_track() {
        let mut p = player(loader_for(10), Arc::new(RecordingWriter::default()));
        assert_eq!(p.start(), Err(DjError::NoSelection));
        assert!(!p.playing());
    }

    #[test]
    fn load_failure_is_source_unavailable() {
        let mut loader = MockSourceLoader::new();
        loader.expect_open().returning(|_| Err("no such file".into()));
        let mut p = player(Arc::new(loader), Arc::new(RecordingWriter::default()));
        assert!(matches!(p.load_track(&fast_track(10)), Err(DjError::SourceUnavailable(_))));
        assert_eq!(p.start(), Err(DjError::NoSelection));
    }

    #[test]
    fn relative_paths_use_tracks_dir() {
        let mut loader = MockSourceLoader::new();
        loader
            .expect_open()
            .withf(|path| path == Path::new("tracks/fast.wav"))
            .times(1)
            .returning(|_| Ok(memory(5)));
        let mut p = player(Arc::new(loader), Arc::new(RecordingWriter::default()));
        p.load_track(&fast_track(5)).unwrap();
        assert_eq!(p.get_track().map(|t| t.id), Some(3));
    }

    #[test]
    fn load_resets_repeats() {
        let mut p = player(loader_for(10), Arc::new(RecordingWriter::default()));
        p.set_repeats(4);
        p.load_track(&fast_track(10)).unwrap();
        assert_eq!(p.get_repeats(), 0);
    }

    #[test]
    fn plays_to_completion() {
        let writer = Arc::new(RecordingWriter::default());
        let mut p = player(loader_for(350), writer.clone());
        let (tx, rx) = mpsc::channel();
        p.set_on_end(Arc::new(move |end| {
            let _ = tx.send(end);
        }));
        p.load_track(&fast_track(350)).unwrap();
        p.start().unwrap();
        assert!(p.playing());
        assert_eq!(p.start(), Err(DjError::Busy));
        assert_eq!(wait_for_end(&rx), PlaybackEnd::Completed);
        assert!(!p.playing());
        // 100 + 100 + 100 + 50 frames
        assert_eq!(writer.intervals(), 4);
        assert_eq!(writer.final_flags(), 4);
        assert_eq!(writer.bytes(), 350 * 4);
    }

    #[test]
    fn repeats_extend_the_stream() {
        let writer = Arc::new(RecordingWriter::default());
        let mut p = player(loader_for(300), writer.clone());
        let (tx, rx) = mpsc::channel();
        p.set_on_end(Arc::new(move |end| {
            let _ = tx.send(end);
        }));
        let mut track = fast_track(300);
        track.loop_start = 100_000;
        track.loop_end = 200_000;
        p.load_track(&track).unwrap();
        p.set_repeats(2);
        p.start().unwrap();
        assert_eq!(wait_for_end(&rx), PlaybackEnd::Completed);
        assert_eq!(writer.bytes(), (300 + 2 * 100) * 4);
    }

    #[test]
    fn stop_is_silent() {
        let writer = Arc::new(RecordingWriter::default());
        let mut p = player(loader_for(100_000), writer.clone());
        let (tx, rx) = mpsc::channel();
        p.set_on_end(Arc::new(move |end| {
            let _ = tx.send(end);
        }));
        p.load_track(&fast_track(100_000)).unwrap();
        p.start().unwrap();
        thread::sleep(Duration::from_millis(250));
        p.stop();
        assert!(!p.playing());
        thread::sleep(Duration::from_millis(300));
        let sent = writer.intervals();
        assert!(sent < 5, "{} intervals after stop", sent);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn restart_reopens_source() {
        let writer = Arc::new(RecordingWriter::default());
        let mut loader = MockSourceLoader::new();
        loader
            .expect_open()
            .times(2)
            .returning(|_| Ok(memory(50)));
        let mut p = player(Arc::new(loader), writer.clone());
        let (tx, rx) = mpsc::channel();
        p.set_on_end(Arc::new(move |end| {
            let _ = tx.send(end);
        }));
        p.load_track(&fast_track(50)).unwrap();
        p.start().unwrap();
        assert_eq!(wait_for_end(&rx), PlaybackEnd::Completed);
        p.start().unwrap();
        assert_eq!(wait_for_end(&rx), PlaybackEnd::Completed);
        assert_eq!(writer.intervals(), 2);
    }

    #[test]
    fn writer_fault_reports_failure() {
        let mut writer = crate::player::interval::MockIntervalWriter::new();
        writer.expect_interval_begin().returning(|_, _| Err("server gone".into()));
        let mut p = JamPlayer::new(
            "tracks",
            loader_for(500),
            Arc::new(PcmBlockEncoder::new(1024)),
            Arc::new(writer),
        );
        let (tx, rx) = mpsc::channel();
        p.set_on_end(Arc::new(move |end| {
            let _ = tx.send(end);
        }));
        p.load_track(&fast_track(500)).unwrap();
        p.start().unwrap();
        assert_eq!(wait_for_end(&rx), PlaybackEnd::Failed("server gone".to_string()));
        assert!(!p.playing());
    }

    #[test]
    fn tempo_less_track_is_rejected() {
        let mut p = player(loader_for(10), Arc::new(RecordingWriter::default()));
        let track = Track { bpm: 0, ..fast_track(10) };
        assert!(matches!(p.load_track(&track), Err(DjError::InvalidInput(_))));
    }
}
