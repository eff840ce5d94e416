//! Turn queue: decides which participant has the floor.
//!
//! [`TurnQueue`] is the plain state machine.  Every method takes the current
//! time in microseconds so it can be driven by tests.  [`QueueManager`] wraps
//! it in a mutex, runs the one second supervisor thread and turns the
//! resulting [`Notice`]s into chat and voice messages.
use std::{
    collections::VecDeque,
    sync::{mpsc, Arc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::common::{
    get_micro_time,
    messages::{MessageCatalog, MessageId},
};

use super::{
    notifier::{voice_name, Notifier},
    play_duration::PlayDurationPolicy,
};

/// how early the successor is warned before a budget runs out
pub const NOTICE_WINDOW: u128 = 15_000_000;
/// no rotation this close to the end of the track
pub const TRACK_END_GUARD: u128 = 15_000_000;
/// the successor is not announced when the track ends within a budget plus this
pub const NEXT_ANNOUNCE_MARGIN: u128 = 10_000_000;
/// supervisor period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// a slot was granted
    NowPlaying { current: String, next: Option<String> },
    /// the named participant is about to get the floor
    GetReady(String),
}

/// a join or leave from the session's presence feed
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub name: String,
    pub active: bool,
}

#[derive(Debug)]
pub struct TurnQueue {
    bot_name: String,
    /// rotation order, the front has the floor
    users: VecDeque<String>,
    slot_start: Option<u128>,
    /// who the running slot was granted to
    slot_owner: Option<String>,
    delayed_start: Option<u128>,
    play_duration: u128,
    track_end: Option<u128>,
    notice_sent: bool,
    stopped: bool,
    notices: Vec<Notice>,
}

impl TurnQueue {
    pub fn new(bot_name: &str) -> TurnQueue {
        TurnQueue {
            bot_name: bot_name.to_string(),
            users: VecDeque::new(),
            slot_start: None,
            slot_owner: None,
            delayed_start: None,
            play_duration: 0,
            track_end: None,
            notice_sent: false,
            stopped: true,
            notices: vec![],
        }
    }

    /// notices raised since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn current(&self) -> Option<&str> {
        self.users.front().map(|s| s.as_str())
    }

    /// participants in rotation order starting with the one holding the floor
    pub fn users(&self) -> Vec<String> {
        self.users.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn slot_start(&self) -> Option<u128> {
        self.slot_start
    }

    pub fn delayed_start(&self) -> Option<u128> {
        self.delayed_start
    }

    pub fn play_duration(&self) -> u128 {
        self.play_duration
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn clear_slot(&mut self) {
        self.slot_start = None;
        self.slot_owner = None;
        self.notice_sent = false;
    }

    fn budget_expired(&self, now: u128) -> bool {
        match self.slot_start {
            Some(start) => now >= start + self.play_duration,
            None => false,
        }
    }

    pub fn add(&mut self, name: &str, now: u128) -> bool {
        if name == self.bot_name || self.users.iter().any(|u| u == name) {
            return false;
        }
        self.users.push_back(name.to_string());
        debug!("queue add {}: {:?}", name, self.users);
        if self.users.len() == 1 && self.track_end.is_some() && !self.stopped {
            self.start(now, 0);
        }
        true
    }

    pub fn del(&mut self, name: &str, now: u128) -> bool {
        let idx = match self.users.iter().position(|u| u == name) {
            Some(idx) => idx,
            None => return false,
        };
        if self.users.len() == 1 {
            self.users.clear();
            self.clear_slot();
            self.delayed_start = None;
            debug!("queue del {}: queue is empty", name);
            return true;
        }
        if self.users.remove(idx).is_none() {
            error!("queue del {}: index {} vanished", name, idx);
            return false;
        }
        debug!("queue del {}: {:?}", name, self.users);
        if idx == 0 {
            self.clear_slot();
            if !self.stopped {
                self.start(now, 0);
            }
        }
        true
    }

    /// hand the floor to the successor, or restart the sole participant's slot
    pub fn next(&mut self, now: u128) {
        if self.users.len() > 1 {
            self.users.rotate_left(1);
            self.clear_slot();
            debug!("queue rotated: {:?}", self.users);
            self.start(now, 0);
        } else {
            self.slot_start = Some(now);
            self.notice_sent = false;
        }
    }

    /// grant the front participant a slot starting `delay` microseconds from now
    pub fn start(&mut self, now: u128, delay: u128) {
        let current = match self.users.front() {
            Some(c) => c.clone(),
            None => {
                self.clear_slot();
                return;
            }
        };
        self.delayed_start = None;
        self.stopped = false;
        if self.slot_owner.as_deref() == Some(current.as_str()) && self.budget_expired(now) && self.users.len() > 1 {
            // their turn is over already, a fresh grant would hand it back
            debug!("{} already used the slot, rotating", current);
            self.next(now);
            return;
        }
        self.slot_start = Some(now + delay);
        self.slot_owner = Some(current.clone());
        self.notice_sent = false;
        let next = self.announce_next(now);
        info!("{} has the floor, next {:?}", current, next);
        self.notices.push(Notice::NowPlaying { current, next });
    }

    fn announce_next(&self, now: u128) -> Option<String> {
        let next = self.users.get(1)?;
        if let Some(end) = self.track_end {
            if now + self.play_duration + NEXT_ANNOUNCE_MARGIN > end {
                return None;
            }
        }
        Some(next.clone())
    }

    /// A track just started playing.  Its first interval is heard `interval`
    /// from now, so the slot and the track end are counted from there.
    pub fn on_start(&mut self, now: u128, track_duration: u128, play_duration: u128, interval: u128) {
        self.track_end = Some(now + interval + track_duration);
        self.play_duration = play_duration;
        self.stopped = false;
        self.start(now, interval);
    }

    /// a track started, the floor changes hands one interval plus `delay` from now
    pub fn on_delayed_start(&mut self, now: u128, track_duration: u128, play_duration: u128, interval: u128, delay: u128) {
        self.track_end = Some(now + track_duration);
        self.play_duration = play_duration;
        self.stopped = false;
        self.clear_slot();
        let current = match self.users.front() {
            Some(c) => c.clone(),
            None => return,
        };
        self.delayed_start = Some(now + interval + delay);
        self.notice_sent = true;
        self.notices.push(Notice::GetReady(current));
    }

    /// rotation order survives, ticks do nothing until the next start
    pub fn on_stop(&mut self) {
        self.stopped = true;
        self.delayed_start = None;
        self.clear_slot();
    }

    pub fn on_userinfo_change(&mut self, user: &UserInfo, now: u128) -> bool {
        if user.active {
            self.add(&user.name, now)
        } else {
            self.del(&user.name, now)
        }
    }

    /// one supervisor step
    pub fn tick(&mut self, now: u128) {
        if self.stopped || self.users.is_empty() {
            return;
        }
        if let Some(deadline) = self.delayed_start {
            if now >= deadline {
                self.start(now, 0);
            }
            return;
        }
        let slot_start = match self.slot_start {
            Some(s) => s,
            None => return,
        };
        if let Some(end) = self.track_end {
            if now + TRACK_END_GUARD >= end {
                return;
            }
        }
        let budget_end = slot_start + self.play_duration;
        if now < budget_end {
            if now + NOTICE_WINDOW >= budget_end && !self.notice_sent {
                self.notice_sent = true;
                if let Some(next) = self.users.get(1) {
                    self.notices.push(Notice::GetReady(next.clone()));
                }
            }
            return;
        }
        self.next(now);
    }
}

/// thread safe scheduler with its supervisor
pub struct QueueManager {
    queue: Arc<Mutex<TurnQueue>>,
    policy: PlayDurationPolicy,
    catalog: Arc<MessageCatalog>,
    notifier: Arc<dyn Notifier>,
    supervisor: Mutex<Option<mpsc::Sender<()>>>,
}

fn lock_queue(queue: &Mutex<TurnQueue>) -> MutexGuard<'_, TurnQueue> {
    queue.lock().unwrap_or_else(|e| e.into_inner())
}

/// send notices as chat text and as voice lines
fn deliver(catalog: &MessageCatalog, notifier: &dyn Notifier, notices: Vec<Notice>) {
    for notice in notices {
        let (text, voice) = match &notice {
            Notice::NowPlaying { current, next } => {
                let mut text = catalog.format(MessageId::NowPlaying, &[current]);
                let mut voice = catalog.format(MessageId::NowPlaying, &[&voice_name(current)]);
                if let Some(next) = next {
                    text = format!("{}, {}", text, catalog.format(MessageId::IsNext, &[next]));
                    voice = format!("{}, {}", voice, catalog.format(MessageId::IsNext, &[&voice_name(next)]));
                }
                (text, voice)
            }
            Notice::GetReady(name) => (
                catalog.format(MessageId::GetReady, &[name]),
                catalog.format(MessageId::GetReady, &[&voice_name(name)]),
            ),
        };
        notifier.send_message(&text);
        notifier.send_voice_message(&voice);
    }
}

impl QueueManager {
    pub fn new(
        bot_name: &str,
        policy: PlayDurationPolicy,
        catalog: Arc<MessageCatalog>,
        notifier: Arc<dyn Notifier>,
    ) -> QueueManager {
        QueueManager {
            queue: Arc::new(Mutex::new(TurnQueue::new(bot_name))),
            policy,
            catalog,
            notifier,
            supervisor: Mutex::new(None),
        }
    }

    /// run `f` under the lock, then deliver what it raised once the lock is released
    fn apply<T>(&self, f: impl FnOnce(&mut TurnQueue) -> T) -> T {
        let (result, notices) = {
            let mut queue = lock_queue(&self.queue);
            let result = f(&mut queue);
            (result, queue.take_notices())
        };
        deliver(&self.catalog, self.notifier.as_ref(), notices);
        result
    }

    pub fn add(&self, name: &str) -> bool {
        self.apply(|q| q.add(name, get_micro_time()))
    }

    pub fn del(&self, name: &str) -> bool {
        self.apply(|q| q.del(name, get_micro_time()))
    }

    pub fn users(&self) -> Vec<String> {
        lock_queue(&self.queue).users()
    }

    pub fn on_start(&self, track_duration: Duration, interval: Duration) {
        let budget = self.policy.play_duration(track_duration).as_micros();
        debug!("track of {:?} with {:?} intervals, turns of {} us", track_duration, interval, budget);
        self.apply(|q| q.on_start(get_micro_time(), track_duration.as_micros(), budget, interval.as_micros()));
    }

    pub fn on_delayed_start(&self, track_duration: Duration, interval: Duration, delay: Duration) {
        let budget = self.policy.play_duration(track_duration).as_micros();
        self.apply(|q| {
            q.on_delayed_start(
                get_micro_time(),
                track_duration.as_micros(),
                budget,
                interval.as_micros(),
                delay.as_micros(),
            )
        });
    }

    pub fn on_stop(&self) {
        self.apply(|q| q.on_stop());
    }

    pub fn on_userinfo_change(&self, user: &UserInfo) -> bool {
        self.apply(|q| q.on_userinfo_change(user, get_micro_time()))
    }

    pub fn tick(&self) {
        self.apply(|q| q.tick(get_micro_time()));
    }

    /// start the one second supervisor.  Calling it twice is a no-op.
    pub fn start_supervisor(&self) {
        let mut supervisor = self.supervisor.lock().unwrap_or_else(|e| e.into_inner());
        if supervisor.is_some() {
            warn!("queue supervisor already running");
            return;
        }
        let (close_tx, close_rx) = mpsc::channel::<()>();
        let queue = self.queue.clone();
        let catalog = self.catalog.clone();
        let notifier = self.notifier.clone();
        let spawned = thread::Builder::new().name("dj_queue".to_string()).spawn(move || loop {
            match close_rx.recv_timeout(TICK_PERIOD) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    let notices = {
                        let mut q = lock_queue(&queue);
                        q.tick(get_micro_time());
                        q.take_notices()
                    };
                    deliver(&catalog, notifier.as_ref(), notices);
                }
                _ => {
                    debug!("queue supervisor closed");
                    break;
                }
            }
        });
        match spawned {
            Ok(_) => *supervisor = Some(close_tx),
            Err(e) => error!("can't start queue supervisor: {}", e),
        }
    }

    pub fn shutdown(&self) {
        let mut supervisor = self.supervisor.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(close_tx) = supervisor.take() {
            let _ = close_tx.send(());
        }
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
