use std::sync::mpsc::Receiver;
use std::time::Duration;

use rand::Rng;
use rand::rngs::ThreadRng;
use tracing::{debug, info, warn};

use crate::audio::{AnalysisTap, AudioGraph, DeviceEvent, GraphMode, OutputDevice};
use crate::config::Settings;
use crate::library::Track;

use super::events::{EventHub, PlaybackEvent, SubscriptionId, TimeUpdate};
use super::policy::{random_index_excluding, wrap_index};

/// Level unmuting falls back to when the player started muted.
const DEFAULT_UNMUTED_VOLUME: f32 = 0.7;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Idle,
    Loaded,
    Playing,
    Paused,
}

/// Snapshot of the current track and where playback is in it.
#[derive(Clone, Debug, PartialEq)]
pub struct NowPlaying {
    pub index: usize,
    pub track: Track,
    pub time: TimeUpdate,
}

pub struct PlaybackController<D: OutputDevice, R: Rng = ThreadRng> {
    graph: AudioGraph<D>,
    queue: Vec<Track>,
    current_index: Option<usize>,
    transport: Transport,
    shuffle: bool,
    repeat: bool,
    volume: f32,
    // Level restored by unmuting.
    unmuted_volume: f32,
    restart_threshold: Duration,
    // Bumped for every start request; only the latest one may complete.
    generation: u64,
    pending_start: Option<u64>,
    source_bound: bool,
    // Device errors in a row without a successful start.
    failures: usize,
    events: EventHub,
    rng: R,
}

impl<D: OutputDevice> PlaybackController<D, ThreadRng> {
    pub fn new(graph: AudioGraph<D>, settings: &Settings) -> Self {
        Self::with_rng(graph, settings, rand::rng())
    }
}

impl<D: OutputDevice, R: Rng> PlaybackController<D, R> {
    pub fn with_rng(graph: AudioGraph<D>, settings: &Settings, rng: R) -> Self {
        let mut controller = Self {
            graph,
            queue: Vec::new(),
            current_index: None,
            transport: Transport::Idle,
            shuffle: settings.playback.shuffle,
            repeat: settings.playback.repeat,
            volume: 1.0,
            unmuted_volume: DEFAULT_UNMUTED_VOLUME,
            restart_threshold: Duration::from_millis(
                settings.playback.previous_restart_threshold_ms,
            ),
            generation: 0,
            pending_start: None,
            source_bound: false,
            failures: 0,
            events: EventHub::new(),
            rng,
        };
        controller.set_volume(settings.audio.initial_volume);
        controller
    }

    // ---- queue ----

    /// Replace the queue. The current index stays put when it still fits.
    pub fn load_queue(&mut self, tracks: Vec<Track>) {
        let was_empty = self.queue.is_empty();
        self.queue = tracks;

        if self.queue.is_empty() {
            let was_active = self.is_active();
            self.invalidate_start();
            self.graph.pause();
            self.current_index = None;
            self.source_bound = false;
            self.transport = Transport::Idle;
            if was_active {
                self.events.emit(PlaybackEvent::PlayStateChanged(false));
            }
            info!("queue cleared");
            return;
        }

        match self.current_index {
            Some(i) if !was_empty && i < self.queue.len() => {}
            _ => {
                self.current_index = Some(0);
                self.source_bound = false;
            }
        }
        info!(tracks = self.queue.len(), "queue loaded");
    }

    /// Bind the track at `index` (wrapped into the queue) to the device.
    /// Returns false on an empty queue.
    pub fn load_track(&mut self, index: isize) -> bool {
        let Some(i) = wrap_index(index, self.queue.len()) else {
            return false;
        };

        self.invalidate_start();
        let track = self.queue[i].clone();
        self.graph.load(&track);
        self.current_index = Some(i);
        self.source_bound = true;
        self.transport = Transport::Loaded;
        debug!(index = i, track = %track.display(), "track loaded");

        self.events.emit(PlaybackEvent::TimeUpdate(TimeUpdate::new(
            Duration::ZERO,
            self.graph.duration(),
        )));
        self.events
            .emit(PlaybackEvent::TrackChanged { track, index: i });
        true
    }

    // ---- transport ----

    /// Request playback. The outcome is applied by `poll`.
    pub fn play(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.transport == Transport::Playing && self.pending_start.is_none() {
            return;
        }
        if !self.source_bound {
            let index = self.current_index.unwrap_or(0);
            self.load_track(index as isize);
        }

        let mode = self.graph.ensure_graph();
        let state = self.graph.resume();
        debug!(?mode, ?state, "graph ready");

        self.generation += 1;
        self.pending_start = Some(self.generation);
        self.graph.start(self.generation);
    }

    pub fn pause(&mut self) {
        if self.transport == Transport::Idle {
            return;
        }
        self.invalidate_start();
        self.graph.pause();
        self.transport = Transport::Paused;
        self.events.emit(PlaybackEvent::PlayStateChanged(false));
    }

    pub fn toggle(&mut self) {
        if self.is_active() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn next(&mut self) {
        let Some(target) = self.advance_index(self.shuffle) else {
            return;
        };
        let was_active = self.is_active();
        self.load_track(target as isize);
        if was_active {
            self.play();
        }
    }

    /// Restart the current track once past the threshold, else go back one.
    pub fn previous(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        if !self.restart_threshold.is_zero()
            && self.source_bound
            && self.graph.position() > self.restart_threshold
        {
            self.seek(Duration::ZERO);
            return;
        }

        let was_active = self.is_active();
        self.load_track(current as isize - 1);
        if was_active {
            self.play();
        }
    }

    pub fn replay(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if !self.source_bound {
            let index = self.current_index.unwrap_or(0);
            self.load_track(index as isize);
        }
        self.seek(Duration::ZERO);
        self.play();
    }

    pub fn play_random(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        let target = random_index_excluding(&mut self.rng, self.queue.len(), current);
        self.load_track(target as isize);
        self.play();
    }

    // ---- seeking ----

    /// Seek within the bound source, clamped to its known duration.
    pub fn seek(&mut self, position: Duration) {
        if !self.source_bound {
            return;
        }
        let duration = self.graph.duration();
        let position = match duration {
            Some(d) => position.min(d),
            None => position,
        };
        self.graph.seek(position);
        self.events
            .emit(PlaybackEvent::TimeUpdate(TimeUpdate::new(position, duration)));
    }

    pub fn seek_by(&mut self, seconds: i64) {
        let current = self.graph.position().as_secs_f64();
        let target = (current + seconds as f64).max(0.0);
        self.seek(Duration::from_secs_f64(target));
    }

    pub fn seek_by_percentage(&mut self, percent: f64) {
        if percent.is_nan() {
            return;
        }
        let Some(duration) = self.graph.duration().filter(|d| !d.is_zero()) else {
            return;
        };
        let fraction = percent.clamp(0.0, 100.0) / 100.0;
        self.seek(duration.mul_f64(fraction));
    }

    // ---- volume and modes ----

    /// Store `level` clamped to `[0, 1]` and apply it. NaN counts as 0.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        let level = if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        };
        self.volume = level;
        self.graph.set_gain(level);
        level
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Mute, remembering the current level, or restore the remembered level.
    /// Returns the level now applied.
    pub fn toggle_mute(&mut self) -> f32 {
        if self.volume > 0.0 {
            self.unmuted_volume = self.volume;
            self.set_volume(0.0)
        } else {
            self.set_volume(self.unmuted_volume)
        }
    }

    pub fn is_muted(&self) -> bool {
        self.volume == 0.0
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.shuffle = on;
    }

    pub fn set_repeat(&mut self, on: bool) {
        self.repeat = on;
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    // ---- queries ----

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Playing, or a start request is still in flight.
    pub fn is_active(&self) -> bool {
        self.transport == Transport::Playing || self.pending_start.is_some()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.queue.get(i))
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        let index = self.current_index?;
        let track = self.queue.get(index)?.clone();
        let position = if self.source_bound {
            self.graph.position()
        } else {
            Duration::ZERO
        };
        Some(NowPlaying {
            index,
            track,
            time: TimeUpdate::new(position, self.graph.duration()),
        })
    }

    pub fn analysis_tap(&self) -> Option<AnalysisTap> {
        self.graph.analysis_tap()
    }

    pub fn graph_mode(&self) -> Option<GraphMode> {
        self.graph.mode()
    }

    pub fn graph(&self) -> &AudioGraph<D> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraph<D> {
        &mut self.graph
    }

    // ---- observers ----

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<PlaybackEvent>) {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }

    // ---- device feedback ----

    /// Apply everything the device reported since the last call.
    pub fn poll(&mut self) {
        for event in self.graph.drain_events() {
            match event {
                DeviceEvent::Started { generation } => self.on_started(generation),
                DeviceEvent::StartFailed { generation, reason } => {
                    if self.pending_start == Some(generation) {
                        self.pending_start = None;
                        warn!(generation, %reason, "playback did not start");
                    } else {
                        debug!(generation, "ignoring stale start failure");
                    }
                }
                DeviceEvent::TimeAdvanced { position } => {
                    if self.transport == Transport::Playing {
                        self.events.emit(PlaybackEvent::TimeUpdate(TimeUpdate::new(
                            position,
                            self.graph.duration(),
                        )));
                    }
                }
                DeviceEvent::Ended => {
                    if self.is_active() {
                        self.on_track_end();
                    }
                }
                DeviceEvent::Error { reason } => self.on_device_error(&reason),
            }
        }
    }

    fn on_started(&mut self, generation: u64) {
        if self.pending_start != Some(generation) {
            debug!(generation, latest = self.generation, "ignoring stale start");
            return;
        }
        self.pending_start = None;
        self.failures = 0;
        self.transport = Transport::Playing;
        self.events.emit(PlaybackEvent::PlayStateChanged(true));
    }

    fn on_track_end(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        let target = if self.repeat {
            current
        } else if self.shuffle {
            random_index_excluding(&mut self.rng, self.queue.len(), current)
        } else {
            (current + 1) % self.queue.len()
        };
        debug!(from = current, to = target, "track ended");
        self.load_track(target as isize);
        self.play();
    }

    fn on_device_error(&mut self, reason: &str) {
        warn!(index = ?self.current_index, %reason, "output device error");
        let was_active = self.is_active();
        self.failures += 1;
        if self.failures >= self.queue.len() {
            warn!("no playable track in queue; stopping");
            self.failures = 0;
            self.pause();
            return;
        }
        let Some(target) = self.advance_index(self.shuffle) else {
            return;
        };
        self.load_track(target as isize);
        // Skip the broken track, but only resume if the user was listening.
        if was_active {
            self.play();
        }
    }

    /// Fade out, stop, and detach the processing graph.
    pub fn shutdown(&mut self, fade_out: Duration) {
        let was_active = self.is_active();
        self.invalidate_start();
        self.graph.fade_out(fade_out);
        self.graph.pause();
        self.graph.teardown();
        if self.transport != Transport::Idle {
            self.transport = Transport::Paused;
        }
        if was_active {
            self.events.emit(PlaybackEvent::PlayStateChanged(false));
        }
        info!("playback shut down");
    }

    // ---- helpers ----

    fn advance_index(&mut self, shuffle: bool) -> Option<usize> {
        let len = self.queue.len();
        let current = self.current_index?;
        if shuffle {
            Some(random_index_excluding(&mut self.rng, len, current))
        } else {
            Some((current + 1) % len)
        }
    }

    fn invalidate_start(&mut self) {
        if self.pending_start.take().is_some() {
            self.generation += 1;
        }
    }
}
