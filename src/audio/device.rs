//! The output-device seam.
//!
//! Everything the playback core needs from a device goes through
//! `OutputDevice`: binding a source, start/pause, seeking, volume, chain
//! installation and an event queue. Starting is asynchronous from the
//! caller's point of view: the outcome comes back as a `DeviceEvent` tagged
//! with the generation passed to `start`.

use std::time::Duration;

use crate::error::Result;
use crate::library::Track;

use super::chain::SignalChain;
use super::registry::DeviceId;

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    /// `start(generation)` succeeded.
    Started { generation: u64 },
    /// `start(generation)` was rejected.
    StartFailed { generation: u64, reason: String },
    /// Playback position moved.
    TimeAdvanced { position: Duration },
    /// The bound source played to its end.
    Ended,
    /// The bound source could not be opened or decoded.
    Error { reason: String },
}

impl DeviceEvent {
    /// Events describing the bound source rather than a start request.
    pub fn is_source_event(&self) -> bool {
        matches!(
            self,
            DeviceEvent::TimeAdvanced { .. } | DeviceEvent::Ended | DeviceEvent::Error { .. }
        )
    }
}

/// Level a device applies at its own output for a stored `volume`. An
/// installed chain already scales every sample by its gain stage, so the
/// device passes those samples through untouched.
pub fn output_level(volume: f32, chained: bool) -> f32 {
    if chained { 1.0 } else { volume }
}

pub trait OutputDevice {
    fn id(&self) -> &DeviceId;

    /// Bind `track` as the single playable source, paused at zero. Failures
    /// surface later as `DeviceEvent::Error`.
    fn load(&mut self, track: &Track);

    fn has_source(&self) -> bool;

    /// Ask the device to start; reports back with the same `generation`.
    fn start(&mut self, generation: u64);

    /// Stop output immediately.
    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    fn position(&self) -> Duration;

    /// `None` while unknown.
    fn duration(&self) -> Option<Duration>;

    /// Device-level volume in `[0, 1]`, audible per `output_level`.
    fn set_volume(&mut self, level: f32);

    fn volume(&self) -> f32;

    /// Route every bound source through `chain`, including the current one.
    fn install_chain(&mut self, chain: SignalChain) -> Result<()>;

    fn remove_chain(&mut self);

    /// Take all pending events, oldest first.
    fn drain_events(&mut self) -> Vec<DeviceEvent>;

    /// Fade to silence over `duration`, then pause.
    fn fade_out(&mut self, _duration: Duration) {
        self.pause();
    }
}
