//! In-memory output device for tests.

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::library::Track;

use super::chain::SignalChain;
use super::device::{DeviceEvent, OutputDevice, output_level};
use super::registry::DeviceId;

#[derive(Debug, Default)]
pub struct FakeDevice {
    id: Option<DeviceId>,
    pub loaded: Vec<usize>,
    pub starts: Vec<u64>,
    pub pauses: usize,
    pub seeks: Vec<Duration>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub chain: Option<SignalChain>,
    pub playing: bool,
    /// Make `install_chain` fail.
    pub reject_chain: bool,
    /// Make `start` report failure.
    pub reject_start: bool,
    /// Hold start outcomes until `resolve_starts` is called.
    pub defer_starts: bool,
    deferred: Vec<u64>,
    events: VecDeque<DeviceEvent>,
}

impl FakeDevice {
    pub fn new(id: &str) -> Self {
        Self {
            id: Some(DeviceId::new(id)),
            volume: 1.0,
            ..Self::default()
        }
    }

    pub fn push_event(&mut self, event: DeviceEvent) {
        self.events.push_back(event);
    }

    /// Amplitude a full-scale sample leaves the device with.
    pub fn effective_level(&self) -> f32 {
        let gain = self.chain.as_ref().map_or(1.0, |c| c.gain.get());
        gain * output_level(self.volume, self.chain.is_some())
    }

    /// Deliver every deferred start outcome.
    pub fn resolve_starts(&mut self) {
        for generation in std::mem::take(&mut self.deferred) {
            self.events.push_back(DeviceEvent::Started { generation });
        }
    }
}

impl OutputDevice for FakeDevice {
    fn id(&self) -> &DeviceId {
        self.id.as_ref().expect("FakeDevice built with FakeDevice::new")
    }

    fn load(&mut self, track: &Track) {
        self.loaded.push(track.id);
        self.position = Duration::ZERO;
        self.duration = track.known_duration();
        self.playing = false;
        self.events.retain(|e| !e.is_source_event());
    }

    fn has_source(&self) -> bool {
        !self.loaded.is_empty()
    }

    fn start(&mut self, generation: u64) {
        self.starts.push(generation);
        if self.reject_start {
            self.events.push_back(DeviceEvent::StartFailed {
                generation,
                reason: "rejected".to_string(),
            });
        } else if self.defer_starts {
            self.playing = true;
            self.deferred.push(generation);
        } else {
            self.playing = true;
            self.events.push_back(DeviceEvent::Started { generation });
        }
    }

    fn pause(&mut self) {
        self.pauses += 1;
        self.playing = false;
    }

    fn seek(&mut self, position: Duration) {
        self.seeks.push(position);
        self.position = position;
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn install_chain(&mut self, chain: SignalChain) -> Result<()> {
        if self.reject_chain {
            return Err(Error::Graph("chain rejected".to_string()));
        }
        self.chain = Some(chain);
        Ok(())
    }

    fn remove_chain(&mut self) {
        self.chain = None;
    }

    fn drain_events(&mut self) -> Vec<DeviceEvent> {
        self.events.drain(..).collect()
    }
}
