//! Processing-graph construction and the degraded fallback.
//!
//! `AudioGraph` owns the device binding and builds the chain lazily, once per
//! binding. The capability split lives behind `ProcessingGraph`: `FullGraph`
//! has a gain stage and an analysis tap, `FallbackGraph` has neither. Which
//! one is used is decided in `ensure_graph` and never re-checked by callers.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::library::Track;

use super::chain::SignalChain;
use super::device::{DeviceEvent, OutputDevice};
use super::registry::TapRegistry;
use super::tap::AnalysisTap;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GraphMode {
    Full,
    Fallback,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GraphState {
    Suspended,
    Running,
}

pub trait ProcessingGraph {
    fn mode(&self) -> GraphMode;
    fn state(&self) -> GraphState;
    /// Resume if suspended; returns the state after the call.
    fn resume(&mut self) -> GraphState;
    fn set_gain(&mut self, level: f32);
    fn analysis_tap(&self) -> Option<AnalysisTap>;
}

pub struct FullGraph {
    chain: SignalChain,
}

impl ProcessingGraph for FullGraph {
    fn mode(&self) -> GraphMode {
        GraphMode::Full
    }

    fn state(&self) -> GraphState {
        if self.chain.clock.is_running() {
            GraphState::Running
        } else {
            GraphState::Suspended
        }
    }

    fn resume(&mut self) -> GraphState {
        if !self.chain.clock.is_running() {
            self.chain.clock.resume();
            debug!("processing graph resumed");
        }
        GraphState::Running
    }

    fn set_gain(&mut self, level: f32) {
        self.chain.gain.set(level);
    }

    fn analysis_tap(&self) -> Option<AnalysisTap> {
        Some(self.chain.tap.clone())
    }
}

/// Plain device output: no gain stage, no tap, always running.
pub struct FallbackGraph;

impl ProcessingGraph for FallbackGraph {
    fn mode(&self) -> GraphMode {
        GraphMode::Fallback
    }

    fn state(&self) -> GraphState {
        GraphState::Running
    }

    fn resume(&mut self) -> GraphState {
        GraphState::Running
    }

    fn set_gain(&mut self, _level: f32) {}

    fn analysis_tap(&self) -> Option<AnalysisTap> {
        None
    }
}

pub struct AudioGraph<D: OutputDevice> {
    device: D,
    registry: TapRegistry,
    graph: Option<Box<dyn ProcessingGraph>>,
    claimed: bool,
    fft_size: usize,
    gain: f32,
}

impl<D: OutputDevice> AudioGraph<D> {
    pub fn new(device: D, registry: TapRegistry, fft_size: usize) -> Self {
        let gain = device.volume();
        Self {
            device,
            registry,
            graph: None,
            claimed: false,
            fft_size,
            gain,
        }
    }

    /// Bind a device. Binding the device already held is a no-op and returns
    /// false; a different device replaces the current one and its graph.
    pub fn bind(&mut self, device: D) -> bool {
        if device.id() == self.device.id() {
            debug!(device = %device.id(), "device already bound");
            return false;
        }
        self.teardown();
        self.device = device;
        self.device.set_volume(self.gain);
        true
    }

    /// Build the processing chain if it does not exist yet.
    pub fn ensure_graph(&mut self) -> GraphMode {
        if let Some(graph) = &self.graph {
            return graph.mode();
        }

        let graph = self.construct();
        let mode = graph.mode();
        self.graph = Some(graph);
        self.set_gain(self.gain);
        mode
    }

    fn construct(&mut self) -> Box<dyn ProcessingGraph> {
        let id = self.device.id().clone();

        if !self.registry.claim(&id) {
            warn!(device = %id, "device already has an analysis tap; using direct output");
            return Box::new(FallbackGraph);
        }

        let tap = match AnalysisTap::new(self.fft_size) {
            Ok(tap) => tap,
            Err(e) => {
                warn!(error = %e, "could not create analysis tap; using direct output");
                self.registry.release(&id);
                return Box::new(FallbackGraph);
            }
        };

        let chain = SignalChain::new(tap, self.gain);
        match self.device.install_chain(chain.clone()) {
            Ok(()) => {
                self.claimed = true;
                info!(device = %id, "processing graph attached");
                Box::new(FullGraph { chain })
            }
            Err(e) => {
                warn!(device = %id, error = %e, "processing graph unavailable; using direct output");
                self.registry.release(&id);
                Box::new(FallbackGraph)
            }
        }
    }

    /// Resume a suspended graph. Before `ensure_graph` there is nothing to
    /// resume and the output counts as running.
    pub fn resume(&mut self) -> GraphState {
        match self.graph.as_mut() {
            Some(graph) => graph.resume(),
            None => GraphState::Running,
        }
    }

    /// Set the gain stage when present and mirror the level to the device.
    pub fn set_gain(&mut self, level: f32) {
        self.gain = level;
        if let Some(graph) = self.graph.as_mut() {
            graph.set_gain(level);
        }
        self.device.set_volume(level);
    }

    pub fn analysis_tap(&self) -> Option<AnalysisTap> {
        self.graph.as_ref().and_then(|g| g.analysis_tap())
    }

    /// `None` until the graph has been constructed.
    pub fn mode(&self) -> Option<GraphMode> {
        self.graph.as_ref().map(|g| g.mode())
    }

    #[cfg(test)]
    pub fn state(&self) -> Option<GraphState> {
        self.graph.as_ref().map(|g| g.state())
    }

    /// Detach the chain from the device and release the tap claim.
    pub fn teardown(&mut self) {
        if self.graph.take().is_none() {
            return;
        }
        if self.claimed {
            self.device.remove_chain();
            self.registry.release(self.device.id());
            self.claimed = false;
        }
        debug!(device = %self.device.id(), "processing graph torn down");
    }

    // Device pass-throughs used by the controller.

    pub fn load(&mut self, track: &Track) {
        if let Some(tap) = self.analysis_tap() {
            tap.clear();
        }
        self.device.load(track);
    }

    pub fn has_source(&self) -> bool {
        self.device.has_source()
    }

    pub fn start(&mut self, generation: u64) {
        self.device.start(generation);
    }

    pub fn pause(&mut self) {
        self.device.pause();
    }

    pub fn seek(&mut self, position: Duration) {
        self.device.seek(position);
    }

    pub fn position(&self) -> Duration {
        self.device.position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.device.duration()
    }

    pub fn drain_events(&mut self) -> Vec<DeviceEvent> {
        self.device.drain_events()
    }

    pub fn fade_out(&mut self, duration: Duration) {
        self.device.fade_out(duration);
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: OutputDevice> Drop for AudioGraph<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
