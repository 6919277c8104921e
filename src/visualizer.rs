//! Live waveform driven by the analysis tap.
//!
//! The visualizer owns a render surface and a frame scheduler. While active,
//! every due frame copies the tap's byte time-domain data, clears the surface
//! and draws one bar per sampled point, then requests the next frame.

mod scheduler;
mod surface;
mod waveform;

use tracing::{debug, warn};

use crate::audio::{AnalysisTap, SILENCE};
use crate::config::VisualizerSettings;

pub use scheduler::{FrameHandle, FrameScheduler, RefreshScheduler};
pub use surface::{RenderSurface, SurfaceSize, WaveformCanvas};
pub use waveform::{Bar, MIN_BAR_HEIGHT, total_bars, waveform_bars};

pub struct Visualizer<S: RenderSurface, F: FrameScheduler> {
    surface: S,
    scheduler: F,
    settings: VisualizerSettings,
    tap: Option<AnalysisTap>,
    buffer: Vec<u8>,
    initialized: bool,
    active: bool,
    pending: Option<FrameHandle>,
}

impl<S: RenderSurface, F: FrameScheduler> Visualizer<S, F> {
    pub fn new(surface: S, scheduler: F, settings: VisualizerSettings) -> Self {
        Self {
            surface,
            scheduler,
            settings,
            tap: None,
            buffer: Vec::new(),
            initialized: false,
            active: false,
            pending: None,
        }
    }

    /// Record the tap to sample from. A different tap is re-initialized on
    /// the next start; losing the tap stops the loop.
    pub fn attach(&mut self, tap: Option<AnalysisTap>) {
        let same = match (&self.tap, &tap) {
            (Some(a), Some(b)) => a.same_tap(b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        self.tap = tap;
        self.initialized = false;
        if self.tap.is_none() {
            self.stop();
        } else if self.active {
            let tap = self.tap.clone();
            if !self.init(tap) {
                self.stop();
            }
        }
    }

    /// Bind to `tap` and size the frame buffer. False without a tap.
    pub fn init(&mut self, tap: Option<AnalysisTap>) -> bool {
        let Some(tap) = tap else {
            self.tap = None;
            self.initialized = false;
            return false;
        };

        if let Err(e) = tap.set_fft_size(self.settings.fft_size) {
            warn!(error = %e, "analysis tap rejected the resolution");
            return false;
        }
        self.buffer = vec![SILENCE; tap.frame_len()];
        self.tap = Some(tap);
        self.resize();
        self.initialized = true;
        debug!(frame_len = self.buffer.len(), "visualizer initialized");
        true
    }

    /// Begin rendering. Returns whether the loop is running afterwards.
    pub fn start(&mut self) -> bool {
        if self.active {
            return true;
        }
        if !self.initialized {
            let tap = self.tap.clone();
            if !self.init(tap) {
                return false;
            }
        }
        self.active = true;
        self.pending = Some(self.scheduler.request_frame());
        true
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.active = false;
    }

    /// Flip between running and stopped; returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.active {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    /// Run the due frame, if there is one. Returns whether a frame was drawn.
    pub fn pump(&mut self) -> bool {
        let Some(handle) = self.scheduler.poll_due() else {
            return false;
        };
        if self.pending != Some(handle) || !self.active {
            // Cancelled or superseded.
            return false;
        }
        self.pending = None;

        self.render_frame();
        if self.active {
            self.pending = Some(self.scheduler.request_frame());
        }
        true
    }

    fn render_frame(&mut self) {
        let Some(tap) = self.tap.as_ref() else {
            return;
        };
        tap.fill_byte_time_domain(&mut self.buffer);

        let size = self.surface.backing_size();
        self.surface.clear();
        let bars = waveform_bars(
            &self.buffer,
            f64::from(size.width),
            f64::from(size.height),
            self.settings.bar_width,
            self.settings.bar_gap,
        );
        for bar in bars {
            self.surface.fill_bar(bar);
        }
    }

    /// Match the backing size to the display size. True when it changed.
    pub fn resize(&mut self) -> bool {
        let display = self.surface.display_size();
        if display == self.surface.backing_size() {
            return false;
        }
        self.surface.set_backing_size(display);
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn frame_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }
}
