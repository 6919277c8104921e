//! The `source -> analyser -> gain` chain spliced in front of the output.
//!
//! `SignalChain` is the control side held by the graph; `ChainSource` is the
//! rodio `Source` wrapper the device appends to its sink. They share state
//! through atomics and the tap buffer only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use rodio::Source;

use super::tap::AnalysisTap;

/// Gain applied after the analysis tap.
#[derive(Clone, Debug)]
pub struct GainStage {
    bits: Arc<AtomicU32>,
}

impl GainStage {
    pub fn new(level: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(level.to_bits())),
        }
    }

    pub fn set(&self, level: f32) {
        self.bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Running/suspended flag of the processing graph. A suspended graph emits
/// silence and does not pull from its source.
#[derive(Clone, Debug)]
pub struct GraphClock {
    running: Arc<AtomicBool>,
}

impl GraphClock {
    pub fn suspended() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::Release);
    }
}

/// Control handles for one constructed chain.
#[derive(Clone, Debug)]
pub struct SignalChain {
    pub tap: AnalysisTap,
    pub gain: GainStage,
    pub clock: GraphClock,
}

impl SignalChain {
    pub fn new(tap: AnalysisTap, gain: f32) -> Self {
        Self {
            tap,
            gain: GainStage::new(gain),
            clock: GraphClock::suspended(),
        }
    }

    /// Wrap a decoded source so it flows through this chain.
    pub fn wrap<S>(&self, source: S) -> ChainSource<S>
    where
        S: Source<Item = f32>,
    {
        ChainSource::new(source, self.clone())
    }
}

pub struct ChainSource<S> {
    inner: S,
    chain: SignalChain,
    channels: u16,
    frame_pos: u16,
}

impl<S> ChainSource<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, chain: SignalChain) -> Self {
        let channels = inner.channels().max(1);
        Self {
            inner,
            chain,
            channels,
            frame_pos: 0,
        }
    }
}

impl<S> Iterator for ChainSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if !self.chain.clock.is_running() {
            return Some(0.0);
        }

        let sample = self.inner.next()?;

        // One sample per frame keeps the waveform a single channel.
        if self.frame_pos == 0 {
            self.chain.tap.push(sample);
        }
        self.frame_pos = (self.frame_pos + 1) % self.channels;

        Some(sample * self.chain.gain.get())
    }
}

impl<S> Source for ChainSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
        self.frame_pos = 0;
        self.inner.try_seek(pos)
    }
}
