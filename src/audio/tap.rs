//! Read-only analysis point in the processing chain.
//!
//! The mixer thread pushes the first channel of every frame into a ring
//! sized to the configured resolution; readers copy out the most recent
//! window as unsigned bytes centered on 128.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::{MAX_FFT_SIZE, MIN_FFT_SIZE, is_valid_fft_size};
use crate::error::{Error, Result};

/// Byte value of a zero sample.
pub const SILENCE: u8 = 128;

#[derive(Debug)]
struct TapBuffer {
    samples: VecDeque<f32>,
    fft_size: usize,
}

/// Shared handle to an analysis tap. Clones observe the same buffer.
#[derive(Clone, Debug)]
pub struct AnalysisTap {
    inner: Arc<Mutex<TapBuffer>>,
}

impl AnalysisTap {
    pub fn new(fft_size: usize) -> Result<Self> {
        check_fft_size(fft_size)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(TapBuffer {
                samples: VecDeque::with_capacity(fft_size),
                fft_size,
            })),
        })
    }

    /// Number of samples in one time-domain frame.
    pub fn frame_len(&self) -> usize {
        self.inner.lock().map(|b| b.fft_size).unwrap_or(MIN_FFT_SIZE)
    }

    /// Change the frame length. Existing samples are kept up to the new size.
    pub fn set_fft_size(&self, fft_size: usize) -> Result<()> {
        check_fft_size(fft_size)?;
        let mut buf = self
            .inner
            .lock()
            .map_err(|_| Error::Tap("tap buffer poisoned".to_string()))?;
        buf.fft_size = fft_size;
        while buf.samples.len() > fft_size {
            buf.samples.pop_front();
        }
        Ok(())
    }

    /// Record one sample. Called from the mixer thread, so contention drops
    /// the sample instead of blocking audio.
    pub fn push(&self, sample: f32) {
        if let Ok(mut buf) = self.inner.try_lock() {
            if buf.samples.len() >= buf.fft_size {
                buf.samples.pop_front();
            }
            buf.samples.push_back(sample);
        }
    }

    /// Fill `out` with the most recent samples as bytes, oldest first.
    /// Missing history reads as silence.
    pub fn fill_byte_time_domain(&self, out: &mut [u8]) {
        out.fill(SILENCE);
        let Ok(buf) = self.inner.lock() else {
            return;
        };

        let n = out.len().min(buf.samples.len());
        let skip = buf.samples.len() - n;
        let offset = out.len() - n;
        for (slot, &s) in out[offset..].iter_mut().zip(buf.samples.iter().skip(skip)) {
            *slot = sample_to_byte(s);
        }
    }

    /// Whether both handles observe the same buffer.
    pub fn same_tap(&self, other: &AnalysisTap) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drop recorded history, e.g. after a source change.
    pub fn clear(&self) {
        if let Ok(mut buf) = self.inner.lock() {
            buf.samples.clear();
        }
    }
}

/// Map `[-1, 1]` to `[0, 255]` with 0.0 at 128.
pub fn sample_to_byte(sample: f32) -> u8 {
    (128.0 * (sample + 1.0)).clamp(0.0, 255.0) as u8
}

fn check_fft_size(fft_size: usize) -> Result<()> {
    if is_valid_fft_size(fft_size) {
        Ok(())
    } else {
        Err(Error::Tap(format!(
            "fft size {fft_size} must be a power of two in [{MIN_FFT_SIZE}, {MAX_FFT_SIZE}]"
        )))
    }
}
