//! Bar layout for one waveform frame.

use crate::audio::SILENCE;

/// One filled rectangle in surface coordinates (y grows downward).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bar {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

pub const MIN_BAR_HEIGHT: f64 = 2.0;
const AMPLITUDE_SCALE: f64 = 0.8;

pub fn total_bars(width: f64, bar_width: f64, bar_gap: f64) -> usize {
    let pitch = bar_width + bar_gap;
    if pitch <= 0.0 || width <= 0.0 {
        return 0;
    }
    (width / pitch).floor() as usize
}

/// Lay out bars for a byte time-domain frame on a `width` x `height` surface.
///
/// Bars sample the frame at a fixed stride; positive samples rise from the
/// center line, negative ones hang below it.
pub fn waveform_bars(data: &[u8], width: f64, height: f64, bar_width: f64, bar_gap: f64) -> Vec<Bar> {
    let total = total_bars(width, bar_width, bar_gap);
    if total == 0 || data.is_empty() {
        return Vec::new();
    }

    let len = data.len();
    let step = len.div_ceil(total);
    let center_y = height / 2.0;

    (0..total)
        .map(|i| {
            let sample = data[(i * step).min(len - 1)];
            let normalized = f64::from(sample) / f64::from(SILENCE) - 1.0;
            let bar_height = ((normalized * center_y).abs() * AMPLITUDE_SCALE).max(MIN_BAR_HEIGHT);
            let y = if normalized >= 0.0 {
                center_y - bar_height
            } else {
                center_y
            };
            Bar {
                x: i as f64 * (bar_width + bar_gap),
                y,
                width: bar_width,
                height: bar_height,
            }
        })
        .collect()
}
