//! Render targets for the waveform.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::symbols::Marker;
use ratatui::widgets::Widget;
use ratatui::widgets::canvas::{Canvas, Line};

use super::waveform::Bar;

/// Size in surface pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub trait RenderSurface {
    /// Size the surface is shown at.
    fn display_size(&self) -> SurfaceSize;
    /// Size the surface draws into.
    fn backing_size(&self) -> SurfaceSize;
    fn set_backing_size(&mut self, size: SurfaceSize);
    fn clear(&mut self);
    fn fill_bar(&mut self, bar: Bar);
}

/// Braille canvas: every terminal cell holds 2x4 dots, one dot per pixel.
#[derive(Debug, Default)]
pub struct WaveformCanvas {
    display: SurfaceSize,
    backing: SurfaceSize,
    bars: Vec<Bar>,
    color: Color,
}

impl WaveformCanvas {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Track the terminal area the canvas is drawn in.
    pub fn set_display_area(&mut self, area: Rect) {
        self.display = SurfaceSize::new(u32::from(area.width) * 2, u32::from(area.height) * 4);
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }
}

impl RenderSurface for WaveformCanvas {
    fn display_size(&self) -> SurfaceSize {
        self.display
    }

    fn backing_size(&self) -> SurfaceSize {
        self.backing
    }

    fn set_backing_size(&mut self, size: SurfaceSize) {
        self.backing = size;
        self.bars.clear();
    }

    fn clear(&mut self) {
        self.bars.clear();
    }

    fn fill_bar(&mut self, bar: Bar) {
        self.bars.push(bar);
    }
}

impl Widget for &WaveformCanvas {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = f64::from(self.backing.width.max(1));
        let height = f64::from(self.backing.height.max(1));
        let color = self.color;

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(|ctx| {
                for bar in &self.bars {
                    // Canvas y grows upward.
                    let bottom = height - (bar.y + bar.height);
                    let top = height - bar.y;
                    let mut x = bar.x;
                    while x < bar.x + bar.width {
                        ctx.draw(&Line::new(x, bottom, x, top, color));
                        x += 1.0;
                    }
                }
            })
            .render(area, buf);
    }
}
