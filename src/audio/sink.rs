//! rodio-backed output device.
//!
//! One `Sink` on the default output stream holds the bound source. Sources
//! are decoded from file and, once a chain is installed, appended through
//! `ChainSource` so the graph sees every sample.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::library::Track;

use super::chain::SignalChain;
use super::device::{DeviceEvent, OutputDevice, output_level};
use super::registry::DeviceId;

const FADE_STEPS: u64 = 20;

/// Open and decode `path`, returning the decoder's own duration estimate.
fn open_decoder(path: &Path) -> Result<(Decoder<BufReader<File>>, Option<Duration>)> {
    let file = File::open(path)?;
    let decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Decode(format!("{}: {e}", path.display())))?;
    let total = decoder.total_duration();
    Ok((decoder, total))
}

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
///
/// Returns the sink and the decoder's own duration estimate.
fn create_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
    chain: Option<&SignalChain>,
) -> Result<(Sink, Option<Duration>)> {
    let (decoder, total) = open_decoder(path)?;

    // `skip_duration` is our seeking primitive; even Duration::ZERO is fine.
    let source = decoder.skip_duration(start_at);

    let sink = Sink::connect_new(stream.mixer());
    match chain {
        Some(chain) => sink.append(chain.wrap(source)),
        None => sink.append(source),
    }
    sink.pause();
    Ok((sink, total))
}

pub struct RodioDevice {
    id: DeviceId,
    stream: OutputStream,
    sink: Option<Sink>,
    source: Option<PathBuf>,
    duration: Option<Duration>,
    // Where a rebuilt sink started; `get_pos` counts from there.
    offset: Duration,
    chain: Option<SignalChain>,
    volume: f32,
    playing: bool,
    events: VecDeque<DeviceEvent>,
}

impl RodioDevice {
    /// Open the system's default output stream.
    pub fn open_default() -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| Error::AudioOutput(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);

        Ok(Self {
            id: DeviceId::new("default-output"),
            stream,
            sink: None,
            source: None,
            duration: None,
            offset: Duration::ZERO,
            chain: None,
            volume: 1.0,
            playing: false,
            events: VecDeque::new(),
        })
    }

    fn sink_level(&self) -> f32 {
        output_level(self.volume, self.chain.is_some())
    }

    /// Replace the current sink with a fresh one for the bound source,
    /// starting at `start_at` and keeping the play/pause state. On failure
    /// the current sink is left as it was.
    fn rebuild_at(&mut self, start_at: Duration) -> Result<()> {
        let Some(path) = self.source.clone() else {
            return Ok(());
        };
        let (sink, _) = create_sink_at(&self.stream, &path, start_at, self.chain.as_ref())?;
        sink.set_volume(self.sink_level());
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        if self.playing {
            sink.play();
        }
        self.sink = Some(sink);
        self.offset = start_at;
        Ok(())
    }

    /// Rebuild at `start_at`, dropping the source if it cannot be decoded.
    fn rebuild_or_fail(&mut self, start_at: Duration) {
        if let Err(e) = self.rebuild_at(start_at) {
            if let Some(old) = self.sink.take() {
                old.stop();
            }
            self.playing = false;
            self.events.push_back(DeviceEvent::Error {
                reason: e.to_string(),
            });
        }
    }
}

impl OutputDevice for RodioDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn load(&mut self, track: &Track) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.playing = false;
        self.offset = Duration::ZERO;
        self.source = Some(track.source.clone());
        // Leftover position/end events belong to the previous source.
        self.events.retain(|e| !e.is_source_event());

        match create_sink_at(&self.stream, &track.source, Duration::ZERO, self.chain.as_ref()) {
            Ok((sink, decoded)) => {
                sink.set_volume(self.sink_level());
                self.duration = track.known_duration().or(decoded);
                self.sink = Some(sink);
                debug!(source = %track.source.display(), "source bound");
            }
            Err(e) => {
                warn!(source = %track.source.display(), error = %e, "could not bind source");
                self.duration = None;
                self.events.push_back(DeviceEvent::Error {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn start(&mut self, generation: u64) {
        match self.sink.as_ref() {
            Some(sink) => {
                sink.play();
                self.playing = true;
                self.events.push_back(DeviceEvent::Started { generation });
            }
            None => self.events.push_back(DeviceEvent::StartFailed {
                generation,
                reason: "no playable source bound".to_string(),
            }),
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.pause();
        }
        self.playing = false;
    }

    fn seek(&mut self, position: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if sink.empty() {
            // The source ran out; seeking means decoding it again.
            self.rebuild_or_fail(position);
            return;
        }
        match sink.try_seek(position) {
            Ok(()) => self.offset = Duration::ZERO,
            Err(e) => {
                debug!(error = %e, "seek unsupported by decoder; rebuilding sink");
                self.rebuild_or_fail(position);
            }
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map(|s| self.offset + s.get_pos())
            .unwrap_or(Duration::ZERO)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level;
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.sink_level());
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn install_chain(&mut self, chain: SignalChain) -> Result<()> {
        let previous = self.chain.replace(chain);
        if self.sink.is_some() {
            // The bound source predates the chain; re-bind it through the chain.
            let at = self.position();
            if let Err(e) = self.rebuild_at(at) {
                self.chain = previous;
                return Err(Error::Graph(format!(
                    "could not route source through chain: {e}"
                )));
            }
        }
        Ok(())
    }

    fn remove_chain(&mut self) {
        if self.chain.take().is_some() && self.sink.is_some() {
            let at = self.position();
            self.rebuild_or_fail(at);
        }
    }

    fn drain_events(&mut self) -> Vec<DeviceEvent> {
        if self.playing {
            if let Some(sink) = self.sink.as_ref() {
                if sink.empty() {
                    self.playing = false;
                    self.events.push_back(DeviceEvent::Ended);
                } else {
                    self.events.push_back(DeviceEvent::TimeAdvanced {
                        position: self.offset + sink.get_pos(),
                    });
                }
            }
        }
        self.events.drain(..).collect()
    }

    fn fade_out(&mut self, duration: Duration) {
        if let Some(sink) = self.sink.as_ref() {
            let fade_ms = duration.as_millis() as u64;
            if fade_ms > 0 && self.playing {
                let step_ms = (fade_ms / FADE_STEPS).max(1);
                for step in 1..=FADE_STEPS {
                    let t = step as f32 / FADE_STEPS as f32;
                    sink.set_volume(self.sink_level() * (1.0 - t));
                    thread::sleep(Duration::from_millis(step_ms));
                }
            }
            sink.set_volume(0.0);
            sink.stop();
        }
        self.playing = false;
    }
}
