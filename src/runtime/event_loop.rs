use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::App;
use crate::audio::RodioDevice;
use crate::config;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::playback::{PlaybackController, PlaybackEvent};
use crate::runtime::mpris_sync::forward_event;
use crate::ui::{self, PlayerView};
use crate::visualizer::{RefreshScheduler, Visualizer, WaveformCanvas};

pub type Controller = PlaybackController<RodioDevice>;
pub type Waveform = Visualizer<WaveformCanvas, RefreshScheduler>;

/// Longest the loop waits for input before polling the device again.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
}

/// Everything the loop drives.
pub struct Session<'a> {
    pub settings: &'a config::Settings,
    pub app: &'a mut App,
    pub controller: &'a mut Controller,
    pub visualizer: &'a mut Waveform,
    pub mpris: &'a MprisHandle,
    pub events: &'a mpsc::Receiver<PlaybackEvent>,
}

impl Session<'_> {
    /// Apply device feedback and fan the resulting events out to the app,
    /// MPRIS and the visualizer.
    fn sync(&mut self) {
        self.controller.poll();
        while let Ok(event) = self.events.try_recv() {
            forward_event(self.mpris, &event, self.controller.transport());
            match event {
                PlaybackEvent::TrackChanged { index, .. } => self.app.on_track_changed(index),
                PlaybackEvent::PlayStateChanged(true) => self.start_visualizer(),
                PlaybackEvent::PlayStateChanged(false) => self.visualizer.stop(),
                PlaybackEvent::TimeUpdate(_) => {}
            }
        }
    }

    fn start_visualizer(&mut self) {
        if !self.app.visualizer_enabled {
            return;
        }
        self.visualizer.attach(self.controller.analysis_tap());
        if !self.visualizer.start() {
            debug!("no analysis tap; waveform stays off");
        }
    }

    fn toggle_visualizer(&mut self) {
        if self.app.toggle_visualizer() {
            if self.controller.is_active() {
                self.start_visualizer();
            }
        } else {
            self.visualizer.stop();
        }
    }

    fn quit(&mut self) {
        self.visualizer.stop();
        self.controller.shutdown(Duration::from_millis(
            self.settings.audio.quit_fade_out_ms,
        ));
    }
}

/// Main terminal event loop: handles input, UI drawing, sync with the
/// controller and MPRIS. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    session: &mut Session<'_>,
    control_tx: &mpsc::Sender<ControlCmd>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        session.sync();

        session.visualizer.resize();
        session.visualizer.pump();

        let view = PlayerView {
            queue: session.controller.queue(),
            now_playing: session.controller.now_playing(),
            transport: session.controller.transport(),
            shuffle: session.controller.shuffle(),
            repeat: session.controller.repeat(),
            volume: session.controller.volume(),
            graph_mode: session.controller.graph_mode(),
        };
        let canvas = session.visualizer.surface_mut();
        let app: &App = session.app;
        terminal.draw(|f| {
            ui::draw(
                f,
                app,
                &view,
                canvas,
                &session.settings.ui,
                &session.settings.controls,
            )
        })?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, session) {
                session.quit();
                return Ok(());
            }
        }

        let timeout = session
            .visualizer
            .scheduler()
            .time_until_due()
            .map_or(IDLE_POLL, |t| t.min(IDLE_POLL));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, session, control_tx, state) {
                    session.quit();
                    return Ok(());
                }
            }
        }
    }
}

/// Apply a host command. Returns true when the app should quit.
fn handle_control_cmd(cmd: ControlCmd, session: &mut Session<'_>) -> bool {
    let controller = &mut *session.controller;
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => controller.play(),
        ControlCmd::Pause => controller.pause(),
        ControlCmd::PlayPause => controller.toggle(),
        ControlCmd::Next => controller.next(),
        ControlCmd::Prev => controller.previous(),
    }
    session.app.follow_playback_on();
    false
}

/// Apply one key press. Returns true when the app should quit.
fn handle_key_event(
    key: KeyEvent,
    session: &mut Session<'_>,
    control_tx: &mpsc::Sender<ControlCmd>,
    state: &mut EventLoopState,
) -> bool {
    let pending_gg = std::mem::take(&mut state.pending_gg);
    let controls = &session.settings.controls;

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if pending_gg {
                session.app.top();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => session.app.bottom(),
        KeyCode::Char('j') | KeyCode::Down => session.app.next(),
        KeyCode::Char('k') | KeyCode::Up => session.app.prev(),
        KeyCode::Enter => {
            let selected = session.app.selected;
            let playing_selected = session.controller.is_active()
                && session.controller.current_index() == Some(selected);
            if !playing_selected && session.controller.load_track(selected as isize) {
                session.controller.play();
                session.app.follow_playback_on();
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => {
            let secs = i64::try_from(controls.scrub_seconds).unwrap_or(i64::MAX);
            session.controller.seek_by(secs);
        }
        KeyCode::Char('H') => {
            let secs = i64::try_from(controls.scrub_seconds).unwrap_or(i64::MAX);
            session.controller.seek_by(-secs);
        }
        KeyCode::Char(c @ '0'..='9') => {
            let tenths = f64::from(c as u8 - b'0');
            session.controller.seek_by_percentage(tenths * 10.0);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let level = session.controller.volume() + controls.volume_step;
            session.controller.set_volume(level);
        }
        KeyCode::Char('-') => {
            let level = session.controller.volume() - controls.volume_step;
            session.controller.set_volume(level);
        }
        KeyCode::Char('m') => {
            session.controller.toggle_mute();
        }
        KeyCode::Char('s') => {
            session.controller.toggle_shuffle();
        }
        KeyCode::Char('r') => {
            session.controller.toggle_repeat();
        }
        KeyCode::Char('R') => {
            session.controller.play_random();
            session.app.follow_playback_on();
        }
        KeyCode::Char('v') => session.toggle_visualizer(),
        KeyCode::Char('K') => session.app.toggle_metadata_window(),
        _ => {}
    }

    false
}
