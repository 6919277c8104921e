use std::env;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::style::Color;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::{AudioGraph, RodioDevice, TapRegistry};
use crate::mpris::ControlCmd;
use crate::playback::PlaybackController;
use crate::visualizer::{RefreshScheduler, Visualizer, WaveformCanvas};

mod event_loop;
mod logging;
mod mpris_sync;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();

    match logging::init(&settings.log) {
        Ok(path) => info!(log = %path.display(), "tremolo starting"),
        Err(e) => eprintln!("tremolo: logging disabled: {e}"),
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let selection = startup::selection_from_args(&args);
    let (tracks, dir) = startup::collect_tracks(&selection, &settings.library);
    if tracks.is_empty() {
        warn!(?selection, "nothing to play");
    }

    let device = RodioDevice::open_default()?;
    let graph = AudioGraph::new(
        device,
        TapRegistry::global(),
        settings.audio.graph_fft_size,
    );
    let mut controller = PlaybackController::new(graph, &settings);
    controller.load_queue(tracks);
    let (_subscription, events) = controller.subscribe();

    let mut app = App::new(controller.queue().len());
    app.visualizer_enabled = settings.visualizer.enabled;
    if let Some(dir) = dir {
        app.set_current_dir(dir);
    }

    let mut visualizer = Visualizer::new(
        WaveformCanvas::new(Color::Cyan),
        RefreshScheduler::new(Duration::from_millis(settings.visualizer.frame_interval_ms)),
        settings.visualizer.clone(),
    );

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());
    mpris_sync::update_mpris(&mpris, &controller);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::default();
        let mut session = event_loop::Session {
            settings: &settings,
            app: &mut app,
            controller: &mut controller,
            visualizer: &mut visualizer,
            mpris: &mpris,
            events: &events,
        };

        event_loop::run(&mut terminal, &mut session, &control_tx, &control_rx, &mut state)
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("tremolo stopped");
    run_result
}
