//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::App;
use crate::audio::GraphMode;
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::Track;
use crate::playback::{NowPlaying, Transport};
use crate::visualizer::WaveformCanvas;

const WAVEFORM_HEIGHT: u16 = 8;

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "play selected song".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next song".to_string());
    // H/L is filled dynamically from config.
    map.insert("0-9".to_string(), "jump to 0-90%".to_string());
    map.insert("+/-".to_string(), "volume".to_string());
    map.insert("m".to_string(), "mute".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("r".to_string(), "repeat".to_string());
    map.insert("R".to_string(), "random song".to_string());
    map.insert("v".to_string(), "waveform".to_string());
    map.insert("K".to_string(), "metadata".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Player state the UI reads each frame.
pub struct PlayerView<'a> {
    pub queue: &'a [Track],
    pub now_playing: Option<NowPlaying>,
    pub transport: Transport,
    pub shuffle: bool,
    pub repeat: bool,
    pub volume: f32,
    pub graph_mode: Option<GraphMode>,
}

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "0-9", "+/-", "m", "s", "r", "R", "v", "K",
        "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Format an optional duration, rounding up partial seconds, showing total seconds.
fn format_duration_mmss_ceil(d: Option<Duration>) -> String {
    let Some(d) = d else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }

    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02} ({}s)", minutes, seconds, total_secs)
}

fn status_text(app: &App, player: &PlayerView<'_>, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    if app.follow_playback {
        parts.push(" CURSOR: Follow".to_string());
    } else {
        parts.push(" CURSOR: Free-roam".to_string());
    }

    let mode = match (player.shuffle, player.repeat) {
        (_, true) => "PLAYBACK: Repeat-one",
        (true, false) => "PLAYBACK: Shuffle",
        (false, false) => "PLAYBACK: In order",
    };
    parts.push(mode.to_string());

    match &player.now_playing {
        Some(now) if player.transport != Transport::Idle => {
            let song = now.track.display();
            match now_playing_time_text(now.time.current_time, now.time.duration, ui) {
                Some(time) => parts.push(format!("Song: {} [{}]", song, time)),
                None => parts.push(format!("Song: {}", song)),
            }
            let state = match player.transport {
                Transport::Playing => "Playing",
                Transport::Paused => "Paused",
                _ => "Ready",
            };
            parts.push(state.to_string());
        }
        _ => parts.push("Stopped".to_string()),
    }

    if player.volume == 0.0 {
        parts.push("Vol: muted".to_string());
    } else {
        parts.push(format!("Vol: {:.0}%", player.volume * 100.0));
    }

    if player.graph_mode == Some(GraphMode::Fallback) {
        parts.push("Waveform: unavailable".to_string());
    }

    if let Some(dir) = &app.current_dir {
        parts.push(format!("Dir: {}", dir));
    }

    parts.join(" • ")
}

fn metadata_text(track: Option<&Track>) -> String {
    let Some(track) = track else {
        return "No track selected".to_string();
    };

    let cover = match &track.cover_art {
        Some(art) => format!("{} ({} bytes)", art.mime_type, art.data.len()),
        None => "-".to_string(),
    };
    format!(
        "Title: {}\nArtist: {}\nAlbum: {}\nGenre: {}\nYear: {}\nDuration: {}\nType: {}\nCover: {}\nPath: {}",
        track.name,
        track.artist.as_deref().unwrap_or("-"),
        track.album.as_deref().unwrap_or("-"),
        track.genre.as_deref().unwrap_or("-"),
        track.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
        format_duration_mmss_ceil(track.known_duration()),
        track.file_type,
        cover,
        track.source.display()
    )
}

fn left_padded() -> Padding {
    Padding {
        left: 1,
        right: 0,
        top: 0,
        bottom: 0,
    }
}

/// Render the entire UI into the provided `frame`.
///
/// The waveform canvas is told the area it occupies so the visualizer can
/// match its backing size on the next frame.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    player: &PlayerView<'_>,
    canvas: &mut WaveformCanvas,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());
    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tremolo ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status_par = Paragraph::new(status_text(app, player, ui_settings))
        .slow_blink()
        .block(Block::bordered().padding(left_padded()).title(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    let (list_area, wave_area) = if app.visualizer_enabled {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(WAVEFORM_HEIGHT)])
            .split(chunks[2]);
        (split[0], Some(split[1]))
    } else {
        (chunks[2], None)
    };

    // Main list
    {
        // Center the selected item when possible by creating a visible window.
        // Important: only build ListItems for the visible window (avoid allocating the entire list).
        let total = player.queue.len();
        let list_height = list_area.height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let playing = player.now_playing.as_ref().map(|n| n.index);
        let visible_items: Vec<ListItem> = player.queue[start..end]
            .iter()
            .enumerate()
            .map(|(offset, track)| {
                let marker = if playing == Some(start + offset) { "♪ " } else { "  " };
                ListItem::new(format!("{}{}", marker, track.display()))
            })
            .collect();

        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, list_area, &mut state);
    }

    // Waveform
    if let Some(area) = wave_area {
        let block = Block::default().borders(Borders::ALL).title(" waveform ");
        let inner = block.inner(area);
        frame.render_widget(block, area);
        canvas.set_display_area(inner);
        frame.render_widget(&*canvas, inner);
    }

    // Overlay metadata popup (keeps list visible under it)
    if app.metadata_window {
        // Keep the popup inside the list area so it doesn't cover header/status/footer.
        let popup_area = centered_rect_sized(72, 12, list_area);
        frame.render_widget(Clear, popup_area);

        let meta_paragraph = Paragraph::new(metadata_text(player.queue.get(app.selected)))
            .block(
                Block::default()
                    .padding(left_padded())
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(left_padded()),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_text_follows_configured_fields() {
        let ui = UiSettings {
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Remaining],
            ..UiSettings::default()
        };
        let text = now_playing_time_text(
            Duration::from_secs(65),
            Some(Duration::from_secs(200)),
            &ui,
        );
        assert_eq!(text.as_deref(), Some("01:05 / -02:15"));
    }

    #[test]
    fn time_text_skips_unknown_total() {
        let ui = UiSettings::default();
        let text = now_playing_time_text(Duration::from_secs(3), None, &ui);
        assert_eq!(text.as_deref(), Some("00:03"));
    }

    #[test]
    fn duration_rounds_partial_seconds_up() {
        assert_eq!(
            format_duration_mmss_ceil(Some(Duration::from_millis(61_200))),
            "1:02 (62s)"
        );
        assert_eq!(format_duration_mmss_ceil(None), "-");
    }

    #[test]
    fn controls_mention_scrub_seconds() {
        assert!(controls_text(7).contains("[H/L] scrub -/+7s"));
        assert!(controls_text(7).contains("[m] mute"));
    }

    #[test]
    fn status_shows_muted_volume() {
        let app = App::new(0);
        let mut player = PlayerView {
            queue: &[],
            now_playing: None,
            transport: Transport::Idle,
            shuffle: false,
            repeat: false,
            volume: 0.0,
            graph_mode: None,
        };
        let ui = UiSettings::default();
        assert!(status_text(&app, &player, &ui).contains("Vol: muted"));

        player.volume = 0.5;
        assert!(status_text(&app, &player, &ui).contains("Vol: 50%"));
    }

    #[test]
    fn metadata_lists_missing_fields_as_dash() {
        let track = Track::minimal(0, std::path::Path::new("/music/song.flac"));
        let text = metadata_text(Some(&track));
        assert!(text.contains("Title: song"));
        assert!(text.contains("Genre: -"));
        assert!(text.contains("Type: audio/flac"));
    }
}
