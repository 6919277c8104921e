use std::path::{Path, PathBuf};
use std::sync::Arc;

use lofty::prelude::*;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::filename::guess_from_stem;
use super::model::{CoverArt, Track};

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Scan `dir` for audio files and build a queue sorted by display name.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks: Vec<Track> = walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && (settings.include_hidden || !is_hidden(path))
                && is_audio_file(path, settings)
        })
        .map(|path| read_track(0, &path))
        .collect();

    tracks.sort_by(|a, b| a.display().to_lowercase().cmp(&b.display().to_lowercase()));
    renumber(&mut tracks);
    debug!(dir = %dir.display(), count = tracks.len(), "library scan finished");
    tracks
}

/// Build a queue from explicitly chosen files, keeping their order.
pub fn from_paths(paths: &[PathBuf]) -> Vec<Track> {
    let mut tracks: Vec<Track> = paths
        .iter()
        .filter(|p| p.is_file())
        .map(|p| read_track(0, p))
        .collect();
    renumber(&mut tracks);
    tracks
}

fn renumber(tracks: &mut [Track]) {
    for (i, t) in tracks.iter_mut().enumerate() {
        t.id = i;
    }
}

/// Read one file's metadata. Never fails: unreadable tags produce the
/// filename-derived record with a zero duration.
pub fn read_track(id: usize, path: &Path) -> Track {
    let mut track = Track::minimal(id, path);

    let guess = guess_from_stem(&track.name);
    if let Some(title) = guess.title {
        track.name = title;
    }
    track.artist = guess.artist;
    track.album = guess.album;
    track.year = guess.year;

    let tagged = match lofty::read_from_path(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read tags, using filename");
            return track;
        }
    };

    track.duration = tagged.properties().duration();

    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return track;
    };

    if let Some(v) = tag.title().filter(|v| !v.trim().is_empty()) {
        track.name = v.trim().to_string();
    }
    if let Some(v) = tag.artist().filter(|v| !v.trim().is_empty()) {
        track.artist = Some(v.trim().to_string());
    }
    if let Some(v) = tag.album().filter(|v| !v.trim().is_empty()) {
        track.album = Some(v.trim().to_string());
    }
    if let Some(v) = tag.genre().filter(|v| !v.trim().is_empty()) {
        track.genre = Some(v.trim().to_string());
    }
    if let Some(year) = tag
        .items()
        .filter(|item| matches!(item.key(), ItemKey::RecordingDate))
        .find_map(|item| item.value().text().and_then(parse_year))
    {
        track.year = Some(year);
    }
    if let Some(picture) = tag.pictures().first() {
        track.cover_art = Some(CoverArt {
            mime_type: picture
                .mime_type()
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "image/jpeg".to_string()),
            data: Arc::from(picture.data()),
        });
    }

    track
}

/// Leading four-digit year of a date string such as `1997-04-01`.
fn parse_year(date: &str) -> Option<u32> {
    let digits: String = date.trim().chars().take(4).collect();
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}
