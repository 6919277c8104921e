use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Embedded artwork pulled from the track's tags.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverArt {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

/// One playable queue entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    /// Position in the queue the track was loaded into.
    pub id: usize,
    pub name: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<u32>,
    /// `Duration::ZERO` when unknown.
    pub duration: Duration,
    /// Playable source handed to the output device.
    pub source: PathBuf,
    pub cover_art: Option<CoverArt>,
    /// Mime type derived from the extension, e.g. `audio/mpeg`.
    pub file_type: String,
}

impl Track {
    /// Best-effort record for a file whose metadata could not be read.
    pub fn minimal(id: usize, path: &Path) -> Self {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();

        Self {
            id,
            name,
            artist: None,
            album: None,
            genre: None,
            year: None,
            duration: Duration::ZERO,
            source: path.to_path_buf(),
            cover_art: None,
            file_type: file_type_for(path).to_string(),
        }
    }

    /// `Artist - Name`, or just the name when the artist is unknown.
    pub fn display(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => format!("{} - {}", a, self.name),
            _ => self.name.clone(),
        }
    }

    /// Known duration, `None` when the metadata had none.
    pub fn known_duration(&self) -> Option<Duration> {
        (!self.duration.is_zero()).then_some(self.duration)
    }
}

/// Map a file extension to the mime tag stored in `Track::file_type`.
pub fn file_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") | Some("aac") => "audio/mp4",
        Some("opus") => "audio/opus",
        _ => "application/octet-stream",
    }
}
