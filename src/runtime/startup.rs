use std::env;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::LibrarySettings;
use crate::library::{self, Track};

/// What the command line asked to play.
#[derive(Debug, PartialEq)]
pub enum Selection {
    Folder(PathBuf),
    Files(Vec<PathBuf>),
}

/// One directory argument (or none, meaning the working directory) selects a
/// folder; anything else is a list of files.
pub fn selection_from_args(args: &[String]) -> Selection {
    match args {
        [] => Selection::Folder(env::current_dir().unwrap_or_else(|_| PathBuf::from("Music"))),
        [one] if Path::new(one).is_dir() => Selection::Folder(PathBuf::from(one)),
        many => Selection::Files(many.iter().map(PathBuf::from).collect()),
    }
}

/// Build the queue for `selection`, plus the directory label shown in the UI.
pub fn collect_tracks(selection: &Selection, settings: &LibrarySettings) -> (Vec<Track>, Option<String>) {
    match selection {
        Selection::Folder(dir) => {
            let tracks = library::scan(dir, settings);
            info!(dir = %dir.display(), tracks = tracks.len(), "scanned folder");
            (tracks, Some(dir.display().to_string()))
        }
        Selection::Files(paths) => {
            let tracks = library::from_paths(paths);
            info!(tracks = tracks.len(), "loaded files");
            (tracks, None)
        }
    }
}
