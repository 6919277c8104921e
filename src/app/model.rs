//! The `App` view model: cursor over the queue and UI toggles.

/// View state of the terminal UI.
#[derive(Debug)]
pub struct App {
    /// Cursor position in the queue.
    pub selected: usize,
    len: usize,

    /// Cursor jumps to the playing track when it changes.
    pub follow_playback: bool,
    pub metadata_window: bool,
    pub visualizer_enabled: bool,
    pub current_dir: Option<String>,
}

impl App {
    /// Create a new `App` over a queue of `len` tracks.
    pub fn new(len: usize) -> Self {
        Self {
            selected: 0,
            len,
            follow_playback: true,
            metadata_window: false,
            visualizer_enabled: true,
            current_dir: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Adopt a new queue length, keeping the cursor in range.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.selected >= len {
            self.selected = 0;
        }
    }

    /// Move the cursor down one row, wrapping to the top.
    pub fn next(&mut self) {
        if self.len == 0 {
            return;
        }
        self.selected = (self.selected + 1) % self.len;
        self.follow_playback = false;
    }

    /// Move the cursor up one row, wrapping to the bottom.
    pub fn prev(&mut self) {
        if self.len == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            self.len - 1
        } else {
            self.selected - 1
        };
        self.follow_playback = false;
    }

    pub fn top(&mut self) {
        self.selected = 0;
        self.follow_playback = false;
    }

    pub fn bottom(&mut self) {
        self.selected = self.len.saturating_sub(1);
        self.follow_playback = false;
    }

    /// Playback moved to `index`; bring the cursor along when following.
    pub fn on_track_changed(&mut self, index: usize) {
        if self.follow_playback && index < self.len {
            self.selected = index;
        }
    }

    /// Explicitly choosing a track re-enables following.
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn toggle_visualizer(&mut self) -> bool {
        self.visualizer_enabled = !self.visualizer_enabled;
        self.visualizer_enabled
    }

    /// Record the directory the queue was scanned from.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }
}
