use crate::config;

/// Load and validate settings. Problems are reported on stderr (the TUI has
/// not taken the terminal yet) and defaults are used instead.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("tremolo: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent the app from starting.
            eprintln!("tremolo: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
