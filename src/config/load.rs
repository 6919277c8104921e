use std::{env, path::PathBuf};

use super::schema::Settings;

/// Valid analysis resolutions, inclusive.
pub(crate) const MIN_FFT_SIZE: usize = 32;
pub(crate) const MAX_FFT_SIZE: usize = 32768;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `TREMOLO__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("TREMOLO")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.audio.initial_volume) {
            return Err("audio.initial_volume must be within [0, 1]".to_string());
        }
        if !is_valid_fft_size(self.audio.graph_fft_size) {
            return Err(format!(
                "audio.graph_fft_size must be a power of two in [{MIN_FFT_SIZE}, {MAX_FFT_SIZE}]"
            ));
        }
        if !is_valid_fft_size(self.visualizer.fft_size) {
            return Err(format!(
                "visualizer.fft_size must be a power of two in [{MIN_FFT_SIZE}, {MAX_FFT_SIZE}]"
            ));
        }
        if !(self.visualizer.bar_width > 0.0) {
            return Err("visualizer.bar_width must be > 0".to_string());
        }
        if !(self.visualizer.bar_gap >= 0.0) {
            return Err("visualizer.bar_gap must be >= 0".to_string());
        }
        if self.visualizer.frame_interval_ms == 0 {
            return Err("visualizer.frame_interval_ms must be >= 1".to_string());
        }
        Ok(())
    }
}

pub(crate) fn is_valid_fft_size(n: usize) -> bool {
    n.is_power_of_two() && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&n)
}

/// Resolve the config path from `TREMOLO_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("TREMOLO_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/tremolo/config.toml`
/// or `~/.config/tremolo/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|base| base.join("tremolo").join("config.toml"))
}
