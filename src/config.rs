use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::processing::DEFAULT_MAX_KERNEL;

#[derive(Debug, Default, Serialize, Deserialize)]
/// Persisted UI/application settings for Retouch.
pub struct AppConfig {
    pub window_width: Option<f32>,
    pub window_height: Option<f32>,
    pub last_dir: Option<PathBuf>,
    /// Upper bound for blur kernel sizes.
    pub max_kernel_size: Option<i32>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("retouch").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_default()
    }

    /// Writes config to disk, ignoring filesystem/serialization errors.
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(s) = toml::to_string_pretty(self) {
            let _ = std::fs::write(&path, s);
        }
    }

    /// Kernel cap, never below the smallest usable kernel.
    pub fn max_kernel(&self) -> i32 {
        self.max_kernel_size.unwrap_or(DEFAULT_MAX_KERNEL).max(3)
    }

    /// Where file dialogs start: the last used directory, else Pictures.
    pub fn dialog_dir(&self) -> Option<PathBuf> {
        self.last_dir
            .clone()
            .filter(|d| d.is_dir())
            .or_else(dirs::picture_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = AppConfig::parse("window_width = 640.0\n");
        assert_eq!(config.window_width, Some(640.0));
        assert_eq!(config.max_kernel(), 31);
        assert_eq!(config.last_dir, None);
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let config = AppConfig::parse("max_kernel_size = \"big\"");
        assert_eq!(config.max_kernel_size, None);
    }

    #[test]
    fn kernel_cap_has_a_floor() {
        let config = AppConfig::parse("max_kernel_size = 1\n");
        assert_eq!(config.max_kernel(), 3);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = AppConfig {
            last_dir: Some("/tmp/pictures".into()),
            max_kernel_size: Some(15),
            ..Default::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back = AppConfig::parse(&text);
        assert_eq!(back.last_dir, config.last_dir);
        assert_eq!(back.max_kernel(), 15);
    }
}
