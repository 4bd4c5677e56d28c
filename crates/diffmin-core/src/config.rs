use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub matching: MatchSettings,
    #[serde(default)]
    pub printer: PrinterSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Smallest subtree (in low-level nodes) that move recovery will pair.
    #[serde(default = "default_min_move_size")]
    pub min_move_size: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            min_move_size: default_min_move_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterSettings {
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Also write `diffmin.log` here when set.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            directory: None,
        }
    }
}

fn default_min_move_size() -> usize {
    2
}
fn default_indent_width() -> usize {
    4
}
fn default_filter() -> String {
    "warn".into()
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"printer": {"indent_width": 2}}"#).unwrap();
        assert_eq!(settings.printer.indent_width, 2);
        assert_eq!(settings.matching.min_move_size, 2);
        assert_eq!(settings.logging.filter, "warn");
        assert!(settings.logging.directory.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.matching.min_move_size = 5;
        settings.logging.directory = Some(dir.path().to_path_buf());
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.matching.min_move_size, 5);
        assert_eq!(loaded.logging.directory.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load(&path).is_err());
        assert!(Settings::load(&dir.path().join("absent.json")).is_err());
    }
}
