//! Configuration types.
//!
//! Loads settings from config.json at startup: clustering thresholds, the
//! schedule's time zone, the upload server address and the OCR and language
//! model collaborators. Secrets are never stored here, only the names of the
//! environment variables that hold them.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::table::TableThresholds;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Which OCR service reads the uploaded photo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendKind {
    /// Local `tesseract` executable
    Tesseract,
    /// Google Cloud Vision text detection
    Vision,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backend: OcrBackendKind,
    /// Tesseract language code
    pub language: String,
    /// Tesseract page segmentation mode (11 = sparse text, suits tables)
    pub page_seg_mode: u8,
    /// Words below this Tesseract confidence are dropped
    pub min_confidence: f32,
    pub vision_endpoint: String,
    /// Environment variable holding the Vision API key
    pub vision_api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackendKind::Tesseract,
            language: "eng".to_string(),
            page_seg_mode: 11,
            min_confidence: 0.0,
            vision_endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            vision_api_key_env: "GOOGLE_VISION_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Uploads larger than this are rejected with 413
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub table: TableThresholds,
    /// IANA zone the class times are given in
    pub timezone: String,
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            table: TableThresholds::default(),
            timezone: "America/Los_Angeles".to_string(),
            server: ServerConfig::default(),
            ocr: OcrConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parses the configured time zone name.
    pub fn zone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("Unknown time zone in config: {}", self.timezone))
    }
}

/// Returns config.json next to the executable.
pub fn default_config_path() -> PathBuf {
    crate::paths::get_exe_dir().join("config.json")
}

/// Loads configuration from `path` or returns defaults.
fn load_config(path: &Path) -> AppConfig {
    crate::log(&format!("Looking for config at: {}", path.display()));

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    path.display(),
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    AppConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config(path: Option<&Path>) {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    let _ = CONFIG.set(load_config(&path));
}

/// Returns a reference to the global configuration.
/// Falls back to defaults if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.table.row_threshold, 30);
        assert_eq!(config.table.cell_threshold, 30);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.ocr.backend, OcrBackendKind::Tesseract);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.zone().unwrap(), chrono_tz::America::Los_Angeles);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"timezone": "America/New_York", "table": {"row_threshold": 12}, "ocr": {"backend": "vision"}}"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.zone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(config.table.row_threshold, 12);
        assert_eq!(config.table.cell_threshold, 30);
        assert_eq!(config.ocr.backend, OcrBackendKind::Vision);
        assert_eq!(config.ocr.language, "eng");
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = load_config(&path);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_missing_config_falls_back() {
        let dir = tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json"));
        assert_eq!(config.timezone, "America/Los_Angeles");
    }

    #[test]
    fn test_unknown_zone_is_an_error() {
        let config = AppConfig {
            timezone: "Nowhere/Special".to_string(),
            ..AppConfig::default()
        };
        assert!(config.zone().is_err());
    }
}
