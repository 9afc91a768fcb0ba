use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::Section;

/// Compiled-in backend URL, overridable at build time
pub const DEFAULT_API_URL: &str = match option_env!("NLSQL_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:8000",
};

/// Run-time override for the backend URL
pub const API_URL_ENV: &str = "NLSQL_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub behavior: BehaviorConfig,
    pub export: ExportConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the assistant backend
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// File name suffix a schema file must have
    pub schema_suffix: String,

    /// Database name shown before any file is attached
    pub default_database_name: String,

    /// Show why a dropped or picked file was ignored
    pub report_rejected_files: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// How long the "copied" confirmation stays visible
    pub copy_feedback_ms: u64,

    /// Panel focused at start-up: "upload", "query" or "none"
    pub start_section: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    /// Where CSV exports are written (current directory when unset)
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs for icons
    pub use_glyphs: bool,

    /// Highlight generated SQL
    pub syntax_highlighting: bool,

    pub icons: IconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub file: String,
    pub database: String,
    pub api: String,
    pub warning: String,
    pub error: String,
    pub success: String,
    pub copied: String,
    pub running: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            schema_suffix: ".sql".to_string(),
            default_database_name: "my_database".to_string(),
            report_rejected_files: false,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            copy_feedback_ms: 2000,
            start_section: "upload".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true,
            syntax_highlighting: true,
            icons: IconConfig::default(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            file: "📄".to_string(),
            database: "🗄️".to_string(),
            api: "🌐".to_string(),
            warning: "⚠️".to_string(),
            error: "❌".to_string(),
            success: "✅".to_string(),
            copied: "✔".to_string(),
            running: "⏳".to_string(),
        }
    }
}

impl IconConfig {
    /// ASCII alternatives for terminals without glyph support
    pub fn simple() -> Self {
        Self {
            file: "[F]".to_string(),
            database: "[DB]".to_string(),
            api: "[API]".to_string(),
            warning: "[!]".to_string(),
            error: "[X]".to_string(),
            success: "[OK]".to_string(),
            copied: "[C]".to_string(),
            running: "[..]".to_string(),
        }
    }
}

impl BehaviorConfig {
    pub fn start_section(&self) -> Option<Section> {
        match self.start_section.to_ascii_lowercase().as_str() {
            "query" => Some(Section::Query),
            "none" => None,
            _ => Some(Section::Upload),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config.with_env_overrides());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config = Self::from_toml(&contents)?;
        Ok(config.with_env_overrides())
    }

    /// Parse and normalize a config document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        if !config.display.use_glyphs {
            config.display.icons = IconConfig::simple();
        }
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("nlsql-cli").join("config.toml"))
    }

    /// Export directory, falling back to the working directory
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# nlsql-cli configuration
# Location: ~/.config/nlsql-cli/config.toml (Linux)
#           ~/Library/Application Support/nlsql-cli/config.toml (macOS)
#           %APPDATA%\nlsql-cli\config.toml (Windows)

[api]
# Base URL of the natural-language-to-SQL backend
# (the {env} environment variable takes precedence)
base_url = "{url}"

# Seconds before a request is abandoned
timeout_secs = 60

[upload]
# Only files whose name ends with this suffix are accepted
schema_suffix = ".sql"

# Database name used before a file is attached
default_database_name = "my_database"

# Report ignored files on the status line instead of silently skipping them
report_rejected_files = false

[behavior]
# Milliseconds the "copied" confirmation stays visible
copy_feedback_ms = 2000

# Panel focused at start-up: "upload", "query" or "none"
start_section = "upload"

[export]
# Directory for CSV exports (defaults to the current directory)
# directory = "/path/to/exports"

[display]
# Set to false for ASCII-only icons
use_glyphs = true

# Highlight the generated SQL
syntax_highlighting = true
"#,
            env = API_URL_ENV,
            url = DEFAULT_API_URL
        )
    }

    /// Initialize config with a setup wizard
    pub fn init_wizard() -> Result<Self> {
        println!("nlsql-cli Configuration Setup");
        println!("=============================");

        print!("Backend URL [{}]: ", DEFAULT_API_URL);
        std::io::Write::flush(&mut std::io::stdout())?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        let mut config = Config::default();
        let url = input.trim();
        if !url.is_empty() {
            config.api.base_url = url.to_string();
        }

        print!("Does your terminal support Unicode icons? (y/n) [y]: ");
        std::io::Write::flush(&mut std::io::stdout())?;
        input.clear();
        std::io::stdin().read_line(&mut input)?;
        config.display.use_glyphs = !input.trim().eq_ignore_ascii_case("n");
        if !config.display.use_glyphs {
            config.display.icons = IconConfig::simple();
        }

        config.save()?;

        println!("\nConfiguration saved to: {:?}", Config::get_config_path()?);
        println!("You can edit this file directly to customize further.");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.upload.schema_suffix, ".sql");
        assert_eq!(config.upload.default_database_name, "my_database");
        assert_eq!(config.behavior.copy_feedback_ms, 2000);
        assert!(!config.upload.report_rejected_files);
        assert_eq!(config.behavior.start_section(), Some(Section::Upload));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml("[api]\nbase_url = \"http://backend:9000\"\n").unwrap();
        assert_eq!(config.api.base_url, "http://backend:9000");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.upload.schema_suffix, ".sql");
    }

    #[test]
    fn test_glyphs_off_uses_simple_icons() {
        let config = Config::from_toml("[display]\nuse_glyphs = false\n").unwrap();
        assert_eq!(config.display.icons.success, "[OK]");
    }

    #[test]
    fn test_commented_default_parses() {
        let config = Config::from_toml(&Config::create_default_with_comments()).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.export_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.api.base_url, parsed.api.base_url);
        assert_eq!(config.behavior.start_section, parsed.behavior.start_section);
    }
}
