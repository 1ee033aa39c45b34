use crate::error::{AppError, Result};
use crate::paginate::PageSize;
use crate::prompt::PromptFormat;
use crate::theme::Theme;
use byte_unit::Byte;
use parse_duration::parse;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_DIR: &str = ".uno";
pub const DEFAULT_CONFIG_FILENAME: &str = "uno.toml";
pub const DEFAULT_MAX_FILE_SIZE: &str = "25 MiB";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_WATCH_DELAY: &str = "300ms";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_false")]
    pub monitor: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InputsConfig {
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    #[serde(default)]
    pub format: PromptFormat,
    #[serde(default = "default_false")]
    pub include_file_tree: bool,
    #[serde(default = "default_false")]
    pub syntax_highlighting: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_margin")]
    pub margin: f32,
    #[serde(default = "default_true")]
    pub line_numbers: bool,
    #[serde(default = "default_false")]
    pub include_file_tree: bool,
    #[serde(default = "default_true")]
    pub syntax_highlighting: bool,
    #[serde(default = "default_true")]
    pub title_pages: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "default_watch_delay_string")]
    pub delay: String,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_max_file_size() -> String {
    DEFAULT_MAX_FILE_SIZE.to_string()
}
fn default_workers() -> usize {
    DEFAULT_WORKERS
}
fn default_font_size() -> f32 {
    9.0
}
fn default_margin() -> f32 {
    36.0
}
fn default_watch_delay_string() -> String {
    DEFAULT_WATCH_DELAY.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            workers: default_workers(),
            monitor: default_false(),
        }
    }
}
impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
            exclude: Vec::new(),
        }
    }
}
impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            format: PromptFormat::default(),
            include_file_tree: default_false(),
            syntax_highlighting: default_false(),
        }
    }
}
impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            page_size: PageSize::default(),
            font_size: default_font_size(),
            margin: default_margin(),
            line_numbers: default_true(),
            include_file_tree: default_false(),
            syntax_highlighting: default_true(),
            title_pages: default_true(),
        }
    }
}
impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay: default_watch_delay_string(),
        }
    }
}

impl Config {
    pub fn resolve_config_path(
        base_dir: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        match cli_config_file {
            Some(p_str) => {
                let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
                if !path.exists() && path.extension().is_none() {
                    path.set_extension("toml");
                }
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Specified config file not found at path: {}",
                        path.display()
                    )));
                }
                log::debug!("Using specified config file path: {}", path.display());
                Ok(Some(path))
            }
            None => {
                let default_path = base_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    log::debug!("Using default config file path: {}", default_path.display());
                    Ok(Some(default_path))
                } else {
                    log::debug!(
                        "No config file specified and default not found at: {}",
                        default_path.display()
                    );
                    Ok(None)
                }
            }
        }
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        let config = toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values that deserialize fine but cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        self.max_file_size_bytes()?;
        self.get_watch_delay()?;
        if self.general.workers == 0 {
            return Err(AppError::Config(
                "general.workers must be at least 1".to_string(),
            ));
        }
        if !(self.document.font_size > 0.0) {
            return Err(AppError::Config(format!(
                "document.font_size must be positive, got {}",
                self.document.font_size
            )));
        }
        if self.document.margin < 0.0 {
            return Err(AppError::Config(format!(
                "document.margin must not be negative, got {}",
                self.document.margin
            )));
        }
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> Result<u64> {
        let byte_value = Byte::from_str(&self.general.max_file_size).map_err(|e| {
            AppError::Config(format!(
                "Invalid max_file_size '{}': {}. Use KB, MB, MiB, etc.",
                self.general.max_file_size, e
            ))
        })?;
        let bytes: u128 = byte_value.into();
        u64::try_from(bytes).map_err(|_| {
            AppError::Config(format!(
                "max_file_size '{}' is out of range",
                self.general.max_file_size
            ))
        })
    }

    pub fn get_watch_delay(&self) -> Result<Duration> {
        parse(&self.watch.delay).map_err(|e| {
            AppError::InvalidArgument(format!(
                "Invalid watch delay duration '{}': {}. Use format like '500ms', '2s'.",
                self.watch.delay, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = config.to_toml_string().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str(
            "[prompt]\nformat = \"markdown\"\n\n[document]\ntheme = \"dark\"\n",
        )
        .unwrap();
        assert_eq!(parsed.prompt.format, PromptFormat::Markdown);
        assert_eq!(parsed.document.theme, Theme::Dark);
        assert!(parsed.document.line_numbers);
        assert_eq!(parsed.general.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<Config>("[general]\nthreads = 3\n").is_err());
    }

    #[test]
    fn parses_human_sizes() {
        let mut config = Config::default();
        config.general.max_file_size = "2 KiB".to_string();
        assert_eq!(config.max_file_size_bytes().unwrap(), 2048);
        config.general.max_file_size = "lots".to_string();
        assert!(matches!(
            config.max_file_size_bytes(),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn zero_workers_fail_validation() {
        let mut config = Config::default();
        config.general.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_default_file_resolves_to_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::resolve_config_path(dir.path(), None, false).unwrap(), None);
    }

    #[test]
    fn default_file_is_found_and_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let conf_dir = dir.path().join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&conf_dir).unwrap();
        fs::write(
            conf_dir.join(DEFAULT_CONFIG_FILENAME),
            "[general]\nworkers = 2\n",
        )
        .unwrap();
        let path = Config::resolve_config_path(dir.path(), None, false)
            .unwrap()
            .unwrap();
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.general.workers, 2);
    }
}
