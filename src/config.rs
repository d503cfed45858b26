use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_FOLDER: &str = r"C:\Program Files\DyKnow\Cloud\7.10.45.7";
const INTERVAL_FILE_NAME: &str = "interval.txt";
const MAX_PANEL_DELAY_MS: u64 = 10_000;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MonitoringConfig {
    #[serde(default = "default_target_folder")]
    pub target_folder: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Overrides the interval file location; defaults to `interval.txt`
    /// beside the executable.
    #[serde(default)]
    pub interval_file: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NetworkConfig {
    #[serde(default = "default_toggle_on_switch")]
    pub toggle_on_switch: bool,
    #[serde(default = "default_panel_delay_ms")]
    pub panel_delay_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NotificationsConfig {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
}

// Defaults for MonitoringConfig
fn default_target_folder() -> PathBuf {
    PathBuf::from(DEFAULT_TARGET_FOLDER)
}

fn default_extension() -> String {
    "exe".to_string()
}

// Defaults for NetworkConfig
fn default_toggle_on_switch() -> bool {
    true
}

fn default_panel_delay_ms() -> u64 {
    700
}

fn default_notifications_enabled() -> bool {
    true
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            target_folder: default_target_folder(),
            extension: default_extension(),
            interval_file: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            toggle_on_switch: default_toggle_on_switch(),
            panel_delay_ms: default_panel_delay_ms(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
        }
    }
}

impl MonitoringConfig {
    pub fn interval_path(&self) -> PathBuf {
        if let Some(path) = &self.interval_file {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(INTERVAL_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(INTERVAL_FILE_NAME))
    }
}

pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".dieknow.json")
}

pub fn load_or_create_config() -> Result<Config> {
    let path = get_config_path();

    if path.exists() {
        load_and_validate_config()
    } else {
        let config = Config::default();
        save_config(&config)?;
        Ok(config)
    }
}

/// Reads the config file and rejects values the monitor cannot work with.
pub fn load_and_validate_config() -> Result<Config> {
    let path = get_config_path();
    let content = fs::read_to_string(&path).context("failed to read config file")?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        serde_json::from_str(content).context("failed to parse config file")?;

    let ext = config.monitoring.extension.trim().trim_start_matches('.');
    if ext.is_empty() {
        bail!("monitoring.extension must not be empty");
    }
    config.monitoring.extension = ext.to_string();

    if config.network.panel_delay_ms > MAX_PANEL_DELAY_MS {
        bail!(
            "network.panel_delay_ms must be at most {} (got {})",
            MAX_PANEL_DELAY_MS,
            config.network.panel_delay_ms
        );
    }

    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = get_config_path();
    let content = serde_json::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(&path, content).context("failed to write config file")?;
    Ok(())
}

/// Fails when the monitored installation cannot be found.
pub fn validate_target_folder(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        return Ok(());
    }
    bail!(
        "A DyKnow installation was not able to be found on your device.\n\
         Ensure the folder \"{}\" exists and you have the permissions to access it!\n\n\
         Additionally, ensure you have one of the supported DyKnow versions. \
         You may need to upgrade your DieKnow to a later version.",
        folder.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(
            config.monitoring.target_folder,
            PathBuf::from(DEFAULT_TARGET_FOLDER)
        );
        assert_eq!(config.monitoring.extension, "exe");
        assert!(config.network.toggle_on_switch);
        assert_eq!(config.network.panel_delay_ms, 700);
        assert!(config.notifications.enabled);
    }

    #[test]
    fn extension_dot_is_stripped() {
        let config = parse_config(r#"{"monitoring": {"extension": ".exe"}}"#).unwrap();
        assert_eq!(config.monitoring.extension, "exe");
    }

    #[test]
    fn rejects_blank_extension() {
        assert!(parse_config(r#"{"monitoring": {"extension": " . "}}"#).is_err());
    }

    #[test]
    fn rejects_long_panel_delay() {
        assert!(parse_config(r#"{"network": {"panel_delay_ms": 60000}}"#).is_err());
    }

    #[test]
    fn explicit_interval_file_wins() {
        let config =
            parse_config(r#"{"monitoring": {"interval_file": "C:\\dieknow\\interval.txt"}}"#)
                .unwrap();
        assert_eq!(
            config.monitoring.interval_path(),
            PathBuf::from(r"C:\dieknow\interval.txt")
        );
    }

    #[test]
    fn default_interval_file_is_named_interval_txt() {
        let path = MonitoringConfig::default().interval_path();
        assert_eq!(path.file_name().unwrap(), "interval.txt");
    }

    #[test]
    fn target_folder_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_target_folder(dir.path()).is_ok());

        let missing = dir.path().join("7.10.45.7");
        let err = validate_target_folder(&missing).unwrap_err();
        assert!(err.to_string().contains("7.10.45.7"));
    }
}
