use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::reminder::{FirePolicy, ReminderEngine};
use crate::scheduler;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the entry collection lives; `~` is expanded
    #[serde(default)]
    pub data_path: String,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_archive_after_hours")]
    pub archive_after_hours: i64,
    #[serde(default)]
    pub reminder_policy: FirePolicy,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: Vec<i64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width_percent: u16,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_new")]
    pub new: String,
    #[serde(default = "default_edit")]
    pub edit: String,
    #[serde(default = "default_save")]
    pub save: String,
    #[serde(default = "default_delete")]
    pub delete: String,
    #[serde(default = "default_archive")]
    pub archive: String,
    #[serde(default = "default_restore")]
    pub restore: String,
    #[serde(default = "default_done")]
    pub done: String,
    #[serde(default = "default_select")]
    pub select: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_tab_left")]
    pub tab_left: String,
    #[serde(default = "default_tab_right")]
    pub tab_right: String,
    #[serde(default = "default_tab_1")]
    pub tab_1: String,
    #[serde(default = "default_tab_2")]
    pub tab_2: String,
    #[serde(default = "default_tab_3")]
    pub tab_3: String,
    #[serde(default = "default_tab_4")]
    pub tab_4: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_cycle_theme")]
    pub cycle_theme: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    #[serde(default = "default_alert")]
    pub alert: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            check_interval_secs: default_check_interval_secs(),
            archive_after_hours: default_archive_after_hours(),
            reminder_policy: FirePolicy::default(),
            snooze_minutes: default_snooze_minutes(),
            log_level: default_log_level(),
            sidebar_width_percent: default_sidebar_width(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            new: default_new(),
            edit: default_edit(),
            save: default_save(),
            delete: default_delete(),
            archive: default_archive(),
            restore: default_restore(),
            done: default_done(),
            select: default_select(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            tab_left: default_tab_left(),
            tab_right: default_tab_right(),
            tab_1: default_tab_1(),
            tab_2: default_tab_2(),
            tab_3: default_tab_3(),
            tab_4: default_tab_4(),
            help: default_help(),
            cycle_theme: default_cycle_theme(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            alert: default_alert(),
        }
    }
}

impl Theme {
    fn preset(fg: &str, bg: &str, highlight_bg: &str, highlight_fg: &str, alert: &str) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: highlight_fg.to_string(),
            tab_bg: default_tab_bg(),
            alert: alert.to_string(),
        }
    }

    /// Themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        HashMap::from([
            ("default".to_string(), Theme::default()),
            (
                "calm".to_string(),
                Theme::preset("#D8DEE9", "#1E1E2E", "#44445A", "", "#F5C2E7"),
            ),
            ("light".to_string(), Theme::preset("black", "white", "blue", "white", "red")),
            (
                "monochrome".to_string(),
                Theme::preset("white", "black", "white", "black", "white"),
            ),
        ])
    }
}

// Default value functions
fn default_check_interval_secs() -> u64 {
    30
}

fn default_archive_after_hours() -> i64 {
    24
}

fn default_snooze_minutes() -> Vec<i64> {
    vec![5, 10]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sidebar_width() -> u16 {
    40
}

fn default_data_path() -> String {
    Config::default_data_path_for_profile(utils::Profile::Prod)
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_new() -> String {
    "n".to_string()
}

fn default_edit() -> String {
    "e".to_string()
}

fn default_save() -> String {
    "Ctrl+s".to_string()
}

fn default_delete() -> String {
    "d".to_string()
}

fn default_archive() -> String {
    "a".to_string()
}

fn default_restore() -> String {
    "r".to_string()
}

fn default_done() -> String {
    "x".to_string()
}

fn default_select() -> String {
    "Enter".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_tab_left() -> String {
    "Left".to_string()
}

fn default_tab_right() -> String {
    "Right".to_string()
}

fn default_tab_1() -> String {
    "1".to_string()
}

fn default_tab_2() -> String {
    "2".to_string()
}

fn default_tab_3() -> String {
    "3".to_string()
}

fn default_tab_4() -> String {
    "4".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_cycle_theme() -> String {
    "t".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_alert() -> String {
    "yellow".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Theme not found: {0}")]
    ThemeNotFound(String),
}

impl Config {
    /// Load configuration from an explicit file, creating it with defaults if
    /// missing. An empty `data_path` falls back to the profile's data directory.
    pub fn load_from(path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents =
                fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;
            if config.data_path.trim().is_empty() {
                config.data_path = Self::default_data_path_for_profile(profile);
            }
            Ok(config)
        } else {
            let mut config = Config {
                data_path: Self::default_data_path_for_profile(profile),
                ..Config::default()
            };
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    /// Directory for rolling log files
    pub fn get_log_dir(profile: utils::Profile) -> PathBuf {
        utils::get_data_dir(profile)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("logs")
    }

    /// Get default entry file for a specific profile
    fn default_data_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("entries.json").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/calmmind-dev/entries.json".to_string(),
                utils::Profile::Prod => "~/.local/share/calmmind/entries.json".to_string(),
            }
        }
    }

    /// Get the expanded entry file path (with ~ expansion)
    pub fn get_data_path(&self) -> PathBuf {
        utils::expand_path(&self.data_path)
    }

    /// Reminder check interval, kept under a minute so no minute is skipped
    pub fn check_interval(&self) -> Duration {
        scheduler::clamp_interval(self.check_interval_secs)
    }

    /// Engine for the configured archive age. An age that does not fit a
    /// duration falls back to the default.
    pub fn reminder_engine(&self) -> ReminderEngine {
        let hours = self.archive_after_hours.max(1);
        let archive_after = TimeDelta::try_hours(hours).unwrap_or_else(|| {
            tracing::warn!(hours, "archive_after_hours is out of range, using the default");
            TimeDelta::hours(default_archive_after_hours())
        });
        ReminderEngine::new(archive_after, self.reminder_policy)
    }

    /// Snooze choices offered in the reminder popup, in configured order.
    /// Non-positive, out-of-range and repeated values are dropped.
    pub fn snooze_options(&self) -> Vec<TimeDelta> {
        let mut options: Vec<TimeDelta> = Vec::new();
        for &minutes in &self.snooze_minutes {
            match TimeDelta::try_minutes(minutes).filter(|_| minutes > 0) {
                Some(delta) if !options.contains(&delta) => options.push(delta),
                Some(_) => {}
                None => tracing::warn!(minutes, "ignoring snooze choice"),
            }
        }
        if options.is_empty() {
            options = default_snooze_minutes().into_iter().map(TimeDelta::minutes).collect();
        }
        options
    }

    /// Get the currently active theme.
    /// An empty highlight_fg is derived from highlight_bg.
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{contrast_color_name, parse_color};

        let mut theme = self
            .themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default();

        if theme.highlight_fg.is_empty() {
            theme.highlight_fg = contrast_color_name(parse_color(&theme.highlight_bg)).to_string();
        }

        theme
    }

    /// Set the active theme by name
    pub fn set_theme(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.themes.contains_key(name) && !Theme::get_preset_themes().contains_key(name) {
            return Err(ConfigError::ThemeNotFound(name.to_string()));
        }

        self.current_theme = name.to_string();
        Ok(())
    }

    /// All theme names (presets + user-defined), sorted
    pub fn get_available_themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Theme::get_preset_themes().into_keys().collect();
        for theme_name in self.themes.keys() {
            if !themes.contains(theme_name) {
                themes.push(theme_name.clone());
            }
        }
        themes.sort();
        themes
    }

    /// Switch to the theme after the current one, wrapping around
    pub fn next_theme(&mut self) -> String {
        let themes = self.get_available_themes();
        let next = themes
            .iter()
            .position(|t| *t == self.current_theme)
            .map(|i| (i + 1) % themes.len())
            .unwrap_or(0);
        if let Some(name) = themes.get(next) {
            self.current_theme = name.clone();
        }
        self.current_theme.clone()
    }
}
