//! Terminal configuration loaded from TOML.
//!
//! Every key is optional; a missing file or an empty document yields
//! [`TerminalConfig::default()`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::color::{Rgb, parse_hex_color};
use crate::error::{HitchError, Result};

/// Behavior and appearance settings read by the command core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Token splitting one input line into segments. Empty disables splitting.
    pub multiple_cmd_separator: String,

    /// Placeholder replaced by alias arguments.
    pub alias_param_marker: String,
    /// Separator between alias arguments.
    pub alias_param_separator: String,
    /// Fill surplus markers with the first argument.
    pub alias_replace_all_markers: bool,
    /// Echo the expanded alias before running it.
    pub show_alias_content: bool,
    /// Format of the echoed alias line (`%a` name, `%v` value, `%n` newline).
    pub alias_content_format: String,
    pub alias_content_color: String,
    /// Maximum alias-to-alias expansion depth for one input line.
    pub max_alias_depth: usize,
    /// Alias store. Relative paths are resolved by the caller.
    pub alias_file: Option<PathBuf>,

    /// Emit a line after launching an app.
    pub show_launch_history: bool,
    /// Format of the launch line (`%l` label, `%p` identifier, `%n` newline).
    pub app_launch_format: String,

    pub output_color: String,
    pub error_color: String,

    /// Working directory restored by `ctrlc`. Defaults to `$HOME`.
    pub home_path: Option<PathBuf>,

    /// Targets accepted by `switch-os`.
    pub os_targets: Vec<String>,
    pub user: String,
    pub hostname: String,

    /// Launchable applications (desktop app service).
    pub apps: Vec<AppEntry>,
    /// Named application groups.
    pub groups: Vec<GroupEntry>,
}

/// A launchable application declared in the config.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AppEntry {
    pub label: String,
    /// Program line run to launch the app.
    pub command: String,
}

/// A named collection of app labels.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            multiple_cmd_separator: ";".to_string(),
            alias_param_marker: "%".to_string(),
            alias_param_separator: " ".to_string(),
            alias_replace_all_markers: false,
            show_alias_content: false,
            alias_content_format: "%a --> [%v]".to_string(),
            alias_content_color: "#1DE9B6".to_string(),
            max_alias_depth: 16,
            alias_file: None,
            show_launch_history: true,
            app_launch_format: "--> %l".to_string(),
            output_color: "#FFFFFF".to_string(),
            error_color: "#FF5252".to_string(),
            home_path: None,
            os_targets: vec![
                "ubuntu".to_string(),
                "macos".to_string(),
                "windows".to_string(),
            ],
            user: "root".to_string(),
            hostname: "hitchhiker-guide".to_string(),
            apps: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl TerminalConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.alias_param_marker.is_empty() {
            return Err(HitchError::Config(
                "alias_param_marker must not be empty".to_string(),
            ));
        }
        if self.alias_param_separator.is_empty() {
            return Err(HitchError::Config(
                "alias_param_separator must not be empty".to_string(),
            ));
        }
        for (key, value) in [
            ("alias_content_color", &self.alias_content_color),
            ("output_color", &self.output_color),
            ("error_color", &self.error_color),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(HitchError::Config(format!(
                    "{key}: expected #RRGGBB, got '{value}'"
                )));
            }
        }
        Ok(())
    }

    pub fn alias_color(&self) -> Option<Rgb> {
        parse_hex_color(&self.alias_content_color)
    }

    pub fn error_rgb(&self) -> Option<Rgb> {
        parse_hex_color(&self.error_color)
    }

    pub fn output_rgb(&self) -> Option<Rgb> {
        parse_hex_color(&self.output_color)
    }

    /// The configured home directory, falling back to `$HOME` and then `/`.
    pub fn home_dir(&self) -> PathBuf {
        self.home_path
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}
