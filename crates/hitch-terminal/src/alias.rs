//! Alias storage, resolution, and parameter substitution.
//!
//! Aliases persist as `name=value` lines. Values may contain the
//! configured parameter marker; each marker takes the next argument
//! supplied after the alias name.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use hitch_types::config::TerminalConfig;
use hitch_types::error::HitchError;

use crate::format::expand_placeholders;

/// Why an alias operation was refused.
#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    #[error("alias '{0}' expands to itself")]
    SelfReference(String),

    #[error("alias '{0}' starts with its own name")]
    PrefixSelfReference(String),

    #[error("alias '{0}' already exists")]
    NameTaken(String),

    #[error("alias '{0}' not found")]
    NotFound(String),

    #[error("alias name and value must not be empty")]
    Empty,

    #[error("alias name must not contain spaces or '='")]
    InvalidName,

    #[error("alias file: {0}")]
    Io(#[from] io::Error),
}

impl From<AliasError> for HitchError {
    fn from(e: AliasError) -> Self {
        HitchError::Alias(e.to_string())
    }
}

/// A user-defined name-to-template mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub value: String,
    /// Whether `value` contains the parameter marker.
    pub parametrized: bool,
}

/// A successful [`AliasManager::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlias {
    pub name: String,
    pub value: String,
    pub parametrized: bool,
    /// Words after the alias name, in input order.
    pub residual: String,
}

/// Substitution and echo settings.
#[derive(Debug, Clone)]
pub struct AliasSettings {
    pub marker: String,
    pub separator: String,
    pub replace_all: bool,
    pub label_format: String,
}

impl AliasSettings {
    pub fn from_config(config: &TerminalConfig) -> Self {
        Self {
            marker: config.alias_param_marker.clone(),
            separator: config.alias_param_separator.clone(),
            replace_all: config.alias_replace_all_markers,
            label_format: config.alias_content_format.clone(),
        }
    }
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self::from_config(&TerminalConfig::default())
    }
}

/// The active alias set and its backing file.
pub struct AliasManager {
    settings: AliasSettings,
    path: Option<PathBuf>,
    aliases: Vec<Alias>,
}

impl AliasManager {
    /// An empty manager. With no path, changes are kept in memory only.
    pub fn new(settings: AliasSettings, path: Option<PathBuf>) -> Self {
        Self {
            settings,
            path,
            aliases: Vec::new(),
        }
    }

    /// Create and load from `path`, logging rejected lines.
    pub fn open(settings: AliasSettings, path: PathBuf) -> Result<Self, AliasError> {
        let mut manager = Self::new(settings, Some(path));
        for warning in manager.reload()? {
            log::warn!("{warning}");
        }
        Ok(manager)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// Replace the in-memory set with the file contents.
    ///
    /// Returns one warning per rejected line. Blank lines and lines
    /// without `=` are skipped silently. A missing file is an empty set.
    pub fn reload(&mut self) -> Result<Vec<String>, AliasError> {
        self.aliases.clear();
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut warnings = Vec::new();
        let mut loaded: Vec<Alias> = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            let checked = self.check(name, value).and_then(|()| {
                if loaded.iter().any(|a| a.name == name) {
                    Err(AliasError::NameTaken(name.to_string()))
                } else {
                    Ok(())
                }
            });
            match checked {
                Ok(()) => loaded.push(self.make(name, value)),
                Err(e) => warnings.push(format!("line {}: {e}", lineno + 1)),
            }
        }
        log::info!("Loaded {} aliases from {}", loaded.len(), path.display());
        self.aliases = loaded;
        Ok(warnings)
    }

    /// Add an alias and append it to the file.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), AliasError> {
        let (name, value) = (name.trim(), value.trim());
        self.check(name, value)?;
        if self.get(name).is_some() {
            return Err(AliasError::NameTaken(name.to_string()));
        }
        if let Some(path) = &self.path {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            write!(file, "\n{name}={value}")?;
        }
        self.aliases.push(self.make(name, value));
        Ok(())
    }

    /// Remove an alias, rewriting the file without its lines.
    pub fn remove(&mut self, name: &str) -> Result<(), AliasError> {
        let name = name.trim();
        if self.path.is_some() {
            for warning in self.reload()? {
                log::warn!("{warning}");
            }
        }
        let Some(index) = self.aliases.iter().position(|a| a.name == name) else {
            return Err(AliasError::NotFound(name.to_string()));
        };
        self.aliases.remove(index);

        if let Some(path) = &self.path {
            let text = fs::read_to_string(path)?;
            let kept: Vec<&str> = text
                .lines()
                .filter(|line| {
                    line.split_once('=')
                        .is_none_or(|(n, _)| n.trim() != name)
                })
                .collect();
            let tmp = path.with_extension("tmp");
            fs::write(&tmp, kept.join("\n"))?;
            fs::rename(&tmp, path)?;
        }
        Ok(())
    }

    /// Find the alias named by `input`.
    ///
    /// With `allow_trailing`, words are peeled off the end until the
    /// remainder names an alias; the peeled words become the residual.
    pub fn resolve(&self, input: &str, allow_trailing: bool) -> Option<ResolvedAlias> {
        let mut candidate = input.trim();
        let mut residual = String::new();
        loop {
            if let Some(alias) = self.get(candidate) {
                return Some(ResolvedAlias {
                    name: alias.name.clone(),
                    value: alias.value.clone(),
                    parametrized: alias.parametrized,
                    residual,
                });
            }
            if !allow_trailing {
                return None;
            }
            let (head, last) = candidate.rsplit_once(' ')?;
            residual = if residual.is_empty() {
                last.to_string()
            } else {
                format!("{last} {residual}")
            };
            candidate = head.trim_end();
        }
    }

    /// The text a resolved alias runs.
    ///
    /// Parametrized values are formatted with the residual; otherwise the
    /// residual is appended after one space.
    pub fn expand(&self, resolved: &ResolvedAlias) -> String {
        if resolved.parametrized {
            self.format(&resolved.value, &resolved.residual)
        } else if resolved.residual.is_empty() {
            resolved.value.clone()
        } else {
            format!("{} {}", resolved.value, resolved.residual)
        }
    }

    /// Replace markers in `value`, left to right, with arguments from
    /// `params`.
    ///
    /// `params` is split on the separator into at most as many pieces as
    /// there are markers, so the last marker takes everything left over.
    /// Surplus markers are filled with the first argument when
    /// `replace_all` is set and left as written otherwise. Blank `params`
    /// leave `value` untouched.
    pub fn format(&self, value: &str, params: &str) -> String {
        let marker = self.settings.marker.as_str();
        let pieces: Vec<&str> = value.split(marker).collect();
        let markers = pieces.len() - 1;
        if markers == 0 || params.trim().is_empty() {
            return value.to_string();
        }
        let args: Vec<&str> = params.splitn(markers, self.settings.separator.as_str()).collect();

        let mut out = String::with_capacity(value.len() + params.len());
        out.push_str(pieces[0]);
        for (i, piece) in pieces[1..].iter().enumerate() {
            match args.get(i) {
                Some(arg) => out.push_str(arg),
                None if self.settings.replace_all => out.push_str(args[0]),
                None => out.push_str(marker),
            }
            out.push_str(piece);
        }
        out
    }

    /// Echo line for an expanded alias (`%a` name, `%v` value, `%n` newline).
    pub fn format_label(&self, name: &str, value: &str) -> String {
        expand_placeholders(&self.settings.label_format, &[('a', name), ('v', value)])
    }

    /// `name --> value`, one per line.
    pub fn print_aliases(&self) -> String {
        self.aliases
            .iter()
            .map(|a| format!("{} --> {}", a.name, a.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn check(&self, name: &str, value: &str) -> Result<(), AliasError> {
        if name.is_empty() || value.is_empty() {
            return Err(AliasError::Empty);
        }
        if name.contains('=') || name.contains(char::is_whitespace) {
            return Err(AliasError::InvalidName);
        }
        if name.eq_ignore_ascii_case(value) {
            return Err(AliasError::SelfReference(name.to_string()));
        }
        if value.starts_with(&format!("{name} ")) {
            return Err(AliasError::PrefixSelfReference(name.to_string()));
        }
        Ok(())
    }

    fn make(&self, name: &str, value: &str) -> Alias {
        Alias {
            name: name.to_string(),
            value: value.to_string(),
            parametrized: value.contains(self.settings.marker.as_str()),
        }
    }
}
