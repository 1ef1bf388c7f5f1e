//! Nightly publishing configuration (`config.ini`).
//!
//! ```ini
//! [github]
//! user = builder
//! pass = secret
//! repo = owner/extension
//! extension = myext
//! dirname = ~/src/myext/build
//! hashalgo = sha256
//!
//! [alternateupdate]
//! url = https://example.org/update-nightly.rdf
//! path = ~/www/update-nightly.rdf
//!
//! [nightly]
//! prune_days = 30
//! api_url = https://api.github.com
//! ```
//!
//! Every `[github]` key is required. `[alternateupdate]` only takes effect
//! when both keys are present; `[nightly]` is optional.

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::downloads::{Credentials, DEFAULT_API_BASE};
use crate::hash::HashAlgorithm;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "config.ini";

/// Update descriptor template, looked up next to the config file.
pub const UPDATE_TEMPLATE_FILENAME: &str = "update-nightly.rdf";

/// Records older than this many days are pruned by default.
pub const DEFAULT_PRUNE_DAYS: u32 = 30;

const GITHUB_SECTION: &str = "github";
const ALTERNATE_SECTION: &str = "alternateupdate";
const NIGHTLY_SECTION: &str = "nightly";

/// Errors from loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("missing config for {section}.{key}")]
    MissingKey { section: String, key: String },

    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Where the update descriptor goes when it is not uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateUpdate {
    /// URL browsers poll for updates.
    pub url: String,
    /// Local path the descriptor is written to.
    pub path: PathBuf,
}

/// Validated nightly configuration.
#[derive(Debug, Clone)]
pub struct NightlyConfig {
    pub user: String,
    pub password: String,
    /// Hosting repository as `owner/name`.
    pub repo: String,
    /// Extension short name used in artifact file names.
    pub extension: String,
    /// Build directory to package.
    pub dirname: PathBuf,
    pub hash_algorithm: HashAlgorithm,
    pub alternate_update: Option<AlternateUpdate>,
    pub prune_days: u32,
    pub api_url: String,
    /// Directory holding the config file and the descriptor template.
    pub config_dir: PathBuf,
}

impl NightlyConfig {
    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::parse(&text, config_dir).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse config text. `config_dir` anchors the descriptor template.
    pub fn parse(text: &str, config_dir: PathBuf) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from(CONFIG_FILENAME),
            message: e.to_string(),
        })?;

        let required = |key: &str| -> Result<String, ConfigError> {
            ini.section(Some(GITHUB_SECTION))
                .and_then(|s| s.get(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MissingKey {
                    section: GITHUB_SECTION.to_string(),
                    key: key.to_string(),
                })
        };
        let optional = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user = required("user")?;
        let password = required("pass")?;
        let repo = required("repo")?;
        let extension = required("extension")?;
        let dirname = expand_home(&required("dirname")?);
        let hashalgo = required("hashalgo")?;

        if !repo.contains('/') {
            return Err(ConfigError::InvalidValue {
                key: "repo".to_string(),
                value: repo,
                reason: "expected owner/name".to_string(),
            });
        }

        let hash_algorithm =
            hashalgo
                .parse::<HashAlgorithm>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "hashalgo".to_string(),
                    value: hashalgo.clone(),
                    reason: e.to_string(),
                })?;

        let alternate_update = match (
            optional(ALTERNATE_SECTION, "url"),
            optional(ALTERNATE_SECTION, "path"),
        ) {
            (Some(url), Some(path)) => Some(AlternateUpdate {
                url,
                path: expand_home(&path),
            }),
            _ => None,
        };

        let prune_days = match optional(NIGHTLY_SECTION, "prune_days") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "prune_days".to_string(),
                value: value.clone(),
                reason: "expected a number of days".to_string(),
            })?,
            None => DEFAULT_PRUNE_DAYS,
        };

        let api_url = optional(NIGHTLY_SECTION, "api_url")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            user,
            password,
            repo,
            extension,
            dirname,
            hash_algorithm,
            alternate_update,
            prune_days,
            api_url,
            config_dir,
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.user, &self.password)
    }

    /// Path of the update descriptor template.
    pub fn update_template_path(&self) -> PathBuf {
        self.config_dir.join(UPDATE_TEMPLATE_FILENAME)
    }

    /// URL written into the package's `em:updateURL`.
    pub fn update_url(&self) -> String {
        match &self.alternate_update {
            Some(alternate) => alternate.url.clone(),
            None => format!(
                "https://github.com/downloads/{}/{}",
                self.repo, UPDATE_TEMPLATE_FILENAME
            ),
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
