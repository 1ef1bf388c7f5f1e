//! Common helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use console::style;
use xpinightly::config::{NightlyConfig, CONFIG_FILENAME};
use xpinightly::downloads::{DownloadRecord, Downloads};

use crate::error::CliError;

/// Directory under the user config dir searched when `./config.ini` is absent.
const APP_DIR: &str = "xpinightly";

/// Pick the config file: the CLI flag, then `./config.ini`, then the user
/// config directory.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.is_file() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
        .filter(|path| path.is_file())
        .unwrap_or(local)
}

/// Load the nightly configuration.
pub fn load_config(cli_path: Option<&Path>) -> Result<NightlyConfig, CliError> {
    let path = resolve_config_path(cli_path);
    tracing::debug!(path = %path.display(), "Loading configuration");
    Ok(NightlyConfig::load(&path)?)
}

/// Downloads client for the configured repository.
pub fn connect(config: &NightlyConfig) -> Result<Downloads, CliError> {
    Ok(Downloads::connect(
        &config.api_url,
        &config.repo,
        &config.credentials(),
    )?)
}

/// Format a size in bytes as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// One-line summary of a download.
pub fn print_record(record: &DownloadRecord) {
    println!(
        "{:>10}  {:<48} {:>10} {:>6}",
        style(record.id()).dim(),
        style(record.name()).bold(),
        format_size(record.size()),
        record.download_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(Some(Path::new("/etc/nightly.ini")));
        assert_eq!(path, PathBuf::from("/etc/nightly.ini"));
    }

    #[test]
    fn test_load_config_from_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nightly.ini");
        std::fs::write(
            &path,
            "[github]\nuser = u\npass = p\nrepo = o/r\nextension = e\ndirname = /b\nhashalgo = sha512\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.repo, "o/r");
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn test_missing_config_is_error() {
        let err = load_config(Some(Path::new("/no/such/nightly.ini"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigFile(_)));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
