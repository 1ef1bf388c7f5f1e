//! CLI error type.

use thiserror::Error;
use xpinightly::config::ConfigError;
use xpinightly::downloads::DownloadsError;
use xpinightly::logging::LoggingError;
use xpinightly::publisher::PublishError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Downloads(#[from] DownloadsError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
