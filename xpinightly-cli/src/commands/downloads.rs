//! `list`, `delete` and `upload` - direct access to the hosted downloads.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use xpinightly::downloads::DownloadRef;

use super::common::{connect, load_config, print_record};
use crate::error::CliError;

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    /// File to upload
    pub file: PathBuf,

    /// Name to publish under (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    /// MIME type sent with the upload
    #[arg(long)]
    pub mime: Option<String>,

    /// Replace an existing download with the same name
    #[arg(long)]
    pub replace: bool,
}

/// All-digit targets are ids; anything else is a name.
pub fn parse_target(target: &str) -> DownloadRef {
    match target.parse::<u64>() {
        Ok(id) if target.bytes().all(|b| b.is_ascii_digit()) => DownloadRef::Id(id),
        _ => DownloadRef::Name(target.to_string()),
    }
}

pub fn list(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let records = connect(&config)?.list()?;

    if records.is_empty() {
        println!("No downloads in {}", config.repo);
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    println!("{}", style(format!("{} download(s)", records.len())).dim());
    Ok(())
}

pub fn delete(config_path: Option<&Path>, target: &str) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let target = parse_target(target);
    connect(&config)?.delete(target.clone())?;
    tracing::info!(download = %target, "Deleted download");
    println!("Deleted {}", target);
    Ok(())
}

pub fn upload(config_path: Option<&Path>, args: UploadArgs) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let record = connect(&config)?.upload_file(
        &args.file,
        args.name.as_deref(),
        args.mime.as_deref(),
        args.replace,
    )?;
    tracing::info!(record = %record, "Uploaded file");
    print_record(&record);
    println!("{}", record.download_url());
    Ok(())
}
