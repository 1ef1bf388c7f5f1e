//! `publish` - build, upload and announce tonight's package.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use xpinightly::config::{AlternateUpdate, NightlyConfig};
use xpinightly::publisher::{NightlyPublisher, PublishOptions, PublishReport};

use super::common::load_config;
use crate::error::CliError;

#[derive(Debug, Clone, Args)]
pub struct PublishArgs {
    /// Build directory to package (overrides github.dirname)
    #[arg(long, value_name = "PATH")]
    pub dirname: Option<PathBuf>,

    /// Write the update descriptor here instead of uploading it
    #[arg(long, value_name = "PATH")]
    pub update_path: Option<PathBuf>,

    /// Keep expired nightlies
    #[arg(long)]
    pub no_prune: bool,

    /// Write the package to this file or directory and stop
    #[arg(long, value_name = "OUT")]
    pub dry_run: Option<PathBuf>,
}

/// Apply command-line overrides on top of the config file.
pub fn apply_overrides(mut config: NightlyConfig, args: &PublishArgs) -> NightlyConfig {
    if let Some(dirname) = &args.dirname {
        config.dirname = dirname.clone();
    }
    if let Some(path) = &args.update_path {
        let url = config.update_url();
        config.alternate_update = Some(AlternateUpdate {
            url,
            path: path.clone(),
        });
    }
    config
}

pub fn run(config_path: Option<&Path>, args: PublishArgs) -> Result<(), CliError> {
    let config = apply_overrides(load_config(config_path)?, &args);
    let options = PublishOptions {
        prune: !args.no_prune,
        dry_run_output: args.dry_run.clone(),
    };

    let today = chrono::Local::now().date_naive();
    let publisher = NightlyPublisher::new(config)?;
    let report = publisher.run(today, &options)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &PublishReport) {
    println!("{}", style(&report.artifact_name).bold());
    println!("  Version: {}", report.version);
    println!("  Hash:    {}", report.hash);

    if let Some(path) = &report.package_path {
        println!("  Written: {}", path.display());
        println!("{}", style("Dry run, nothing uploaded.").yellow());
        return;
    }
    if let Some(record) = &report.record {
        println!("  Link:    {}", record.download_url());
    }
    for name in &report.pruned {
        println!("  Pruned:  {}", style(name).dim());
    }
    if let Some(descriptor) = &report.descriptor {
        println!("  Update:  {}", descriptor);
    }
    println!("{}", style("Published.").green());
}
