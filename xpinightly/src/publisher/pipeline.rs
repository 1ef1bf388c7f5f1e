//! Nightly publish workflow.
//!
//! 1. Build - package the build directory and bind the update descriptor
//! 2. Upload - push the `.xpi`, replacing a same-named download
//! 3. Prune - delete nightlies older than the retention window
//! 4. Descriptor - add hash and link, then write or upload it
//!
//! The descriptor needs the download link, so it can only be finished once
//! the package upload has returned its record.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::{debug, info, warn};

use super::{PublishError, PublishResult};
use crate::config::{NightlyConfig, UPDATE_TEMPLATE_FILENAME};
use crate::downloads::{DownloadRecord, Downloads};
use crate::hash::ContentHash;
use crate::manifest::{InstallManifest, UpdateDescriptor};
use crate::package::{
    artifact_name, collect_entries, nightly_date, nightly_version, read_install_manifest,
    write_xpi,
};

/// MIME type packages are uploaded with.
pub const XPI_MIME: &str = "application/x-xpinstall";

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Delete expired nightlies after uploading.
    pub prune: bool,
    /// Write the package here and stop before touching the network.
    /// A directory receives the artifact under its own name.
    pub dry_run_output: Option<PathBuf>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            prune: true,
            dry_run_output: None,
        }
    }
}

/// A packaged nightly, ready to upload.
#[derive(Debug, Clone)]
pub struct NightlyBuild {
    pub version: String,
    pub artifact_name: String,
    /// Zipped package bytes.
    pub package: Vec<u8>,
    pub hash: ContentHash,
    /// Descriptor bound to this build, still missing hash and link.
    pub descriptor: UpdateDescriptor,
}

/// Where the update descriptor ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorDestination {
    Written(PathBuf),
    Uploaded(DownloadRecord),
}

impl fmt::Display for DescriptorDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorDestination::Written(path) => write!(f, "{}", path.display()),
            DescriptorDestination::Uploaded(record) => write!(f, "{}", record.download_url()),
        }
    }
}

/// Outcome of [`NightlyPublisher::run`].
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub artifact_name: String,
    pub version: String,
    pub hash: ContentHash,
    /// Uploaded package record; `None` for dry runs.
    pub record: Option<DownloadRecord>,
    /// Names of pruned downloads.
    pub pruned: Vec<String>,
    pub descriptor: Option<DescriptorDestination>,
    /// Local package path written by a dry run.
    pub package_path: Option<PathBuf>,
}

/// Builds and publishes nightlies for one configured extension.
#[derive(Debug)]
pub struct NightlyPublisher {
    config: NightlyConfig,
    downloads: Downloads,
}

impl NightlyPublisher {
    /// Publisher talking to the configured API over reqwest.
    pub fn new(config: NightlyConfig) -> PublishResult<Self> {
        let downloads = Downloads::connect(&config.api_url, &config.repo, &config.credentials())?;
        Ok(Self::with_downloads(config, downloads))
    }

    pub fn with_downloads(config: NightlyConfig, downloads: Downloads) -> Self {
        Self { config, downloads }
    }

    pub fn config(&self) -> &NightlyConfig {
        &self.config
    }

    pub fn downloads(&self) -> &Downloads {
        &self.downloads
    }

    /// Package the build directory as the nightly for `today`.
    pub fn build(&self, today: NaiveDate) -> PublishResult<NightlyBuild> {
        let template_path = self.config.update_template_path();
        let template =
            fs::read_to_string(&template_path).map_err(|source| PublishError::ReadFailed {
                path: template_path.clone(),
                source,
            })?;
        let mut descriptor = UpdateDescriptor::parse(&template)?;

        let build_dir = &self.config.dirname;
        let entries = collect_entries(build_dir)?;
        let mut manifest = InstallManifest::parse(&read_install_manifest(build_dir)?)?;

        let extension_id = manifest.extension_id()?;
        let version = nightly_version(&manifest.version()?, today);
        manifest.set_version(&version)?;

        descriptor.set_extension_id(&extension_id)?;
        descriptor.set_version(&version, &manifest.target_applications())?;

        let stripped = manifest.strip_update_keys();
        let rewritten = manifest.set_update_url(&self.config.update_url());
        debug!(stripped, rewritten, "Rewrote install manifest update entries");

        let package = write_xpi(&entries, manifest.to_xml()?.as_bytes())?;
        let hash = ContentHash::compute(self.config.hash_algorithm, &package);
        let artifact_name = artifact_name(&self.config.extension, &version);

        info!(
            artifact = %artifact_name,
            extension_id = %extension_id,
            files = entries.len() + 1,
            bytes = package.len(),
            "Built nightly package"
        );

        Ok(NightlyBuild {
            version,
            artifact_name,
            package,
            hash,
            descriptor,
        })
    }

    /// Delete nightlies dated on or before `today - prune_days`.
    ///
    /// Names without a nightly date stamp and the download named `keep` are
    /// never touched. A failed delete is logged and skipped, so the returned
    /// names are exactly the downloads that are gone.
    pub fn prune(&self, today: NaiveDate, keep: &str) -> PublishResult<Vec<String>> {
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(self.config.prune_days)))
            .unwrap_or(NaiveDate::MIN);

        let mut pruned = Vec::new();
        for record in self.downloads.list()? {
            if record.name() == keep {
                continue;
            }
            let Some(date) = nightly_date(record.name()) else {
                continue;
            };
            if date > cutoff {
                continue;
            }
            if let Err(e) = record.delete(&self.downloads) {
                warn!(
                    name = record.name(),
                    id = record.id(),
                    error = %e,
                    "Failed to prune expired nightly"
                );
                continue;
            }
            info!(name = record.name(), id = record.id(), %date, "Pruned expired nightly");
            pruned.push(record.name().to_string());
        }
        Ok(pruned)
    }

    /// Finish the descriptor for an uploaded package and publish it.
    ///
    /// With an alternate update location the file is written locally;
    /// otherwise it replaces `update-nightly.rdf` in the downloads.
    pub fn publish_descriptor(
        &self,
        mut descriptor: UpdateDescriptor,
        hash: &ContentHash,
        record: &DownloadRecord,
    ) -> PublishResult<DescriptorDestination> {
        descriptor.set_update_info(hash, record.download_url())?;
        let xml = descriptor.to_xml()?;

        match &self.config.alternate_update {
            Some(alternate) => {
                write_file(&alternate.path, xml.as_bytes())?;
                info!(path = %alternate.path.display(), "Wrote update descriptor");
                Ok(DescriptorDestination::Written(alternate.path.clone()))
            }
            None => {
                let uploaded =
                    self.downloads
                        .upload_bytes(xml.as_bytes(), UPDATE_TEMPLATE_FILENAME, None, true)?;
                info!(url = uploaded.download_url(), "Uploaded update descriptor");
                Ok(DescriptorDestination::Uploaded(uploaded))
            }
        }
    }

    /// Run the full workflow for `today`.
    ///
    /// Prune failures are logged and do not fail the run; every other step
    /// stops it.
    pub fn run(&self, today: NaiveDate, options: &PublishOptions) -> PublishResult<PublishReport> {
        let build = self.build(today)?;

        if let Some(output) = &options.dry_run_output {
            let path = if output.is_dir() {
                output.join(&build.artifact_name)
            } else {
                output.clone()
            };
            write_file(&path, &build.package)?;
            info!(path = %path.display(), "Dry run: wrote package, skipping upload");
            return Ok(PublishReport {
                artifact_name: build.artifact_name,
                version: build.version,
                hash: build.hash,
                record: None,
                pruned: Vec::new(),
                descriptor: None,
                package_path: Some(path),
            });
        }

        let record = self.downloads.upload_bytes(
            &build.package,
            &build.artifact_name,
            Some(XPI_MIME),
            true,
        )?;
        info!(record = %record, url = record.download_url(), "Uploaded nightly package");

        let pruned = if options.prune {
            match self.prune(today, record.name()) {
                Ok(pruned) => pruned,
                Err(e) => {
                    warn!(error = %e, "Pruning old nightlies failed, continuing");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let destination = self.publish_descriptor(build.descriptor, &build.hash, &record)?;

        Ok(PublishReport {
            artifact_name: build.artifact_name,
            version: build.version,
            hash: build.hash,
            record: Some(record),
            pruned,
            descriptor: Some(destination),
            package_path: None,
        })
    }
}

fn write_file(path: &Path, data: &[u8]) -> PublishResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PublishError::WriteFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, data).map_err(|source| PublishError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
