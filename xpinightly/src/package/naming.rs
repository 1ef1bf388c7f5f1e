//! Nightly version strings and artifact names.
//!
//! A nightly build appends the build date to the manifest version
//! (`1.4.2` built on 2026-10-19 becomes `1.4.2.20261019`) and is published as
//! `<extension>-nightly-<version>.xpi`. Pruning reads the date back out of
//! names in that shape.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

/// Date stamp format appended to versions.
const DATE_FORMAT: &str = "%Y%m%d";

/// Matches the build date in a nightly artifact name.
fn nightly_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"nightly.*\.(\d{8})").expect("valid nightly date regex"))
}

/// `YYYYMMDD` stamp for a date.
fn date_stamp(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Manifest version with the build date appended.
pub fn nightly_version(base_version: &str, date: NaiveDate) -> String {
    format!("{}.{}", base_version.trim(), date_stamp(date))
}

/// File name for a nightly package.
pub fn artifact_name(extension: &str, version: &str) -> String {
    format!("{}-nightly-{}.xpi", extension, version)
}

/// Build date embedded in a nightly artifact name, if any.
pub fn nightly_date(name: &str) -> Option<NaiveDate> {
    let captures = nightly_date_pattern().captures(name)?;
    NaiveDate::parse_from_str(captures.get(1)?.as_str(), DATE_FORMAT).ok()
}
