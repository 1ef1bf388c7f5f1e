//! Nightly package construction.
//!
//! - `archive`: walks the build directory and writes the `.xpi` zip
//! - `naming`: nightly version stamps and artifact names

mod archive;
mod naming;

pub use archive::{
    collect_entries, read_install_manifest, write_xpi, Compression, PackageEntry, PackageError,
    PackageResult, INSTALL_MANIFEST,
};
pub use naming::{artifact_name, nightly_date, nightly_version};
