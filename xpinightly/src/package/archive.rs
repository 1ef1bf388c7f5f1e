//! XPI (zip) construction from a build directory.
//!
//! Every regular file below the build directory is added under its relative
//! `/`-separated path. PNG images are stored as-is since deflating them gains
//! nothing. Files named `install.rdf` are skipped during the walk; the
//! rewritten install manifest is appended last instead.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the install manifest at the root of a package.
pub const INSTALL_MANIFEST: &str = "install.rdf";

/// Result type for packaging operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Errors that can occur while packaging a build.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("build directory does not exist: {}", .0.display())]
    MissingBuildDir(PathBuf),

    #[error("no install.rdf in {}", .0.display())]
    MissingManifest(PathBuf),

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive entry {entry}: {reason}")]
    Zip { entry: String, reason: String },
}

/// How an entry is stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Stored,
    Deflated,
}

impl Compression {
    /// Compression chosen for a given archive path.
    pub fn for_path(archive_path: &str) -> Self {
        if archive_path.to_ascii_lowercase().ends_with(".png") {
            Compression::Stored
        } else {
            Compression::Deflated
        }
    }

    fn method(self) -> CompressionMethod {
        match self {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// One file to be added to the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Path inside the archive, `/`-separated.
    pub archive_path: String,
    /// File on disk.
    pub source: PathBuf,
    pub compression: Compression,
}

/// Enumerate the files of `build_dir` in a stable (name-sorted) order.
pub fn collect_entries(build_dir: &Path) -> PackageResult<Vec<PackageEntry>> {
    if !build_dir.is_dir() {
        return Err(PackageError::MissingBuildDir(build_dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(build_dir)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| PackageError::Walk {
            path: build_dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || entry.file_name() == INSTALL_MANIFEST {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(build_dir)
            .unwrap_or_else(|_| entry.path());
        let archive_path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push(PackageEntry {
            compression: Compression::for_path(&archive_path),
            archive_path,
            source: entry.path().to_path_buf(),
        });
    }
    Ok(entries)
}

/// Read the install manifest at the root of `build_dir`.
pub fn read_install_manifest(build_dir: &Path) -> PackageResult<String> {
    let path = build_dir.join(INSTALL_MANIFEST);
    if !path.is_file() {
        return Err(PackageError::MissingManifest(build_dir.to_path_buf()));
    }
    fs::read_to_string(&path).map_err(|source| PackageError::Read { path, source })
}

/// Write `entries` followed by `install_manifest` into an in-memory zip.
pub fn write_xpi(entries: &[PackageEntry], install_manifest: &[u8]) -> PackageResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        let data = fs::read(&entry.source).map_err(|source| PackageError::Read {
            path: entry.source.clone(),
            source,
        })?;
        add_entry(&mut zip, &entry.archive_path, entry.compression, &data)?;
    }
    add_entry(
        &mut zip,
        INSTALL_MANIFEST,
        Compression::Deflated,
        install_manifest,
    )?;

    let cursor = zip.finish().map_err(|e| PackageError::Zip {
        entry: "<central directory>".to_string(),
        reason: e.to_string(),
    })?;
    Ok(cursor.into_inner())
}

fn add_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    compression: Compression,
    data: &[u8],
) -> PackageResult<()> {
    let options = FileOptions::default().compression_method(compression.method());
    let zip_err = |reason: String| PackageError::Zip {
        entry: name.to_string(),
        reason,
    };

    zip.start_file(name, options)
        .map_err(|e| zip_err(e.to_string()))?;
    zip.write_all(data).map_err(|e| zip_err(e.to_string()))
}
