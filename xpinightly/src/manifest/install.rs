//! Edits applied to a build's `install.rdf` before packaging.

use super::document::{Document, Element};
use super::error::{ManifestError, ManifestResult};

const ID: &str = "em:id";
const VERSION: &str = "em:version";
const TARGET_APPLICATION: &str = "em:targetApplication";
const UPDATE_KEY: &str = "em:updateKey";
const UPDATE_URL: &str = "em:updateURL";

/// A parsed install manifest.
#[derive(Debug, Clone)]
pub struct InstallManifest {
    doc: Document,
}

impl InstallManifest {
    pub fn parse(text: &str) -> ManifestResult<Self> {
        Ok(Self {
            doc: Document::parse(text)?,
        })
    }

    fn first_text(&self, name: &str) -> ManifestResult<String> {
        self.doc
            .find_first(name)
            .map(|e| e.text().trim().to_string())
            .ok_or_else(|| ManifestError::MissingElement(name.to_string()))
    }

    /// Extension id (the first `em:id` in document order).
    pub fn extension_id(&self) -> ManifestResult<String> {
        self.first_text(ID)
    }

    /// Declared version (the first `em:version`).
    pub fn version(&self) -> ManifestResult<String> {
        self.first_text(VERSION)
    }

    /// Replace the first `em:version`.
    pub fn set_version(&mut self, version: &str) -> ManifestResult<()> {
        self.doc
            .find_first_mut(VERSION)
            .ok_or_else(|| ManifestError::MissingElement(VERSION.to_string()))?
            .set_text(version);
        Ok(())
    }

    /// Copies of every `em:targetApplication` block.
    pub fn target_applications(&self) -> Vec<Element> {
        self.doc
            .find_all(TARGET_APPLICATION)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop signing keys; nightly descriptors are served unsigned.
    pub fn strip_update_keys(&mut self) -> usize {
        self.doc.remove_all(UPDATE_KEY)
    }

    /// Point every `em:updateURL` at `url`. Returns how many were rewritten.
    pub fn set_update_url(&mut self, url: &str) -> usize {
        self.doc.for_each_mut(UPDATE_URL, |e| e.set_text(url))
    }

    pub fn to_xml(&self) -> ManifestResult<String> {
        self.doc.to_xml()
    }
}
