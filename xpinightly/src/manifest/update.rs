//! The nightly update descriptor (`update-nightly.rdf`).
//!
//! Built from a template in two stages. Before upload the entry is bound to
//! the extension and version and receives the package's target applications.
//! After upload the package digest and download link are appended.

use super::document::{Document, Element};
use super::error::{ManifestError, ManifestResult};
use crate::hash::ContentHash;

const DESCRIPTION: &str = "RDF:Description";
const VERSION: &str = "em:version";
const UPDATE_HASH: &str = "em:updateHash";
const UPDATE_LINK: &str = "em:updateLink";

/// Update descriptor being filled in from a template.
#[derive(Debug, Clone)]
pub struct UpdateDescriptor {
    doc: Document,
    /// Path to the element holding `em:version`, once bound.
    entry: Option<Vec<usize>>,
}

impl UpdateDescriptor {
    pub fn parse(template: &str) -> ManifestResult<Self> {
        Ok(Self {
            doc: Document::parse(template)?,
            entry: None,
        })
    }

    /// Point the first `RDF:Description` at the extension.
    ///
    /// A prefixed `RDF:about` is rewritten in place; otherwise the plain
    /// `about` attribute is set.
    pub fn set_extension_id(&mut self, extension_id: &str) -> ManifestResult<()> {
        let description = self
            .doc
            .find_first_mut(DESCRIPTION)
            .ok_or_else(|| ManifestError::MissingElement(DESCRIPTION.to_string()))?;
        let about = format!("urn:mozilla:extension:{}", extension_id);
        if description.attribute("RDF:about").is_some() {
            description.set_attribute("RDF:about", about);
        } else {
            description.set_attribute("about", about);
        }
        Ok(())
    }

    /// Set the first `em:version` and append the target applications to
    /// the element that holds it.
    pub fn set_version(&mut self, version: &str, targets: &[Element]) -> ManifestResult<()> {
        let path = self
            .doc
            .path_to_first(VERSION)
            .ok_or_else(|| ManifestError::MissingElement(VERSION.to_string()))?;
        if path.len() < 2 {
            return Err(ManifestError::Detached(VERSION.to_string()));
        }
        let parent_path = path[..path.len() - 1].to_vec();

        if let Some(element) = self.doc.element_at_mut(&path) {
            element.set_text(version);
        }
        let parent = self
            .doc
            .element_at_mut(&parent_path)
            .ok_or_else(|| ManifestError::Detached(VERSION.to_string()))?;
        for target in targets {
            parent.append(target.clone());
        }

        self.entry = Some(parent_path);
        Ok(())
    }

    /// Append `em:updateHash` and `em:updateLink` to the version entry.
    pub fn set_update_info(&mut self, hash: &ContentHash, link: &str) -> ManifestResult<()> {
        let path = match &self.entry {
            Some(path) => path.clone(),
            None => {
                let mut path = self
                    .doc
                    .path_to_first(VERSION)
                    .ok_or_else(|| ManifestError::MissingElement(VERSION.to_string()))?;
                path.pop();
                path
            }
        };
        let entry = self
            .doc
            .element_at_mut(&path)
            .ok_or_else(|| ManifestError::Detached(VERSION.to_string()))?;
        entry.append(Element::with_text(UPDATE_HASH, hash.to_string()));
        entry.append(Element::with_text(UPDATE_LINK, link));
        Ok(())
    }

    pub fn to_xml(&self) -> ManifestResult<String> {
        self.doc.to_xml()
    }
}
