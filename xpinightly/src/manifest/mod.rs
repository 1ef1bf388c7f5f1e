//! RDF manifest editing.
//!
//! [`InstallManifest`] rewrites the packaged `install.rdf`;
//! [`UpdateDescriptor`] fills in the `update-nightly.rdf` template that
//! browsers poll for new builds.

mod document;
mod error;
mod install;
mod update;

pub use document::{Document, Element, Node};
pub use error::{ManifestError, ManifestResult};
pub use install::InstallManifest;
pub use update::UpdateDescriptor;
