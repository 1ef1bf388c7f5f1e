//! Nightly XPI packaging and publishing.
//!
//! Packages an extension build directory into a date-stamped `.xpi`, uploads
//! it to a hosted downloads service and publishes the matching update
//! descriptor.
//!
//! - [`downloads`] - client for the hosted downloads API (two-phase upload)
//! - [`package`] - build directory walking, XPI writing, nightly naming
//! - [`manifest`] - `install.rdf` and `update-nightly.rdf` editing
//! - [`publisher`] - the build / upload / prune / descriptor workflow
//! - [`config`] - `config.ini` loading

pub mod config;
pub mod downloads;
pub mod hash;
pub mod logging;
pub mod manifest;
pub mod package;
pub mod publisher;
