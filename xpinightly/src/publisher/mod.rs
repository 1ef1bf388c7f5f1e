//! Nightly build publishing.
//!
//! [`NightlyPublisher`] packages a build directory, uploads it through
//! [`crate::downloads`], prunes expired nightlies and publishes the update
//! descriptor browsers poll.

mod error;
mod pipeline;

pub use error::{PublishError, PublishResult};
pub use pipeline::{
    DescriptorDestination, NightlyBuild, NightlyPublisher, PublishOptions, PublishReport,
    XPI_MIME,
};
