//! Client for a hosted download service.
//!
//! Artifacts are published in two phases:
//!
//! ```text
//! Downloads::upload_bytes
//!     │
//!     ├── 1. POST {api}/repos/{repo}/downloads   (Basic auth, JSON)
//!     │        └── 201 → UploadTicket (record + signed storage form)
//!     │        └── 422 already_exists → delete by name, retry once (replace only)
//!     │
//!     └── 2. POST {ticket.s3_url}                (no auth, multipart/form-data)
//!              └── 201 → DownloadRecord from phase 1
//! ```
//!
//! Listing and deletion go through the same authenticated [`ApiClient`].
//! All calls block; nothing here retries on its own or logs.
//!
//! # Example
//!
//! ```ignore
//! use xpinightly::downloads::{Credentials, Downloads};
//!
//! let downloads = Downloads::new("owner/extension", &Credentials::new("user", "pass"))?;
//! let record = downloads.upload_bytes(b"hello", "greeting.txt", Some("text/plain"), true)?;
//! println!("{} -> {}", record, record.download_url());
//! ```

mod client;
mod error;
mod multipart;
mod record;
mod repository;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiClient, ApiRequest, Credentials, RequestBody};
pub use error::{DownloadsError, DownloadsResult, ALREADY_EXISTS_CODE};
pub use multipart::{EncodedForm, FilePart, MultipartEncoder};
pub use record::DownloadRecord;
pub use repository::{DownloadRef, Downloads, DEFAULT_API_BASE};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, DEFAULT_TIMEOUT_SECS,
};
