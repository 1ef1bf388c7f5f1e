//! Download records and upload tickets as returned by the hosting API.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DownloadsResult;
use super::repository::Downloads;

/// Server-side metadata for one hosted artifact.
///
/// A record is a snapshot taken when it was listed or created; nothing here
/// is refreshed or mutable on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    id: u64,
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    download_count: u64,
    #[serde(rename = "url")]
    api_url: String,
    #[serde(rename = "html_url")]
    download_url: String,
}

impl DownloadRecord {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn download_count(&self) -> u64 {
        self.download_count
    }

    /// API URL of this record.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Public URL the artifact is served from.
    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    /// Delete this record through the repository it came from.
    pub fn delete(&self, owner: &Downloads) -> DownloadsResult<()> {
        owner.delete_id(self.id)
    }
}

impl fmt::Display for DownloadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Phase-1 answer to an upload: the new record plus the pre-signed
/// storage form values needed for phase 2.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadTicket {
    #[serde(flatten)]
    pub record: DownloadRecord,
    pub s3_url: String,
    pub path: String,
    pub acl: String,
    pub accesskeyid: String,
    pub policy: String,
    pub signature: String,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_list_entry() {
        let json = r#"{
            "url": "https://api.test/repos/o/r/downloads/3",
            "html_url": "https://cdn.test/downloads/o/r/a.xpi",
            "id": 3,
            "name": "a.xpi",
            "description": null,
            "size": 1024,
            "download_count": 12,
            "content_type": "application/x-xpinstall"
        }"#;
        let record: DownloadRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id(), 3);
        assert_eq!(record.name(), "a.xpi");
        assert_eq!(record.size(), 1024);
        assert_eq!(record.description(), None);
        assert_eq!(record.download_count(), 12);
        assert_eq!(record.api_url(), "https://api.test/repos/o/r/downloads/3");
        assert_eq!(record.download_url(), "https://cdn.test/downloads/o/r/a.xpi");
        assert_eq!(record.to_string(), "a.xpi (3)");
    }

    #[test]
    fn test_optional_counters_default() {
        let json = r#"{"id": 1, "name": "b", "url": "u", "html_url": "h"}"#;
        let record: DownloadRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.size(), 0);
        assert_eq!(record.download_count(), 0);
    }

    #[test]
    fn test_ticket_carries_record_and_form_values() {
        let json = r#"{
            "url": "https://api.test/repos/o/r/downloads/9",
            "html_url": "https://cdn.test/downloads/o/r/n.xpi",
            "id": 9,
            "name": "n.xpi",
            "size": 5,
            "download_count": 0,
            "policy": "cG9saWN5",
            "signature": "c2ln",
            "bucket": "downloads",
            "accesskeyid": "AKIA",
            "path": "downloads/o/r/n.xpi",
            "acl": "public-read",
            "expirationdate": "2026-10-20T00:00:00.000Z",
            "prefix": "downloads/o/r/",
            "mime_type": "application/x-xpinstall",
            "redirect": false,
            "s3_url": "https://storage.test/"
        }"#;
        let ticket: UploadTicket = serde_json::from_str(json).unwrap();

        assert_eq!(ticket.record.id(), 9);
        assert_eq!(ticket.record.name(), "n.xpi");
        assert_eq!(ticket.s3_url, "https://storage.test/");
        assert_eq!(ticket.path, "downloads/o/r/n.xpi");
        assert_eq!(ticket.mime_type, "application/x-xpinstall");
    }

    #[test]
    fn test_ticket_missing_signature_rejected() {
        let json = r#"{"id": 1, "name": "b", "url": "u", "html_url": "h", "s3_url": "s"}"#;
        assert!(serde_json::from_str::<UploadTicket>(json).is_err());
    }
}
