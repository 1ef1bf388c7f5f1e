//! Download resource operations for one repository.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::client::{ApiClient, ApiRequest, Credentials};
use super::error::{DownloadsError, DownloadsResult};
use super::multipart::{FilePart, MultipartEncoder};
use super::record::{DownloadRecord, UploadTicket};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

/// Default hosting API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Identifies a download either by server id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadRef {
    Id(u64),
    Name(String),
}

impl From<u64> for DownloadRef {
    fn from(id: u64) -> Self {
        DownloadRef::Id(id)
    }
}

impl From<&str> for DownloadRef {
    fn from(name: &str) -> Self {
        DownloadRef::Name(name.to_string())
    }
}

impl From<String> for DownloadRef {
    fn from(name: String) -> Self {
        DownloadRef::Name(name)
    }
}

impl fmt::Display for DownloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadRef::Id(id) => write!(f, "#{}", id),
            DownloadRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

#[derive(Serialize)]
struct CreateDownload<'a> {
    name: &'a str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
}

/// Client for the downloads collection of one `owner/repo`.
///
/// Holds no cache: every call reflects the server state at that moment.
/// Name-based operations are not atomic with respect to other clients.
#[derive(Debug)]
pub struct Downloads {
    repo: String,
    client: ApiClient,
}

impl Downloads {
    /// Client for `repo` against the default API using reqwest.
    pub fn new(repo: impl Into<String>, credentials: &Credentials) -> DownloadsResult<Self> {
        Self::connect(DEFAULT_API_BASE, repo, credentials)
    }

    /// Client for `repo` under `api_base` using reqwest.
    pub fn connect(
        api_base: &str,
        repo: impl Into<String>,
        credentials: &Credentials,
    ) -> DownloadsResult<Self> {
        let transport = ReqwestTransport::new().map_err(|reason| DownloadsError::Transport {
            url: api_base.to_string(),
            reason,
        })?;
        Ok(Self::with_transport(
            api_base,
            repo,
            credentials,
            Box::new(transport),
        ))
    }

    /// Client for `repo` under `api_base`, sending through `transport`.
    pub fn with_transport(
        api_base: &str,
        repo: impl Into<String>,
        credentials: &Credentials,
        transport: Box<dyn HttpTransport>,
    ) -> Self {
        let repo = repo.into();
        let base_url = format!(
            "{}/repos/{}/downloads",
            api_base.trim_end_matches('/'),
            repo
        );
        Self {
            client: ApiClient::new(base_url, credentials, transport),
            repo,
        }
    }

    /// The `owner/repo` this client targets.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Collection endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.client.base_url()
    }

    /// All downloads, in server order.
    pub fn list(&self) -> DownloadsResult<Vec<DownloadRecord>> {
        let response = self.client.request(ApiRequest::new())?;
        self.decode(&response, self.endpoint())
    }

    /// Fetch one download by id.
    pub fn get_by_id(&self, id: u64) -> DownloadsResult<DownloadRecord> {
        let path = format!("/{}", id);
        match self.client.request(ApiRequest::new().path(&path)) {
            Ok(response) => self.decode(&response, &format!("{}{}", self.endpoint(), path)),
            Err(err) if err.status() == Some(404) => {
                Err(DownloadsError::NotFound(format!("download #{}", id)))
            }
            Err(err) => Err(err),
        }
    }

    /// First download whose name equals `name`. Scans the full listing.
    pub fn get_by_name(&self, name: &str) -> DownloadsResult<DownloadRecord> {
        self.list()?
            .into_iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| DownloadsError::NotFound(format!("no download named '{}'", name)))
    }

    /// Delete by id or by name. Names are resolved through [`get_by_name`].
    ///
    /// [`get_by_name`]: Downloads::get_by_name
    pub fn delete(&self, target: impl Into<DownloadRef>) -> DownloadsResult<()> {
        match target.into() {
            DownloadRef::Id(id) => self.delete_id(id),
            DownloadRef::Name(name) => self.delete_name(&name),
        }
    }

    /// Delete by id. A missing id surfaces the server's error.
    pub fn delete_id(&self, id: u64) -> DownloadsResult<()> {
        self.client.request(
            ApiRequest::new()
                .path(format!("/{}", id))
                .method(Method::DELETE),
        )?;
        Ok(())
    }

    /// Delete the download named `name`.
    pub fn delete_name(&self, name: &str) -> DownloadsResult<()> {
        let record = self.get_by_name(name)?;
        self.delete_id(record.id())
    }

    /// Upload a file from disk. `name` defaults to the path's file name.
    pub fn upload_file(
        &self,
        path: &Path,
        name: Option<&str>,
        mime: Option<&str>,
        replace: bool,
    ) -> DownloadsResult<DownloadRecord> {
        let data = std::fs::read(path).map_err(|source| DownloadsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let default_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        self.upload_bytes(&data, name.unwrap_or(default_name), mime, replace)
    }

    /// Upload `data` as `name` using the two-phase protocol.
    ///
    /// With `replace`, a name conflict deletes the existing download and the
    /// upload is attempted once more without `replace`; a second conflict is
    /// returned to the caller. Phase-2 failures are returned unchanged and
    /// leave the phase-1 record in place.
    pub fn upload_bytes(
        &self,
        data: &[u8],
        name: &str,
        mime: Option<&str>,
        replace: bool,
    ) -> DownloadsResult<DownloadRecord> {
        if name.is_empty() {
            return Err(DownloadsError::Configuration(
                "must provide a file name".to_string(),
            ));
        }

        let mut replace = replace;
        let ticket = loop {
            match self.create(name, data.len(), mime) {
                Ok(ticket) => break ticket,
                Err(err) if replace && err.is_already_exists() => {
                    self.delete_name(name)?;
                    replace = false;
                }
                Err(err) => return Err(err),
            }
        };

        self.push_to_storage(&ticket, data)?;
        Ok(ticket.record)
    }

    /// Phase 1: register the download and obtain the storage ticket.
    fn create(&self, name: &str, size: usize, mime: Option<&str>) -> DownloadsResult<UploadTicket> {
        let body = CreateDownload {
            name,
            size,
            content_type: mime,
        };
        let request = ApiRequest::new()
            .json(&body)
            .map_err(|source| DownloadsError::Json {
                url: self.endpoint().to_string(),
                source,
            })?;
        let response = self.client.request(request)?;
        self.decode(&response, self.endpoint())
    }

    /// Phase 2: post the bytes to the pre-signed storage endpoint.
    fn push_to_storage(&self, ticket: &UploadTicket, data: &[u8]) -> DownloadsResult<()> {
        let mut encoder = MultipartEncoder::new();
        encoder
            .add_field("key", &ticket.path)
            .add_field("acl", &ticket.acl)
            .add_field("success_action_status", 201)
            .add_field("Filename", ticket.record.name())
            .add_field("AWSAccessKeyId", &ticket.accesskeyid)
            .add_field("Policy", &ticket.policy)
            .add_field("Signature", &ticket.signature)
            .add_field("Content-Type", &ticket.mime_type);
        let form = encoder.finish(FilePart {
            field: "file",
            file_name: ticket.record.name(),
            mime: &ticket.mime_type,
            data,
        });

        self.client.send_unauthenticated(HttpRequest {
            method: Method::POST,
            url: ticket.s3_url.clone(),
            headers: vec![("Content-Type".to_string(), form.content_type())],
            body: Some(form.into_body()),
        })?;
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, response: &HttpResponse, url: &str) -> DownloadsResult<T> {
        serde_json::from_slice(&response.body).map_err(|source| DownloadsError::Json {
            url: url.to_string(),
            source,
        })
    }
}
