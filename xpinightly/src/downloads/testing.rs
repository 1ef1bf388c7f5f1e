//! In-memory hosting API and storage endpoint for tests.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use super::client::Credentials;
use super::repository::Downloads;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

pub const API_BASE: &str = "https://api.test";
pub const STORAGE_URL: &str = "https://storage.test/bucket/";

/// Storage form fields in the order the signed policy expects them.
const EXPECTED_FIELDS: [&str; 9] = [
    "key",
    "acl",
    "success_action_status",
    "Filename",
    "AWSAccessKeyId",
    "Policy",
    "Signature",
    "Content-Type",
    "file",
];

/// One part recovered from a multipart body.
#[derive(Debug, Clone)]
pub struct ParsedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn quoted_param(header: &str, param: &str) -> Option<String> {
    let marker = format!("{}=\"", param);
    let start = header.find(&format!("; {}", marker))? + 2 + marker.len();
    let end = header[start..].find('"')? + start;
    Some(header[start..end].to_string())
}

/// Minimal multipart/form-data parser.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Vec<ParsedPart> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(pos) = find(body, &delimiter, from) {
        if pos == 0 || body[..pos].ends_with(b"\r\n") {
            positions.push(pos);
        }
        from = pos + delimiter.len();
    }

    let mut parts = Vec::new();
    for window in positions.windows(2) {
        let start = window[0] + delimiter.len() + 2;
        let end = window[1] - 2;
        let segment = &body[start..end];
        let Some(header_end) = find(segment, b"\r\n\r\n", 0) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&segment[..header_end]).into_owned();
        let data = segment[header_end + 4..].to_vec();

        let mut name = String::new();
        let mut file_name = None;
        let mut content_type = None;
        for line in headers.split("\r\n") {
            if let Some(value) = line.strip_prefix("Content-Disposition: ") {
                name = quoted_param(value, "name").unwrap_or_default();
                file_name = quoted_param(value, "filename");
            } else if let Some(value) = line.strip_prefix("Content-Type: ") {
                content_type = Some(value.to_string());
            }
        }
        parts.push(ParsedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    parts
}

/// A request as seen by the fake server.
#[derive(Debug, Clone)]
pub struct LoggedRequest {
    pub method: Method,
    pub url: String,
    pub authorized: bool,
}

#[derive(Debug, Clone)]
struct StoredDownload {
    id: u64,
    owner: String,
    repo: String,
    name: String,
    size: u64,
    content_type: Option<String>,
    key: String,
    content: Option<Vec<u8>>,
}

impl StoredDownload {
    fn to_json(&self) -> Value {
        json!({
            "url": format!("{}/repos/{}/{}/downloads/{}", API_BASE, self.owner, self.repo, self.id),
            "html_url": format!("https://cdn.test/downloads/{}/{}/{}", self.owner, self.repo, self.name),
            "id": self.id,
            "name": self.name,
            "description": null,
            "size": self.size,
            "download_count": 0,
            "content_type": self.content_type,
        })
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    downloads: Vec<StoredDownload>,
    log: Vec<LoggedRequest>,
    create_bodies: Vec<Value>,
    deletes: usize,
    always_conflict: bool,
    storage_failure: bool,
    failing_deletes: Vec<String>,
}

/// Shared fake of the hosting API and its storage endpoint.
#[derive(Debug, Clone, Default)]
pub struct FakeHosting {
    state: Arc<Mutex<State>>,
}

fn respond(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&body).unwrap()
        },
    }
}

impl FakeHosting {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().next_id = 100;
        fake
    }

    /// A repository client wired to this fake.
    pub fn downloads(&self, repo: &str) -> Downloads {
        Downloads::with_transport(
            API_BASE,
            repo,
            &Credentials::new("tester", "secret"),
            Box::new(self.clone()),
        )
    }

    /// Insert a fully uploaded download directly, bypassing the protocol.
    pub fn seed(&self, repo: &str, name: &str, content: &[u8]) -> u64 {
        let (owner, repo) = repo.split_once('/').unwrap();
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.downloads.push(StoredDownload {
            id,
            owner: owner.to_string(),
            repo: repo.to_string(),
            name: name.to_string(),
            size: content.len() as u64,
            content_type: None,
            key: format!("downloads/{}/{}/{}", owner, repo, name),
            content: Some(content.to_vec()),
        });
        id
    }

    pub fn set_always_conflict(&self, value: bool) {
        self.state.lock().unwrap().always_conflict = value;
    }

    pub fn set_storage_failure(&self, value: bool) {
        self.state.lock().unwrap().storage_failure = value;
    }

    /// Answer DELETE requests for the download named `name` with a 500.
    pub fn fail_delete_of(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .push(name.to_string());
    }

    /// Uploaded bytes of the live download named `name`.
    pub fn content_of(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .downloads
            .iter()
            .find(|d| d.name == name)
            .and_then(|d| d.content.clone())
    }

    /// Names of all live downloads, in creation order.
    pub fn names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.downloads.iter().map(|d| d.name.clone()).collect()
    }

    pub fn delete_count(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    pub fn create_attempts(&self) -> usize {
        self.state.lock().unwrap().create_bodies.len()
    }

    pub fn create_bodies(&self) -> Vec<Value> {
        self.state.lock().unwrap().create_bodies.clone()
    }

    pub fn request_log(&self) -> Vec<LoggedRequest> {
        self.state.lock().unwrap().log.clone()
    }

    fn handle_api(&self, request: &HttpRequest) -> HttpResponse {
        let rest = &request.url[API_BASE.len()..];
        let segments: Vec<&str> = rest.trim_start_matches('/').split('/').collect();
        let (owner, repo, id) = match segments.as_slice() {
            ["repos", owner, repo, "downloads"] => (*owner, *repo, None),
            ["repos", owner, repo, "downloads", id] => match id.parse::<u64>() {
                Ok(id) => (*owner, *repo, Some(id)),
                Err(_) => return respond(404, json!({"message": "Not Found"})),
            },
            _ => return respond(404, json!({"message": "Not Found"})),
        };

        let mut state = self.state.lock().unwrap();
        let position = id.and_then(|id| state.downloads.iter().position(|d| d.id == id));

        match (request.method.as_str(), id) {
            ("GET", None) => {
                let listed: Vec<Value> = state
                    .downloads
                    .iter()
                    .filter(|d| d.owner == owner && d.repo == repo)
                    .map(StoredDownload::to_json)
                    .collect();
                respond(200, Value::Array(listed))
            }
            ("GET", Some(_)) => match position {
                Some(index) => respond(200, state.downloads[index].to_json()),
                None => respond(404, json!({"message": "Not Found"})),
            },
            ("DELETE", Some(_)) => match position {
                Some(index) if state.failing_deletes.contains(&state.downloads[index].name) => {
                    respond(500, json!({"message": "Server Error"}))
                }
                Some(index) => {
                    state.downloads.remove(index);
                    state.deletes += 1;
                    respond(204, Value::Null)
                }
                None => respond(404, json!({"message": "Not Found"})),
            },
            ("POST", None) => {
                let body: Value =
                    serde_json::from_slice(request.body.as_deref().unwrap_or_default())
                        .unwrap_or(Value::Null);
                state.create_bodies.push(body.clone());

                let name = body["name"].as_str().unwrap_or_default().to_string();
                let size = body["size"].as_u64().unwrap_or_default();
                let content_type = body["content_type"].as_str().map(str::to_string);
                let taken = state
                    .downloads
                    .iter()
                    .any(|d| d.owner == owner && d.repo == repo && d.name == name);
                if state.always_conflict || taken {
                    return respond(
                        422,
                        json!({
                            "message": "Validation Failed",
                            "errors": [{"resource": "Download", "code": "already_exists", "field": "name"}],
                        }),
                    );
                }

                state.next_id += 1;
                let stored = StoredDownload {
                    id: state.next_id,
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    name: name.clone(),
                    size,
                    content_type: content_type.clone(),
                    key: format!("downloads/{}/{}/{}", owner, repo, name),
                    content: None,
                };
                let mut ticket = stored.to_json();
                let extra = json!({
                    "policy": "cG9saWN5",
                    "signature": "c2lnbmF0dXJl",
                    "bucket": "bucket",
                    "accesskeyid": "AKIATEST",
                    "path": stored.key,
                    "acl": "public-read",
                    "expirationdate": "2026-10-20T00:00:00.000Z",
                    "prefix": format!("downloads/{}/{}/", owner, repo),
                    "mime_type": content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
                    "redirect": false,
                    "s3_url": STORAGE_URL,
                });
                if let (Some(target), Some(source)) = (ticket.as_object_mut(), extra.as_object()) {
                    target.extend(source.clone());
                }
                state.downloads.push(stored);
                respond(201, ticket)
            }
            _ => respond(405, json!({"message": "Method Not Allowed"})),
        }
    }

    fn handle_storage(&self, request: &HttpRequest) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        if state.storage_failure {
            return HttpResponse {
                status: 403,
                body: b"<Error><Code>AccessDenied</Code><Message>Request has expired</Message></Error>"
                    .to_vec(),
            };
        }

        let boundary = request
            .header("content-type")
            .and_then(|v| v.split_once("boundary="))
            .map(|(_, b)| b.to_string())
            .unwrap_or_default();
        let parts = parse_multipart(request.body.as_deref().unwrap_or_default(), &boundary);
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        if names != EXPECTED_FIELDS {
            return HttpResponse {
                status: 400,
                body: b"<Error><Code>InvalidPolicyDocument</Code></Error>".to_vec(),
            };
        }

        let key = String::from_utf8_lossy(&parts[0].data).into_owned();
        let file = parts[8].data.clone();
        match state.downloads.iter_mut().find(|d| d.key == key) {
            Some(download) => {
                download.content = Some(file);
                HttpResponse {
                    status: 201,
                    body: b"<PostResponse/>".to_vec(),
                }
            }
            None => HttpResponse {
                status: 404,
                body: b"<Error><Code>NoSuchKey</Code></Error>".to_vec(),
            },
        }
    }
}

impl HttpTransport for FakeHosting {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        self.state.lock().unwrap().log.push(LoggedRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            authorized: request.header("authorization").is_some(),
        });

        if request.url.starts_with(STORAGE_URL) {
            Ok(self.handle_storage(&request))
        } else if request.url.starts_with(API_BASE) {
            Ok(self.handle_api(&request))
        } else {
            Err(format!("no route to {}", request.url))
        }
    }
}
