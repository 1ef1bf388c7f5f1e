//! Authenticated client for the hosting API.
//!
//! Every request carries the repository's Basic-Auth header. Requests to
//! pre-signed storage URLs go through [`ApiClient::send_unauthenticated`],
//! which never attaches credentials.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use super::error::{DownloadsError, DownloadsResult};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

const AUTHORIZATION: &str = "Authorization";

/// Username and password for the hosting API.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// `Basic <base64(user:password)>`.
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.user, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request body variants.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Vec<u8>),
    Raw(Vec<u8>),
}

/// A request relative to the client's base URL.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    path: Option<String>,
    method: Option<Method>,
    body: Option<RequestBody>,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-path appended verbatim to the base URL (e.g. `/42`).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Explicit verb, overriding the GET/POST default.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(RequestBody::Json(serde_json::to_vec(value)?));
        Ok(self)
    }

    /// Use `data` as the body unchanged.
    pub fn raw(mut self, data: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Raw(data));
        self
    }

    /// Add a caller header. `Authorization` is always replaced by the client.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn resolved_method(&self) -> Method {
        match (&self.method, &self.body) {
            (Some(method), _) => method.clone(),
            (None, Some(_)) => Method::POST,
            (None, None) => Method::GET,
        }
    }
}

/// HTTP client bound to one API base URL and one credential.
pub struct ApiClient {
    base_url: String,
    auth_header: String,
    transport: Box<dyn HttpTransport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// The auth header is derived once here and reused for every request.
    pub fn new(
        base_url: impl Into<String>,
        credentials: &Credentials,
        transport: Box<dyn HttpTransport>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_header: credentials.basic_auth_header(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send an authenticated request. Non-2xx responses become
    /// [`DownloadsError::Status`].
    pub fn request(&self, request: ApiRequest) -> DownloadsResult<HttpResponse> {
        let method = request.resolved_method();
        let url = match &request.path {
            Some(path) => format!("{}{}", self.base_url, path),
            None => self.base_url.clone(),
        };

        let mut headers: Vec<(String, String)> = request
            .headers
            .into_iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION))
            .collect();
        let body = match request.body {
            Some(RequestBody::Json(bytes)) => {
                if !headers
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case("Content-Type"))
                {
                    headers.push(("Content-Type".to_string(), "application/json".to_string()));
                }
                Some(bytes)
            }
            Some(RequestBody::Raw(bytes)) => Some(bytes),
            None => None,
        };
        headers.push((AUTHORIZATION.to_string(), self.auth_header.clone()));

        self.send_unauthenticated(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send a request exactly as given, with no credentials added.
    pub fn send_unauthenticated(&self, request: HttpRequest) -> DownloadsResult<HttpResponse> {
        let url = request.url.clone();
        let response = self
            .transport
            .send(request)
            .map_err(|reason| DownloadsError::Transport {
                url: url.clone(),
                reason,
            })?;

        if !response.is_success() {
            return Err(DownloadsError::Status {
                status: response.status,
                url,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every request and answers with a fixed response.
    struct RecordingTransport {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
        response: Result<HttpResponse, String>,
    }

    impl HttpTransport for RecordingTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            self.seen.lock().unwrap().push(request);
            self.response.clone()
        }
    }

    fn client_with(
        response: Result<HttpResponse, String>,
    ) -> (ApiClient, Arc<Mutex<Vec<HttpRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = RecordingTransport {
            seen: Arc::clone(&seen),
            response,
        };
        let client = ApiClient::new(
            "https://api.test/repos/o/r/downloads/",
            &Credentials::new("alice", "s3cret"),
            Box::new(transport),
        );
        (client, seen)
    }

    fn ok(status: u16, body: &str) -> Result<HttpResponse, String> {
        Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        })
    }

    #[test]
    fn test_basic_auth_header_encoding() {
        let creds = Credentials::new("alice", "s3cret");
        assert_eq!(creds.basic_auth_header(), "Basic YWxpY2U6czNjcmV0");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("alice", "s3cret"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_get_is_default_method() {
        let (client, seen) = client_with(ok(200, "[]"));
        client.request(ApiRequest::new()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(seen[0].url, "https://api.test/repos/o/r/downloads");
        assert!(seen[0].body.is_none());
    }

    #[test]
    fn test_body_implies_post() {
        let (client, seen) = client_with(ok(201, "{}"));
        let request = ApiRequest::new()
            .json(&serde_json::json!({"name": "a"}))
            .unwrap();
        client.request(request).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_method_override_and_path() {
        let (client, seen) = client_with(ok(204, ""));
        client
            .request(ApiRequest::new().path("/7").method(Method::DELETE))
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::DELETE);
        assert_eq!(seen[0].url, "https://api.test/repos/o/r/downloads/7");
    }

    #[test]
    fn test_caller_cannot_replace_authorization() {
        let (client, seen) = client_with(ok(200, ""));
        client
            .request(
                ApiRequest::new()
                    .header("authorization", "Bearer forged")
                    .header("X-Trace", "1"),
            )
            .unwrap();

        let seen = seen.lock().unwrap();
        let auth: Vec<_> = seen[0]
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].1, "Basic YWxpY2U6czNjcmV0");
        assert_eq!(seen[0].header("x-trace"), Some("1"));
    }

    #[test]
    fn test_non_success_becomes_status_error() {
        let (client, _) = client_with(ok(422, r#"{"errors":[{"code":"already_exists"}]}"#));
        let err = client.request(ApiRequest::new()).unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_transport_failure_is_distinct() {
        let (client, _) = client_with(Err("dns failure".to_string()));
        let err = client.request(ApiRequest::new()).unwrap_err();
        assert!(matches!(err, DownloadsError::Transport { .. }));
        assert!(err.to_string().contains("dns failure"));
    }

    #[test]
    fn test_unauthenticated_send_adds_nothing() {
        let (client, seen) = client_with(ok(201, ""));
        client
            .send_unauthenticated(HttpRequest {
                method: Method::POST,
                url: "https://storage.test/bucket/".to_string(),
                headers: Vec::new(),
                body: Some(b"x".to_vec()),
            })
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen[0].header("authorization").is_none());
        assert_eq!(seen[0].url, "https://storage.test/bucket/");
    }
}
