//! multipart/form-data body construction for storage uploads.
//!
//! Pre-signed storage endpoints validate the form against a signed policy,
//! so fields are written exactly in the order they were added. The file part
//! always comes last, as the storage provider ignores fields after it.

/// Prefix of every generated boundary token.
const BOUNDARY_PREFIX: &str = "ghd";

/// The single binary part of a form.
#[derive(Debug, Clone, Copy)]
pub struct FilePart<'a> {
    /// Form field name (`file` for storage uploads).
    pub field: &'a str,
    /// File name reported in the part's Content-Disposition.
    pub file_name: &'a str,
    /// MIME type of the payload.
    pub mime: &'a str,
    /// Payload, written verbatim.
    pub data: &'a [u8],
}

/// A finished multipart body together with the boundary that delimits it.
#[derive(Debug, Clone)]
pub struct EncodedForm {
    boundary: String,
    body: Vec<u8>,
}

impl EncodedForm {
    /// Boundary token used between parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encoded body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the form, returning the body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Builds a multipart/form-data body from ordered text fields and one file.
#[derive(Debug, Clone)]
pub struct MultipartEncoder {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartEncoder {
    /// Create an encoder with a fresh random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("{}{:016x}", BOUNDARY_PREFIX, rand::random::<u64>()))
    }

    /// Create an encoder with a caller-chosen boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    /// Boundary token this encoder writes.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Append a text field. Values are written as their `Display` text.
    pub fn add_field(&mut self, name: &str, value: impl std::fmt::Display) -> &mut Self {
        self.write_delimiter();
        self.write_line(&format!("Content-Disposition: form-data; name=\"{}\"", name));
        self.write_line("");
        self.write_line(&value.to_string());
        self
    }

    /// Append the file part and close the body.
    pub fn finish(mut self, file: FilePart<'_>) -> EncodedForm {
        self.write_delimiter();
        self.write_line(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            file.field, file.file_name
        ));
        self.write_line(&format!("Content-Type: {}", file.mime));
        self.write_line("");
        self.body.extend_from_slice(file.data);
        self.body.extend_from_slice(b"\r\n");

        let closing = format!("--{}--", self.boundary);
        self.write_line(&closing);

        EncodedForm {
            boundary: self.boundary,
            body: self.body,
        }
    }

    fn write_delimiter(&mut self) {
        let delimiter = format!("--{}", self.boundary);
        self.write_line(&delimiter);
    }

    fn write_line(&mut self, line: &str) {
        self.body.extend_from_slice(line.as_bytes());
        self.body.extend_from_slice(b"\r\n");
    }
}
