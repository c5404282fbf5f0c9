//! Response under construction during dispatch.
//!
//! # Responsibilities
//! - Collect status, headers and body written by actions and filters
//! - Record redirects (status + `Location`)
//! - Convert into an axum response for the transport
//!
//! # Design Decisions
//! - Body is buffered; actions return whole bodies
//! - `finish` is the only place `content-length` is set

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE)
    }

    /// Values that are not valid header text are ignored.
    pub fn set_content_type(&mut self, content_type: &str) {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(header::CONTENT_TYPE, value);
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION)
    }

    /// Set status and `Location` for a redirect.
    pub fn redirect(&mut self, location: &str, status: StatusCode) {
        self.status = status;
        match HeaderValue::from_str(location) {
            Ok(value) => {
                self.headers.insert(header::LOCATION, value);
            }
            Err(_) => tracing::warn!(location, "Dropping unencodable redirect location"),
        }
    }

    /// Append to the body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, lossily decoded.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Seal the response for sending.
    pub fn finish(mut self) -> Self {
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        self
    }

    fn header_str(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
