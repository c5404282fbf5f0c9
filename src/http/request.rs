//! Request representation seen by the routing core.
//!
//! # Responsibilities
//! - Hold method, URL, headers and the merged parameter mapping
//! - Build from raw transport parts (query string and form body become params)
//! - Expose the host/port/path views the matchers need
//!
//! # Design Decisions
//! - The URL is always absolute; path-only targets get `http://localhost`
//! - Query parameters are merged first, form body parameters override them
//! - The Host header only ever supplies `host[:port]`; the path always comes
//!   from the request line

use std::str::FromStr;

use axum::http::{header, request::Parts, uri::Authority, HeaderMap, HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::http::params::Params;

const DEFAULT_ORIGIN: &str = "http://localhost";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid request target: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid host: {0:?}")]
    InvalidHost(String),
}

#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    params: Params,
}

impl Request {
    /// Build a request for `target`, an absolute URL or a path.
    pub fn new(method: Method, target: &str) -> Result<Self, RequestError> {
        let url = if target.starts_with('/') {
            Url::parse(&format!("{DEFAULT_ORIGIN}{target}"))?
        } else {
            Url::parse(target)?
        };
        Ok(Self::from_url(method, url))
    }

    fn from_url(method: Method, url: Url) -> Self {
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Self {
            method,
            url,
            headers: HeaderMap::new(),
            params,
        }
    }

    pub fn get(target: &str) -> Result<Self, RequestError> {
        Self::new(Method::GET, target)
    }

    pub fn post(target: &str) -> Result<Self, RequestError> {
        Self::new(Method::POST, target)
    }

    /// Build from the parts handed over by the HTTP server.
    pub fn from_parts(parts: &Parts, body: &[u8]) -> Result<Self, RequestError> {
        let authority = match parts.headers.get(header::HOST) {
            Some(value) => {
                let raw = value.to_str().map_err(|_| {
                    RequestError::InvalidHost(String::from_utf8_lossy(value.as_bytes()).into_owned())
                })?;
                Some(parse_authority(raw)?)
            }
            None => parts.uri.authority().cloned(),
        };

        let mut url = match authority {
            Some(authority) => Url::parse(&format!("http://{}", authority.as_str()))?,
            None => Url::parse(DEFAULT_ORIGIN)?,
        };
        url.set_path(parts.uri.path());
        url.set_query(parts.uri.query());

        let mut request = Self::from_url(parts.method.clone(), url);
        request.headers = parts.headers.clone();

        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            let form: Params = url::form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            request.params.merge(form);
        }

        Ok(request)
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Explicit port, or the scheme's default.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    /// `scheme://host[:port]/path` with no query or fragment.
    /// The port appears only when it is not the scheme default.
    pub fn location(&self) -> String {
        let mut location = format!("{}://{}", self.url.scheme(), self.host().unwrap_or(""));
        if let Some(port) = self.url.port() {
            location.push(':');
            location.push_str(&port.to_string());
        }
        location.push_str(self.path());
        location
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }
}

/// A bare `host[:port]`. Userinfo and anything past the authority is refused.
fn parse_authority(raw: &str) -> Result<Authority, RequestError> {
    let authority = Authority::from_str(raw).map_err(|_| RequestError::InvalidHost(raw.to_string()))?;
    if authority.as_str().contains('@') || authority.host().is_empty() {
        return Err(RequestError::InvalidHost(raw.to_string()));
    }
    Ok(authority)
}
