//! Per-request context handed to handlers
//!
//! Reads go to the inbound request; writes (status, headers) accumulate the
//! outbound response head. Setters return `&mut Self` so calls chain.

use crate::logger;
use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::http::request::Parts;
use hyper::{Method, StatusCode, Uri};

pub struct RequestContext {
    parts: Parts,
    path: String,
    status: StatusCode,
    headers: HeaderMap,
}

impl RequestContext {
    /// Build a context from the inbound request head
    ///
    /// The path is percent-decoded; undecodable paths are kept verbatim.
    pub fn new(parts: Parts) -> Self {
        let raw = parts.uri.path();
        let path = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |p| p.into_owned());

        Self {
            parts,
            path,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Decoded request path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up an inbound header, case-insensitively
    ///
    /// Returns the first value; values that are not visible ASCII are skipped.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Underlying request head
    pub const fn request(&self) -> &Parts {
        &self.parts
    }

    /// Set the response status code
    ///
    /// Codes outside 100..=999 are rejected with a warning and leave the
    /// status unchanged.
    pub fn status(&mut self, code: u16) -> &mut Self {
        match StatusCode::from_u16(code) {
            Ok(status) => self.status = status,
            Err(_) => logger::log_warning(&format!("Ignoring invalid status code: {code}")),
        }
        self
    }

    /// Set a response header to one or more values
    ///
    /// Replaces any earlier values for `name`; an empty `values` slice
    /// removes the header.
    pub fn header(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            logger::log_warning(&format!("Ignoring invalid header name: {name:?}"));
            return self;
        };

        let mut parsed = Vec::with_capacity(values.len());
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(v) => parsed.push(v),
                Err(_) => {
                    logger::log_warning(&format!("Ignoring invalid value for header {name}"));
                    return self;
                }
            }
        }

        self.headers.remove(&name);
        for value in parsed {
            self.headers.append(name.clone(), value);
        }
        self
    }

    pub const fn response_status(&self) -> StatusCode {
        self.status
    }

    pub const fn response_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Consume the context, keeping the response head
    pub fn into_response_head(self) -> (StatusCode, HeaderMap) {
        (self.status, self.headers)
    }
}
