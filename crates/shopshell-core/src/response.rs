//! Owned HTTP response representation.

use std::collections::HashMap;

/// An owned response: status, headers and body bytes.
///
/// Responses flowing through the cache layer are plain byte buffers plus
/// metadata. Returning a response to the caller and persisting it into a
/// store are two independent consumers of the body, so any code path doing
/// both must [`duplicate`](Self::duplicate) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response headers.
    pub headers: HashMap<String, String>,
    /// The response body.
    pub body: Vec<u8>,
    /// Whether the body could not be inspected due to cross-origin
    /// restrictions. Opaque responses carry a zeroed status.
    pub opaque: bool,
}

impl StoredResponse {
    /// Create a new response.
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            opaque: false,
        }
    }

    /// Create a successful response with the given body and no headers.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, HashMap::new(), body.into())
    }

    /// Create an opaque cross-origin response.
    ///
    /// The transport could not inspect the payload, so status and headers
    /// are unverifiable.
    pub fn opaque(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            headers: HashMap::new(),
            body: body.into(),
            opaque: true,
        }
    }

    /// Synthesized response served when every fallback path is exhausted.
    ///
    /// Distinguishable from anything an origin would return, but still a
    /// well-formed response rather than an error bubbling to the client.
    pub fn unavailable() -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        Self::new(503, headers, b"offline".to_vec())
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether a strategy may persist this response: a verified success, or
    /// an opaque response when the route's policy allows storing those.
    pub fn is_storable(&self) -> bool {
        self.is_success() || self.opaque
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        let key_lower = key.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == key_lower)
            .map(|(_, v)| v.as_str())
    }

    /// Duplicate the response, copying the body buffer.
    ///
    /// Call this before handing one copy to the client and one to a store.
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Get the response body as text.
    pub fn text(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}
