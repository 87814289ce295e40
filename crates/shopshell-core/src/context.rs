//! Typed description of an intercepted request.

use std::collections::HashMap;

use url::Url;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Convert to HTTP method string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether this is a GET-equivalent read.
    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// Resource-type classification of a request, as reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    /// A top-level or embedded document.
    Document,
    Image,
    Script,
    Style,
    Font,
    /// Anything else (data fetches, media, workers, ...).
    #[default]
    Other,
}

/// An intercepted request as seen by the routing layer.
///
/// Carries exactly the inputs routing needs: method, destination
/// classification, navigation flag and the full URL. Headers are kept for
/// the Accept-based document hint.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Full request URL (scheme, host, path, query).
    pub url: Url,
    /// Resource-type classification.
    pub destination: Destination,
    /// Whether this request fetches a new top-level document.
    pub navigation: bool,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            destination: Destination::Other,
            navigation: false,
            headers: HashMap::new(),
        }
    }

    /// Convenience constructor for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Set the destination classification.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Mark the request as a top-level navigation.
    pub fn navigate(mut self) -> Self {
        self.navigation = true;
        self.destination = Destination::Document;
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }

    /// The request hostname, if the URL has one.
    pub fn hostname(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Whether the request shares an origin with `other`.
    pub fn same_origin_as(&self, other: &Url) -> bool {
        self.url.origin() == other.origin()
    }

    /// Whether the client is fetching a document: either an explicit
    /// navigation, or an Accept header asking for HTML.
    pub fn wants_document(&self) -> bool {
        if self.navigation {
            return true;
        }
        self.header("accept")
            .map(|accept| accept.contains("text/html"))
            .unwrap_or(false)
    }
}
