//! Request paths with an ordered query string
//!
//! The rendered path doubles as the cache key, so parameters are emitted in
//! the order they were added and values are percent-encoded the same way every
//! time.

use std::fmt;

/// An API path plus its query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
    params: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Appends a single query parameter
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Appends one parameter per value, for array-style keys like `includes[]`
    pub fn params<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for value in values {
            self.params.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Renders `path?key=value&...` with percent-encoded values
    pub fn path_and_query(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }

        let query = self
            .params
            .iter()
            .map(|(key, value)| format!("{}={}", key, encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.path, query)
    }

    /// Key under which the response to this request is cached
    pub fn cache_key(&self) -> String {
        self.path_and_query()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_and_query())
    }
}

/// Percent-encodes a query value or path segment; spaces become `%20` rather than `+`
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
