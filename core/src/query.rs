//! Ordered query parameters and their canonical encoding.
//!
//! The encoded string is used twice: once as checksum input and once in the
//! request URL. Both uses go through [`Params::encode`], so the two can never
//! disagree on order or escaping.

use std::fmt::Display;

use url::form_urlencoded;

/// Ordered `(key, value)` pairs for one API call.
///
/// Absent values are kept in place until encoding so the call site reads as
/// the full parameter list of the operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, Option<String>)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter that is always sent.
    pub fn push(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.pairs.push((key.into(), Some(value.to_string())));
        self
    }

    /// Append a parameter that is only sent when `value` is `Some`.
    pub fn push_opt<V: Display>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.pairs.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    /// Append every pair of `extra` in order.
    pub fn extend<K, V, I>(mut self, extra: I) -> Self
    where
        K: Into<String>,
        V: Display,
        I: IntoIterator<Item = (K, V)>,
    {
        self.pairs
            .extend(extra.into_iter().map(|(k, v)| (k.into(), Some(v.to_string()))));
        self
    }

    /// Pairs that will actually be sent, in order.
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Encode as `application/x-www-form-urlencoded`: `k1=v1&k2=v2`.
    ///
    /// Absent values are dropped. An empty list encodes to `""`.
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.present() {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}
