use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body format requested from a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFormat {
    Text,
    Blob,
}

/// Fetched content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Blob(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl Payload {
    /// Interpret the payload as UTF-8 text.
    pub fn into_text(self) -> Result<String, FetchError> {
        match self {
            Payload::Text(text) => Ok(text),
            Payload::Blob(bytes) => {
                String::from_utf8(bytes).map_err(|e| FetchError::Decode(e.to_string()))
            }
        }
    }
}

/// Object metadata as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub size: u64,
}

/// Which step of the pipeline produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    Cache,
    DirectBytes,
    DownloadUrl,
    Proxy,
    InlineBytes,
    Builtin,
    Mock,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "cache",
            ResolutionSource::DirectBytes => "direct-bytes",
            ResolutionSource::DownloadUrl => "download-url",
            ResolutionSource::Proxy => "proxy",
            ResolutionSource::InlineBytes => "inline-bytes",
            ResolutionSource::Builtin => "builtin",
            ResolutionSource::Mock => "mock",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved value together with how it was obtained.
///
/// `is_fallback` marks degraded results (built-in text, `mock://` URLs) that
/// callers may want to surface and that are never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolved<T> {
    pub value: T,
    pub is_fallback: bool,
    pub source: ResolutionSource,
}

impl<T> Resolved<T> {
    pub fn live(value: T, source: ResolutionSource) -> Self {
        Self {
            value,
            is_fallback: false,
            source,
        }
    }

    pub fn fallback(value: T, source: ResolutionSource) -> Self {
        Self {
            value,
            is_fallback: true,
            source,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: f(self.value),
            is_fallback: self.is_fallback,
            source: self.source,
        }
    }
}
