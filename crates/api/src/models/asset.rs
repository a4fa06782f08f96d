use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of asset a story references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Text,
    Audio,
    Image,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [AssetClass::Text, AssetClass::Audio, AssetClass::Image];

    /// Canonical storage folder, including the trailing separator.
    pub fn folder(&self) -> &'static str {
        match self {
            AssetClass::Text => "stories/",
            AssetClass::Audio => "audio/",
            AssetClass::Image => "images/",
        }
    }

    /// Classify a file extension (without the dot). Matching is case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "json" => Some(AssetClass::Text),
            "mp3" | "wav" | "ogg" => Some(AssetClass::Audio),
            "png" | "jpg" | "jpeg" | "webp" | "gif" => Some(AssetClass::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Text => "text",
            AssetClass::Audio => "audio",
            AssetClass::Image => "image",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "story" | "stories" => Ok(AssetClass::Text),
            "audio" => Ok(AssetClass::Audio),
            "image" | "images" => Ok(AssetClass::Image),
            other => Err(format!("unknown asset class: {other}")),
        }
    }
}

/// A loosely specified pointer to an asset, as found in story metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    pub raw_path: String,
    pub asset_class: AssetClass,
}

impl AssetReference {
    pub fn new(raw_path: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            raw_path: raw_path.into(),
            asset_class,
        }
    }

    pub fn text(raw_path: impl Into<String>) -> Self {
        Self::new(raw_path, AssetClass::Text)
    }

    pub fn audio(raw_path: impl Into<String>) -> Self {
        Self::new(raw_path, AssetClass::Audio)
    }

    pub fn image(raw_path: impl Into<String>) -> Self {
        Self::new(raw_path, AssetClass::Image)
    }
}

/// Normalized object-store path carrying the folder prefix of its class.
///
/// Produced by the path normalizer; holding one means the string has already
/// been trimmed, decoded and prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
