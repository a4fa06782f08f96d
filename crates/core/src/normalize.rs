//! Path normalization
//!
//! Turns the loosely specified paths found in story metadata (bare file
//! names, padded strings, percent-encoded keys, full download URLs) into
//! canonical object-store keys. Pure and deterministic.

use std::borrow::Cow;
use storyvault_api::{AssetClass, AssetReference, CanonicalKey};
use url::Url;

/// Host serving object-store download URLs.
pub const DOWNLOAD_HOST: &str = "firebasestorage.googleapis.com";

/// Normalize with the default download host.
pub fn normalize(raw_path: &str, asset_class: AssetClass) -> Option<CanonicalKey> {
    PathNormalizer::default().normalize(raw_path, asset_class)
}

#[derive(Debug, Clone)]
pub struct PathNormalizer {
    download_hosts: Vec<String>,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self {
            download_hosts: vec![DOWNLOAD_HOST.to_string()],
        }
    }
}

impl PathNormalizer {
    /// Also treat `host` (e.g. a local storage emulator) as a download endpoint.
    pub fn with_download_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into().to_ascii_lowercase();
        if !self.download_hosts.contains(&host) {
            self.download_hosts.push(host);
        }
        self
    }

    /// Default hosts plus the host of `base_url`, so URLs issued by a storage
    /// emulator normalize like production ones.
    pub fn for_storage_base_url(base_url: &str) -> Self {
        let normalizer = Self::default();
        match Url::parse(base_url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => normalizer.with_download_host(host),
            None => normalizer,
        }
    }

    pub fn normalize_reference(&self, reference: &AssetReference) -> Option<CanonicalKey> {
        self.normalize(&reference.raw_path, reference.asset_class)
    }

    /// Returns `None` only for empty or whitespace-only input.
    pub fn normalize(&self, raw_path: &str, asset_class: AssetClass) -> Option<CanonicalKey> {
        let trimmed = raw_path.trim();
        if trimmed.is_empty() {
            return None;
        }

        // URLs are parsed before decoding so an encoded `?` or `#` stays
        // part of the key; only the extracted key is decoded.
        let cleaned = if is_url(trimmed) {
            self.key_from_url(trimmed)
                .unwrap_or_else(|| decode_once(trimmed).into_owned())
        } else {
            let decoded = decode_once(trimmed);
            if is_url(&decoded) {
                self.key_from_url(&decoded)
                    .unwrap_or_else(|| decoded.to_string())
            } else {
                decoded.into_owned()
            }
        };
        let cleaned = cleaned.trim().trim_start_matches('/');
        if cleaned.is_empty() {
            return Some(CanonicalKey::new(trimmed));
        }

        let class = extension_of(cleaned)
            .and_then(AssetClass::from_extension)
            .unwrap_or(asset_class);
        let folder = class.folder();

        if cleaned.starts_with(folder) {
            return Some(CanonicalKey::new(cleaned));
        }
        if !cleaned.contains('/') {
            return Some(CanonicalKey::new(format!("{folder}{cleaned}")));
        }
        // Nested path outside the canonical folder: left as is.
        Some(CanonicalKey::new(cleaned))
    }

    fn is_download_endpoint(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| {
                let host = host.to_ascii_lowercase();
                self.download_hosts.iter().any(|h| *h == host)
            })
            .unwrap_or(false)
    }

    fn key_from_url(&self, input: &str) -> Option<String> {
        let url = Url::parse(input).ok()?;
        let segments: Vec<&str> = url.path_segments()?.collect();

        if self.is_download_endpoint(&url) {
            // /v0/b/<bucket>/o/<key...>
            if segments.len() >= 5 && segments[1] == "b" && segments[3] == "o" {
                let key = segments[4..].join("/");
                return Some(decode_once(&key).into_owned());
            }
            if let Some(pos) = segments.iter().position(|s| *s == "o") {
                let key = segments[pos + 1..].join("/");
                if !key.is_empty() {
                    return Some(decode_once(&key).into_owned());
                }
            }
        }

        segments
            .iter()
            .rev()
            .find(|s| !s.is_empty())
            .map(|s| decode_once(s).into_owned())
    }
}

fn is_url(input: &str) -> bool {
    let lower = input.get(..8).unwrap_or(input).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Percent-decode once. Input that does not decode to UTF-8 is kept.
fn decode_once(input: &str) -> Cow<'_, str> {
    if !input.contains('%') {
        return Cow::Borrowed(input);
    }
    match urlencoding::decode(input) {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(input),
    }
}

fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str, class: AssetClass) -> String {
        normalize(raw, class).map(CanonicalKey::into_string).unwrap_or_default()
    }

    #[test]
    fn trims_and_keeps_prefixed_keys() {
        assert_eq!(
            key("  stories/dragon-share.txt ", AssetClass::Text),
            "stories/dragon-share.txt"
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(normalize("", AssetClass::Text).is_none());
        assert!(normalize(" \t\n", AssetClass::Audio).is_none());
    }

    #[test]
    fn bare_names_get_folder_from_extension() {
        assert_eq!(key("dragon.txt", AssetClass::Audio), "stories/dragon.txt");
        assert_eq!(key("dragon.MP3", AssetClass::Text), "audio/dragon.MP3");
        assert_eq!(key("cover.webp", AssetClass::Text), "images/cover.webp");
        assert_eq!(key("notes.md", AssetClass::Text), "stories/notes.md");
    }

    #[test]
    fn decodes_percent_encoding_once() {
        assert_eq!(
            key("audio%2Fdragon%20no%20volar.mp3", AssetClass::Audio),
            "audio/dragon no volar.mp3"
        );
        // %2541 decodes to %41 and stays there.
        assert_eq!(key("a%2541.txt", AssetClass::Text), "stories/a%41.txt");
    }

    #[test]
    fn extracts_key_from_download_url() {
        let url = "https://firebasestorage.googleapis.com/v0/b/tales.appspot.com/o/audio%2Fdragon-no-volar.mp3?alt=media&token=abc-123";
        assert_eq!(key(url, AssetClass::Audio), "audio/dragon-no-volar.mp3");
    }

    #[test]
    fn encoded_delimiters_stay_in_download_key() {
        let url = "https://firebasestorage.googleapis.com/v0/b/tales.appspot.com/o/stories%2Fque-paso%3F.txt?alt=media";
        assert_eq!(key(url, AssetClass::Text), "stories/que-paso?.txt");
        let url = "https://cdn.example.com/cuentos/cuento%231.txt#top";
        assert_eq!(key(url, AssetClass::Text), "stories/cuento#1.txt");
    }

    #[test]
    fn foreign_url_uses_last_segment() {
        let url = "https://cdn.example.com/assets/v2/dragon-share.txt?v=3";
        assert_eq!(key(url, AssetClass::Text), "stories/dragon-share.txt");
    }

    #[test]
    fn ambiguous_nested_paths_are_left_alone() {
        assert_eq!(
            key("legacy/stories/dragon.txt", AssetClass::Text),
            "legacy/stories/dragon.txt"
        );
    }

    #[test]
    fn emulator_host_is_recognised() {
        let normalizer = PathNormalizer::default().with_download_host("127.0.0.1");
        let url = "http://127.0.0.1:9199/v0/b/demo/o/images%2Fcover.png?alt=media";
        assert_eq!(
            normalizer
                .normalize(url, AssetClass::Image)
                .map(CanonicalKey::into_string),
            Some("images/cover.png".to_string())
        );
    }
}
