use super::asset::AssetReference;
use serde::{Deserialize, Serialize};

/// Story metadata record as stored by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    pub text_path: String,
    #[serde(default)]
    pub audio_path: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl StoryRecord {
    pub fn text_reference(&self) -> AssetReference {
        AssetReference::text(self.text_path.clone())
    }

    /// Audio reference, skipping blank paths.
    pub fn audio_reference(&self) -> Option<AssetReference> {
        non_blank(&self.audio_path).map(AssetReference::audio)
    }

    pub fn image_reference(&self) -> Option<AssetReference> {
        non_blank(&self.image_path).map(AssetReference::image)
    }

    /// All references carried by the record, text first.
    pub fn references(&self) -> Vec<AssetReference> {
        let mut refs = vec![self.text_reference()];
        refs.extend(self.audio_reference());
        refs.extend(self.image_reference());
        refs
    }
}

fn non_blank(path: &Option<String>) -> Option<String> {
    path.as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(str::to_string)
}
