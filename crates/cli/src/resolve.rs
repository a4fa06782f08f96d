use std::path::Path;
use storyvault_api::{AssetClass, AssetReference, ResolveResult, Resolved, ResourceResolver, StoryRecord};
use storyvault_core::{Engine, EngineConfig, PathNormalizer};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct AssetRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Fallback")]
    fallback: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl AssetRow {
    fn new(asset: &str, result: &ResolveResult<Resolved<String>>) -> Self {
        match result {
            Ok(resolved) => Self {
                asset: asset.to_string(),
                source: resolved.source.to_string(),
                fallback: if resolved.is_fallback { "yes" } else { "no" }.to_string(),
                value: preview(&resolved.value),
            },
            Err(e) => Self {
                asset: asset.to_string(),
                source: "-".to_string(),
                fallback: "-".to_string(),
                value: format!("error: {e}"),
            },
        }
    }
}

fn preview(value: &str) -> String {
    const MAX: usize = 72;
    let line = value.lines().next().unwrap_or_default();
    if line.chars().count() > MAX || line.len() < value.len() {
        let cut: String = line.chars().take(MAX).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

pub fn normalize(
    config: &EngineConfig,
    path: &str,
    class: AssetClass,
) -> Result<(), Box<dyn std::error::Error>> {
    match PathNormalizer::for_storage_base_url(&config.storage_base_url).normalize(path, class) {
        Some(key) => {
            println!("{key}");
            Ok(())
        }
        None => Err(format!("cannot normalize empty path {path:?}").into()),
    }
}

pub async fn asset(
    engine: &Engine,
    class: AssetClass,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolved = engine.resolve(&AssetReference::new(path, class)).await?;

    if resolved.is_fallback {
        eprintln!("note: degraded result ({})", resolved.source);
    } else {
        tracing::debug!(source = %resolved.source, "Resolved {} asset", class);
    }
    println!("{}", resolved.value);
    Ok(())
}

pub async fn story(engine: &Engine, record: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(record)?;
    let record: StoryRecord = serde_json::from_str(&raw)?;

    let story = engine.resolve_story(&record).await;
    println!("{} ({})", story.title, story.id);

    let mut rows = vec![AssetRow::new("text", &story.text)];
    if let Some(audio) = &story.audio {
        rows.push(AssetRow::new("audio", audio));
    }
    if let Some(image) = &story.image {
        rows.push(AssetRow::new("image", image));
    }
    println!("{}", Table::new(rows));

    if story.is_degraded() {
        eprintln!("note: some assets are degraded or unavailable");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_text() {
        assert_eq!(preview("short"), "short");
        assert_eq!(preview("first\nsecond"), "first…");
        let long = "a".repeat(100);
        assert_eq!(preview(&long).chars().count(), 73);
    }
}
