//! End-to-end resolution through the engine with an in-memory object store.

mod common;

use common::{BrokenChild, ManualChild, TestFetcher};
use std::sync::Arc;
use storyvault_api::{
    CacheManager, CacheNamespace, FetchError, ResolutionSource, ResolveError, ResourceResolver,
    StorageError, StoryRecord,
};
use storyvault_core::cache::{FileCacheStore, MemoryCacheStore};
use storyvault_core::pipeline::fallback::{PLACEHOLDER_TEXT, story_text};
use storyvault_core::proxy::RelayContext;
use storyvault_core::storage::{MemoryObjectStore, StorageOp};
use storyvault_core::{Engine, EngineBuilder};
use tempfile::TempDir;

fn engine(store: &Arc<MemoryObjectStore>, fetcher: TestFetcher) -> Engine {
    EngineBuilder::new(store.clone())
        .with_fetcher(Arc::new(fetcher))
        .with_cache_store(Arc::new(MemoryCacheStore::new()))
        .without_proxy()
        .build()
}

#[tokio::test]
async fn test_text_from_direct_bytes_is_cached() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/dragon-share.txt", "Lucas comparte sus juguetes.");
    let engine = engine(&store, TestFetcher::cors_blocked());

    let first = engine.resolve_text("dragon-share.txt").await.unwrap();
    assert_eq!(first.value, "Lucas comparte sus juguetes.");
    assert_eq!(first.source, ResolutionSource::DirectBytes);
    assert!(!first.is_fallback);

    let second = engine
        .resolve_text("  stories/dragon-share.txt ")
        .await
        .unwrap();
    assert_eq!(second.value, first.value);
    assert_eq!(second.source, ResolutionSource::Cache);
    assert_eq!(store.calls(StorageOp::GetBytes), 1);
}

#[tokio::test]
async fn test_text_download_url_when_direct_bytes_fail() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/a.txt", "unused");
    store.fail(
        "stories/a.txt",
        StorageOp::GetBytes,
        StorageError::PermissionDenied("stories/a.txt".into()),
    );
    let fetcher = TestFetcher::serving("texto descargado");
    let engine = engine(&store, fetcher);

    let resolved = engine.resolve_text("a.txt").await.unwrap();
    assert_eq!(resolved.value, "texto descargado");
    assert_eq!(resolved.source, ResolutionSource::DownloadUrl);
}

#[tokio::test]
async fn test_text_falls_back_to_builtin_and_is_not_cached() {
    let store = Arc::new(MemoryObjectStore::default());
    let engine = engine(&store, TestFetcher::cors_blocked());

    let known = engine.resolve_text("dragon-no-volar.txt").await.unwrap();
    assert!(known.is_fallback);
    assert_eq!(known.source, ResolutionSource::Builtin);
    assert_eq!(Some(known.value.as_str()), story_text("dragon-no-volar.txt"));

    let unknown = engine.resolve_text("stories/unknown.txt").await.unwrap();
    assert!(unknown.is_fallback);
    assert_eq!(unknown.value, PLACEHOLDER_TEXT);

    // Degraded results are retried on the next call.
    let again = engine.resolve_text("dragon-no-volar.txt").await.unwrap();
    assert_eq!(again.source, ResolutionSource::Builtin);
    assert_eq!(engine.cache().len(CacheNamespace::Text).await, 0);
    assert_eq!(store.calls(StorageOp::GetBytes), 3);
}

#[tokio::test]
async fn test_text_relays_through_proxy_when_cors_blocked() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/dragon-share.txt", "unused");
    store.fail(
        "stories/dragon-share.txt",
        StorageOp::GetBytes,
        StorageError::Network("offline".into()),
    );

    let direct = Arc::new(TestFetcher::cors_blocked());
    let relay = RelayContext::new(Arc::new(TestFetcher::serving("desde el proxy")));
    let engine = EngineBuilder::new(store.clone())
        .with_fetcher(direct.clone())
        .with_child_context(Arc::new(relay))
        .build();

    let resolved = engine.resolve_text("dragon-share.txt").await.unwrap();
    assert_eq!(resolved.value, "desde el proxy");
    assert_eq!(resolved.source, ResolutionSource::Proxy);
    assert!(!resolved.is_fallback);
    assert_eq!(direct.fetch_count(), 1);

    engine.shutdown();
}

#[tokio::test]
async fn test_unavailable_proxy_keeps_direct_failure() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/dragon-no-volar.txt", "unused");
    store.fail(
        "stories/dragon-no-volar.txt",
        StorageOp::GetBytes,
        StorageError::Network("offline".into()),
    );

    let engine = EngineBuilder::new(store.clone())
        .with_fetcher(Arc::new(TestFetcher::cors_blocked()))
        .with_child_context(Arc::new(BrokenChild))
        .build();

    let resolved = engine.resolve_text("dragon-no-volar.txt").await.unwrap();
    assert_eq!(resolved.source, ResolutionSource::Builtin);
    assert!(resolved.is_fallback);
}

#[tokio::test]
async fn test_proxy_child_is_not_launched_without_need() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/a.txt", "directo");
    let child = Arc::new(ManualChild::ready());

    let engine = EngineBuilder::new(store.clone())
        .with_fetcher(Arc::new(TestFetcher::cors_blocked()))
        .with_child_context(child.clone())
        .build();

    engine.resolve_text("a.txt").await.unwrap();
    assert_eq!(child.launches(), 0);
}

#[tokio::test]
async fn test_audio_probe_blocked_by_origin_yields_mock_url() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert("audio/dragon-no-volar.mp3", vec![1, 2, 3], Some("audio/mpeg"));
    let engine = engine(&store, TestFetcher::cors_blocked());

    let resolved = engine
        .resolve_audio_url("audio/dragon-no-volar.mp3")
        .await
        .unwrap();
    assert_eq!(resolved.value, "mock://audio/dragon-no-volar.mp3");
    assert!(resolved.is_fallback);
    assert_eq!(resolved.source, ResolutionSource::Mock);
    assert_eq!(engine.cache().len(CacheNamespace::Audio).await, 0);
    // The sentinel short-circuits the chain.
    assert_eq!(store.calls(StorageOp::GetMetadata), 0);
}

#[tokio::test]
async fn test_audio_url_is_probed_and_cached() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert("audio/a.mp3", vec![1, 2, 3], Some("audio/mpeg"));
    let engine = engine(&store, TestFetcher::serving(""));

    let resolved = engine.resolve_audio_url("a.mp3").await.unwrap();
    assert_eq!(resolved.value, store.download_url("audio/a.mp3"));
    assert_eq!(resolved.source, ResolutionSource::DownloadUrl);

    let cached = engine.resolve_audio_url("a.mp3").await.unwrap();
    assert_eq!(cached.source, ResolutionSource::Cache);
    assert_eq!(store.calls(StorageOp::IssueUrl), 1);
}

#[tokio::test]
async fn test_image_inlined_when_probe_fails() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert("images/cover.png", b"png!".to_vec(), Some("image/png"));
    let fetcher = TestFetcher::new(
        |url| Err(FetchError::Network(url.to_string())),
        |url| {
            Err(FetchError::Status {
                status: 503,
                url: url.to_string(),
            })
        },
    );
    let engine = engine(&store, fetcher);

    let resolved = engine.resolve_image_url("cover.png").await.unwrap();
    assert_eq!(resolved.value, "data:image/png;base64,cG5nIQ==");
    assert_eq!(resolved.source, ResolutionSource::InlineBytes);
}

#[tokio::test]
async fn test_missing_media_is_exhausted() {
    let store = Arc::new(MemoryObjectStore::default());
    let engine = engine(&store, TestFetcher::serving(""));

    let err = engine.resolve_audio_url("missing.mp3").await.unwrap_err();
    match err {
        ResolveError::Exhausted { key, last } => {
            assert_eq!(key, "audio/missing.mp3");
            assert!(matches!(*last, ResolveError::NotFound(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_reference_is_malformed() {
    let store = Arc::new(MemoryObjectStore::default());
    let engine = engine(&store, TestFetcher::serving(""));

    let err = engine.resolve_text("   ").await.unwrap_err();
    assert_eq!(err, ResolveError::MalformedReference("   ".to_string()));
    assert_eq!(store.calls(StorageOp::GetBytes), 0);
}

#[tokio::test]
async fn test_resolve_story_record() {
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/dragon-share.txt", "Lucas comparte.");
    store.insert("audio/dragon-share.mp3", vec![0; 8], Some("audio/mpeg"));
    let engine = engine(&store, TestFetcher::serving(""));

    let record: StoryRecord = serde_json::from_str(
        r#"{
            "id": "s1",
            "title": "El dragón que comparte",
            "textPath": "dragon-share.txt",
            "audioPath": "dragon-share.mp3",
            "imagePath": "  "
        }"#,
    )
    .unwrap();

    let story = engine.resolve_story(&record).await;
    assert_eq!(story.id, "s1");
    assert_eq!(story.text.as_ref().unwrap().value, "Lucas comparte.");
    assert!(story.audio.as_ref().unwrap().is_ok());
    assert!(story.image.is_none());
    assert!(!story.is_degraded());
}

#[tokio::test]
async fn test_file_cache_survives_new_engine() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(MemoryObjectStore::default());
    store.insert_text("stories/a.txt", "persistido");

    let first = EngineBuilder::new(store.clone())
        .with_fetcher(Arc::new(TestFetcher::cors_blocked()))
        .with_cache_store(Arc::new(FileCacheStore::new(temp.path())))
        .without_proxy()
        .build();
    first.resolve_text("a.txt").await.unwrap();
    drop(first);

    let empty = Arc::new(MemoryObjectStore::default());
    let second = EngineBuilder::new(empty)
        .with_fetcher(Arc::new(TestFetcher::cors_blocked()))
        .with_cache_store(Arc::new(FileCacheStore::new(temp.path())))
        .without_proxy()
        .build();

    let resolved = second.resolve_text("a.txt").await.unwrap();
    assert_eq!(resolved.value, "persistido");
    assert_eq!(resolved.source, ResolutionSource::Cache);

    second.clear(Some(CacheNamespace::Text)).await.unwrap();
    let stats = second.stats().await;
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.location.as_deref(), Some(temp.path()));
}
