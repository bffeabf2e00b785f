//! End-to-end repair flow tests.
//!
//! These tests build a complete registry tree on disk (blobs, layer
//! links, revision links, tag indexes, tag links, and a seeded cache),
//! then drive it through the repair engine and the watcher's dispatch
//! loop, verifying:
//!
//! 1. Healthy images are left byte-for-byte alone
//! 2. Missing blobs lose every reference, across all repositories
//! 3. Corrupt blobs are deleted along with their references
//! 4. Repair is idempotent and dry-run is side-effect free
//! 5. Journal lines drive exactly the repairs they should
//!
//! ## Running
//!
//! ```bash
//! cargo test -p scour-e2e --test repair_flow
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use scour_digest::Digest;
use scour_repair::{RepairEngine, RepairReport};
use scour_store::{blob_presence_key, CacheStore, MemoryCache, RegistryLayout};

/// A scratch registry tree with a seeded in-memory cache.
struct Registry {
    _temp: TempDir,
    layout: RegistryLayout,
    cache: Arc<MemoryCache>,
}

impl Registry {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        Self {
            layout: RegistryLayout::new(temp.path()),
            cache: Arc::new(MemoryCache::new()),
            _temp: temp,
        }
    }

    fn engine(&self, dry_run: bool) -> RepairEngine {
        RepairEngine::new(self.layout.clone(), self.cache.clone(), dry_run)
    }

    async fn store_blob(&self, bytes: &[u8]) -> Digest {
        let digest = Digest::of_bytes(bytes);
        write_file(&self.layout.blob_data_path(&digest), bytes);
        self.cache.insert(blob_presence_key(&digest)).await;
        digest
    }

    /// Store a blob whose content does not hash to its claimed address.
    async fn store_corrupt_blob(&self, claimed: &[u8], actual: &[u8]) -> Digest {
        let digest = Digest::of_bytes(claimed);
        write_file(&self.layout.blob_data_path(&digest), actual);
        self.cache.insert(blob_presence_key(&digest)).await;
        digest
    }

    /// Wire a manifest, its links, and its cache entries into one
    /// repository the way the registry server would on push.
    async fn push_image(
        &self,
        repo: &str,
        tag: &str,
        config: &Digest,
        layers: &[&Digest],
    ) -> Digest {
        let manifest = serde_json::json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": {"digest": config.to_string(), "size": 1},
            "layers": layers
                .iter()
                .map(|d| serde_json::json!({"digest": d.to_string(), "size": 1}))
                .collect::<Vec<_>>(),
        });
        let manifest_digest = self.store_blob(manifest.to_string().as_bytes()).await;

        write_file(
            &self.layout.tag_current_link(repo, tag),
            manifest_digest.to_string().as_bytes(),
        );
        write_file(&self.layout.revision_link(repo, &manifest_digest), b"");
        write_file(&self.layout.tag_index_link(repo, tag, &manifest_digest), b"");

        for digest in std::iter::once(config).chain(layers.iter().copied()) {
            write_file(&self.layout.layer_link(repo, digest), b"");
            self.cache
                .insert(format!("repository::{repo}::layer::{}", digest.hex()))
                .await;
        }

        manifest_digest
    }
}

fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn healthy_image_survives_repair_untouched() {
    let registry = Registry::new();
    let config = registry.store_blob(b"config").await;
    let layer = registry.store_blob(b"layer").await;
    let manifest_digest = registry.push_image("myapp", "v1", &config, &[&layer]).await;

    let cache_before = registry.cache.len().await;
    let report = registry
        .engine(false)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.healthy, 2);
    assert_eq!(report.manifest_digest, Some(manifest_digest.clone()));

    assert!(registry.layout.blob_data_path(&config).exists());
    assert!(registry.layout.blob_data_path(&layer).exists());
    assert!(registry.layout.blob_data_path(&manifest_digest).exists());
    assert!(registry.layout.layer_link("myapp", &layer).exists());
    assert!(registry.layout.tag_current_link("myapp", "v1").exists());
    assert_eq!(registry.cache.len().await, cache_before);
}

#[tokio::test]
async fn corrupt_layer_is_pruned_and_deleted_config_untouched() {
    let registry = Registry::new();
    let config = registry.store_blob(b"config bytes").await;
    let corrupt = registry
        .store_corrupt_blob(b"claimed layer", b"tampered layer")
        .await;
    registry
        .push_image("myapp", "v1", &config, &[&corrupt])
        .await;

    let report = registry
        .engine(false)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();

    assert_eq!(report.healthy, 1);
    assert_eq!(report.mismatched, 1);

    // Every trace of the corrupt digest is gone, blob included.
    assert!(!registry.layout.blob_data_path(&corrupt).exists());
    assert!(!registry.layout.layer_link("myapp", &corrupt).exists());
    assert!(!registry.cache.contains(&blob_presence_key(&corrupt)).await);
    assert!(
        registry
            .cache
            .keys_matching(corrupt.hex())
            .await
            .unwrap()
            .is_empty()
    );

    // The healthy config and the tag link are untouched.
    assert!(registry.layout.blob_data_path(&config).exists());
    assert!(registry.layout.layer_link("myapp", &config).exists());
    assert!(registry.layout.tag_current_link("myapp", "v1").exists());
}

#[tokio::test]
async fn missing_layer_is_pruned_across_all_repositories() {
    let registry = Registry::new();
    let config_a = registry.store_blob(b"config a").await;
    let config_b = registry.store_blob(b"config b").await;
    let shared = registry.store_blob(b"shared layer").await;
    registry.push_image("alpha", "v1", &config_a, &[&shared]).await;
    registry.push_image("beta", "v2", &config_b, &[&shared]).await;

    // The shared layer blob vanishes out from under both repositories.
    fs::remove_file(registry.layout.blob_data_path(&shared)).unwrap();

    let report = registry
        .engine(false)
        .repair_tag("alpha", "v1", false)
        .await
        .unwrap();

    assert_eq!(report.missing, 1);
    assert!(!registry.layout.layer_link("alpha", &shared).exists());
    assert!(!registry.layout.layer_link("beta", &shared).exists());
    assert!(
        registry
            .cache
            .keys_matching(shared.hex())
            .await
            .unwrap()
            .is_empty()
    );

    // Beta's own config is not alpha's problem.
    assert!(registry.layout.layer_link("beta", &config_b).exists());
}

#[tokio::test]
async fn repair_is_idempotent() {
    let registry = Registry::new();
    let config = registry.store_blob(b"config").await;
    let corrupt = registry.store_corrupt_blob(b"claimed", b"actual").await;
    registry
        .push_image("myapp", "v1", &config, &[&corrupt])
        .await;

    let first = registry
        .engine(false)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();
    assert_eq!(first.mismatched, 1);

    // The second pass finds the layer already gone and changes nothing.
    let second = registry
        .engine(false)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();
    assert_eq!(second.mismatched, 0);
    assert_eq!(second.missing, 1);

    let third = registry
        .engine(false)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();
    assert_eq!(third, second);
}

#[tokio::test]
async fn dry_run_reports_the_same_actions_without_side_effects() {
    async fn build() -> (Registry, Digest) {
        let registry = Registry::new();
        let config = registry.store_blob(b"config").await;
        let corrupt = registry.store_corrupt_blob(b"claimed", b"actual").await;
        registry
            .push_image("myapp", "v1", &config, &[&corrupt])
            .await;
        (registry, corrupt)
    }

    let (dry_registry, dry_corrupt) = build().await;
    let cache_before = dry_registry.cache.len().await;
    let dry: RepairReport = dry_registry
        .engine(true)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();

    // Identical state, real run.
    let (real_registry, _) = build().await;
    let real = real_registry
        .engine(false)
        .repair_tag("myapp", "v1", false)
        .await
        .unwrap();

    assert_eq!(dry, real);

    // The dry run touched nothing.
    assert!(dry_registry.layout.blob_data_path(&dry_corrupt).exists());
    assert!(dry_registry.layout.layer_link("myapp", &dry_corrupt).exists());
    assert_eq!(dry_registry.cache.len().await, cache_before);
}

#[tokio::test]
async fn delete_tag_removes_the_tag_and_its_references() {
    let registry = Registry::new();
    let config = registry.store_blob(b"config").await;
    let layer = registry.store_blob(b"layer").await;
    let manifest_digest = registry.push_image("myapp", "v1", &config, &[&layer]).await;

    let report = registry
        .engine(false)
        .repair_tag("myapp", "v1", true)
        .await
        .unwrap();

    assert!(report.tag_removed);
    assert!(!registry.layout.tag_dir("myapp", "v1").exists());
    assert!(!registry
        .layout
        .revision_link("myapp", &manifest_digest)
        .exists());
    // Healthy blobs stay: tag deletion removes references, not content.
    assert!(registry.layout.blob_data_path(&manifest_digest).exists());
    assert!(registry.layout.blob_data_path(&layer).exists());
}

mod watcher_flow {
    use super::*;
    use async_trait::async_trait;
    use scour_watcher::{
        Dispatcher, EventReader, InvokeError, PushEvent, RepairInvoker,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::{Duration, Instant};

    struct ScriptedReader {
        lines: VecDeque<String>,
    }

    #[async_trait]
    impl EventReader for ScriptedReader {
        async fn next_line(&mut self) -> Option<String> {
            self.lines.pop_front()
        }
    }

    /// Drives the repair engine in-process instead of spawning the CLI.
    struct EngineInvoker {
        engine: RepairEngine,
        repaired: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RepairInvoker for EngineInvoker {
        async fn invoke(&self, event: &PushEvent) -> Result<(), InvokeError> {
            self.engine
                .repair_tag(&event.repository, &event.tag, false)
                .await
                .map_err(|_| InvokeError::Failed { code: Some(1) })?;
            self.repaired
                .lock()
                .unwrap()
                .push((event.repository.clone(), event.tag.clone()));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn journal_lines_drive_repairs_at_the_gated_rate() {
        let registry = Registry::new();
        let config = registry.store_blob(b"config").await;
        let corrupt = registry.store_corrupt_blob(b"claimed", b"actual").await;
        registry
            .push_image("myapp", "v1.2.3", &config, &[&corrupt])
            .await;
        let healthy_config = registry.store_blob(b"other config").await;
        registry
            .push_image("other", "latest", &healthy_config, &[])
            .await;

        let mut reader = ScriptedReader {
            lines: VecDeque::from([
                r#"registry[7]: "PUT /v2/myapp/manifests/v1.2.3 HTTP/1.1" 201"#.to_string(),
                r#"registry[7]: "GET /v2/myapp/manifests/v1.2.3 HTTP/1.1" 200"#.to_string(),
                r#"registry[7]: "PUT /v2/other/manifests/latest HTTP/1.1" 201"#.to_string(),
            ]),
        };
        let invoker = EngineInvoker {
            engine: registry.engine(false),
            repaired: Mutex::new(Vec::new()),
        };
        let mut dispatcher = Dispatcher::new(Duration::from_secs(5));

        let start = Instant::now();
        let stats = dispatcher.run(&mut reader, &invoker).await;

        // The GET line dispatched nothing; two pushes, one cooldown apart.
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.failures, 0);
        assert!(start.elapsed() >= Duration::from_secs(5));

        let repaired = invoker.repaired.lock().unwrap();
        assert_eq!(
            *repaired,
            vec![
                ("myapp".to_string(), "v1.2.3".to_string()),
                ("other".to_string(), "latest".to_string()),
            ]
        );

        // The repair actually happened on disk.
        assert!(!registry.layout.blob_data_path(&corrupt).exists());
        assert!(registry.layout.blob_data_path(&config).exists());
    }
}
