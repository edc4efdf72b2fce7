//! Logical key -> palette resolution
//!
//! Expensive work (image download, AI analysis) only happens on a miss,
//! and at most one analysis per unique image is ever in flight. The two
//! reads of the analysis store around the fingerprint lock are both
//! required: the first skips the lock for images another key already
//! analyzed, the second collapses callers that raced to the same miss.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analyzer::PaletteAnalyzer;
use crate::cache::{AnalysisStore, RequestStore, fingerprint};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AnalysisHints, ContentFingerprint, FetchedWallpaper, LogicalKey, Palette, Resolution,
};
use crate::sources::WallpaperFeed;

pub struct LookupOrchestrator {
    request_store: Arc<RequestStore>,
    analysis_store: Arc<AnalysisStore>,
    feed: Arc<dyn WallpaperFeed>,
    analyzer: Arc<dyn PaletteAnalyzer>,
    expiry_interval: Duration,
}

impl LookupOrchestrator {
    pub fn new(
        request_store: Arc<RequestStore>,
        analysis_store: Arc<AnalysisStore>,
        feed: Arc<dyn WallpaperFeed>,
        analyzer: Arc<dyn PaletteAnalyzer>,
        expiry_interval: Duration,
    ) -> Self {
        Self {
            request_store,
            analysis_store,
            feed,
            analyzer,
            expiry_interval,
        }
    }

    pub fn request_store(&self) -> &Arc<RequestStore> {
        &self.request_store
    }

    pub fn analysis_store(&self) -> &Arc<AnalysisStore> {
        &self.analysis_store
    }

    /// Resolve `key` to a palette, downloading and analyzing only when
    /// nothing cached can answer it.
    pub async fn resolve(&self, key: &LogicalKey) -> AppResult<Resolution> {
        // Fast path: fresh request entry whose analysis is known. No lock, no I/O.
        if let Some(entry) = self.request_store.get(key).await
            && entry.is_fresh(Utc::now())
            && let Some(analysis) = self.analysis_store.get(&entry.fingerprint).await
        {
            debug!(key = %key, fingerprint = %entry.fingerprint.short(12), "Request cache hit");
            return Ok(Resolution {
                palette: analysis.palette.clone(),
                image_urls: entry.image_urls.clone(),
                metadata: entry.metadata.clone(),
                from_cache: true,
            });
        }

        // Miss or stale: ask the feed what is current for this key.
        let wallpaper = self.feed.fetch(key).await?;
        let fp = fingerprint(&wallpaper.bytes);

        // Cross-key hit: the same bytes were already analyzed, possibly under another key.
        if let Some(analysis) = self.analysis_store.get(&fp).await {
            info!(key = %key, fingerprint = %fp.short(12), "Image already analyzed, reusing palette");
            return Ok(self.commit_request(key, &fp, wallpaper, analysis.palette.clone(), true).await);
        }

        // True miss: serialize on the fingerprint.
        let lock = self.analysis_store.acquire_lock(&fp).await;
        let _guard = lock.lock().await;

        // Double-check: someone may have finished the analysis while we waited.
        if let Some(analysis) = self.analysis_store.get(&fp).await {
            debug!(key = %key, fingerprint = %fp.short(12), "Analysis completed while waiting for lock");
            return Ok(self.commit_request(key, &fp, wallpaper, analysis.palette.clone(), true).await);
        }

        info!(key = %key, fingerprint = %fp.short(12), title = %wallpaper.metadata.title, "Analyzing new wallpaper");
        let hints = AnalysisHints {
            fingerprint: fp.clone(),
            title: wallpaper.metadata.title.clone(),
            copyright: wallpaper.metadata.copyright.clone(),
        };
        let palette = self.analyzer.analyze(&wallpaper.bytes, &hints).await?;

        // Commit: analysis first, so a request entry never points at nothing.
        if let Err(e) = self.analysis_store.set(&fp, palette.clone()).await {
            warn!(fingerprint = %fp, "Persistence warning, analysis kept in memory only: {}", e);
        }
        Ok(self.commit_request(key, &fp, wallpaper, palette, false).await)
        // `_guard` drops here, releasing the fingerprint lock
    }

    /// Run `resolve` on its own task so a dropped caller does not cancel
    /// work other callers may be waiting on.
    pub async fn resolve_detached(self: &Arc<Self>, key: LogicalKey) -> AppResult<Resolution> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.resolve(&key).await })
            .await
            .map_err(|e| AppError::internal(format!("Resolution task failed: {e}")))?
    }

    /// Next multiple of the expiry interval after `now`, counted from the
    /// Unix epoch. With the default hour this is the top of the next hour.
    ///
    /// A boundary past the representable range saturates to the latest
    /// representable instant.
    pub fn expiry_for(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let interval = i64::try_from(self.expiry_interval.as_secs())
            .unwrap_or(i64::MAX)
            .max(1);
        now.timestamp()
            .div_euclid(interval)
            .checked_add(1)
            .and_then(|n| n.checked_mul(interval))
            .and_then(|next| DateTime::<Utc>::from_timestamp(next, 0))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn commit_request(
        &self,
        key: &LogicalKey,
        fp: &ContentFingerprint,
        wallpaper: FetchedWallpaper,
        palette: Palette,
        from_cache: bool,
    ) -> Resolution {
        let FetchedWallpaper {
            image_urls,
            metadata,
            ..
        } = wallpaper;

        let expires_at = self.expiry_for(Utc::now());
        if let Err(e) = self
            .request_store
            .set(key, fp, image_urls.clone(), metadata.clone(), expires_at)
            .await
        {
            warn!(key = %key, "Persistence warning, request entry kept in memory only: {}", e);
        }

        Resolution {
            palette,
            image_urls,
            metadata,
            from_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MockPaletteAnalyzer;
    use crate::errors::{AnalysisError, SourceError};
    use crate::models::{ImageLocations, WallpaperMetadata};
    use crate::sources::MockWallpaperFeed;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn wallpaper(bytes: &[u8]) -> FetchedWallpaper {
        FetchedWallpaper {
            bytes: bytes.to_vec(),
            image_urls: ImageLocations::from([("UHD".to_string(), "https://example.com/a_UHD.jpg".to_string())]),
            metadata: WallpaperMetadata {
                title: "Test".to_string(),
                ..Default::default()
            },
        }
    }

    fn palette() -> Palette {
        let mut p = Palette::new();
        p.insert("gradient_from".into(), json!("#34495e"));
        p
    }

    fn orchestrator(
        tmp: &TempDir,
        feed: MockWallpaperFeed,
        analyzer: MockPaletteAnalyzer,
    ) -> LookupOrchestrator {
        LookupOrchestrator::new(
            Arc::new(RequestStore::new(tmp.path())),
            Arc::new(AnalysisStore::new(tmp.path())),
            Arc::new(feed),
            Arc::new(analyzer),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_feed_failure_is_upstream_error_and_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut feed = MockWallpaperFeed::new();
        feed.expect_fetch()
            .times(1)
            .returning(|_| Err(SourceError::Http { status: 503, url: "https://feed".into() }));
        let mut analyzer = MockPaletteAnalyzer::new();
        analyzer.expect_analyze().never();

        let orchestrator = orchestrator(&tmp, feed, analyzer);
        let key = LogicalKey::new("en-US", 0);
        let err = orchestrator.resolve(&key).await.unwrap_err();

        assert!(matches!(err, AppError::Upstream(SourceError::Http { status: 503, .. })));
        assert!(orchestrator.request_store().get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_analysis_failure_writes_nothing_and_releases_lock() {
        let tmp = TempDir::new().unwrap();
        let mut feed = MockWallpaperFeed::new();
        feed.expect_fetch().times(2).returning(|_| Ok(wallpaper(b"image")));
        let mut analyzer = MockPaletteAnalyzer::new();
        let mut seq = mockall::Sequence::new();
        analyzer
            .expect_analyze()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AnalysisError::EmptyResponse));
        analyzer
            .expect_analyze()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(palette()));

        let orchestrator = orchestrator(&tmp, feed, analyzer);
        let key = LogicalKey::new("en-US", 0);

        let err = orchestrator.resolve(&key).await.unwrap_err();
        assert!(matches!(err, AppError::Analysis(AnalysisError::EmptyResponse)));
        assert!(orchestrator.analysis_store().is_empty().await);
        assert!(orchestrator.request_store().is_empty().await);

        // Would hang if the failed attempt had kept the lock
        let resolution = tokio::time::timeout(Duration::from_secs(5), orchestrator.resolve(&key))
            .await
            .expect("lock was not released")
            .unwrap();
        assert_eq!(resolution.palette, palette());
        assert!(!resolution.from_cache);
    }

    #[tokio::test]
    async fn test_cross_key_hit_skips_analyzer() {
        let tmp = TempDir::new().unwrap();
        let mut feed = MockWallpaperFeed::new();
        feed.expect_fetch().returning(|_| Ok(wallpaper(b"shared")));
        let mut analyzer = MockPaletteAnalyzer::new();
        analyzer.expect_analyze().never();

        let orchestrator = orchestrator(&tmp, feed, analyzer);
        orchestrator
            .analysis_store()
            .set(&fingerprint(b"shared"), palette())
            .await
            .unwrap();

        let key = LogicalKey::new("ja-JP", 0);
        let resolution = orchestrator.resolve(&key).await.unwrap();
        assert!(resolution.from_cache);
        assert_eq!(resolution.palette, palette());

        let entry = orchestrator.request_store().get(&key).await.unwrap();
        assert_eq!(entry.fingerprint, fingerprint(b"shared"));
        assert!(entry.is_fresh(Utc::now()));
    }

    #[tokio::test]
    async fn test_request_persistence_failure_still_answers() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("requests"), b"blocker").unwrap();
        let mut feed = MockWallpaperFeed::new();
        feed.expect_fetch().times(1).returning(|_| Ok(wallpaper(b"image")));
        let mut analyzer = MockPaletteAnalyzer::new();
        analyzer.expect_analyze().times(1).returning(|_, _| Ok(palette()));

        let orchestrator = orchestrator(&tmp, feed, analyzer);
        let key = LogicalKey::new("en-US", 0);
        let resolution = orchestrator.resolve(&key).await.unwrap();
        assert_eq!(resolution.palette, palette());

        // Memory mirror is authoritative, so the next call is a pure hit
        let again = orchestrator.resolve(&key).await.unwrap();
        assert!(again.from_cache);
    }

    #[tokio::test]
    async fn test_expiry_is_next_interval_boundary() {
        let tmp = TempDir::new().unwrap();
        let orchestrator = orchestrator(&tmp, MockWallpaperFeed::new(), MockPaletteAnalyzer::new());

        let now = Utc.with_ymd_and_hms(2025, 10, 19, 7, 42, 13).unwrap();
        assert_eq!(
            orchestrator.expiry_for(now),
            Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap()
        );

        let on_boundary = Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap();
        assert_eq!(
            orchestrator.expiry_for(on_boundary),
            Utc.with_ymd_and_hms(2025, 10, 19, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_expiry_saturates_for_huge_intervals() {
        let tmp = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 10, 19, 7, 42, 13).unwrap();

        for interval in [Duration::MAX, Duration::from_secs(i64::MAX as u64), Duration::from_secs(1 << 40)] {
            let orchestrator = LookupOrchestrator::new(
                Arc::new(RequestStore::new(tmp.path())),
                Arc::new(AnalysisStore::new(tmp.path())),
                Arc::new(MockWallpaperFeed::new()),
                Arc::new(MockPaletteAnalyzer::new()),
                interval,
            );
            assert!(orchestrator.expiry_for(now) > now, "{interval:?}");
        }
    }

    /// Feed that reports when it starts and then waits to be released
    struct GatedFeed {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl WallpaperFeed for GatedFeed {
        async fn fetch(&self, _key: &LogicalKey) -> crate::errors::SourceResult<FetchedWallpaper> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(wallpaper(b"image"))
        }
    }

    #[tokio::test]
    async fn test_resolve_detached_survives_dropped_caller() {
        let tmp = TempDir::new().unwrap();
        let feed = Arc::new(GatedFeed {
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let mut analyzer = MockPaletteAnalyzer::new();
        analyzer.expect_analyze().times(1).returning(|_, _| Ok(palette()));
        let orchestrator = Arc::new(LookupOrchestrator::new(
            Arc::new(RequestStore::new(tmp.path())),
            Arc::new(AnalysisStore::new(tmp.path())),
            feed.clone(),
            Arc::new(analyzer),
            Duration::from_secs(3600),
        ));
        let key = LogicalKey::new("en-US", 0);

        let caller = {
            let orchestrator = orchestrator.clone();
            let key = key.clone();
            tokio::spawn(async move { orchestrator.resolve_detached(key).await })
        };

        // Drop the caller while the resolution is inside the feed call
        feed.started.notified().await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());
        feed.release.notify_one();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while orchestrator.request_store().get(&key).await.is_none() {
            assert!(tokio::time::Instant::now() < deadline, "detached resolution never committed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(orchestrator.analysis_store().get(&fingerprint(b"image")).await.is_some());
    }
}
