//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

use dailyhues::analyzer::PaletteAnalyzer;
use dailyhues::cache::{AnalysisStore, RequestStore};
use dailyhues::errors::{AnalysisError, SourceError, SourceResult};
use dailyhues::models::{AnalysisHints, FetchedWallpaper, ImageLocations, LogicalKey, Palette, WallpaperMetadata};
use dailyhues::services::LookupOrchestrator;
use dailyhues::sources::WallpaperFeed;

/// Feed serving fixed bytes per locale, counting every fetch
#[derive(Default)]
pub struct CountingFeed {
    images: HashMap<String, Vec<u8>>,
    default_image: Vec<u8>,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingFeed {
    pub fn new(default_image: &[u8]) -> Self {
        Self {
            default_image: default_image.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, locale: &str, bytes: &[u8]) -> Self {
        self.images.insert(locale.to_string(), bytes.to_vec());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WallpaperFeed for CountingFeed {
    async fn fetch(&self, key: &LogicalKey) -> SourceResult<FetchedWallpaper> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Transport {
                url: "https://feed.internal:8443/secret-upstream-detail".to_string(),
                message: "connection refused".to_string(),
            });
        }

        let bytes = self
            .images
            .get(&key.locale)
            .unwrap_or(&self.default_image)
            .clone();
        Ok(FetchedWallpaper {
            bytes,
            image_urls: ImageLocations::from([(
                "1920x1080".to_string(),
                format!("https://www.bing.com/th?id=OHR.{}_1920x1080.jpg", key.locale),
            )]),
            metadata: WallpaperMetadata {
                title: format!("Wallpaper for {key}"),
                copyright: "Test Photographer".to_string(),
                start_date: "20251019".to_string(),
                ..Default::default()
            },
        })
    }
}

/// Analyzer whose palette is derived from the fingerprint, counting calls
#[derive(Default)]
pub struct CountingAnalyzer {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    delay: Option<Duration>,
    barrier: Option<Arc<Barrier>>,
}

impl CountingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every analysis waits until `barrier` is full
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn palette_for(hints: &AnalysisHints) -> Palette {
    let mut palette = Palette::new();
    palette.insert("gradient_from".into(), json!(format!("#{}", hints.fingerprint.short(6))));
    palette.insert("gradient_to".into(), json!("#456789"));
    palette.insert("gradient_angle".into(), json!(135));
    palette
}

#[async_trait]
impl PaletteAnalyzer for CountingAnalyzer {
    async fn analyze(&self, _bytes: &[u8], hints: &AnalysisHints) -> Result<Palette, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AnalysisError::Http {
                status: 500,
                body: "secret-analyzer-detail".to_string(),
            });
        }
        Ok(palette_for(hints))
    }
}

pub struct Harness {
    pub feed: Arc<CountingFeed>,
    pub analyzer: Arc<CountingAnalyzer>,
    pub orchestrator: Arc<LookupOrchestrator>,
}

pub fn harness(cache_dir: &Path, feed: CountingFeed, analyzer: CountingAnalyzer) -> Harness {
    let feed = Arc::new(feed);
    let analyzer = Arc::new(analyzer);
    let orchestrator = Arc::new(LookupOrchestrator::new(
        Arc::new(RequestStore::new(cache_dir)),
        Arc::new(AnalysisStore::new(cache_dir)),
        feed.clone(),
        analyzer.clone(),
        Duration::from_secs(3600),
    ));
    Harness {
        feed,
        analyzer,
        orchestrator,
    }
}
