//! Bing "HPImageArchive" feed client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::WallpaperFeed;
use crate::config::FeedConfig;
use crate::errors::{SourceError, SourceResult};
use crate::models::{FetchedWallpaper, ImageLocations, LogicalKey, WallpaperMetadata};

/// Resolutions Bing publishes for every wallpaper
pub const IMAGE_SIZES: [&str; 7] = [
    "UHD",
    "1920x1200",
    "1920x1080",
    "1366x768",
    "1280x720",
    "1024x768",
    "800x600",
];

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    images: Vec<ArchiveImage>,
}

#[derive(Debug, Deserialize)]
struct ArchiveImage {
    url: String,
    urlbase: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    copyright: String,
    #[serde(default)]
    copyrightlink: String,
    #[serde(default)]
    startdate: String,
    #[serde(default)]
    fullstartdate: String,
    #[serde(default)]
    enddate: String,
}

/// Image selected from an archive document
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSelection {
    pub download_url: String,
    pub image_urls: ImageLocations,
    pub metadata: WallpaperMetadata,
}

#[derive(Clone)]
pub struct BingFeedClient {
    client: Client,
    base_url: String,
    max_image_bytes: usize,
}

impl BingFeedClient {
    pub fn new(config: &FeedConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("dailyhues/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_image_bytes: config.max_image_bytes,
        })
    }

    fn archive_url(&self) -> String {
        format!("{}/HPImageArchive.aspx", self.base_url)
    }

    /// Look up the wallpaper metadata for `key`
    pub async fn fetch_metadata(&self, key: &LogicalKey) -> SourceResult<ArchiveSelection> {
        let url = self.archive_url();
        let days_ago = key.days_ago.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "js"),
                ("idx", days_ago.as_str()),
                ("n", "1"),
                ("mkt", key.locale.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::transport(&url, e))?;

        if !response.status().is_success() {
            return Err(SourceError::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::transport(&url, e))?;
        parse_archive(&body, &self.base_url, key)
    }

    /// Download the image body, refusing anything over the size limit
    pub async fn download(&self, url: &str) -> SourceResult<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::transport(url, e))?;

        if !response.status().is_success() {
            return Err(SourceError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length()
            && length as usize > self.max_image_bytes
        {
            return Err(SourceError::ImageTooLarge {
                size: length as usize,
                max_size: self.max_image_bytes,
            });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SourceError::transport(url, e))?
        {
            if bytes.len() + chunk.len() > self.max_image_bytes {
                return Err(SourceError::ImageTooLarge {
                    size: bytes.len() + chunk.len(),
                    max_size: self.max_image_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(SourceError::parse_error(format!("empty image body from {url}")));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl WallpaperFeed for BingFeedClient {
    async fn fetch(&self, key: &LogicalKey) -> SourceResult<FetchedWallpaper> {
        let selection = self.fetch_metadata(key).await?;
        let bytes = self.download(&selection.download_url).await?;

        debug!(
            key = %key,
            title = %selection.metadata.title,
            bytes = bytes.len(),
            "Downloaded wallpaper"
        );

        Ok(FetchedWallpaper {
            bytes,
            image_urls: selection.image_urls,
            metadata: selection.metadata,
        })
    }
}

/// Pick the first image of an archive document and expand its URLs
pub fn parse_archive(body: &str, base_url: &str, key: &LogicalKey) -> SourceResult<ArchiveSelection> {
    let archive: ArchiveResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::parse_error(format!("invalid archive document: {e}")))?;

    let image = archive
        .images
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::NoImage { key: key.to_string() })?;

    if image.url.is_empty() || image.urlbase.is_empty() {
        return Err(SourceError::NoImage { key: key.to_string() });
    }

    let base_url = base_url.trim_end_matches('/');
    let image_urls = IMAGE_SIZES
        .iter()
        .map(|size| {
            (
                (*size).to_string(),
                format!("{base_url}{}_{size}.jpg", image.urlbase),
            )
        })
        .collect();

    Ok(ArchiveSelection {
        download_url: format!("{base_url}{}", image.url),
        image_urls,
        metadata: WallpaperMetadata {
            title: image.title,
            copyright: image.copyright,
            copyright_link: image.copyrightlink,
            start_date: image.startdate,
            full_start_date: image.fullstartdate,
            end_date: image.enddate,
        },
    })
}
