//! Error type definitions for dailyhues
//!
//! Each layer owns an error enum; `AppError` is the umbrella the lookup
//! orchestrator and the web layer speak in.

use thiserror::Error;

/// Top-level application error type
///
/// Carries full diagnostic detail for logging. The web layer is responsible
/// for collapsing it into a sanitized client message.
#[derive(Error, Debug)]
pub enum AppError {
    /// The wallpaper feed could not produce an image for the key
    #[error("Upstream fetch failed: {0}")]
    Upstream(#[from] SourceError),

    /// The AI collaborator failed or returned garbage
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Wallpaper feed specific errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level failure talking to the feed
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Non-success HTTP status from the feed or the image host
    #[error("HTTP error: {status} from {url}")]
    Http { status: u16, url: String },

    /// Feed document could not be decoded
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Feed answered but had no image for the requested key
    #[error("No wallpaper available for {key}")]
    NoImage { key: String },

    /// Image body exceeded the configured limit
    #[error("Image too large: {size} bytes (max: {max_size})")]
    ImageTooLarge { size: usize, max_size: usize },
}

/// AI analysis specific errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// No API key configured for the analysis endpoint
    #[error("Analyzer API key is not configured")]
    MissingApiKey,

    /// Image could not be decoded or re-encoded before upload
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// Transport-level failure talking to the AI endpoint
    #[error("Request to analyzer failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from the AI endpoint
    #[error("Analyzer returned status {status}: {body}")]
    Http { status: u16, body: String },

    /// The endpoint reported an error object in its payload
    #[error("Analyzer API error: {message} (code: {code})")]
    Api { message: String, code: String },

    /// The endpoint answered without any choices
    #[error("Analyzer returned no response")]
    EmptyResponse,

    /// Response body was not the expected envelope
    #[error("Failed to decode analyzer response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The model reply did not contain a palette object
    #[error("Could not extract palette from response: {content}")]
    Unparseable { content: String },
}

/// Durable store errors
///
/// A failed write after the in-memory mirror has been updated is a
/// persistence warning: callers log it and carry on.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create a transport error from any displayable failure
    pub fn transport<U: Into<String>, E: std::fmt::Display>(url: U, error: E) -> Self {
        Self::Transport {
            url: url.into(),
            message: error.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}

impl StoreError {
    pub fn io<P: AsRef<std::path::Path>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
