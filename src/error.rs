use thiserror::Error;

/// Library error type for lightbox operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP transport failed before a response body was read.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The server answered, but not with a success status.
    #[error("unexpected status {status} fetching {url}")]
    Status {
        status: reqwest::StatusCode,
        url: reqwest::Url,
    },

    /// The fetched bytes are not a decodable image.
    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// An image with zero width or height cannot be presented.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// The background decode task panicked or was aborted.
    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration or scenario error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
