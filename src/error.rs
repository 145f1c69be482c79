use thiserror::Error;

/// Errors surfaced to callers of the color engine.
///
/// Data-quality problems (flat images, scenes with bad levels) never show up
/// here; they fall back to defined values and are logged instead.
#[derive(Debug, Error)]
pub enum ColorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("RGBA buffer of {len} bytes does not match {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unable to read image file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ColorError> = std::result::Result<T, E>;
