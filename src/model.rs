use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Ordered, single-pass sequence of text fragments produced by a model.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// A single prompt-plus-image request.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Raw bytes of the input image, as read from disk.
    pub image: Vec<u8>,
    /// Instruction sent alongside the image.
    pub prompt: String,
    /// Identifier of the remote model to run.
    pub model: String,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response blocked: {0}")]
    Blocked(String),

    #[error("unsupported image: {0}")]
    UnsupportedImage(String),
}

/// Trait for the remote generators the streaming engine can drive.
///
/// Opening the connection is part of consuming the stream: a failure to
/// connect shows up as the first item being an error.
pub trait GenerativeModel {
    fn stream(&mut self, request: GenerationRequest) -> FragmentStream;
}
