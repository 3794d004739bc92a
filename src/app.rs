use crate::engine::SessionHandle;
use crate::model::{GenerationRequest, GenerativeModel};
use crate::notify::NotificationSink;
use crate::thumbnail::{ThumbnailError, create_thumbnail};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error("failed to read {path}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start the streaming thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// What a single run of the tool was asked to do.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub image: PathBuf,
    pub prompt: String,
    pub model: String,
    /// Where the notification icon is written.
    pub thumbnail_dir: PathBuf,
}

/// Validates the image, prepares its thumbnail and starts streaming the
/// model's answer into `sink` on a background thread.
///
/// Returns as soon as the stream is launched.
pub fn launch<M, S>(invocation: Invocation, model: M, sink: S) -> Result<SessionHandle, LaunchError>
where
    M: GenerativeModel + Send + 'static,
    S: NotificationSink + Send + 'static,
{
    let Invocation {
        image,
        prompt,
        model: model_name,
        thumbnail_dir,
    } = invocation;

    if !image.exists() {
        return Err(LaunchError::ImageNotFound(image));
    }

    let thumbnail = create_thumbnail(&image, &thumbnail_dir)?;

    let bytes = std::fs::read(&image).map_err(|source| LaunchError::ReadImage {
        path: image.clone(),
        source,
    })?;

    let request = GenerationRequest {
        image: bytes,
        prompt,
        model: model_name,
    };

    log::info!("Asking {} about {}", request.model, image.display());
    SessionHandle::spawn(model, sink, request, thumbnail).map_err(LaunchError::Spawn)
}
