use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest width or height of a generated thumbnail, in pixels.
pub const THUMBNAIL_BOUND: u32 = 128;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode thumbnail: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to create thumbnail file: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes a PNG copy of `source`, shrunk to fit within [`THUMBNAIL_BOUND`],
/// to a new file in `dir` and returns its path.
///
/// The file is left on disk: the notification daemon may read the icon
/// after this process is gone.
pub fn create_thumbnail(source: &Path, dir: &Path) -> Result<PathBuf, ThumbnailError> {
    // format comes from the file contents, the extension is only a fallback
    let image = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(|source_err| ThumbnailError::Decode {
            path: source.to_path_buf(),
            source: source_err,
        })?;

    let thumbnail = shrink_to_bound(image, THUMBNAIL_BOUND);

    let file = tempfile::Builder::new()
        .prefix("kuasimi-")
        .suffix(".png")
        .tempfile_in(dir)?;
    thumbnail.save_with_format(file.path(), ImageFormat::Png)?;
    let path = file.into_temp_path().keep().map_err(|e| e.error)?;

    log::debug!(
        "Thumbnail {}x{} written to {}",
        thumbnail.width(),
        thumbnail.height(),
        path.display()
    );
    Ok(path)
}

// never upscales
fn shrink_to_bound(image: DynamicImage, bound: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= bound && height <= bound {
        return image;
    }
    image.thumbnail(bound, bound)
}
