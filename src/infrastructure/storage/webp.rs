use image::ImageFormat;
use std::io::Cursor;
use tracing::debug;

/// Acceptance limits for post images.
#[derive(Debug, Clone, Copy)]
pub struct ImageRules {
    pub min_width: u32,
    pub min_height: u32,
    pub max_bytes: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageRejection {
    #[error("image exceeds {max} bytes")]
    TooLarge { max: usize },
    #[error("image is {width}x{height}, minimum is {min_width}x{min_height}")]
    TooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
    #[error("unsupported or corrupted image: {0}")]
    Undecodable(String),
}

/// Decodes any supported input and re-encodes it as WebP.
pub fn convert_to_webp(data: &[u8], rules: ImageRules) -> Result<Vec<u8>, ImageRejection> {
    if data.len() > rules.max_bytes {
        return Err(ImageRejection::TooLarge {
            max: rules.max_bytes,
        });
    }

    let img = image::load_from_memory(data)
        .map_err(|e| ImageRejection::Undecodable(e.to_string()))?;
    if img.width() < rules.min_width || img.height() < rules.min_height {
        return Err(ImageRejection::TooSmall {
            width: img.width(),
            height: img.height(),
            min_width: rules.min_width,
            min_height: rules.min_height,
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::WebP)
        .map_err(|e| ImageRejection::Undecodable(e.to_string()))?;
    let webp = buffer.into_inner();
    debug!(
        width = img.width(),
        height = img.height(),
        bytes = webp.len(),
        "image re-encoded as webp"
    );
    Ok(webp)
}
