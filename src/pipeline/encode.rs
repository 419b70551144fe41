//! Image encoding: uploaded image bytes → base64 payload for the vision model.
//!
//! Ollama vision models reliably decode PNG and JPEG only. Those two pass
//! through byte-for-byte; BMP, TIFF and WebP uploads are decoded and
//! re-encoded as lossless PNG first.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::ImageFormat;
use std::io::Cursor;
use tracing::debug;

/// A base64 image ready to attach to a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub base64: String,
    pub mime_type: &'static str,
}

impl EncodedImage {
    /// Attachment form used by `edgequake_llm` providers.
    pub fn to_image_data(&self) -> ImageData {
        ImageData::new(self.base64.clone(), self.mime_type).with_detail("high")
    }
}

/// Encode raw image bytes, converting to PNG when the format is not PNG/JPEG.
pub fn encode_image(bytes: &[u8]) -> Result<EncodedImage, image::ImageError> {
    let format = image::guess_format(bytes)?;

    let (payload, mime_type) = match format {
        ImageFormat::Png => (bytes.to_vec(), "image/png"),
        ImageFormat::Jpeg => (bytes.to_vec(), "image/jpeg"),
        other => {
            debug!("Re-encoding {:?} upload as PNG", other);
            let img = image::load_from_memory_with_format(bytes, other)?;
            let mut buf = Vec::new();
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            (buf, "image/png")
        }
    };

    let base64 = STANDARD.encode(&payload);
    debug!("Encoded image → {} bytes base64", base64.len());

    Ok(EncodedImage { base64, mime_type })
}
