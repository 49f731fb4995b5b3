use crate::ExtractionError;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Decoded-and-verified upload, ready to be sent to the model.
#[derive(Debug)]
pub struct PreparedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decodes an uploaded image and re-encodes it as JPEG when it is in another format.
///
/// The decoded pixel buffer is dropped before returning. This is CPU bound; call it from a
/// blocking thread.
pub fn prepare_image(bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    if format == ImageFormat::Jpeg {
        return Ok(PreparedImage {
            jpeg: bytes.to_vec(),
            width,
            height,
        });
    }

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(decoded.to_rgb8())
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
    Ok(PreparedImage {
        jpeg,
        width,
        height,
    })
}
