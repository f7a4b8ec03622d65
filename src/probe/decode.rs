//! Image dimension decoding.

use std::io::Cursor;

use image::ImageReader;

use crate::error::ProbeError;

/// Pixel size of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Reads image dimensions from raw bytes.
pub trait Decode: Send + Sync + 'static {
    fn dimensions(&self, bytes: &[u8]) -> Result<Dimensions, ProbeError>;
}

/// Decoder backed by the `image` crate.
///
/// Only the header is read; the format is guessed from the content, not
/// from the URL or the response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decode for ImageDecoder {
    fn dimensions(&self, bytes: &[u8]) -> Result<Dimensions, ProbeError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .into_dimensions()?;
        Ok(Dimensions { width, height })
    }
}
