use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::geometry::Size;

/// Decoded bitmap shown by the viewer.
///
/// Cloning is cheap; clones share the same pixel buffer. The intrinsic size
/// never changes once the handle exists.
#[derive(Clone)]
pub struct Image {
    pixels: Arc<RgbaImage>,
}

impl Image {
    /// Wraps an RGBA buffer, rejecting buffers without pixels.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptyImage { width, height });
        }
        Ok(Self {
            pixels: Arc::new(pixels),
        })
    }

    /// Decodes an encoded image (PNG, JPEG, GIF, WebP) from memory.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Self::from_rgba(decoded.to_rgba8())
    }

    /// Solid-color placeholder. Sides are clamped to at least one pixel.
    pub fn blank(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba(color));
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn size(&self) -> Size {
        let (w, h) = self.pixels.dimensions();
        Size::new(f64::from(w), f64::from(h))
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Whether both handles point at the same pixel buffer.
    pub fn same_as(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.pixels.dimensions();
        f.debug_struct("Image")
            .field("width", &w)
            .field("height", &h)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    // 2x1 opaque red PNG
    const RED_2X1_PNG: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAIAAAABCAIAAAB7QOjdAAAADUlEQVR4nGP4z8AARAAI/gH/xp559wAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_bytes() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(RED_2X1_PNG)
            .unwrap();
        let img = Image::decode(&bytes).unwrap();
        assert_eq!(img.size(), Size::new(2.0, 1.0));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Image::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let err = Image::from_rgba(RgbaImage::new(0, 10)).unwrap_err();
        assert!(matches!(err, Error::EmptyImage { width: 0, height: 10 }));
    }

    #[test]
    fn blank_is_never_empty() {
        let img = Image::blank(0, 0, [0, 0, 0, 255]);
        assert_eq!(img.size(), Size::new(1.0, 1.0));
        assert!(img.same_as(&img.clone()));
        assert!(!img.same_as(&Image::blank(1, 1, [0, 0, 0, 255])));
    }
}
