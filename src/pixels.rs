use image::{ImageBuffer, Rgba, RgbaImage, imageops::FilterType};

use crate::error::{ColorError, Result};

const CHANNELS: usize = 4;

/// Borrowed, row-major RGBA8 pixels owned by the caller.
#[derive(Clone, Copy, Debug)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(ColorError::BufferSize {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn from_image(img: &'a RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + 'a {
        self.data
            .chunks_exact(CHANNELS)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Scratch copy no wider than `max_width`, or `None` when the buffer
    /// already fits. Aspect ratio is kept and nothing is ever upscaled.
    pub fn downscaled(&self, max_width: u32) -> Option<RgbaImage> {
        if self.is_empty() || max_width == 0 || self.width <= max_width {
            return None;
        }
        let scale = max_width as f64 / self.width as f64;
        let new_w = ((self.width as f64 * scale).floor() as u32).clamp(1, self.width);
        let new_h = ((self.height as f64 * scale).floor() as u32).clamp(1, self.height);

        let view: ImageBuffer<Rgba<u8>, &[u8]> =
            ImageBuffer::from_raw(self.width, self.height, self.data)?;
        Some(image::imageops::resize(&view, new_w, new_h, FilterType::Triangle))
    }
}
