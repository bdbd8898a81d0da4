//! Frame buffer type.
//!
//! A `Frame` is a transient, owned pixel buffer produced by a frame source
//! and consumed by the classifier within the same loop iteration. Frames
//! have no identity beyond their content and are superseded on the next
//! capture; nothing in the crate stores them.

use anyhow::{anyhow, Result};

/// A single captured image.
///
/// Pixels are stored row-major, interleaved (e.g. RGBRGB... for 3 channels).
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl Frame {
    /// Create a frame, validating that the buffer matches the metadata.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(channels as usize))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer is {} bytes, expected {} for {}x{}x{}",
                pixels.len(),
                expected,
                width,
                height,
                channels
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            channels,
        })
    }

    /// Convenience constructor for 3-channel RGB frames.
    pub fn rgb(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        Self::new(pixels, width, height, 3)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
