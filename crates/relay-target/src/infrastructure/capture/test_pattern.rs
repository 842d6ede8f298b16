//! Synthetic frame source: a scrolling gradient, for platforms without a
//! capture backend and for tests.

use crate::application::capture::{CaptureError, FrameSource};

use super::encode_jpeg;

/// Renders a gradient that shifts one step per frame.
#[derive(Debug)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    quality: u8,
    frame: u32,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
            frame: 0,
        }
    }

    fn render(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let shifted = x.wrapping_add(self.frame.wrapping_mul(4));
                rgb.push((shifted % 256) as u8);
                rgb.push((y % 256) as u8);
                rgb.push((self.frame % 256) as u8);
            }
        }
        rgb
    }
}

impl FrameSource for TestPatternSource {
    fn capture(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::Unavailable("empty test pattern".into()));
        }
        let jpeg = encode_jpeg(&self.render(), self.width, self.height, self.quality)?;
        self.frame = self.frame.wrapping_add(1);
        Ok(jpeg)
    }
}
