//! Inference pipeline boundary.
//!
//! Camera, model, display and codec live behind [`VisionBackend`]. The core
//! owns the parts with fixed semantics: centre crop, top-1 selection and the
//! per-iteration [`FrameRecord`].

use alloc::vec::Vec;

use crate::{error::PipelineError, transport::wire};

#[allow(async_fn_in_trait)]
pub trait VisionBackend {
    /// Blocks until the sensor delivers a frame; not retried by the core.
    async fn capture(&mut self) -> Result<Frame, PipelineError>;

    /// Fills one raw score per label.
    fn infer(&mut self, roi: &Frame, scores: &mut [f32]) -> Result<(), PipelineError>;

    /// Local display; `overlay` carries the result once classification ran.
    fn present(&mut self, frame: &Frame, overlay: Option<&Classification>);

    fn compress(&mut self, frame: &Frame, quality: u8) -> Result<Vec<u8>, PipelineError>;

    /// Drops cached buffers; called on every collection pass.
    fn release_scratch(&mut self) {}
}

/// RGB565 image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
}

impl Frame {
    pub fn new(width: u16, height: u16, pixels: Vec<u16>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u16, height: u16, color: u16) -> Self {
        Self {
            width,
            height,
            pixels: alloc::vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len() * 2
    }

    /// Centred `size` x `size` region, clamped to the frame bounds.
    pub fn crop_center(&self, size: u16) -> Frame {
        let width = size.min(self.width);
        let height = size.min(self.height);
        let x0 = (self.width - width) / 2;
        let y0 = (self.height - height) / 2;

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for row in y0..y0 + height {
            let start = row as usize * self.width as usize + x0 as usize;
            pixels.extend_from_slice(&self.pixels[start..start + width as usize]);
        }
        Frame {
            width,
            height,
            pixels,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub label: &'static str,
    pub confidence: f32,
}

/// Stable argmax: the first maximum wins and NaN never does.
pub fn top1(scores: &[f32], labels: &[&'static str]) -> Option<Classification> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((index, score)),
        }
    }

    let (index, confidence) = best?;
    let label = *labels.get(index)?;
    Some(Classification {
        index,
        label,
        confidence,
    })
}

/// One classified frame; consumed by value when it is put on the wire.
#[derive(Debug)]
pub struct FrameRecord {
    captured_at_ms: u64,
    classification: Classification,
    payload: Vec<u8>,
}

impl FrameRecord {
    pub fn new(captured_at_ms: u64, classification: Classification, payload: Vec<u8>) -> Self {
        Self {
            captured_at_ms,
            classification,
            payload,
        }
    }

    pub fn captured_at_ms(&self) -> u64 {
        self.captured_at_ms
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_message(self) -> Vec<u8> {
        wire::encode_record(&self.payload, &self.classification)
    }
}
