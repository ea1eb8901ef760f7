//! Bring-up vision backend.
//!
//! Stands in for camera, model, display and codec until the board bindings
//! exist: it renders a synthetic scene, scores it against one reference colour
//! per label and emits a decimated RGB332 image. Every trait contract of the
//! real backend holds, so the control loop runs unchanged on hardware.

use alloc::vec::Vec;

use embassy_time::Timer;
use log::{debug, info};

use crate::{
    error::PipelineError,
    pipeline::{Classification, Frame, VisionBackend},
};

pub const FRAME_WIDTH: u16 = 128;
pub const FRAME_HEIGHT: u16 = 96;
const CAPTURE_LATENCY_MS: u64 = 40;
// The scene changes every this many frames.
const FRAMES_PER_SCENE: u32 = 8;
const ENCODED_MAGIC: [u8; 2] = *b"R3";

/// Reference colours as (r, g, b) in 0..=255, in label table order.
const PROTOTYPES: [(u8, u8, u8); 5] = [
    (200, 30, 40),
    (230, 210, 60),
    (240, 140, 30),
    (150, 200, 80),
    (110, 40, 130),
];

pub struct TestPatternVision {
    frame_index: u32,
}

impl TestPatternVision {
    pub const fn new() -> Self {
        Self { frame_index: 0 }
    }
}

impl Default for TestPatternVision {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionBackend for TestPatternVision {
    async fn capture(&mut self) -> Result<Frame, PipelineError> {
        Timer::after_millis(CAPTURE_LATENCY_MS).await;

        let scene = (self.frame_index / FRAMES_PER_SCENE) as usize % PROTOTYPES.len();
        self.frame_index = self.frame_index.wrapping_add(1);
        let (r, g, b) = PROTOTYPES[scene];

        let len = FRAME_WIDTH as usize * FRAME_HEIGHT as usize;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| PipelineError::OutOfMemory)?;
        for y in 0..FRAME_HEIGHT {
            for x in 0..FRAME_WIDTH {
                // Subject in the middle, darker border around it.
                let inside = x >= FRAME_WIDTH / 4
                    && x < FRAME_WIDTH * 3 / 4
                    && y >= FRAME_HEIGHT / 4
                    && y < FRAME_HEIGHT * 3 / 4;
                let shade = if inside { 0 } else { 1 };
                pixels.push(rgb565(r >> shade, g >> shade, b >> shade));
            }
        }
        Frame::new(FRAME_WIDTH, FRAME_HEIGHT, pixels).ok_or(PipelineError::Capture)
    }

    fn infer(&mut self, roi: &Frame, scores: &mut [f32]) -> Result<(), PipelineError> {
        if scores.is_empty() || roi.pixels().is_empty() {
            return Err(PipelineError::Inference);
        }

        let (mut sum_r, mut sum_g, mut sum_b) = (0u32, 0u32, 0u32);
        for &pixel in roi.pixels() {
            let (r, g, b) = rgb565_channels(pixel);
            sum_r += r as u32;
            sum_g += g as u32;
            sum_b += b as u32;
        }
        let count = roi.pixels().len() as u32;
        let mean = (sum_r / count, sum_g / count, sum_b / count);

        let mut total = 0.0f32;
        for (index, score) in scores.iter_mut().enumerate() {
            *score = match PROTOTYPES.get(index) {
                Some(&(r, g, b)) => {
                    let dr = mean.0 as f32 - r as f32;
                    let dg = mean.1 as f32 - g as f32;
                    let db = mean.2 as f32 - b as f32;
                    1.0 / (1.0 + (dr * dr + dg * dg + db * db) / 1024.0)
                }
                None => 0.0,
            };
            total += *score;
        }
        if total > 0.0 {
            for score in scores.iter_mut() {
                *score /= total;
            }
        }
        Ok(())
    }

    fn present(&mut self, frame: &Frame, overlay: Option<&Classification>) {
        match overlay {
            None => debug!("display: frame {}x{}", frame.width(), frame.height()),
            Some(result) => info!(
                "display: label={} confidence={}",
                result.label, result.confidence
            ),
        }
    }

    /// `R3`, width and height (u16 BE), then one RGB332 byte per sampled
    /// pixel. Lower quality samples a sparser grid.
    fn compress(&mut self, frame: &Frame, quality: u8) -> Result<Vec<u8>, PipelineError> {
        let stride = decimation_stride(quality);
        let out_width = frame.width().div_ceil(stride);
        let out_height = frame.height().div_ceil(stride);

        let mut out = Vec::new();
        out.try_reserve_exact(6 + out_width as usize * out_height as usize)
            .map_err(|_| PipelineError::OutOfMemory)?;
        out.extend_from_slice(&ENCODED_MAGIC);
        out.extend_from_slice(&out_width.to_be_bytes());
        out.extend_from_slice(&out_height.to_be_bytes());

        for y in (0..frame.height()).step_by(stride as usize) {
            for x in (0..frame.width()).step_by(stride as usize) {
                let pixel = frame.pixel(x, y).ok_or(PipelineError::Encode)?;
                out.push(rgb332(pixel));
            }
        }
        Ok(out)
    }
}

fn decimation_stride(quality: u8) -> u16 {
    1 + (100 - quality.clamp(1, 100) as u16) / 25
}

const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    (((r as u16) >> 3) << 11) | (((g as u16) >> 2) << 5) | ((b as u16) >> 3)
}

const fn rgb565_channels(pixel: u16) -> (u8, u8, u8) {
    (
        ((pixel >> 11) as u8 & 0x1F) << 3,
        ((pixel >> 5) as u8 & 0x3F) << 2,
        (pixel as u8 & 0x1F) << 3,
    )
}

const fn rgb332(pixel: u16) -> u8 {
    let (r, g, b) = rgb565_channels(pixel);
    (r & 0xE0) | ((g & 0xE0) >> 3) | (b >> 6)
}
