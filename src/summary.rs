use serde::{Deserialize, Serialize};

use crate::color::rgb_to_hsv;
use crate::config::SummaryConfig;
use crate::pixels::PixelBuffer;

const BUCKETS: usize = 360;

/// Per-image HSV signature stored with each scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub avg_s: f64,
    pub avg_v: f64,
    /// Dominant hue bucket, 0..=359.
    pub dom_h: u16,
}

/// Grid-sampled average saturation/value and dominant hue.
#[derive(Clone, Debug, Default)]
pub struct ImageSummarizer {
    config: SummaryConfig,
}

impl ImageSummarizer {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    /// Images with no qualifying sample summarize to all zeros.
    pub fn summarize(&self, buffer: &PixelBuffer<'_>) -> ImageSummary {
        let scratch = buffer.downscaled(self.config.max_width);
        let work = match &scratch {
            Some(img) => PixelBuffer::from_image(img),
            None => *buffer,
        };
        if work.is_empty() {
            return ImageSummary::default();
        }

        let step = sample_step(work.width(), work.height(), self.config.grid_divisor);
        let mut s_sum = 0.0;
        let mut v_sum = 0.0;
        let mut count = 0u32;
        let mut hue_bins = [0.0f64; BUCKETS];

        for y in (0..work.height()).step_by(step) {
            for x in (0..work.width()).step_by(step) {
                let [r, g, b, a] = work.pixel(x, y);
                if a < self.config.alpha_threshold {
                    continue;
                }
                let hsv = rgb_to_hsv(r, g, b);
                if hsv.v < self.config.v_min {
                    continue;
                }

                s_sum += hsv.s;
                v_sum += hsv.v;
                count += 1;

                let bucket = hsv.h.degrees().round() as usize % BUCKETS;
                hue_bins[bucket] += (0.3 + hsv.s) * (0.3 + hsv.v);
            }
        }

        if count == 0 {
            return ImageSummary::default();
        }

        ImageSummary {
            avg_s: s_sum / count as f64,
            avg_v: v_sum / count as f64,
            dom_h: argmax(&hue_bins) as u16,
        }
    }
}

fn sample_step(width: u32, height: u32, divisor: u32) -> usize {
    (width.min(height) / divisor.max(1)).max(1) as usize
}

/// First index of the largest bin.
fn argmax(bins: &[f64]) -> usize {
    let mut best = 0;
    for (i, w) in bins.iter().enumerate() {
        if *w > bins[best] {
            best = i;
        }
    }
    best
}
