//! Dominant-hue palette extraction.
//!
//! Pixels that survive the saturation/value filter vote into a 360-bucket
//! hue histogram, weighted towards vivid mid-brightness colors. Peaks are
//! picked greedily; each pick suppresses its neighbourhood so that the
//! palette stays hue-separated. When a strict pass finds too few hues the
//! extraction is repeated with relaxed thresholds.

use log::{debug, info, warn};

use crate::color::{Hsv, Shade, rgb_to_hsv};
use crate::config::{AchromaticConfig, ExtractionConfig, ExtractionPass};
use crate::error::{ColorError, Result};
use crate::pixels::PixelBuffer;

const BUCKETS: usize = 360;

/// Below this many hues the image is reported as washed out.
const LOW_COLOR_WARNING: usize = 3;

/// Hue wheel used while no poster has been analyzed.
pub const DEFAULT_PALETTE: [Hsv; 10] = [
    Hsv::chromatic_const(0.0, 0.60, 0.70),
    Hsv::chromatic_const(30.0, 0.55, 0.72),
    Hsv::chromatic_const(60.0, 0.50, 0.68),
    Hsv::chromatic_const(120.0, 0.45, 0.65),
    Hsv::chromatic_const(180.0, 0.45, 0.65),
    Hsv::chromatic_const(210.0, 0.50, 0.62),
    Hsv::chromatic_const(240.0, 0.58, 0.68),
    Hsv::chromatic_const(270.0, 0.60, 0.70),
    Hsv::chromatic_const(300.0, 0.55, 0.70),
    Hsv::chromatic_const(330.0, 0.58, 0.70),
];

/// `palette`, or the default hue wheel when it is empty.
pub fn palette_or_default(palette: Vec<Hsv>) -> Vec<Hsv> {
    if palette.is_empty() {
        DEFAULT_PALETTE.to_vec()
    } else {
        palette
    }
}

/// Weighted hue histogram for a single extraction pass.
pub struct HueHistogram {
    weights: [f64; BUCKETS],
    counts: [u32; BUCKETS],
    valid: u32,
}

impl HueHistogram {
    pub fn build(buffer: &PixelBuffer<'_>, alpha_threshold: u8, pass: &ExtractionPass) -> Self {
        let mut hist = HueHistogram {
            weights: [0.0; BUCKETS],
            counts: [0; BUCKETS],
            valid: 0,
        };

        for [r, g, b, a] in buffer.pixels() {
            if a < alpha_threshold {
                continue;
            }
            let hsv = rgb_to_hsv(r, g, b);
            if hsv.s < pass.s_min || hsv.v < pass.v_min || hsv.v > pass.v_max {
                continue;
            }

            let bucket = hsv.h.degrees().round() as usize % BUCKETS;
            // vivid colors dominate, mid values are preferred over extremes
            let saturation_weight = hsv.s * hsv.s;
            let value_weight = hsv.v * (1.0 - (hsv.v - 0.5).abs() * 0.3);

            hist.weights[bucket] += saturation_weight * value_weight * 100.0;
            hist.counts[bucket] += 1;
            hist.valid += 1;
        }

        hist
    }

    /// Number of pixels that passed the filter.
    pub fn valid(&self) -> u32 {
        self.valid
    }

    pub fn weight(&self, bucket: usize) -> f64 {
        self.weights[bucket]
    }

    pub fn count(&self, bucket: usize) -> u32 {
        self.counts[bucket]
    }

    /// Greedy peak picking with circular suppression. Ties go to the lower hue.
    pub fn peaks(&self, k: usize, pass: &ExtractionPass) -> Vec<u16> {
        let threshold = pass.pixel_threshold(self.valid);
        let mut used = [false; BUCKETS];
        let mut picked = Vec::with_capacity(k);

        while picked.len() < k {
            let mut best: Option<(usize, f64)> = None;
            for bucket in 0..BUCKETS {
                if used[bucket] || (self.counts[bucket] as f64) < threshold {
                    continue;
                }
                let w = self.weights[bucket];
                if best.is_none_or(|(_, best_w)| w > best_w) {
                    best = Some((bucket, w));
                }
            }

            let Some((bucket, weight)) = best else { break };
            if weight <= 0.0 {
                break;
            }
            debug!(
                "  color {}: hue {}° ({} px, weight {:.2})",
                picked.len() + 1,
                bucket,
                self.counts[bucket],
                weight
            );
            picked.push(bucket as u16);

            for d in -pass.min_dist..=pass.min_dist {
                used[(bucket as i32 + d).rem_euclid(BUCKETS as i32) as usize] = true;
            }
        }

        picked
    }
}

/// Share and mean value of one achromatic shade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadeCoverage {
    pub shade: Shade,
    pub ratio: f64,
    pub avg_v: f64,
}

/// Counts white, black and gray pixels. Sorted by coverage, largest first;
/// shades that never occur are left out.
pub fn detect_achromatic(
    buffer: &PixelBuffer<'_>,
    alpha_threshold: u8,
    cfg: &AchromaticConfig,
) -> Vec<ShadeCoverage> {
    let total = buffer.len();
    if total == 0 {
        return Vec::new();
    }

    // white, black, gray
    let mut counts = [0u32; 3];
    let mut v_sums = [0.0f64; 3];
    for [r, g, b, a] in buffer.pixels() {
        if a < alpha_threshold {
            continue;
        }
        let hsv = rgb_to_hsv(r, g, b);
        if hsv.s >= cfg.s_max {
            continue;
        }
        let slot = if hsv.v > cfg.white_v {
            0
        } else if hsv.v < cfg.black_v {
            1
        } else {
            2
        };
        counts[slot] += 1;
        v_sums[slot] += hsv.v;
    }

    let mut found: Vec<ShadeCoverage> = [Shade::White, Shade::Black, Shade::Gray]
        .into_iter()
        .zip(counts.into_iter().zip(v_sums))
        .filter(|(_, (count, _))| *count > 0)
        .map(|(shade, (count, v_sum))| ShadeCoverage {
            shade,
            ratio: count as f64 / total as f64,
            avg_v: v_sum / count as f64,
        })
        .collect();
    found.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    found
}

/// Extracts up to `k` hue-separated palette entries from an image.
#[derive(Clone, Debug, Default)]
pub struct HueExtractor {
    config: ExtractionConfig,
}

impl HueExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Palette ordered by hue, achromatic entries (if enabled) last.
    ///
    /// An empty result is valid: the image had no usable color and the
    /// caller is expected to fall back to a default palette.
    pub fn extract(&self, buffer: &PixelBuffer<'_>, k: usize) -> Result<Vec<Hsv>> {
        if k == 0 {
            return Err(ColorError::InvalidArgument(
                "palette size k must be at least 1".into(),
            ));
        }
        if self.config.passes.is_empty() {
            return Err(ColorError::InvalidArgument(
                "extraction needs at least one pass".into(),
            ));
        }

        let scratch = buffer.downscaled(self.config.max_width);
        let work = match &scratch {
            Some(img) => PixelBuffer::from_image(img),
            None => *buffer,
        };

        let mut picked = self.run_passes(&work, k);
        picked.sort_unstable();
        if picked.len() < LOW_COLOR_WARNING {
            warn!(
                "only {} distinct hues found; image may be low saturation",
                picked.len()
            );
        }

        let mut palette: Vec<Hsv> = picked
            .iter()
            .map(|&h| Hsv::chromatic(h as f64, self.config.fixed_s, self.config.fixed_v))
            .collect();

        if self.config.achromatic.enabled {
            self.append_achromatic(&work, k, &mut palette);
        }

        info!(
            "palette: {} colors ({} chromatic)",
            palette.len(),
            picked.len()
        );
        Ok(palette)
    }

    fn run_passes(&self, work: &PixelBuffer<'_>, k: usize) -> Vec<u16> {
        let last_resort_target = k.min((k / 2).max(5));
        let mut picked: Vec<u16> = Vec::new();

        for (i, pass) in self.config.passes.iter().enumerate() {
            let target = if pass.last_resort { last_resort_target } else { k };
            if i > 0 && picked.len() >= target {
                continue;
            }
            let hist = HueHistogram::build(work, self.config.alpha_threshold, pass);
            if hist.valid() == 0 {
                debug!("pass {}: no pixels with s >= {} and v >= {}", i + 1, pass.s_min, pass.v_min);
                picked.clear();
                continue;
            }
            picked = hist.peaks(k, pass);
            info!(
                "pass {}: {} hues from {} valid pixels",
                i + 1,
                picked.len(),
                hist.valid()
            );
        }

        picked
    }

    fn append_achromatic(&self, work: &PixelBuffer<'_>, k: usize, palette: &mut Vec<Hsv>) {
        let cfg = &self.config.achromatic;
        let mut slots = k.saturating_sub(palette.len());

        for coverage in detect_achromatic(work, self.config.alpha_threshold, cfg) {
            if slots == 0 {
                debug!("{}: {:.1}% (no slots left)", coverage.shade.label(), coverage.ratio * 100.0);
                break;
            }
            if coverage.ratio <= cfg.min_ratio {
                debug!("{}: {:.1}% (below threshold)", coverage.shade.label(), coverage.ratio * 100.0);
                continue;
            }
            let v = match coverage.shade {
                Shade::White => coverage.avg_v.max(0.85),
                Shade::Black => coverage.avg_v.min(0.20),
                Shade::Gray => coverage.avg_v,
            };
            debug!("added {}: {:.1}% of image", coverage.shade.label(), coverage.ratio * 100.0);
            palette.push(Hsv::achromatic(coverage.shade, v));
            slots -= 1;
        }
    }
}
