//! Tunable thresholds for extraction, summarizing and level resolution.
//!
//! Every value here was tuned by eye against real poster and scene sets.
//! All structs deserialize from partial JSON; missing fields keep their
//! defaults.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One histogram pass of the hue palette extractor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionPass {
    /// Pixels with lower saturation are ignored.
    pub s_min: f64,
    /// Pixels darker than this are ignored.
    pub v_min: f64,
    /// Pixels brighter than this are ignored.
    pub v_max: f64,
    /// Half-width (degrees) of the window suppressed around each pick.
    pub min_dist: i32,
    /// Fraction of valid pixels a bucket needs to be a candidate.
    pub pixel_ratio: f64,
    /// Absolute floor for the candidate pixel count.
    pub min_pixels: u32,
    /// Only run this pass when fewer than `max(5, k / 2)` hues were found.
    pub last_resort: bool,
}

impl ExtractionPass {
    pub const fn strict() -> Self {
        Self {
            s_min: 0.25,
            v_min: 0.20,
            v_max: 0.95,
            min_dist: 20,
            pixel_ratio: 0.005,
            min_pixels: 5,
            last_resort: false,
        }
    }

    /// Candidate threshold for a histogram holding `valid` pixels.
    pub fn pixel_threshold(&self, valid: u32) -> f64 {
        (self.min_pixels as f64).max(valid as f64 * self.pixel_ratio)
    }
}

impl Default for ExtractionPass {
    fn default() -> Self {
        Self::strict()
    }
}

/// Detection of white, black and gray areas for the palette tail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AchromaticConfig {
    pub enabled: bool,
    /// Pixels below this saturation count as achromatic.
    pub s_max: f64,
    /// Achromatic pixels brighter than this are white.
    pub white_v: f64,
    /// Achromatic pixels darker than this are black.
    pub black_v: f64,
    /// Share of the image a shade must exceed to enter the palette.
    pub min_ratio: f64,
}

impl Default for AchromaticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            s_max: 0.20,
            white_v: 0.70,
            black_v: 0.35,
            min_ratio: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// Images wider than this are downscaled before the histogram.
    pub max_width: u32,
    pub alpha_threshold: u8,
    /// Passes from strictest to most relaxed.
    pub passes: Vec<ExtractionPass>,
    /// Saturation given to every extracted palette entry.
    pub fixed_s: f64,
    /// Value given to every extracted palette entry.
    pub fixed_v: f64,
    pub achromatic: AchromaticConfig,
}

impl ExtractionConfig {
    /// A configuration that runs only the strict pass.
    pub fn single_pass() -> Self {
        Self {
            passes: vec![ExtractionPass::strict()],
            ..Self::default()
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_width: 240,
            alpha_threshold: 180,
            passes: vec![
                ExtractionPass::strict(),
                ExtractionPass {
                    s_min: 0.15,
                    v_min: 0.12,
                    v_max: 0.96,
                    min_dist: 18,
                    pixel_ratio: 0.003,
                    min_pixels: 3,
                    last_resort: false,
                },
                ExtractionPass {
                    s_min: 0.10,
                    v_min: 0.10,
                    v_max: 0.97,
                    min_dist: 15,
                    pixel_ratio: 0.001,
                    min_pixels: 3,
                    last_resort: false,
                },
                ExtractionPass {
                    s_min: 0.05,
                    v_min: 0.08,
                    v_max: 0.98,
                    min_dist: 12,
                    pixel_ratio: 0.0005,
                    min_pixels: 3,
                    last_resort: true,
                },
            ],
            fixed_s: 0.58,
            fixed_v: 0.70,
            achromatic: AchromaticConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SummaryConfig {
    pub max_width: u32,
    pub alpha_threshold: u8,
    /// Samples darker than this are skipped.
    pub v_min: f64,
    /// Roughly how many samples to take across the shorter side.
    pub grid_divisor: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_width: 260,
            alpha_threshold: 200,
            v_min: 0.08,
            grid_divisor: 90,
        }
    }
}

/// `(base, gain)` pair for the no-data mood curve: `base + t² * gain`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoodCurve {
    pub base: f64,
    pub gain: f64,
}

impl MoodCurve {
    pub fn at(self, t: f64) -> f64 {
        self.base + t * t * self.gain
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
    /// How far a level's deviation from the cross-level mean is stretched.
    pub amplification: f64,
    pub s_dim: f64,
    pub v_dim: f64,
    pub s_floor: f64,
    pub v_floor: f64,
    pub mood_s: MoodCurve,
    pub mood_v: MoodCurve,
    /// Share of the palette's own saturation in the no-data blend.
    pub palette_s_blend: f64,
    /// Share of the palette's own value in the no-data blend.
    pub palette_v_blend: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            amplification: 2.0,
            s_dim: 0.9,
            v_dim: 0.7,
            s_floor: 0.15,
            v_floor: 0.20,
            mood_s: MoodCurve { base: 0.35, gain: 0.50 },
            mood_v: MoodCurve { base: 0.30, gain: 0.60 },
            palette_s_blend: 0.5,
            palette_v_blend: 0.4,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub extraction: ExtractionConfig,
    pub summary: SummaryConfig,
    pub resolver: ResolverConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
