use wasm_bindgen::prelude::*;
use js_sys::{Array, JSON, Object, Reflect};

pub mod aggregate;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod hue_palette;
pub mod meta;
pub mod pixels;
pub mod resolver;
pub mod spectrum;
pub mod summary;

pub use aggregate::{DatasetOverview, LEVEL_COUNT, Level, LevelAggregate, LevelAggregator, LevelTable, SceneRecord};
pub use color::{Hsv, Hue, Shade, circular_mean_hue, hsv_to_rgb, lerp_hue, rgb_to_hsv};
pub use config::{EngineConfig, ExtractionConfig, ExtractionPass, ResolverConfig, SummaryConfig};
pub use engine::LevelEngine;
pub use error::{ColorError, Result};
pub use hue_palette::{DEFAULT_PALETTE, HueExtractor, palette_or_default};
pub use meta::{SceneMeta, parse_scene_file_name};
pub use pixels::PixelBuffer;
pub use resolver::LevelColorResolver;
pub use spectrum::{gradient_stops, spectrum_order};
pub use summary::{ImageSummarizer, ImageSummary};

// ------------------------------------------------------------
// JS conversion helpers
// ------------------------------------------------------------

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// `{h, s, v, hex, css}` with achromatic hues as their negative sentinel.
fn hsv_to_js(color: &Hsv) -> Result<Object, JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &JsValue::from_str("h"), &JsValue::from_f64(color.h.degrees()))?;
    Reflect::set(&obj, &JsValue::from_str("s"), &JsValue::from_f64(color.s))?;
    Reflect::set(&obj, &JsValue::from_str("v"), &JsValue::from_f64(color.v))?;
    Reflect::set(&obj, &JsValue::from_str("hex"), &JsValue::from_str(&color.to_hex()))?;
    Reflect::set(&obj, &JsValue::from_str("css"), &JsValue::from_str(&color.to_css()))?;
    Ok(obj)
}

fn palette_to_js(palette: &[Hsv]) -> Result<Array, JsValue> {
    let out = Array::new();
    for color in palette {
        let obj: JsValue = hsv_to_js(color)?.into();
        out.push(&obj);
    }
    Ok(out)
}

/// Round-trips a serde value through JSON into a plain JS object.
fn to_js_json<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value).map_err(js_err)?;
    JSON::parse(&json)
}

// ------------------------------------------------------------
// Stateless entry points
// ------------------------------------------------------------

/// Extract up to `k` dominant hues from canvas RGBA data.
///
/// Returns an array of `{h, s, v, hex}` ordered by hue. An empty array means
/// the image has no usable color; the caller keeps its fallback palette.
#[wasm_bindgen]
pub fn extract_palette(
    width: u32,
    height: u32,
    rgba: &[u8],
    k: usize,
    config_json: Option<String>,
) -> Result<Array, JsValue> {
    let config = match config_json {
        Some(json) => EngineConfig::from_json(&json).map_err(js_err)?.extraction,
        None => ExtractionConfig::default(),
    };
    let buffer = PixelBuffer::new(width, height, rgba).map_err(js_err)?;
    let palette = HueExtractor::new(config).extract(&buffer, k).map_err(js_err)?;
    palette_to_js(&palette)
}

fn summary_to_js(summary: &ImageSummary) -> Result<Object, JsValue> {
    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("avgS"), &JsValue::from_f64(summary.avg_s))?;
    Reflect::set(&result, &JsValue::from_str("avgV"), &JsValue::from_f64(summary.avg_v))?;
    Reflect::set(&result, &JsValue::from_str("domH"), &JsValue::from_f64(summary.dom_h as f64))?;
    Ok(result)
}

/// `{avgS, avgV, domH}` for one scene.
#[wasm_bindgen]
pub fn compute_hsv_summary(
    width: u32,
    height: u32,
    rgba: &[u8],
    config_json: Option<String>,
) -> Result<Object, JsValue> {
    let config = match config_json {
        Some(json) => EngineConfig::from_json(&json).map_err(js_err)?.summary,
        None => SummaryConfig::default(),
    };
    let buffer = PixelBuffer::new(width, height, rgba).map_err(js_err)?;
    summary_to_js(&ImageSummarizer::new(config).summarize(&buffer))
}

/// Display order for a palette given as JSON `[{h, s, v}, ...]`.
#[wasm_bindgen]
pub fn palette_spectrum(palette_json: &str) -> Result<Array, JsValue> {
    let palette: Vec<Hsv> = serde_json::from_str(palette_json).map_err(js_err)?;
    palette_to_js(&spectrum_order(&palette))
}

// ------------------------------------------------------------
// Stateful engine
// ------------------------------------------------------------

/// Browser handle on [`LevelEngine`].
#[wasm_bindgen(js_name = LevelEngine)]
pub struct JsLevelEngine {
    inner: LevelEngine,
}

#[wasm_bindgen(js_class = LevelEngine)]
impl JsLevelEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<JsLevelEngine, JsValue> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json).map_err(js_err)?,
            None => EngineConfig::default(),
        };
        Ok(Self {
            inner: LevelEngine::new(config),
        })
    }

    /// Replace the palette with JSON `[{h, s, v}, ...]`; `[]` restores the default.
    #[wasm_bindgen(js_name = setPalette)]
    pub fn set_palette(&mut self, palette_json: &str) -> Result<(), JsValue> {
        let palette: Vec<Hsv> = serde_json::from_str(palette_json).map_err(js_err)?;
        self.inner.set_palette(palette);
        Ok(())
    }

    /// Extract a palette from poster RGBA data and make it current.
    #[wasm_bindgen(js_name = analyzePoster)]
    pub fn analyze_poster(&mut self, width: u32, height: u32, rgba: &[u8], k: usize) -> Result<Array, JsValue> {
        let buffer = PixelBuffer::new(width, height, rgba).map_err(js_err)?;
        let extracted = self.inner.analyze_poster(&buffer, k).map_err(js_err)?;
        palette_to_js(&extracted)
    }

    pub fn palette(&self) -> Result<Array, JsValue> {
        palette_to_js(self.inner.palette())
    }

    /// Replace the scene collection with JSON `[{title, level, hsv}, ...]`
    /// and recompute every level.
    pub fn rebuild(&mut self, scenes_json: &str) -> Result<(), JsValue> {
        let scenes = SceneRecord::list_from_json(scenes_json).map_err(js_err)?;
        self.inner.load_scenes(scenes);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// `{avgS, avgV, domH}` with the engine's summary settings.
    pub fn summarize(&self, width: u32, height: u32, rgba: &[u8]) -> Result<Object, JsValue> {
        let buffer = PixelBuffer::new(width, height, rgba).map_err(js_err)?;
        summary_to_js(&self.inner.summarize(&buffer))
    }

    /// Analyzes one scene, stores it and rebuilds the level table.
    #[wasm_bindgen(js_name = addScene)]
    pub fn add_scene(
        &mut self,
        title: &str,
        level: i32,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Object, JsValue> {
        let level = Level::new(level as i64).map_err(js_err)?;
        let buffer = PixelBuffer::new(width, height, rgba).map_err(js_err)?;
        summary_to_js(&self.inner.add_scene(title, level, &buffer))
    }

    /// Level table as `{"1": {count, sMin, ...}, ..., "9": {...}}`.
    pub fn aggregates(&self) -> Result<JsValue, JsValue> {
        to_js_json(self.inner.table())
    }

    #[wasm_bindgen(js_name = aggregatesCsv)]
    pub fn aggregates_csv(&self) -> String {
        self.inner.table().to_csv()
    }

    pub fn overview(&self) -> Result<JsValue, JsValue> {
        to_js_json(&self.inner.overview())
    }

    #[wasm_bindgen(js_name = levelColor)]
    pub fn level_color(&self, level: i32) -> Result<Object, JsValue> {
        let level = Level::new(level as i64).map_err(js_err)?;
        let color = self.inner.level_color(level).map_err(js_err)?;
        hsv_to_js(&color)
    }

    /// Colors for levels 1..=9, index 0 being level 1.
    #[wasm_bindgen(js_name = levelColors)]
    pub fn level_colors(&self) -> Result<Array, JsValue> {
        let colors = self.inner.level_colors().map_err(js_err)?;
        palette_to_js(&colors)
    }

    pub fn spectrum(&self) -> Result<Array, JsValue> {
        palette_to_js(&self.inner.spectrum())
    }

    /// CSS gradient stops `[{offset, hex, css}, ...]` over the chromatic spectrum.
    pub fn gradient(&self) -> Result<Array, JsValue> {
        let out = Array::new();
        for (offset, color) in gradient_stops(&self.inner.spectrum()) {
            let stop = Object::new();
            Reflect::set(&stop, &JsValue::from_str("offset"), &JsValue::from_f64(offset))?;
            Reflect::set(&stop, &JsValue::from_str("hex"), &JsValue::from_str(&color.to_hex()))?;
            Reflect::set(&stop, &JsValue::from_str("css"), &JsValue::from_str(&color.to_css()))?;
            let stop: JsValue = stop.into();
            out.push(&stop);
        }
        Ok(out)
    }
}

// ------------------------------------------------------------
// Native helpers working on encoded image files
// ------------------------------------------------------------

#[cfg(not(target_arch = "wasm32"))]
pub fn extract_palette_bytes(input: &[u8], k: usize, config: &ExtractionConfig) -> Result<Vec<Hsv>> {
    let img = image::load_from_memory(input)?.to_rgba8();
    let buffer = PixelBuffer::from_image(&img);
    HueExtractor::new(config.clone()).extract(&buffer, k)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn summarize_bytes(input: &[u8], config: &SummaryConfig) -> Result<ImageSummary> {
    let img = image::load_from_memory(input)?.to_rgba8();
    let buffer = PixelBuffer::from_image(&img);
    Ok(ImageSummarizer::new(config.clone()).summarize(&buffer))
}

/// Scene record for an image file named like `Title_5.jpg`.
///
/// A file that cannot be read or decoded still yields a record, without a
/// summary, so it is counted at its level. A name without a usable level
/// yields a record that aggregation skips.
#[cfg(not(target_arch = "wasm32"))]
pub fn scene_from_file(path: &std::path::Path, config: &SummaryConfig) -> SceneRecord {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let hsv = match std::fs::read(path)
        .map_err(ColorError::from)
        .and_then(|bytes| summarize_bytes(&bytes, config))
    {
        Ok(summary) => Some(summary),
        Err(e) => {
            log::warn!("no summary for {}: {e}", path.display());
            None
        }
    };

    match parse_scene_file_name(&file_name) {
        Some(meta) => SceneRecord::new(meta.title, meta.level, hsv),
        None => SceneRecord {
            title: file_name.into_owned(),
            level: None,
            hsv,
        },
    }
}
