//! Stateful front door used by both the wasm bindings and the CLI.

use log::info;

use crate::aggregate::{DatasetOverview, LEVEL_COUNT, Level, LevelAggregator, LevelTable, SceneRecord};
use crate::color::Hsv;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::hue_palette::{HueExtractor, palette_or_default};
use crate::pixels::PixelBuffer;
use crate::resolver::LevelColorResolver;
use crate::spectrum::spectrum_order;
use crate::summary::{ImageSummarizer, ImageSummary};

/// Holds the current palette, the scene collection and the level table
/// derived from it.
pub struct LevelEngine {
    config: EngineConfig,
    extractor: HueExtractor,
    summarizer: ImageSummarizer,
    palette: Vec<Hsv>,
    scenes: Vec<SceneRecord>,
    aggregator: LevelAggregator,
}

impl LevelEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            extractor: HueExtractor::new(config.extraction.clone()),
            summarizer: ImageSummarizer::new(config.summary.clone()),
            config,
            palette: palette_or_default(Vec::new()),
            scenes: Vec::new(),
            aggregator: LevelAggregator::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn palette(&self) -> &[Hsv] {
        &self.palette
    }

    /// Replaces the palette; an empty one falls back to the default wheel.
    pub fn set_palette(&mut self, palette: Vec<Hsv>) {
        self.palette = palette_or_default(palette);
    }

    /// Extracts a palette from a poster and makes it current. Returns the
    /// raw extraction result, which may be empty.
    pub fn analyze_poster(&mut self, poster: &PixelBuffer<'_>, k: usize) -> Result<Vec<Hsv>> {
        let extracted = self.extractor.extract(poster, k)?;
        self.set_palette(extracted.clone());
        Ok(extracted)
    }

    pub fn summarize(&self, scene: &PixelBuffer<'_>) -> ImageSummary {
        self.summarizer.summarize(scene)
    }

    /// Analyzes and stores one scene, then rebuilds the level table.
    pub fn add_scene(&mut self, title: &str, level: Level, scene: &PixelBuffer<'_>) -> ImageSummary {
        let summary = self.summarize(scene);
        self.scenes.push(SceneRecord::new(title, level, Some(summary)));
        self.rebuild();
        summary
    }

    /// Replaces the whole scene collection (bulk import) and rebuilds.
    pub fn load_scenes(&mut self, scenes: Vec<SceneRecord>) {
        info!("loading {} scenes", scenes.len());
        self.scenes = scenes;
        self.rebuild();
    }

    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    /// Drops every scene and the palette.
    pub fn reset(&mut self) {
        self.scenes.clear();
        self.aggregator.reset();
        self.palette = palette_or_default(Vec::new());
    }

    fn rebuild(&mut self) {
        self.aggregator.rebuild(&self.scenes);
    }

    pub fn table(&self) -> &LevelTable {
        self.aggregator.table()
    }

    pub fn overview(&self) -> DatasetOverview {
        DatasetOverview::from_scenes(&self.scenes)
    }

    fn resolver(&self) -> Result<LevelColorResolver<'_>> {
        LevelColorResolver::new(&self.palette, self.aggregator.table(), &self.config.resolver)
    }

    pub fn level_color(&self, level: Level) -> Result<Hsv> {
        Ok(self.resolver()?.resolve(level))
    }

    pub fn level_colors(&self) -> Result<[Hsv; LEVEL_COUNT]> {
        Ok(self.resolver()?.resolve_all())
    }

    pub fn spectrum(&self) -> Vec<Hsv> {
        spectrum_order(&self.palette)
    }
}

impl Default for LevelEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
