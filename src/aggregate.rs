//! Per-level statistics over all analyzed scenes.
//!
//! The table is derived state. It is always rebuilt from the complete scene
//! collection; there is no incremental update path.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::color::circular_mean_hue;
use crate::error::{ColorError, Result};
use crate::summary::ImageSummary;

pub const LEVEL_COUNT: usize = 9;

/// An emotional level, 1..=9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(1);
    pub const MAX: Level = Level(LEVEL_COUNT as u8);

    pub fn new(level: i64) -> Result<Self> {
        if (1..=LEVEL_COUNT as i64).contains(&level) {
            Ok(Level(level as u8))
        } else {
            Err(ColorError::InvalidArgument(format!(
                "level must be within 1..=9, got {level}"
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Position on the scale, 0.0 for level 1 up to 1.0 for level 9.
    pub fn t(self) -> f64 {
        (self.0 - 1) as f64 / (LEVEL_COUNT - 1) as f64
    }

    pub fn all() -> impl Iterator<Item = Level> {
        (1..=LEVEL_COUNT as u8).map(Level)
    }

    fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u8> for Level {
    type Error = ColorError;

    fn try_from(value: u8) -> Result<Self> {
        Level::new(value as i64)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level.0
    }
}

/// One scene as the collaborator stores it.
///
/// `level` is kept raw so that corrupt records can be carried and skipped
/// during aggregation instead of failing deserialization. `hsv` is absent
/// when the scene's analysis failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    #[serde(default, deserialize_with = "lenient_title")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_level")]
    pub level: Option<i64>,
    #[serde(default, deserialize_with = "lenient_summary")]
    pub hsv: Option<ImageSummary>,
}

fn lenient_title<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(title) => title,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Anything but an integer becomes `None`, which aggregation skips.
fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if !value.is_null() && !value.is_i64() {
        debug!("unreadable scene level {value}");
    }
    Ok(value.as_i64())
}

fn lenient_summary<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ImageSummary>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(summary) => Ok(Some(summary)),
        Err(e) => {
            warn!("discarding malformed scene summary: {e}");
            Ok(None)
        }
    }
}

impl SceneRecord {
    pub fn new(title: impl Into<String>, level: Level, hsv: Option<ImageSummary>) -> Self {
        Self {
            title: title.into(),
            level: Some(level.get() as i64),
            hsv,
        }
    }

    /// Reads a JSON array of scene records. Entries that are not objects are
    /// dropped with a warning; fields that do not parse are treated as missing.
    pub fn list_from_json(json: &str) -> Result<Vec<SceneRecord>> {
        let values: Vec<Value> = serde_json::from_str(json)?;
        Ok(values
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| match serde_json::from_value(value) {
                Ok(scene) => Some(scene),
                Err(e) => {
                    warn!("skipping scene entry {i}: {e}");
                    None
                }
            })
            .collect())
    }

    /// The scene's level if it is present and in range.
    pub fn valid_level(&self) -> Option<Level> {
        self.level.and_then(|l| Level::new(l).ok())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelAggregate {
    /// Scenes at this level, with or without a summary.
    pub count: u32,
    /// Scenes that contributed saturation/value.
    pub samples: u32,
    pub s_min: Option<f64>,
    pub s_max: Option<f64>,
    pub s_avg: Option<f64>,
    pub v_min: Option<f64>,
    pub v_max: Option<f64>,
    pub v_avg: Option<f64>,
    pub s_sum: f64,
    pub v_sum: f64,
    /// Circular mean of the scenes' dominant hues.
    pub h_mean: Option<f64>,
}

impl LevelAggregate {
    /// True when averages exist for this level.
    pub fn has_data(&self) -> bool {
        self.count > 0 && self.s_avg.is_some() && self.v_avg.is_some()
    }

    fn fold(&mut self, summary: &ImageSummary) {
        fold_min(&mut self.s_min, summary.avg_s);
        fold_max(&mut self.s_max, summary.avg_s);
        fold_min(&mut self.v_min, summary.avg_v);
        fold_max(&mut self.v_max, summary.avg_v);
        self.s_sum += summary.avg_s;
        self.v_sum += summary.avg_v;
        self.samples += 1;
    }

    fn finish(&mut self, dom_hues: &[f64]) {
        if self.samples > 0 {
            self.s_avg = Some(self.s_sum / self.samples as f64);
            self.v_avg = Some(self.v_sum / self.samples as f64);
            self.h_mean = circular_mean_hue(dom_hues);
        }
    }
}

fn fold_min(slot: &mut Option<f64>, x: f64) {
    *slot = Some(slot.map_or(x, |m| m.min(x)));
}

fn fold_max(slot: &mut Option<f64>, x: f64) {
    *slot = Some(slot.map_or(x, |m| m.max(x)));
}

/// The nine level aggregates. Serializes as a map keyed `"1"`..`"9"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<u8, LevelAggregate>",
    try_from = "BTreeMap<u8, LevelAggregate>"
)]
pub struct LevelTable {
    levels: [LevelAggregate; LEVEL_COUNT],
}

impl LevelTable {
    pub fn get(&self, level: Level) -> &LevelAggregate {
        &self.levels[level.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Level, &LevelAggregate)> {
        Level::all().zip(self.levels.iter())
    }

    pub fn total_count(&self) -> u32 {
        self.levels.iter().map(|a| a.count).sum()
    }

    /// `level,count,sMin,sMax,sAvg,vMin,vMax,vAvg` with empty cells for no data.
    pub fn to_csv(&self) -> String {
        fn cell(x: Option<f64>) -> String {
            x.map(|v| format!("{v:.4}")).unwrap_or_default()
        }

        let mut out = String::from("level,count,sMin,sMax,sAvg,vMin,vMax,vAvg\n");
        for (level, a) in self.iter() {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                level.get(),
                a.count,
                cell(a.s_min),
                cell(a.s_max),
                cell(a.s_avg),
                cell(a.v_min),
                cell(a.v_max),
                cell(a.v_avg),
            );
        }
        out
    }
}

impl From<LevelTable> for BTreeMap<u8, LevelAggregate> {
    fn from(table: LevelTable) -> Self {
        Level::all().map(|l| l.get()).zip(table.levels).collect()
    }
}

impl TryFrom<BTreeMap<u8, LevelAggregate>> for LevelTable {
    type Error = ColorError;

    fn try_from(map: BTreeMap<u8, LevelAggregate>) -> Result<Self> {
        let mut table = LevelTable::default();
        for (key, aggregate) in map {
            let level = Level::try_from(key)?;
            table.levels[level.index()] = aggregate;
        }
        Ok(table)
    }
}

/// Owns the level table. Writers need `&mut self`; readers borrow the
/// finished table, so a half-built table is never observable.
#[derive(Clone, Debug, Default)]
pub struct LevelAggregator {
    table: LevelTable,
}

impl LevelAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    pub fn reset(&mut self) {
        self.table = LevelTable::default();
    }

    /// Recomputes every level from `scenes`. Records without a usable level
    /// are skipped and logged.
    pub fn rebuild<'a>(&mut self, scenes: impl IntoIterator<Item = &'a SceneRecord>) {
        let mut table = LevelTable::default();
        let mut dom_hues: [Vec<f64>; LEVEL_COUNT] = Default::default();
        let mut skipped = 0usize;

        for scene in scenes {
            let Some(level) = scene.valid_level() else {
                warn!("skipping scene {:?}: invalid level {:?}", scene.title, scene.level);
                skipped += 1;
                continue;
            };
            let aggregate = &mut table.levels[level.index()];
            aggregate.count += 1;
            if let Some(summary) = &scene.hsv {
                aggregate.fold(summary);
                dom_hues[level.index()].push(summary.dom_h as f64);
            }
        }

        for (aggregate, hues) in table.levels.iter_mut().zip(&dom_hues) {
            aggregate.finish(hues);
        }

        debug!(
            "rebuilt level table: {} scenes, {} skipped",
            table.total_count(),
            skipped
        );
        self.table = table;
    }
}

/// Collection-wide figures shown next to the level table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOverview {
    pub total_scenes: usize,
    pub avg_level: Option<f64>,
    pub avg_s: Option<f64>,
    pub avg_v: Option<f64>,
}

impl DatasetOverview {
    pub fn from_scenes(scenes: &[SceneRecord]) -> Self {
        let summaries = || scenes.iter().filter_map(|s| s.hsv.as_ref());
        DatasetOverview {
            total_scenes: scenes.len(),
            avg_level: mean(
                scenes
                    .iter()
                    .filter_map(|s| s.valid_level())
                    .map(|l| l.get() as f64),
            ),
            avg_s: mean(summaries().map(|s| s.avg_s)),
            avg_v: mean(summaries().map(|s| s.avg_v)),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(level: i64, s: f64, v: f64) -> SceneRecord {
        SceneRecord {
            title: format!("scene {level}"),
            level: Some(level),
            hsv: Some(ImageSummary { avg_s: s, avg_v: v, dom_h: 0 }),
        }
    }

    fn level(n: i64) -> Level {
        Level::new(n).unwrap()
    }

    #[test]
    fn folds_one_level() {
        let scenes = [scene(5, 0.5, 0.6), scene(5, 0.7, 0.4)];
        let mut agg = LevelAggregator::new();
        agg.rebuild(&scenes);

        let five = agg.table().get(level(5));
        assert_eq!(five.count, 2);
        assert!((five.s_avg.unwrap() - 0.6).abs() < 1e-12);
        assert!((five.v_avg.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(five.s_min, Some(0.5));
        assert_eq!(five.s_max, Some(0.7));
        assert_eq!(five.v_min, Some(0.4));
        assert_eq!(five.v_max, Some(0.6));

        for (lv, a) in agg.table().iter() {
            if lv.get() == 5 {
                continue;
            }
            assert_eq!(a.count, 0);
            assert_eq!(a.s_min, None);
            assert_eq!(a.s_max, None);
            assert_eq!(a.s_avg, None);
            assert_eq!(a.v_min, None);
            assert_eq!(a.v_max, None);
            assert_eq!(a.v_avg, None);
        }
    }

    #[test]
    fn malformed_levels_are_skipped() {
        let mut scenes = vec![scene(2, 0.3, 0.3), scene(0, 0.9, 0.9), scene(12, 0.9, 0.9)];
        scenes.push(SceneRecord { title: "no level".into(), level: None, hsv: None });
        scenes.push(scene(-4, 0.9, 0.9));

        let mut agg = LevelAggregator::new();
        agg.rebuild(&scenes);
        assert_eq!(agg.table().total_count(), 1);
        assert_eq!(agg.table().get(level(2)).s_max, Some(0.3));
    }

    #[test]
    fn rebuild_is_idempotent_and_replaces() {
        let scenes = [scene(1, 0.2, 0.3), scene(9, 0.8, 0.9), scene(9, 0.6, 0.7)];
        let mut agg = LevelAggregator::new();
        agg.rebuild(&scenes);
        let first = agg.table().clone();
        agg.rebuild(&scenes);
        assert_eq!(&first, agg.table());

        agg.rebuild(&scenes[..1]);
        assert_eq!(agg.table().get(level(9)).count, 0);
        assert_eq!(agg.table().get(level(9)).v_avg, None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut agg = LevelAggregator::new();
        agg.rebuild(&[scene(3, 0.5, 0.5)]);
        agg.reset();
        assert_eq!(agg.table(), &LevelTable::default());
    }

    #[test]
    fn scenes_without_summary_only_count() {
        let scenes = [SceneRecord::new("pending", level(4), None)];
        let mut agg = LevelAggregator::new();
        agg.rebuild(&scenes);
        let four = agg.table().get(level(4));
        assert_eq!(four.count, 1);
        assert_eq!(four.samples, 0);
        assert_eq!(four.s_avg, None);
        assert!(!four.has_data());
    }

    #[test]
    fn hue_mean_is_circular() {
        let mut a = scene(6, 0.5, 0.5);
        a.hsv.as_mut().unwrap().dom_h = 340;
        let mut b = scene(6, 0.5, 0.5);
        b.hsv.as_mut().unwrap().dom_h = 20;
        let mut agg = LevelAggregator::new();
        agg.rebuild(&[a, b]);
        let h = agg.table().get(level(6)).h_mean.unwrap();
        assert!(h < 1e-6 || h > 360.0 - 1e-6);
    }

    #[test]
    fn level_bounds() {
        assert!(Level::new(0).is_err());
        assert!(Level::new(10).is_err());
        assert_eq!(Level::MIN.t(), 0.0);
        assert_eq!(Level::MAX.t(), 1.0);
        assert_eq!(level(5).t(), 0.5);
        assert_eq!(Level::all().count(), LEVEL_COUNT);
    }

    #[test]
    fn table_json_round_trips() {
        let mut agg = LevelAggregator::new();
        agg.rebuild(&[scene(5, 0.5, 0.6), scene(7, 0.25, 0.75)]);
        let json = serde_json::to_string(agg.table()).unwrap();
        assert!(json.starts_with(r#"{"1":{"count":0"#));
        assert!(json.contains(r#""sMin":null"#));
        let back: LevelTable = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, agg.table());

        assert!(serde_json::from_str::<LevelTable>(r#"{"10":{}}"#).is_err());
    }

    #[test]
    fn scene_records_accept_loose_json() {
        let scenes: Vec<SceneRecord> = serde_json::from_str(
            r#"[{"title":"A","level":3,"hsv":{"avgS":0.4,"avgV":0.5,"domH":10}},
                {"title":"B"},
                {"title":"C","level":42,"hsv":null}]"#,
        )
        .unwrap();
        assert_eq!(scenes[0].valid_level(), Some(level(3)));
        assert_eq!(scenes[1].valid_level(), None);
        assert_eq!(scenes[2].valid_level(), None);
    }

    #[test]
    fn bad_records_do_not_sink_a_bulk_load() {
        let scenes = SceneRecord::list_from_json(
            r#"[{"title":"Kept","level":3,"hsv":{"avgS":0.4,"avgV":0.5,"domH":10}},
                {"title":"Quoted","level":"5","hsv":{"avgS":0.9,"avgV":0.9,"domH":0}},
                {"title":"Fractional","level":4.5},
                {"title":"Partial","level":6,"hsv":{"avgS":0.2}},
                {"title":7,"level":3,"hsv":{"avgS":0.6,"avgV":0.7,"domH":20}},
                "not a scene",
                42]"#,
        )
        .unwrap();
        assert_eq!(scenes.len(), 5);
        assert_eq!(scenes[1].level, None);
        assert_eq!(scenes[2].level, None);
        assert_eq!(scenes[3].valid_level(), Some(level(6)));
        assert_eq!(scenes[3].hsv, None);
        assert_eq!(scenes[4].title, "7");

        let mut agg = LevelAggregator::new();
        agg.rebuild(&scenes);
        let three = agg.table().get(level(3));
        assert_eq!(three.count, 2);
        assert!((three.s_avg.unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(agg.table().get(level(6)).count, 1);
        assert_eq!(agg.table().get(level(6)).samples, 0);
        assert_eq!(agg.table().total_count(), 3);

        assert!(SceneRecord::list_from_json("{}").is_err());
    }

    #[test]
    fn csv_has_empty_cells_for_no_data() {
        let mut agg = LevelAggregator::new();
        agg.rebuild(&[scene(1, 0.5, 0.25)]);
        let csv = agg.table().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[1], "1,1,0.5000,0.5000,0.5000,0.2500,0.2500,0.2500");
        assert_eq!(lines[2], "2,0,,,,,,");
    }

    #[test]
    fn overview_means() {
        let mut scenes = vec![scene(2, 0.2, 0.4), scene(4, 0.4, 0.8)];
        scenes.push(SceneRecord::new("pending", level(9), None));
        let overview = DatasetOverview::from_scenes(&scenes);
        assert_eq!(overview.total_scenes, 3);
        assert!((overview.avg_level.unwrap() - 5.0).abs() < 1e-12);
        assert!((overview.avg_s.unwrap() - 0.3).abs() < 1e-12);
        assert!((overview.avg_v.unwrap() - 0.6).abs() < 1e-12);

        assert_eq!(DatasetOverview::from_scenes(&[]).avg_level, None);
    }
}
