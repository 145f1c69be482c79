use std::fs;
use std::io::Cursor;
use std::path::Path;

use cinematic_palette_wasm::{
    ColorError, EngineConfig, ExtractionConfig, Hue, Level, LevelEngine, LevelTable, SceneRecord,
    SummaryConfig, extract_palette_bytes, parse_scene_file_name, scene_from_file, summarize_bytes,
};
use image::{ImageFormat, Rgba, RgbaImage};

const RED: [u8; 4] = [204, 41, 41, 255];
const BLUE: [u8; 4] = [41, 41, 204, 255];
const DIM_RED: [u8; 4] = [102, 20, 20, 255];

fn png(img: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    png(&RgbaImage::from_pixel(width, height, Rgba(color)))
}

fn poster_png() -> Vec<u8> {
    png(&RgbaImage::from_fn(200, 100, |x, _| {
        if x < 100 { Rgba(RED) } else { Rgba(BLUE) }
    }))
}

fn scene(file_name: &str, color: [u8; 4]) -> SceneRecord {
    let meta = parse_scene_file_name(file_name).unwrap();
    let summary = summarize_bytes(&solid_png(64, 48, color), &SummaryConfig::default()).unwrap();
    SceneRecord::new(meta.title, meta.level, Some(summary))
}

fn level(n: i64) -> Level {
    Level::new(n).unwrap()
}

#[test]
fn poster_palette_from_encoded_file() {
    let palette = extract_palette_bytes(&poster_png(), 8, &ExtractionConfig::default()).unwrap();
    let hues: Vec<f64> = palette.iter().map(|c| c.h.degrees()).collect();
    assert_eq!(hues, vec![0.0, 240.0]);
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    assert!(matches!(
        extract_palette_bytes(b"definitely not a png", 8, &ExtractionConfig::default()),
        Err(ColorError::Decode(_))
    ));
    assert!(summarize_bytes(&[], &SummaryConfig::default()).is_err());
}

#[test]
fn scenes_drive_level_colors() {
    let mut engine = LevelEngine::new(EngineConfig::default());
    let palette = extract_palette_bytes(&poster_png(), 8, &engine.config().extraction).unwrap();
    engine.set_palette(palette);

    engine.load_scenes(vec![
        scene("001 - Night Walk_2.png", DIM_RED),
        scene("Night_Walk-2.png", DIM_RED),
        scene("Open Sea_8.png", BLUE),
        SceneRecord {
            title: "unlabelled.png".into(),
            level: None,
            hsv: None,
        },
    ]);

    let table = engine.table();
    assert_eq!(table.total_count(), 3);
    assert_eq!(table.get(level(2)).count, 2);
    assert_eq!(table.get(level(8)).count, 1);
    assert!((table.get(level(2)).v_avg.unwrap() - 0.4).abs() < 1e-9);
    assert!((table.get(level(8)).v_avg.unwrap() - 0.8).abs() < 1e-9);
    assert_eq!(table.get(level(8)).h_mean.map(f64::round), Some(240.0));
    assert_eq!(table.get(level(5)).s_avg, None);

    let colors = engine.level_colors().unwrap();
    assert_eq!(colors[0].h, Hue::Chromatic(0.0));
    // 0 -> 240 goes the short way through 300
    assert_eq!(colors[4].h, Hue::Chromatic(300.0));
    assert_eq!(colors[8].h, Hue::Chromatic(240.0));

    // level 2 sits far below the mean value and hits the floor
    assert_eq!(colors[1].v, engine.config().resolver.v_floor);
    assert!(colors[7].v > colors[1].v);
    for c in colors {
        assert!((0.0..=1.0).contains(&c.s));
        assert!((0.0..=1.0).contains(&c.v));
    }

    let overview = engine.overview();
    assert_eq!(overview.total_scenes, 4);
    assert!((overview.avg_level.unwrap() - 4.0).abs() < 1e-12);

    let csv = engine.table().to_csv();
    assert!(csv.lines().nth(2).unwrap().starts_with("2,2,"));
}

#[test]
fn scenes_survive_a_json_round_trip() {
    let mut engine = LevelEngine::default();
    engine.load_scenes(vec![
        scene("Harbor_3.png", RED),
        scene("Harbor_9.png", BLUE),
    ]);

    let json = serde_json::to_string(engine.scenes()).unwrap();
    assert!(json.contains(r#""title":"Harbor""#));
    assert!(json.contains(r#""domH":240"#));

    let back: Vec<SceneRecord> = serde_json::from_str(&json).unwrap();
    let mut reloaded = LevelEngine::default();
    reloaded.load_scenes(back);

    let table_json = serde_json::to_string(reloaded.table()).unwrap();
    let table: LevelTable = serde_json::from_str(&table_json).unwrap();
    for ((lv, a), (_, b)) in engine.table().iter().zip(table.iter()) {
        assert_eq!(a.count, b.count, "level {}", lv.get());
        match (a.s_avg, b.s_avg) {
            (Some(x), Some(y)) => assert!((x - y).abs() < 1e-12),
            (x, y) => assert_eq!(x, y),
        }
    }
}

#[test]
fn poster_analysis_through_the_engine() {
    let mut engine = LevelEngine::default();
    let poster = image::load_from_memory(&poster_png()).unwrap().to_rgba8();
    let buffer = cinematic_palette_wasm::PixelBuffer::from_image(&poster);
    let extracted = engine.analyze_poster(&buffer, 4).unwrap();
    assert_eq!(extracted.len(), 2);
    assert_eq!(engine.palette(), &extracted[..]);

    let spectrum = engine.spectrum();
    assert_eq!(spectrum.len(), 2);
    assert!(spectrum[0].h.degrees() < spectrum[1].h.degrees());

    engine.reset();
    assert_eq!(engine.palette().len(), 10);
}

#[test]
fn unreadable_scene_files_are_kept_without_summary() {
    let dir = std::env::temp_dir().join(format!("cinepalette-scenes-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let good = dir.join("Open Sea_8.png");
    fs::write(&good, solid_png(32, 32, BLUE)).unwrap();
    let corrupt = dir.join("Broken Reel_3.png");
    fs::write(&corrupt, b"\x89PNG truncated").unwrap();
    let missing = Path::new("/nonexistent/cinepalette/Lost Highway_6.png");

    let config = SummaryConfig::default();
    let scenes: Vec<SceneRecord> = [good.as_path(), corrupt.as_path(), missing]
        .into_iter()
        .map(|p| scene_from_file(p, &config))
        .collect();

    assert_eq!(scenes[0].title, "Open Sea");
    assert_eq!(scenes[0].hsv.map(|s| s.dom_h), Some(240));
    assert_eq!(scenes[1].title, "Broken Reel");
    assert_eq!(scenes[1].valid_level(), Some(level(3)));
    assert_eq!(scenes[1].hsv, None);
    assert_eq!(scenes[2].valid_level(), Some(level(6)));
    assert_eq!(scenes[2].hsv, None);

    let mut engine = LevelEngine::default();
    engine.load_scenes(scenes);
    assert_eq!(engine.table().total_count(), 3);
    assert_eq!(engine.table().get(level(3)).samples, 0);
    assert!(engine.level_colors().is_ok());

    fs::remove_dir_all(&dir).unwrap();
}
