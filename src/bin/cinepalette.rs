use anyhow::{Context, Result};
use cinematic_palette_wasm::{EngineConfig, Hsv, Hue, LevelEngine, extract_palette_bytes, scene_from_file};
use clap::Parser;
use flexi_logger::Logger;
use std::fs;
use std::path::{Path, PathBuf};

/// Derive per-level colors from a poster and a set of labelled scene images.
///
/// Scene levels and titles are read from the file names, e.g. `Inception_8.jpg`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scene image paths
    scenes: Vec<PathBuf>,

    /// Poster image used to build the hue palette
    #[arg(short, long)]
    poster: Option<PathBuf>,

    /// Number of palette hues to extract
    #[arg(short = 'k', long, default_value_t = 8)]
    n_colors: usize,

    /// JSON file with threshold overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print everything as one JSON document
    #[arg(long)]
    json: bool,

    /// Print the level table as CSV
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Log filter (e.g. `info`, `cinematic_palette_wasm=debug`)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    EngineConfig::from_json(&text).with_context(|| format!("parsing {}", path.display()))
}

fn describe(c: &Hsv) -> String {
    let hue = match c.h {
        Hue::Chromatic(h) => format!("h={h:>5.1}"),
        Hue::Achromatic(shade) => format!("{:>7}", shade.label()),
    };
    format!("#{}  {} s={:.2} v={:.2}", c.to_hex(), hue, c.s, c.v)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _logger = Logger::try_with_str(&args.log_level)?
        .log_to_stderr()
        .start()
        .context("starting logger")?;

    let mut engine = LevelEngine::new(load_config(args.config.as_deref())?);

    if let Some(poster) = &args.poster {
        let bytes = fs::read(poster).with_context(|| format!("reading {}", poster.display()))?;
        let extracted = extract_palette_bytes(&bytes, args.n_colors, &engine.config().extraction)
            .context("palette extraction failed")?;
        engine.set_palette(extracted);
    }

    let scenes = args
        .scenes
        .iter()
        .map(|p| scene_from_file(p, &engine.config().summary))
        .collect();
    engine.load_scenes(scenes);

    let colors = engine.level_colors()?;

    if args.json {
        let doc = serde_json::json!({
            "palette": engine.palette(),
            "spectrum": engine.spectrum(),
            "scenes": engine.scenes(),
            "aggregates": engine.table(),
            "overview": engine.overview(),
            "levelColors": colors,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }
    if args.csv {
        print!("{}", engine.table().to_csv());
        return Ok(());
    }

    println!("Palette ({} colors)", engine.palette().len());
    for c in engine.spectrum() {
        println!("  {}", describe(&c));
    }

    println!();
    println!("level  count   sAvg   vAvg   color");
    for ((level, agg), color) in engine.table().iter().zip(colors) {
        let cell = |x: Option<f64>| x.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".into());
        println!(
            "{:>5}  {:>5}  {:>5}  {:>5}   {}",
            level.get(),
            agg.count,
            cell(agg.s_avg),
            cell(agg.v_avg),
            describe(&color)
        );
    }

    let overview = engine.overview();
    println!();
    println!("{} scenes", overview.total_scenes);

    Ok(())
}
