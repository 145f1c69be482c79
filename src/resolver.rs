//! One representative color per level.
//!
//! The hue always comes from the palette, interpolated along the 1..9 scale.
//! Saturation and value come from the measured level averages when a level
//! has data, stretched away from the cross-level mean so that close levels
//! still read as different. Levels without data follow a fixed mood curve.

use log::debug;

use crate::aggregate::{LEVEL_COUNT, Level, LevelTable};
use crate::color::{Hsv, clamp01, lerp, lerp_hue};
use crate::config::ResolverConfig;
use crate::error::{ColorError, Result};

pub struct LevelColorResolver<'a> {
    palette: &'a [Hsv],
    table: &'a LevelTable,
    config: &'a ResolverConfig,
    /// Mean (s, v) over every level with data.
    data_mean: Option<(f64, f64)>,
}

impl<'a> LevelColorResolver<'a> {
    pub fn new(palette: &'a [Hsv], table: &'a LevelTable, config: &'a ResolverConfig) -> Result<Self> {
        if palette.is_empty() {
            return Err(ColorError::InvalidArgument(
                "cannot resolve level colors from an empty palette".into(),
            ));
        }
        Ok(Self {
            palette,
            table,
            config,
            data_mean: data_mean(table),
        })
    }

    pub fn resolve(&self, level: Level) -> Hsv {
        let t = level.t();
        let idx = t * (self.palette.len() - 1) as f64;
        let i0 = idx.floor() as usize;
        let i1 = (i0 + 1).min(self.palette.len() - 1);
        let f = idx - i0 as f64;
        let (a, b) = (self.palette[i0], self.palette[i1]);

        let h = lerp_hue(a.h, b.h, f);
        let cfg = self.config;
        let aggregate = self.table.get(level);

        if let (true, Some((s_mean, v_mean)), Some(s_avg), Some(v_avg)) = (
            aggregate.has_data(),
            self.data_mean,
            aggregate.s_avg,
            aggregate.v_avg,
        ) {
            let s = clamp01(s_mean + (s_avg - s_mean) * cfg.amplification);
            let v = clamp01(v_mean + (v_avg - v_mean) * cfg.amplification);
            let s = (s * cfg.s_dim).max(cfg.s_floor);
            let v = (v * cfg.v_dim).max(cfg.v_floor);
            debug!(
                "level {}: measured s={:.3} v={:.3}, mean s={:.3} v={:.3} -> s={:.3} v={:.3}",
                level.get(),
                s_avg,
                v_avg,
                s_mean,
                v_mean,
                s,
                v
            );
            return Hsv { h, s: clamp01(s), v: clamp01(v) };
        }

        let ps = cfg.palette_s_blend;
        let pv = cfg.palette_v_blend;
        let s = lerp(a.s, b.s, f) * ps + cfg.mood_s.at(t) * (1.0 - ps);
        let v = lerp(a.v, b.v, f) * pv + cfg.mood_v.at(t) * (1.0 - pv);
        Hsv { h, s: clamp01(s), v: clamp01(v) }
    }

    /// Colors for levels 1..=9 in order.
    pub fn resolve_all(&self) -> [Hsv; LEVEL_COUNT] {
        let mut out = [Hsv::chromatic_const(0.0, 0.0, 0.0); LEVEL_COUNT];
        for (slot, level) in out.iter_mut().zip(Level::all()) {
            *slot = self.resolve(level);
        }
        out
    }
}

fn data_mean(table: &LevelTable) -> Option<(f64, f64)> {
    let (s_sum, v_sum, n) = table
        .iter()
        .filter(|(_, a)| a.has_data())
        .filter_map(|(_, a)| Some((a.s_avg?, a.v_avg?)))
        .fold((0.0, 0.0, 0usize), |(s, v, n), (sa, va)| (s + sa, v + va, n + 1));
    (n > 0).then(|| (s_sum / n as f64, v_sum / n as f64))
}
