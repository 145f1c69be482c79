//! HSV colors with explicit achromatic hues, plus RGB conversion.
//!
//! Hues that carry no meaning (white, black, gray palette entries) are kept as
//! a separate variant so that interpolation never blends across them. On the
//! wire they still travel as the negative sentinels -1 / -2 / -3 the web
//! front-end understands.

use palette::{FromColor, Srgb, encoding};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `palette`'s HSV with double precision over the sRGB encoding.
type PaletteHsv = palette::Hsv<encoding::Srgb, f64>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shade {
    White,
    Black,
    Gray,
}

impl Shade {
    /// The negative hue used for this shade in JSON.
    pub fn sentinel(self) -> f64 {
        match self {
            Shade::White => -1.0,
            Shade::Black => -2.0,
            Shade::Gray => -3.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Shade::White => "White",
            Shade::Black => "Black",
            Shade::Gray => "Gray",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Hue {
    /// Degrees in `[0, 360)`.
    Chromatic(f64),
    Achromatic(Shade),
}

impl Hue {
    /// Reads a hue in the sentinel encoding. Unknown negative values are gray.
    pub fn from_degrees(h: f64) -> Hue {
        if h >= 0.0 {
            return Hue::Chromatic(normalize_degrees(h));
        }
        match h.round() as i64 {
            -1 => Hue::Achromatic(Shade::White),
            -2 => Hue::Achromatic(Shade::Black),
            _ => Hue::Achromatic(Shade::Gray),
        }
    }

    /// Degrees for chromatic hues, the sentinel for achromatic ones.
    pub fn degrees(self) -> f64 {
        match self {
            Hue::Chromatic(h) => h,
            Hue::Achromatic(shade) => shade.sentinel(),
        }
    }

    pub fn is_chromatic(self) -> bool {
        matches!(self, Hue::Chromatic(_))
    }
}

impl Serialize for Hue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.degrees())
    }
}

impl<'de> Deserialize<'de> for Hue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let h = f64::deserialize(deserializer)?;
        if !h.is_finite() {
            return Err(serde::de::Error::custom("hue must be finite"));
        }
        Ok(Hue::from_degrees(h))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: Hue,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    pub fn chromatic(h: f64, s: f64, v: f64) -> Self {
        Hsv {
            h: Hue::Chromatic(normalize_degrees(h)),
            s,
            v,
        }
    }

    /// For constant tables; `h` must already be within `[0, 360)`.
    pub const fn chromatic_const(h: f64, s: f64, v: f64) -> Self {
        Hsv {
            h: Hue::Chromatic(h),
            s,
            v,
        }
    }

    pub fn achromatic(shade: Shade, v: f64) -> Self {
        Hsv {
            h: Hue::Achromatic(shade),
            s: 0.0,
            v,
        }
    }

    pub fn to_rgb(self) -> [u8; 3] {
        hsv_to_rgb(self)
    }

    /// `RRGGBB`, upper case, no leading `#`.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb();
        format!("{r:02X}{g:02X}{b:02X}")
    }

    pub fn to_css(self) -> String {
        let [r, g, b] = self.to_rgb();
        format!("rgb({r}, {g}, {b})")
    }
}

pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

pub fn normalize_degrees(h: f64) -> f64 {
    let h = h.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if h >= 360.0 { 0.0 } else { h }
}

/// Hexagonal RGB to HSV. Grays get hue 0; black gets saturation 0.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let rgb: Srgb<f64> = Srgb::new(r, g, b).into_format();
    let hsv = PaletteHsv::from_color(rgb);
    let h = if r == g && g == b {
        0.0
    } else {
        normalize_degrees(hsv.hue.into_positive_degrees())
    };
    let s = if r.max(g).max(b) == 0 { 0.0 } else { hsv.saturation };
    Hsv {
        h: Hue::Chromatic(h),
        s: clamp01(s),
        v: clamp01(hsv.value),
    }
}

/// HSV to 8-bit RGB. Saturation and value are clamped to `[0, 1]` first.
///
/// Achromatic colors ignore `s` and become a gray of `round(v * 255)`.
/// Channels round half away from zero.
pub fn hsv_to_rgb(color: Hsv) -> [u8; 3] {
    let s = clamp01(color.s);
    let v = clamp01(color.v);
    match color.h {
        Hue::Achromatic(_) => {
            let gray = to_channel(v);
            [gray, gray, gray]
        }
        Hue::Chromatic(h) => {
            let hsv = PaletteHsv::new(normalize_degrees(h), s, v);
            let rgb = Srgb::<f64>::from_color(hsv);
            [to_channel(rgb.red), to_channel(rgb.green), to_channel(rgb.blue)]
        }
    }
}

fn to_channel(x: f64) -> u8 {
    (clamp01(x) * 255.0).round() as u8
}

/// Shortest-path interpolation around the hue circle.
///
/// An achromatic endpoint is never blended: the chromatic side wins, and two
/// achromatic endpoints keep the first.
pub fn lerp_hue(from: Hue, to: Hue, t: f64) -> Hue {
    match (from, to) {
        (Hue::Achromatic(_), Hue::Achromatic(_)) => from,
        (Hue::Achromatic(_), chromatic) => chromatic,
        (chromatic, Hue::Achromatic(_)) => chromatic,
        (Hue::Chromatic(a), Hue::Chromatic(b)) => {
            let a = normalize_degrees(a);
            let b = normalize_degrees(b);
            let mut d = b - a;
            if d > 180.0 {
                d -= 360.0;
            }
            if d < -180.0 {
                d += 360.0;
            }
            Hue::Chromatic(normalize_degrees(a + d * t))
        }
    }
}

/// Mean direction of a set of hues in degrees, or `None` for no input or a
/// perfectly balanced set.
pub fn circular_mean_hue(hues: &[f64]) -> Option<f64> {
    if hues.is_empty() {
        return None;
    }
    let (sin_sum, cos_sum) = hues.iter().fold((0.0, 0.0), |(s, c), h| {
        let rad = h.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    if sin_sum.abs() < 1e-9 && cos_sum.abs() < 1e-9 {
        return None;
    }
    Some(normalize_degrees(sin_sum.atan2(cos_sum).to_degrees()))
}
