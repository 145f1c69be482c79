use crate::color::{Hsv, Hue};

/// Left-to-right display order: chromatic entries by ascending hue, then the
/// achromatic entries in their original order.
pub fn spectrum_order(palette: &[Hsv]) -> Vec<Hsv> {
    let (mut chromatic, achromatic): (Vec<Hsv>, Vec<Hsv>) =
        palette.iter().partition(|c| c.h.is_chromatic());
    chromatic.sort_by(|a, b| a.h.degrees().total_cmp(&b.h.degrees()));
    chromatic.extend(achromatic);
    chromatic
}

/// Gradient stop position (0..=1) of each chromatic entry in a spectrum
/// produced by [`spectrum_order`].
pub fn gradient_stops(spectrum: &[Hsv]) -> Vec<(f64, Hsv)> {
    let chromatic: Vec<&Hsv> = spectrum
        .iter()
        .filter(|c| matches!(c.h, Hue::Chromatic(_)))
        .collect();
    let span = chromatic.len().saturating_sub(1).max(1) as f64;
    chromatic
        .into_iter()
        .enumerate()
        .map(|(i, c)| (i as f64 / span, *c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Shade;

    #[test]
    fn sorts_chromatic_and_moves_achromatic_last() {
        let palette = vec![
            Hsv::achromatic(Shade::White, 0.9),
            Hsv::chromatic(240.0, 0.5, 0.5),
            Hsv::achromatic(Shade::Black, 0.1),
            Hsv::chromatic(30.0, 0.5, 0.5),
            Hsv::chromatic(120.0, 0.5, 0.5),
        ];
        let hues: Vec<f64> = spectrum_order(&palette).iter().map(|c| c.h.degrees()).collect();
        assert_eq!(hues, vec![30.0, 120.0, 240.0, -1.0, -2.0]);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(spectrum_order(&[]).is_empty());
        assert!(gradient_stops(&[]).is_empty());
    }

    #[test]
    fn stops_span_the_unit_interval() {
        let spectrum = spectrum_order(&[
            Hsv::chromatic(0.0, 0.5, 0.5),
            Hsv::chromatic(90.0, 0.5, 0.5),
            Hsv::chromatic(180.0, 0.5, 0.5),
            Hsv::achromatic(Shade::Gray, 0.5),
        ]);
        let stops: Vec<f64> = gradient_stops(&spectrum).iter().map(|(p, _)| *p).collect();
        assert_eq!(stops, vec![0.0, 0.5, 1.0]);

        let single = gradient_stops(&[Hsv::chromatic(10.0, 0.5, 0.5)]);
        assert_eq!(single[0].0, 0.0);
    }
}
