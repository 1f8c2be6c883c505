// src/world/preview.rs
//
// Grayscale snapshot of a fractal, for previewing parameter changes.

use image::GrayImage;

use crate::world::generator::{Fractal, HeightFieldConfig};

pub const PREVIEW_SEED: i32 = 0;

/// Renders the already-generated grid; the last row/column is dropped so the image is 2^n square.
pub fn grayscale(fractal: &Fractal) -> GrayImage {
    let s = (fractal.size() - 1) as u32;
    GrayImage::from_fn(s, s, |x, y| {
        let v = fractal.value(x as i32, y as i32).clamp(0.0, 1.0);
        image::Luma([(v * 255.0) as u8])
    })
}

/// Fresh generator, one run with `seed`. `None` if the config is invalid.
pub fn preview_image(config: &HeightFieldConfig, seed: i32) -> Option<GrayImage> {
    let mut fractal = Fractal::with_config(*config).ok()?;
    fractal.clear();
    fractal.generate(seed);
    Some(grayscale(&fractal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_has_power_of_two_side() {
        let cfg = HeightFieldConfig { size: 5, ..HeightFieldConfig::default() };
        let img = preview_image(&cfg, PREVIEW_SEED).expect("valid config");
        assert_eq!(img.dimensions(), (32, 32));
    }

    #[test]
    fn preview_matches_grid() {
        let cfg = HeightFieldConfig { size: 4, ..HeightFieldConfig::default() };
        let mut f = Fractal::with_config(cfg).expect("valid config");
        f.clear();
        f.generate(9);
        let img = grayscale(&f);
        assert_eq!(img.get_pixel(3, 5)[0], (f.value(3, 5) * 255.0) as u8);
    }

    #[test]
    fn invalid_config_has_no_preview() {
        let cfg = HeightFieldConfig { clamping_min: 1.0, clamping_max: 0.0, ..HeightFieldConfig::default() };
        assert!(preview_image(&cfg, PREVIEW_SEED).is_none());
    }
}
