// src/world/generator.rs
//
// Plasma fractal (midpoint displacement) height generator.
//
// - `generate(seed)` fills every still-unset cell of the grid; pre-seeded cells survive,
//   which is how tile edges shared with neighbours are kept identical.
// - Output is a pure function of (seed, pre-seeded cells, config).
// - Every random draw is normalized from [clamping_min, clamping_max] to [0, 1].

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::REGENERATE_ATTEMPTS;
use crate::error::InvalidConfig;
use crate::world::grid::HeightGrid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionKind {
    Uniform,
    Normal,
    Weibull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampingMode {
    /// Clamp the raw draw into range.
    RoundToRange,
    /// Redraw until the value lands in range (bounded by `REGENERATE_ATTEMPTS`).
    RegenerateUntilInRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixingMode {
    Gaussian,
    Linear,
}

/// Statistical parameters of one generation run.
///
/// Parameters of every distribution are kept even when another one is active.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeightFieldConfig {
    /// Grid side is `1 + 2^size`.
    pub size: u32,

    pub distribution: DistributionKind,
    pub uniform_min: f32,
    pub uniform_max: f32,
    pub normal_mean: f32,
    pub normal_variance: f32,
    pub weibull_scale: f32,
    pub weibull_shape: f32,

    pub clamping: ClampingMode,
    pub clamping_min: f32,
    pub clamping_max: f32,

    pub mixing: MixingMode,
    pub two_point_gauss_cutoff: f32,
    pub four_point_gauss_cutoff: f32,
    pub two_point_linear_min: f32,
    pub four_point_linear_min: f32,
}

impl Default for HeightFieldConfig {
    fn default() -> Self {
        Self {
            size: 7,

            distribution: DistributionKind::Normal,
            uniform_min: 0.0,
            uniform_max: 1.0,
            normal_mean: 0.8,
            normal_variance: 1.0,
            weibull_scale: 1.0,
            weibull_shape: 5.0,

            clamping: ClampingMode::RegenerateUntilInRange,
            clamping_min: -2.5,
            clamping_max: 2.0,

            mixing: MixingMode::Linear,
            two_point_gauss_cutoff: 2.5,
            four_point_gauss_cutoff: 2.1,
            two_point_linear_min: 0.05,
            four_point_linear_min: 0.01,
        }
    }
}

impl HeightFieldConfig {
    // Comparisons are written so NaN fails every check.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if !(3..=11).contains(&self.size) {
            return Err(InvalidConfig::Size(self.size));
        }
        if !(self.uniform_max > self.uniform_min) {
            return Err(InvalidConfig::UniformRange { min: self.uniform_min, max: self.uniform_max });
        }
        if !(self.normal_variance > 0.0) {
            return Err(InvalidConfig::NormalVariance(self.normal_variance));
        }
        if !(self.weibull_scale > 0.0 && self.weibull_shape > 0.0) {
            return Err(InvalidConfig::Weibull { scale: self.weibull_scale, shape: self.weibull_shape });
        }
        if !(self.clamping_max > self.clamping_min) {
            return Err(InvalidConfig::ClampingRange { min: self.clamping_min, max: self.clamping_max });
        }
        if !(self.two_point_gauss_cutoff > 0.0 && self.four_point_gauss_cutoff > 0.0) {
            return Err(InvalidConfig::GaussCutoff {
                two_point: self.two_point_gauss_cutoff,
                four_point: self.four_point_gauss_cutoff,
            });
        }
        if !(self.two_point_linear_min > 0.0 && self.two_point_linear_min < 0.5) {
            return Err(InvalidConfig::TwoPointLinearMin(self.two_point_linear_min));
        }
        if !(self.four_point_linear_min > 0.0 && self.four_point_linear_min < 0.25) {
            return Err(InvalidConfig::FourPointLinearMin(self.four_point_linear_min));
        }
        Ok(())
    }

    #[inline]
    pub fn side(&self) -> usize {
        1 + (1usize << self.size)
    }
}

#[inline(always)]
fn gauss(x: f32) -> f32 {
    (-x * x).exp()
}

pub struct Fractal {
    config: HeightFieldConfig,
    grid: HeightGrid,
    rng: ChaCha8Rng,
}

impl Default for Fractal {
    fn default() -> Self {
        Self::new()
    }
}

impl Fractal {
    pub fn new() -> Self {
        let config = HeightFieldConfig::default();
        Self {
            grid: HeightGrid::for_exponent(config.size),
            config,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    pub fn with_config(config: HeightFieldConfig) -> Result<Self, InvalidConfig> {
        config.validate()?;
        Ok(Self {
            grid: HeightGrid::for_exponent(config.size),
            config,
            rng: ChaCha8Rng::seed_from_u64(0),
        })
    }

    #[inline]
    pub fn config(&self) -> &HeightFieldConfig {
        &self.config
    }

    /// Applies `config` if valid. On rejection the current config stays active.
    pub fn set_config(&mut self, config: HeightFieldConfig) -> bool {
        if let Err(why) = config.validate() {
            debug!("fractal config rejected: {why}");
            return false;
        }
        if config.size != self.config.size {
            self.grid.resize_for_exponent(config.size);
        }
        self.config = config;
        true
    }

    /// Samples per side.
    #[inline]
    pub fn size(&self) -> usize {
        self.grid.side()
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    #[inline]
    pub fn set_value(&mut self, x: i32, z: i32, v: f32) {
        self.grid.set(x, z, v);
    }

    #[inline]
    pub fn value(&self, x: i32, z: i32) -> f32 {
        self.grid.get(x, z)
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    pub fn generate(&mut self, seed: i32) {
        self.rng = ChaCha8Rng::seed_from_u64(seed as u32 as u64);

        let last = (self.grid.side() - 1) as i32;

        // Always draw all four so pre-seeded corners don't shift the stream.
        let v1 = self.random_value();
        self.grid.fill_unset(0, 0, v1);
        let v2 = self.random_value();
        self.grid.fill_unset(0, last, v2);
        let v3 = self.random_value();
        self.grid.fill_unset(last, last, v3);
        let v4 = self.random_value();
        self.grid.fill_unset(last, 0, v4);

        self.generate_recursive(0, 0, last, last);
    }

    fn raw_draw(&mut self) -> f32 {
        let c = self.config;
        match c.distribution {
            DistributionKind::Uniform => {
                let x: f32 = self.rng.gen();
                c.uniform_min + x * (c.uniform_max - c.uniform_min)
            }
            DistributionKind::Normal => {
                // Box-Muller; u is in (0, 1] so ln(u) is finite.
                let u: f32 = 1.0 - self.rng.gen::<f32>();
                let v: f32 = self.rng.gen();
                let normal = (-2.0 * u.ln()).sqrt() * (2.0 * std::f32::consts::PI * v).cos();
                c.normal_mean + c.normal_variance * normal
            }
            DistributionKind::Weibull => {
                let alpha = c.weibull_scale.powf(-c.weibull_shape);
                let x: f32 = self.rng.gen();
                (-(1.0 - x).ln() / alpha).powf(1.0 / c.weibull_shape)
            }
        }
    }

    /// One draw from the configured distribution, clamped and normalized to [0, 1].
    pub fn random_value(&mut self) -> f32 {
        let (lo, hi) = (self.config.clamping_min, self.config.clamping_max);

        let mut value = 0.0;
        for _ in 0..REGENERATE_ATTEMPTS {
            value = self.raw_draw();
            match self.config.clamping {
                ClampingMode::RoundToRange => {
                    value = value.clamp(lo, hi);
                    break;
                }
                ClampingMode::RegenerateUntilInRange => {
                    if value >= lo && value <= hi {
                        break;
                    }
                }
            }
        }

        // Only bites when every regenerate attempt missed the range.
        let value = value.clamp(lo, hi);
        (value - lo) / (hi - lo)
    }

    #[inline]
    fn two_point_mix(&self, scale: f32) -> f32 {
        match self.config.mixing {
            MixingMode::Gaussian => 0.5 * gauss(scale * self.config.two_point_gauss_cutoff),
            MixingMode::Linear => 0.5 - scale * (0.5 - self.config.two_point_linear_min),
        }
    }

    #[inline]
    fn four_point_mix(&self, scale: f32) -> f32 {
        match self.config.mixing {
            MixingMode::Gaussian => 0.25 * gauss(scale * self.config.four_point_gauss_cutoff),
            MixingMode::Linear => 0.25 - scale * (0.25 - self.config.four_point_linear_min),
        }
    }

    fn generate_recursive(&mut self, x1: i32, z1: i32, x2: i32, z2: i32) {
        let mid_x = (x1 + x2) / 2;
        let mid_z = (z1 + z2) / 2;
        let mid_scale = (x2 - x1) as f32 / self.grid.side() as f32;

        let c11 = self.grid.get(x1, z1);
        let c21 = self.grid.get(x2, z1);
        let c12 = self.grid.get(x1, z2);
        let c22 = self.grid.get(x2, z2);

        let m2 = self.two_point_mix(mid_scale);
        let r2 = 1.0 - 2.0 * m2;

        let v = r2 * self.random_value() + m2 * (c11 + c21);
        self.grid.fill_unset(mid_x, z1, v);

        let v = r2 * self.random_value() + m2 * (c12 + c22);
        self.grid.fill_unset(mid_x, z2, v);

        let v = r2 * self.random_value() + m2 * (c11 + c12);
        self.grid.fill_unset(x1, mid_z, v);

        let v = r2 * self.random_value() + m2 * (c21 + c22);
        self.grid.fill_unset(x2, mid_z, v);

        let m4 = self.four_point_mix(mid_scale);
        let v = (1.0 - 4.0 * m4) * self.random_value() + m4 * (c11 + c12 + c21 + c22);
        self.grid.fill_unset(mid_x, mid_z, v);

        if mid_x == x1 + 1 {
            return;
        }

        self.generate_recursive(x1, z1, mid_x, mid_z);
        self.generate_recursive(mid_x, z1, x2, mid_z);
        self.generate_recursive(x1, mid_z, mid_x, z2);
        self.generate_recursive(mid_x, mid_z, x2, z2);
    }
}
