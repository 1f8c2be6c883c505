use thiserror::Error;

/// Reasons a `HeightFieldConfig` is refused.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidConfig {
    #[error("size exponent {0} outside [3, 11]")]
    Size(u32),
    #[error("uniform range is empty: max {max} <= min {min}")]
    UniformRange { min: f32, max: f32 },
    #[error("normal variance must be positive, got {0}")]
    NormalVariance(f32),
    #[error("weibull scale and shape must be positive, got scale {scale} shape {shape}")]
    Weibull { scale: f32, shape: f32 },
    #[error("clamping range is empty: max {max} <= min {min}")]
    ClampingRange { min: f32, max: f32 },
    #[error("gaussian cutoffs must be positive, got two-point {two_point} four-point {four_point}")]
    GaussCutoff { two_point: f32, four_point: f32 },
    #[error("two-point linear minimum must lie in (0, 0.5), got {0}")]
    TwoPointLinearMin(f32),
    #[error("four-point linear minimum must lie in (0, 0.25), got {0}")]
    FourPointLinearMin(f32),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read terrain settings: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse terrain settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("terrain settings rejected: {0}")]
    Rejected(#[from] InvalidConfig),
}

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("failed to start tile worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
    #[error("tile worker panicked")]
    WorkerPanicked,
    #[error("generator grid has {found} samples per side, tiles need {expected}")]
    GridSizeMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
