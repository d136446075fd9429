use thiserror::Error;

/// Fatal problems detected before a simulation run starts.
///
/// Every variant aborts the run for the offending input file only; batch
/// callers continue with their remaining files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("simulation duration must be at least 1 year (start {start}, end {end})")]
    InvalidDuration { start: i32, end: i32 },

    #[error("weather file covers {available} whole years but the simulation needs {required}")]
    WeatherTooShort { available: u32, required: u32 },

    #[error("weather row {row}: t_max {t_max} is below t_min {t_min}")]
    WeatherTemperatureOrder { row: usize, t_max: f64, t_min: f64 },

    #[error("soil section: {0}")]
    Soil(String),

    #[error("feed section: {0}")]
    Feed(String),
}

/// Failures of the least-cost ration formulation.
#[derive(Debug, Error)]
pub enum RationError {
    #[error(
        "no feasible ration after {attempts} milk-target relaxations \
         (multiplier floor {multiplier:.4})"
    )]
    Exhausted { attempts: u32, multiplier: f64 },
}
