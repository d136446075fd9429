//! Deterministic daily dairy-farm biophysical simulation.
//!
//! One [`SimContext`] per input document runs a 365-day-year clock over
//! the farm state: scheduled field operations, the soil water and
//! nitrogen kernels (compute both, then commit both), least-cost ration
//! formulation on its interval, and buffered per-year CSV reports.
//! There is no global state and no stochastic term; re-running the same
//! inputs produces bit-identical output.

pub mod clock;
pub mod error;
pub mod io;
pub mod ration;
pub mod soil;
pub mod weather;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::clock::SimClock;
use crate::error::ConfigError;
use crate::io::config::FarmInput;
use crate::io::report::Reports;
use crate::ration::{FeedCatalog, Ration};
use crate::soil::{events, nitrogen, water, Soil};
use crate::weather::WeatherSeries;

/// All mutable farm state owned by one simulation.
pub struct Farm {
    pub soil: Soil,
    pub catalog: FeedCatalog,
    pub ration: Option<Ration>,
}

/// One simulation run: configuration, farm state, weather, clock, and
/// report buffers.
pub struct SimContext {
    input: FarmInput,
    farm: Farm,
    weather: WeatherSeries,
    clock: SimClock,
    reports: Reports,
}

impl SimContext {
    /// Build a run from a farm input document. The weather CSV path is
    /// resolved relative to the input file; when `output_root` is given,
    /// the configured output directory is nested under it.
    pub fn from_input_path(path: &Path, output_root: Option<&Path>) -> Result<Self> {
        let input = FarmInput::load_from_path(path)?;
        let duration = input.config.duration()?;

        let weather_path = if input.weather.is_absolute() {
            input.weather.clone()
        } else {
            path.parent().unwrap_or_else(|| Path::new(".")).join(&input.weather)
        };
        let weather = io::weather::load_from_path(&weather_path, duration)?;

        let soil = Soil::from_config(&input.farm.soil)?;
        let catalog = FeedCatalog::from_config(&input.farm.feed);

        let ration_section = &input.farm.animal.ration;
        if !ration_section.user_input {
            if catalog.is_empty() {
                return Err(ConfigError::Feed(
                    "ration formulation is enabled but no feeds are configured".into(),
                )
                .into());
            }
            if ration_section.formulation_interval == 0 {
                return Err(ConfigError::Feed(
                    "ration formulation interval must be at least one day".into(),
                )
                .into());
            }
        }

        // like the weather path, a relative output dir is anchored at the
        // input file, never at the process working directory
        let output_dir: PathBuf = match output_root {
            Some(root) => root.join(&input.config.output_dir),
            None if input.config.output_dir.is_absolute() => input.config.output_dir.clone(),
            None => path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&input.config.output_dir),
        };
        let reports =
            Reports::create(&input.output, &output_dir, soil.layers.len(), &catalog.names())?;

        Ok(Self {
            input,
            farm: Farm {
                soil,
                catalog,
                ration: None,
            },
            weather,
            clock: SimClock::new(duration),
            reports,
        })
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn farm(&self) -> &Farm {
        &self.farm
    }

    /// Run the simulation to completion, flushing reports at each year
    /// end.
    pub fn run(&mut self) -> Result<()> {
        info!(years = self.clock.duration(), "starting simulation");
        while !self.clock.is_simulation_end() {
            let year_end = self.clock.is_year_end();
            self.step_day()?;
            if year_end {
                debug!(year = self.clock.year, "year complete, flushing reports");
                self.reports.write_annual()?;
            }
            self.clock.advance();
        }
        info!("simulation complete");
        Ok(())
    }

    /// Advance the farm through the clock's current day.
    pub fn step_day(&mut self) -> Result<()> {
        let year = self.clock.year;
        let day = self.clock.day;
        let today = self.weather.day(year, day);

        events::apply_scheduled(&mut self.farm.soil, year, day);

        // both kernels rate against the committed evening state before
        // either commits
        let water_fluxes = water::compute(&self.farm.soil, &today, day);
        let nitrogen_fluxes = nitrogen::compute(&self.farm.soil, &water_fluxes, today.rainfall);
        water::apply(&mut self.farm.soil, &water_fluxes, today.rainfall);
        nitrogen::apply(&mut self.farm.soil, &nitrogen_fluxes, today.added_n);

        let ration_section = &self.input.farm.animal.ration;
        let formulated_today =
            !ration_section.user_input && day % ration_section.formulation_interval == 1;
        if formulated_today {
            let ration = ration::formulate(&self.input.farm.animal, &self.farm.catalog)
                .with_context(|| format!("ration formulation failed (year {year}, day {day})"))?;
            debug!(
                cost = ration.cost,
                steps = ration.relaxation_steps,
                "ration formulated"
            );
            self.farm.ration = Some(ration);
        }

        self.reports.daily_update(
            &self.farm.soil,
            if formulated_today {
                self.farm.ration.as_ref()
            } else {
                None
            },
            &today,
            year,
            day,
        );
        Ok(())
    }
}
