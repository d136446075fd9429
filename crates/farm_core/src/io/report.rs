//! Buffered per-year report emission.
//!
//! Each active report accumulates one rendered row per day (or per
//! formulation event) and appends the buffered year to its CSV file when
//! the orchestrator closes the year, then starts over empty. Files are
//! created with their header when the run starts, so a crashed run still
//! leaves well-formed output for the years it completed.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::OutputSection;
use crate::ration::Ration;
use crate::soil::Soil;
use crate::weather::WeatherDay;

/// The set of report handlers activated by the input document.
pub struct Reports {
    soil_summary: Option<CsvReport>,
    soil_nitrogen: Option<CsvReport>,
    ration: Option<CsvReport>,
}

/// One buffered CSV report: header written at creation, rows appended
/// once per simulated year.
struct CsvReport {
    path: PathBuf,
    rows: Vec<Vec<String>>,
}

impl CsvReport {
    fn create(path: PathBuf, header: &[String]) -> Result<Self> {
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("failed to create report file {:?}", path))?;
        writer.write_record(header)?;
        writer.flush()?;
        Ok(Self {
            path,
            rows: Vec::new(),
        })
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn write_annual(&mut self) -> Result<()> {
        let file = File::options()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to append report file {:?}", self.path))?;
        let mut writer = csv::Writer::from_writer(file);
        for row in self.rows.drain(..) {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn per_layer(prefix: &str, layer_count: usize) -> impl Iterator<Item = String> + '_ {
    (1..=layer_count).map(move |layer| format!("{prefix}_l{layer}"))
}

fn fmt(value: f64) -> String {
    format!("{value:.4}")
}

impl Reports {
    /// Create the output directory and the activated report files.
    pub fn create(
        output: &OutputSection,
        output_dir: &Path,
        layer_count: usize,
        feed_names: &[String],
    ) -> Result<Self> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create output dir {:?}", output_dir))?;

        let soil_summary = match &output.soil_summary {
            Some(toggle) if toggle.active => {
                let mut header = vec!["year".to_string(), "julian_day".to_string()];
                header.extend(
                    ["rainfall", "runoff", "potential_et", "transpiration", "soil_evaporation"]
                        .map(String::from),
                );
                header.extend(per_layer("soil_water", layer_count));
                header.extend(per_layer("esoil", layer_count));
                header.extend(per_layer("perc", layer_count));
                header.extend(per_layer("temp", layer_count));
                header.push("surface_temp".to_string());
                header.push("sediment_yield".to_string());
                Some(CsvReport::create(output_dir.join(&toggle.file), &header)?)
            }
            _ => None,
        };

        let soil_nitrogen = match &output.soil_nitrogen {
            Some(toggle) if toggle.active => {
                let mut header = vec!["year".to_string(), "julian_day".to_string()];
                header.extend(per_layer("no3", layer_count));
                header.extend(per_layer("nh4", layer_count));
                header.extend(per_layer("active_n", layer_count));
                header.extend(per_layer("stable_n", layer_count));
                header.push("fresh_n".to_string());
                header.extend(["c_to_n", "fresh_min", "fresh_decomp"].map(String::from));
                header.extend(per_layer("nitrification", layer_count));
                header.extend(per_layer("volatilization", layer_count));
                header.extend(per_layer("denitrification", layer_count));
                header.extend(per_layer("no3_perc", layer_count));
                header.extend(per_layer("nh4_perc", layer_count));
                header.extend(
                    [
                        "no3_runoff",
                        "nh4_runoff",
                        "fresh_n_loss",
                        "active_n_loss",
                        "stable_n_loss",
                        "nh4_loss",
                        "enrichment_ratio",
                        "cumulative_manure_mass",
                        "cumulative_manure_p",
                    ]
                    .map(String::from),
                );
                Some(CsvReport::create(output_dir.join(&toggle.file), &header)?)
            }
            _ => None,
        };

        let ration = match &output.ration_report {
            Some(toggle) if toggle.active => {
                let mut header = vec![
                    "year".to_string(),
                    "julian_day".to_string(),
                    "cost".to_string(),
                    "milk_multiplier".to_string(),
                    "relaxation_steps".to_string(),
                ];
                header.extend(feed_names.iter().cloned());
                Some(CsvReport::create(output_dir.join(&toggle.file), &header)?)
            }
            _ => None,
        };

        Ok(Self {
            soil_summary,
            soil_nitrogen,
            ration,
        })
    }

    /// Snapshot the committed end-of-day state. `formulated` is the
    /// ration produced today, present only on formulation days.
    pub fn daily_update(
        &mut self,
        soil: &Soil,
        formulated: Option<&Ration>,
        weather: &WeatherDay,
        year: u32,
        day: u16,
    ) {
        if let Some(report) = &mut self.soil_summary {
            let water = &soil.daily_water;
            let mut row = vec![year.to_string(), day.to_string()];
            row.push(fmt(weather.rainfall));
            row.push(fmt(water.runoff));
            row.push(fmt(water.potential_et));
            row.push(fmt(water.transpiration));
            row.push(fmt(water.soil_evaporation));
            row.extend(soil.layers.iter().map(|l| fmt(l.water_mm)));
            row.extend(water.layer_evaporation.iter().copied().map(fmt));
            row.extend(water.percolation.iter().copied().map(fmt));
            row.extend(soil.layers.iter().map(|l| fmt(l.temperature)));
            row.push(fmt(soil.surface_temperature));
            row.push(fmt(water.sediment));
            report.push(row);
        }

        if let Some(report) = &mut self.soil_nitrogen {
            let nitrogen = &soil.daily_nitrogen;
            let mut row = vec![year.to_string(), day.to_string()];
            row.extend(soil.layers.iter().map(|l| fmt(l.no3)));
            row.extend(soil.layers.iter().map(|l| fmt(l.nh4)));
            row.extend(soil.layers.iter().map(|l| fmt(l.active_n)));
            row.extend(soil.layers.iter().map(|l| fmt(l.stable_n)));
            row.push(fmt(soil.fresh_n));
            row.push(fmt(nitrogen.c_to_n));
            row.push(fmt(nitrogen.fresh_min));
            row.push(fmt(nitrogen.fresh_decomp));
            row.extend(nitrogen.nitrification.iter().copied().map(fmt));
            row.extend(nitrogen.volatilization.iter().copied().map(fmt));
            row.extend(nitrogen.denitrification.iter().copied().map(fmt));
            row.extend(nitrogen.no3_perc.iter().copied().map(fmt));
            row.extend(nitrogen.nh4_perc.iter().copied().map(fmt));
            row.push(fmt(nitrogen.no3_runoff));
            row.push(fmt(nitrogen.nh4_runoff));
            row.push(fmt(nitrogen.fresh_n_loss));
            row.push(fmt(nitrogen.active_n_loss));
            row.push(fmt(nitrogen.stable_n_loss));
            row.push(fmt(nitrogen.nh4_loss));
            row.push(fmt(nitrogen.enrichment_ratio));
            row.push(fmt(soil.cumulative_manure_mass));
            row.push(fmt(soil.cumulative_manure_p));
            report.push(row);
        }

        if let (Some(report), Some(ration)) = (&mut self.ration, formulated) {
            let mut row = vec![
                year.to_string(),
                day.to_string(),
                fmt(ration.cost),
                fmt(ration.milk_production_multiplier),
                ration.relaxation_steps.to_string(),
            ];
            row.extend(ration.quantities.iter().map(|(_, kg)| fmt(*kg)));
            report.push(row);
        }
    }

    /// Append the buffered year to each active file and clear the
    /// buffers.
    pub fn write_annual(&mut self) -> Result<()> {
        for report in [&mut self.soil_summary, &mut self.soil_nitrogen, &mut self.ration]
            .into_iter()
            .flatten()
        {
            report.write_annual()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::test_fixtures::soil_section;
    use crate::io::config::ReportToggle;

    fn all_active() -> OutputSection {
        OutputSection {
            soil_summary: Some(ReportToggle {
                active: true,
                file: "soil_summary.csv".to_string(),
            }),
            soil_nitrogen: Some(ReportToggle {
                active: true,
                file: "soil_nitrogen.csv".to_string(),
            }),
            ration_report: Some(ReportToggle {
                active: false,
                file: "ration.csv".to_string(),
            }),
        }
    }

    #[test]
    fn writes_header_then_buffered_rows_per_year() {
        let dir = tempfile::tempdir().unwrap();
        let soil = Soil::from_config(&soil_section()).unwrap();
        let mut reports = Reports::create(&all_active(), dir.path(), 3, &[]).unwrap();

        let weather = WeatherDay::default();
        reports.daily_update(&soil, None, &weather, 1, 1);
        reports.daily_update(&soil, None, &weather, 1, 2);
        reports.write_annual().unwrap();

        let contents = fs::read_to_string(dir.path().join("soil_summary.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("year,julian_day,rainfall"));
        assert!(lines[0].contains("soil_water_l3"));
        assert!(lines[1].starts_with("1,1,"));

        // inactive toggle creates no file
        assert!(!dir.path().join("ration.csv").exists());
    }

    #[test]
    fn annual_flush_empties_the_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let soil = Soil::from_config(&soil_section()).unwrap();
        let mut reports = Reports::create(&all_active(), dir.path(), 3, &[]).unwrap();

        reports.daily_update(&soil, None, &WeatherDay::default(), 1, 1);
        reports.write_annual().unwrap();
        reports.write_annual().unwrap();

        let contents = fs::read_to_string(dir.path().join("soil_nitrogen.csv")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
