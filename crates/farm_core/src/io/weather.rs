//! Weather CSV ingestion.
//!
//! One header row, then one row per day with a leading date/index column
//! followed by seven value columns: rainfall, max/min/avg temperature,
//! standing biomass, solar radiation, and added nitrogen. Columns past
//! the seventh value are ignored, as are rows past the simulation
//! duration. Too few whole years of rows, or any row with max
//! temperature below min temperature, rejects the file before the run
//! starts.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::clock::DAYS_PER_YEAR;
use crate::error::ConfigError;
use crate::weather::{WeatherDay, WeatherSeries};

/// Load and validate a weather CSV from disk.
pub fn load_from_path(path: &Path, duration: u32) -> Result<WeatherSeries> {
    let file =
        File::open(path).with_context(|| format!("failed to open weather file {:?}", path))?;
    from_reader(file, duration).with_context(|| format!("invalid weather file {:?}", path))
}

/// Parse a weather table from an arbitrary reader.
pub fn from_reader<R: Read>(reader: R, duration: u32) -> Result<WeatherSeries> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("weather row {}", index + 1))?;
        let value = |column: usize| -> Result<f64> {
            row.get(column)
                .with_context(|| {
                    format!("weather row {} is missing column {}", index + 1, column)
                })?
                .parse::<f64>()
                .with_context(|| {
                    format!("weather row {} column {} is not a number", index + 1, column)
                })
        };

        let day = WeatherDay {
            rainfall: value(1)?,
            t_max: value(2)?,
            t_min: value(3)?,
            t_avg: value(4)?,
            biomass: value(5)?,
            radiation: value(6)?,
            added_n: value(7)?,
        };
        if day.t_max < day.t_min {
            return Err(ConfigError::WeatherTemperatureOrder {
                row: index + 1,
                t_max: day.t_max,
                t_min: day.t_min,
            }
            .into());
        }
        records.push(day);
    }

    let available = records.len() as u32 / u32::from(DAYS_PER_YEAR);
    if available < duration {
        return Err(ConfigError::WeatherTooShort {
            available,
            required: duration,
        }
        .into());
    }

    Ok(WeatherSeries::from_records(&records, duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "date,rainfall,tmax,tmin,tavg,biomass,radiation,added_n\n";

    fn one_year(rainfall: f64) -> String {
        let mut table = String::from(HEADER);
        for day in 1..=365 {
            table.push_str(&format!(
                "{day},{rainfall},24.0,12.0,18.0,2000.0,22.0,0.01\n"
            ));
        }
        table
    }

    #[test]
    fn loads_a_full_year() {
        let series = from_reader(one_year(3.5).as_bytes(), 1).unwrap();
        let day = series.day(1, 200);
        assert_eq!(day.rainfall, 3.5);
        assert_eq!(day.t_avg, 18.0);
        assert_eq!(day.added_n, 0.01);
    }

    #[test]
    fn rejects_a_short_file() {
        let mut table = String::from(HEADER);
        for day in 1..=100 {
            table.push_str(&format!("{day},0.0,24.0,12.0,18.0,2000.0,22.0,0.0\n"));
        }
        let err = from_reader(table.as_bytes(), 1).unwrap_err();
        let config_err = err.downcast_ref::<ConfigError>().unwrap();
        assert!(matches!(
            config_err,
            ConfigError::WeatherTooShort {
                available: 0,
                required: 1
            }
        ));
    }

    #[test]
    fn rejects_inverted_temperatures() {
        let mut table = String::from(HEADER);
        table.push_str("1,0.0,5.0,12.0,8.0,2000.0,22.0,0.0\n");
        let err = from_reader(table.as_bytes(), 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>().unwrap(),
            ConfigError::WeatherTemperatureOrder { row: 1, .. }
        ));
    }

    #[test]
    fn extra_columns_are_ignored() {
        let mut table = String::from(
            "date,rainfall,tmax,tmin,tavg,biomass,radiation,added_n,evap,cows\n",
        );
        for day in 1..=365 {
            table.push_str(&format!(
                "{day},1.0,24.0,12.0,18.0,2000.0,22.0,0.0,9.9,120\n"
            ));
        }
        let series = from_reader(table.as_bytes(), 1).unwrap();
        assert_eq!(series.day(1, 1).rainfall, 1.0);
    }

    #[test]
    fn non_numeric_cell_names_the_row() {
        let mut table = String::from(HEADER);
        table.push_str("1,oops,24.0,12.0,18.0,2000.0,22.0,0.0\n");
        let err = from_reader(table.as_bytes(), 1).unwrap_err();
        assert!(format!("{err:#}").contains("weather row 1"));
    }
}
