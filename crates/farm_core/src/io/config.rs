//! Farm input document: one JSON file describing a complete simulation
//! run. `FarmInput::load_from_path` is the single entry point; every
//! configuration error is surfaced here, before the first simulated day.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::soil::{CropUptakeEvent, FertilizerEvent, ManureEvent, TillageEvent};

/// Parsed farm input document.
#[derive(Clone, Debug, Deserialize)]
pub struct FarmInput {
    pub config: RunSection,
    pub farm: FarmSection,
    /// Weather CSV path, resolved relative to the input file.
    pub weather: PathBuf,
    pub output: OutputSection,
}

impl FarmInput {
    /// Load a farm input JSON document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open farm input {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("invalid farm input {:?}", path))
    }

    /// Deserialize a farm input document from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader).context("invalid farm input json")?)
    }
}

/// Run window and output location.
#[derive(Clone, Debug, Deserialize)]
pub struct RunSection {
    pub start_year: i32,
    pub end_year: i32,
    pub output_dir: PathBuf,
}

impl RunSection {
    /// Simulation duration in whole years; at least one.
    pub fn duration(&self) -> Result<u32, ConfigError> {
        let years = i64::from(self.end_year) - i64::from(self.start_year) + 1;
        if years < 1 {
            return Err(ConfigError::InvalidDuration {
                start: self.start_year,
                end: self.end_year,
            });
        }
        Ok(years as u32)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct FarmSection {
    pub soil: SoilSection,
    pub animal: AnimalSection,
    pub feed: FeedSection,
}

/// Soil profile, field geometry, and the field-operation schedules.
#[derive(Clone, Debug, Deserialize)]
pub struct SoilSection {
    pub profile_depth: f64,
    pub cn2: f64,
    pub field_slope: f64,
    pub slope_length: f64,
    pub manning: f64,
    pub field_size: f64,
    pub practice_factor: f64,
    pub org_c: f64,
    pub sand: f64,
    pub silt: f64,
    pub soil_albedo: f64,
    pub residue: f64,
    pub fresh_n_mineral_rate: f64,
    pub layers: Vec<LayerSection>,
    #[serde(default)]
    pub fertilizer: Vec<FertilizerEvent>,
    #[serde(default)]
    pub manure: Vec<ManureEvent>,
    #[serde(default)]
    pub tillage: Vec<TillageEvent>,
    #[serde(default)]
    pub crop_uptake: Vec<CropUptakeEvent>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LayerSection {
    pub bottom_depth: f64,
    pub bulk_density: f64,
    pub wilting_point: f64,
    pub field_capacity: f64,
    pub saturation: f64,
    pub ksat: f64,
    pub clay: f64,
    pub org_c: f64,
    pub labile_p: f64,
    pub frac_active_n: f64,
    pub active_mineral_rate: f64,
    pub cation_exclusion_fraction: f64,
    pub denitrification_rate: f64,
    pub volatile_exchange_factor: f64,
    /// Initial NH4 input (mg/kg, scaled to kg/ha at construction).
    pub nh4: f64,
    pub initial_temperature: f64,
}

/// Herd description driving the ration requirements. The lactation
/// parameters default to the reference cow used for calibration.
#[derive(Clone, Debug, Deserialize)]
pub struct AnimalSection {
    pub housing: Housing,
    pub ration: RationSection,
    #[serde(default = "default_parity")]
    pub parity: f64,
    #[serde(default = "default_weeks_in_milk")]
    pub weeks_in_milk: f64,
    #[serde(default = "default_average_milk_fat")]
    pub average_milk_fat: f64,
    #[serde(default = "default_body_weight_ratio")]
    pub body_weight_ratio: f64,
    #[serde(default = "default_base_diet_energy")]
    pub base_diet_energy: f64,
}

fn default_parity() -> f64 {
    1.0
}
fn default_weeks_in_milk() -> f64 {
    20.0
}
fn default_average_milk_fat() -> f64 {
    3.5
}
fn default_body_weight_ratio() -> f64 {
    1.0
}
fn default_base_diet_energy() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Housing {
    Barn,
    Drylot,
    Pasture,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RationSection {
    /// When true, no ration is formulated; the farm feeds a fixed diet.
    #[serde(default)]
    pub user_input: bool,
    /// A new ration is formulated on every day where
    /// `day % formulation_interval == 1`.
    pub formulation_interval: u16,
}

/// Farm-grown and purchased feed tables. On a name collision the
/// purchased entry wins.
#[derive(Clone, Debug, Deserialize)]
pub struct FeedSection {
    #[serde(default)]
    pub farm_feed: std::collections::BTreeMap<String, FeedEntry>,
    #[serde(default)]
    pub purchased_feed: std::collections::BTreeMap<String, FeedEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FeedEntry {
    /// Cost per kg dry matter.
    pub price: f64,
    /// Maximum kg available per day.
    pub limit: f64,
    #[serde(default)]
    pub units: String,
    pub nutrition: NutritionEntry,
}

/// Per-kg nutrition coefficients of a feed.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct NutritionEntry {
    /// Fiber intake share.
    pub fi: f64,
    /// Rumen volume contribution.
    pub rv: f64,
    /// Net energy (Mcal/kg).
    pub ne: f64,
    /// Crude protein fraction.
    pub cp: f64,
    /// Rumen-degradable fraction of the crude protein.
    pub rdp_fraction: f64,
    /// Indigestible crude protein fraction.
    pub icp: f64,
    pub class: FeedClass,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedClass {
    Concentrate,
    Roughage,
}

/// Report activation toggles.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub soil_summary: Option<ReportToggle>,
    #[serde(default)]
    pub soil_nitrogen: Option<ReportToggle>,
    #[serde(default)]
    pub ration_report: Option<ReportToggle>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReportToggle {
    pub active: bool,
    /// Output file name inside the run's output directory.
    pub file: String,
}

#[cfg(test)]
pub mod test_fixtures {
    use super::*;

    pub fn layer_section(bottom_depth: f64) -> LayerSection {
        LayerSection {
            bottom_depth,
            bulk_density: 1.35,
            wilting_point: 0.10,
            field_capacity: 0.25,
            saturation: 0.45,
            ksat: 20.0,
            clay: 25.0,
            org_c: 1.5,
            labile_p: 20.0,
            frac_active_n: 0.02,
            active_mineral_rate: 0.0002,
            cation_exclusion_fraction: 0.5,
            denitrification_rate: 0.05,
            volatile_exchange_factor: 0.15,
            nh4: 1.0,
            initial_temperature: 10.0,
        }
    }

    pub fn soil_section() -> SoilSection {
        SoilSection {
            profile_depth: 1000.0,
            cn2: 75.0,
            field_slope: 0.02,
            slope_length: 50.0,
            manning: 0.10,
            field_size: 0.5,
            practice_factor: 0.5,
            org_c: 2.0,
            sand: 30.0,
            silt: 40.0,
            soil_albedo: 0.16,
            residue: 3000.0,
            fresh_n_mineral_rate: 0.05,
            layers: vec![
                layer_section(200.0),
                layer_section(600.0),
                layer_section(1000.0),
            ],
            fertilizer: Vec::new(),
            manure: Vec::new(),
            tillage: Vec::new(),
            crop_uptake: Vec::new(),
        }
    }

    pub fn animal_section() -> AnimalSection {
        AnimalSection {
            housing: Housing::Barn,
            ration: RationSection {
                user_input: false,
                formulation_interval: 7,
            },
            parity: default_parity(),
            weeks_in_milk: default_weeks_in_milk(),
            average_milk_fat: default_average_milk_fat(),
            body_weight_ratio: default_body_weight_ratio(),
            base_diet_energy: default_base_diet_energy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_INPUT: &str = r#"{
        "config": { "start_year": 2015, "end_year": 2016, "output_dir": "out" },
        "farm": {
            "soil": {
                "profile_depth": 1000.0, "cn2": 75.0,
                "field_slope": 0.02, "slope_length": 50.0, "manning": 0.1,
                "field_size": 0.5, "practice_factor": 0.5,
                "org_c": 2.0, "sand": 30.0, "silt": 40.0,
                "soil_albedo": 0.16, "residue": 3000.0,
                "fresh_n_mineral_rate": 0.05,
                "layers": [{
                    "bottom_depth": 300.0, "bulk_density": 1.35,
                    "wilting_point": 0.1, "field_capacity": 0.25,
                    "saturation": 0.45, "ksat": 20.0, "clay": 25.0,
                    "org_c": 1.5, "labile_p": 20.0, "frac_active_n": 0.02,
                    "active_mineral_rate": 0.0002,
                    "cation_exclusion_fraction": 0.5,
                    "denitrification_rate": 0.05,
                    "volatile_exchange_factor": 0.15,
                    "nh4": 1.0, "initial_temperature": 10.0
                }],
                "manure": [{
                    "name": "spring slurry", "year": 1, "day": 90,
                    "mass": 12000.0, "total_p": 0.004
                }]
            },
            "animal": {
                "housing": "barn",
                "ration": { "formulation_interval": 7 }
            },
            "feed": {
                "farm_feed": {
                    "corn silage": {
                        "price": 0.08, "limit": 40.0, "units": "kg",
                        "nutrition": {
                            "fi": 0.45, "rv": 1.0, "ne": 1.45, "cp": 0.08,
                            "rdp_fraction": 0.6, "icp": 0.1,
                            "class": "roughage"
                        }
                    }
                }
            }
        },
        "weather": "weather.csv",
        "output": {
            "soil_summary": { "active": true, "file": "soil_summary.csv" }
        }
    }"#;

    #[test]
    fn parses_a_minimal_document() {
        let input = FarmInput::from_reader(MINIMAL_INPUT.as_bytes()).unwrap();
        assert_eq!(input.config.duration().unwrap(), 2);
        assert_eq!(input.farm.soil.layers.len(), 1);
        assert_eq!(input.farm.soil.manure.len(), 1);
        assert_eq!(input.farm.animal.housing, Housing::Barn);
        assert!(!input.farm.animal.ration.user_input);
        // lactation parameters fall back to the reference cow
        assert_eq!(input.farm.animal.parity, 1.0);
        assert_eq!(input.farm.animal.weeks_in_milk, 20.0);
        let silage = &input.farm.feed.farm_feed["corn silage"];
        assert_eq!(silage.nutrition.class, FeedClass::Roughage);
        assert!(input.output.soil_summary.as_ref().unwrap().active);
        assert!(input.output.soil_nitrogen.is_none());
    }

    #[test]
    fn inverted_year_window_is_rejected() {
        let run = RunSection {
            start_year: 2020,
            end_year: 2019,
            output_dir: PathBuf::from("out"),
        };
        assert!(matches!(
            run.duration(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn single_year_window_is_valid() {
        let run = RunSection {
            start_year: 2020,
            end_year: 2020,
            output_dir: PathBuf::from("out"),
        };
        assert_eq!(run.duration().unwrap(), 1);
    }

    #[test]
    fn garbage_json_reports_context() {
        let err = FarmInput::from_reader("not json".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid farm input json"));
    }
}
