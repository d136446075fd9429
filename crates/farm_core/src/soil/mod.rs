pub mod events;
pub mod nitrogen;
pub mod water;

use crate::error::ConfigError;
use crate::io::config::{LayerSection, SoilSection};

use self::nitrogen::NitrogenFluxes;
use self::water::WaterFluxes;

pub use self::events::{CropUptakeEvent, FertilizerEvent, ManureEvent, TillageEvent};

/// One horizontal slice of the soil profile.
///
/// Layers are independent value types owned by [`Soil`] in top-to-bottom
/// order; each layer exchanges mass only with its direct neighbours.
#[derive(Clone, Debug)]
pub struct SoilLayer {
    // physical constants
    pub bottom_depth: f64,
    pub depth: f64,
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
    // derived water thresholds (mm)
    pub wilting_water: f64,
    pub fc_water: f64,
    pub sat_water: f64,
    // daily state
    pub water_mm: f64,
    pub temperature: f64,
    // nitrogen pools (kg/ha)
    pub no3: f64,
    pub nh4: f64,
    pub active_n: f64,
    pub stable_n: f64,
}

impl SoilLayer {
    fn from_section(section: &LayerSection) -> Self {
        Self {
            bottom_depth: section.bottom_depth,
            depth: 0.0,
            bulk_density: section.bulk_density,
            wilting_point: section.wilting_point,
            field_capacity: section.field_capacity,
            saturation: section.saturation,
            ksat: section.ksat,
            clay: section.clay,
            org_c: section.org_c,
            labile_p: section.labile_p,
            frac_active_n: section.frac_active_n,
            active_mineral_rate: section.active_mineral_rate,
            cation_exclusion_fraction: section.cation_exclusion_fraction,
            denitrification_rate: section.denitrification_rate,
            volatile_exchange_factor: section.volatile_exchange_factor,
            wilting_water: 0.0,
            fc_water: 0.0,
            sat_water: 0.0,
            water_mm: 0.0,
            temperature: section.initial_temperature,
            no3: 0.0,
            nh4: section.nh4,
            active_n: 0.0,
            stable_n: 0.0,
        }
    }
}

/// Full soil state of the farm: the layer column, field geometry and
/// erosion parameters, the top-layer fresh organic nitrogen pool, the
/// scheduled field operations, and the previous day's committed flux
/// records.
#[derive(Clone, Debug)]
pub struct Soil {
    pub layers: Vec<SoilLayer>,

    // profile / runoff
    pub profile_depth: f64,
    pub cn2: f64,

    // erosion
    pub field_slope: f64,
    pub slope_length: f64,
    pub manning: f64,
    pub field_size: f64,
    pub practice_factor: f64,
    pub org_c: f64,
    pub sand: f64,
    pub silt: f64,

    // temperature
    pub soil_albedo: f64,
    pub surface_temperature: f64,

    // fresh organic nitrogen, top layer only (kg/ha)
    pub fresh_n: f64,
    pub residue: f64,
    pub fresh_n_mineral_rate: f64,

    // cumulative manure accounting over the whole run
    pub cumulative_manure_mass: f64,
    pub cumulative_manure_p: f64,

    // scheduled field operations, keyed by (year, day)
    pub fertilizer_events: Vec<FertilizerEvent>,
    pub manure_events: Vec<ManureEvent>,
    pub tillage_events: Vec<TillageEvent>,
    pub uptake_events: Vec<CropUptakeEvent>,

    // committed flux records from the most recent apply phase
    pub daily_water: WaterFluxes,
    pub daily_nitrogen: NitrogenFluxes,
}

impl Soil {
    /// Build the soil state from its configuration section, deriving layer
    /// thicknesses, water thresholds, and the initial nitrogen pools.
    pub fn from_config(section: &SoilSection) -> Result<Self, ConfigError> {
        if section.layers.is_empty() {
            return Err(ConfigError::Soil("at least one soil layer is required".into()));
        }

        let mut layers: Vec<SoilLayer> =
            section.layers.iter().map(SoilLayer::from_section).collect();
        layers.sort_by(|a, b| a.bottom_depth.total_cmp(&b.bottom_depth));

        let mut previous_bottom = 0.0;
        for layer in &mut layers {
            layer.depth = layer.bottom_depth - previous_bottom;
            previous_bottom = layer.bottom_depth;

            if layer.depth <= 0.0 {
                return Err(ConfigError::Soil(format!(
                    "layer ending at {} mm has non-positive thickness",
                    layer.bottom_depth
                )));
            }
            if layer.bulk_density <= 0.0 || layer.bulk_density >= 2.4 {
                return Err(ConfigError::Soil(format!(
                    "layer ending at {} mm: bulk density must be between 0 and 2.4 g/cm3",
                    layer.bottom_depth
                )));
            }
            if layer.ksat <= 0.0 || layer.clay <= 0.0 {
                return Err(ConfigError::Soil(format!(
                    "layer ending at {} mm needs positive ksat and clay content",
                    layer.bottom_depth
                )));
            }
            if !(0.0 <= layer.wilting_point
                && layer.wilting_point < layer.field_capacity
                && layer.field_capacity < layer.saturation)
            {
                return Err(ConfigError::Soil(format!(
                    "layer ending at {} mm must order wilting < field capacity < saturation",
                    layer.bottom_depth
                )));
            }
            if layer.frac_active_n <= 0.0 || layer.frac_active_n >= 1.0 {
                return Err(ConfigError::Soil(format!(
                    "layer ending at {} mm: frac_active_n must be in (0, 1)",
                    layer.bottom_depth
                )));
            }

            layer.wilting_water = layer.depth * layer.wilting_point;
            layer.fc_water = layer.depth * layer.field_capacity;
            layer.sat_water = layer.depth * layer.saturation;
            // the profile starts the run at field capacity
            layer.water_mm = layer.fc_water;
        }

        for (name, value) in [
            ("profile_depth", section.profile_depth),
            ("field_slope", section.field_slope),
            ("slope_length", section.slope_length),
            ("manning", section.manning),
            ("field_size", section.field_size),
            ("practice_factor", section.practice_factor),
            ("sand", section.sand),
            ("silt", section.silt),
            ("org_c", section.org_c),
            ("residue", section.residue),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::Soil(format!("{name} must be positive")));
            }
        }
        // the retention curve degenerates at either end of the CN range
        if section.cn2 <= 0.0 || section.cn2 >= 100.0 {
            return Err(ConfigError::Soil(format!(
                "cn2 must be strictly between 0 and 100, got {}",
                section.cn2
            )));
        }

        // initial nitrogen pools, varied by depth
        for layer in &mut layers {
            let mass_scale = layer.bulk_density * layer.depth / 100.0;
            layer.no3 = 7.0 * (-layer.bottom_depth / 1000.0).exp() * mass_scale;
            let org_n = 1.0e4 * layer.org_c / 14.0;
            layer.active_n = layer.frac_active_n * org_n * mass_scale;
            layer.stable_n = (1.0 - layer.frac_active_n) * org_n * mass_scale;
            layer.nh4 *= mass_scale;
        }

        let top = &layers[0];
        let fresh_n = 0.0015 * section.residue * top.bulk_density * top.depth / 100.0;
        let surface_temperature = top.temperature;

        Ok(Self {
            layers,
            profile_depth: section.profile_depth,
            cn2: section.cn2,
            field_slope: section.field_slope,
            slope_length: section.slope_length,
            manning: section.manning,
            field_size: section.field_size,
            practice_factor: section.practice_factor,
            org_c: section.org_c,
            sand: section.sand,
            silt: section.silt,
            soil_albedo: section.soil_albedo,
            surface_temperature,
            fresh_n,
            residue: section.residue,
            fresh_n_mineral_rate: section.fresh_n_mineral_rate,
            cumulative_manure_mass: 0.0,
            cumulative_manure_p: 0.0,
            fertilizer_events: section.fertilizer.clone(),
            manure_events: section.manure.clone(),
            tillage_events: section.tillage.clone(),
            uptake_events: section.crop_uptake.clone(),
            daily_water: WaterFluxes::default(),
            daily_nitrogen: NitrogenFluxes::default(),
        })
    }

    /// Total water currently held across all layers (mm).
    pub fn sum_soil_water(&self) -> f64 {
        self.layers.iter().map(|layer| layer.water_mm).sum()
    }

    /// Total water held at wilting point across all layers (mm).
    pub fn sum_wilting_water(&self) -> f64 {
        self.layers.iter().map(|layer| layer.wilting_water).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::test_fixtures::{layer_section, soil_section};

    #[test]
    fn layers_are_sorted_and_sized_by_bottom_depth() {
        let mut section = soil_section();
        section.layers = vec![
            layer_section(600.0),
            layer_section(200.0),
            layer_section(1000.0),
        ];
        let soil = Soil::from_config(&section).unwrap();
        let depths: Vec<f64> = soil.layers.iter().map(|l| l.bottom_depth).collect();
        assert_eq!(depths, vec![200.0, 600.0, 1000.0]);
        let thicknesses: Vec<f64> = soil.layers.iter().map(|l| l.depth).collect();
        assert_eq!(thicknesses, vec![200.0, 400.0, 400.0]);
    }

    #[test]
    fn initial_no3_declines_with_depth() {
        let soil = Soil::from_config(&soil_section()).unwrap();
        let per_mm: Vec<f64> = soil
            .layers
            .iter()
            .map(|l| l.no3 / (l.bulk_density * l.depth))
            .collect();
        assert!(per_mm.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn water_starts_at_field_capacity() {
        let soil = Soil::from_config(&soil_section()).unwrap();
        for layer in &soil.layers {
            assert_eq!(layer.water_mm, layer.fc_water);
            assert!(layer.wilting_water < layer.fc_water);
            assert!(layer.fc_water < layer.sat_water);
        }
    }

    #[test]
    fn rejects_out_of_range_curve_numbers() {
        for cn2 in [0.0, -5.0, 100.0, 120.0] {
            let mut section = soil_section();
            section.cn2 = cn2;
            assert!(Soil::from_config(&section).is_err(), "cn2 {cn2} accepted");
        }
    }

    #[test]
    fn rejects_implausible_bulk_density_and_missing_clay() {
        let mut dense = soil_section();
        dense.layers[0].bulk_density = 2.6;
        assert!(Soil::from_config(&dense).is_err());

        let mut clayless = soil_section();
        clayless.layers[1].clay = 0.0;
        assert!(Soil::from_config(&clayless).is_err());
    }

    #[test]
    fn rejects_nonpositive_erosion_parameters() {
        let mut no_practice = soil_section();
        no_practice.practice_factor = 0.0;
        assert!(Soil::from_config(&no_practice).is_err());

        let mut no_residue = soil_section();
        no_residue.residue = -1.0;
        assert!(Soil::from_config(&no_residue).is_err());
    }

    #[test]
    fn rejects_inverted_moisture_thresholds() {
        let mut section = soil_section();
        section.layers[0].field_capacity = section.layers[0].saturation + 0.1;
        assert!(Soil::from_config(&section).is_err());
    }

    #[test]
    fn two_soils_own_independent_events() {
        let section = soil_section();
        let mut first = Soil::from_config(&section).unwrap();
        let second = Soil::from_config(&section).unwrap();
        first.manure_events.clear();
        assert_eq!(second.manure_events.len(), section.manure.len());
    }
}
