//! Daily soil water kernel: layer temperatures, curve-number runoff,
//! Hargreaves evapotranspiration, percolation, and MUSLE erosion.
//!
//! `compute` reads the soil state as of the previous evening and returns
//! the day's fluxes without touching the state; `apply` commits them.
//! Layer temperatures are part of the flux record because the downstream
//! nitrogen kernel rates on the new temperatures while the water balance
//! itself still reflects yesterday.

use crate::weather::WeatherDay;

use super::Soil;

/// Long-term mean annual air temperature (C) the profile relaxes toward.
const MEAN_ANNUAL_AIR_TEMP: f64 = 8.41;

/// Lag coefficient for the day-to-day soil temperature relaxation.
const TEMPERATURE_LAG: f64 = 0.8;

/// Julian-day window outside of which snow cover is assumed.
const SNOW_FREE_START: u16 = 95;
const SNOW_FREE_END: u16 = 300;

/// One day of water-cycle fluxes, computed against the prior state.
#[derive(Clone, Debug, Default)]
pub struct WaterFluxes {
    pub surface_temperature: f64,
    /// New temperature of each layer, top to bottom (C).
    pub layer_temperature: Vec<f64>,
    /// Surface runoff (mm).
    pub runoff: f64,
    /// Water entering the profile (mm).
    pub infiltration: f64,
    /// Potential evapotranspiration (mm).
    pub potential_et: f64,
    /// Crop transpiration demand (mm).
    pub transpiration: f64,
    /// Soil evaporation after the cover and supply limits (mm).
    pub soil_evaporation: f64,
    /// Evaporation demand charged to each layer (mm).
    pub layer_evaporation: Vec<f64>,
    /// Water percolating out of the bottom of each layer (mm).
    pub percolation: Vec<f64>,
    /// Sediment yield (metric tons).
    pub sediment: f64,
    /// Sediment yield after the snow-cover correction (metric tons).
    pub snow_corrected_sediment: f64,
}

fn snow_season(day: u16) -> bool {
    day < SNOW_FREE_START || day > SNOW_FREE_END
}

/// Compute the day's water fluxes. The soil state is not modified.
pub fn compute(soil: &Soil, weather: &WeatherDay, day: u16) -> WaterFluxes {
    let mut fluxes = WaterFluxes::default();
    soil_temperature(soil, weather, day, &mut fluxes);
    curve_number_runoff(soil, weather.rainfall, &mut fluxes);
    evapotranspiration(soil, weather, &mut fluxes);
    percolation(soil, &mut fluxes);
    erosion(soil, weather, day, &mut fluxes);
    fluxes
}

/// Commit the day's fluxes: new temperatures, then the layer water
/// balance. Each layer keeps at least its wilting-point water.
pub fn apply(soil: &mut Soil, fluxes: &WaterFluxes, rainfall: f64) {
    soil.surface_temperature = fluxes.surface_temperature;
    for (layer, &temperature) in soil.layers.iter_mut().zip(&fluxes.layer_temperature) {
        layer.temperature = temperature;
    }

    let mut perc_from_above = 0.0;
    for (index, layer) in soil.layers.iter_mut().enumerate() {
        let esoil = fluxes.layer_evaporation[index];
        let perc = fluxes.percolation[index];
        let balance = if index == 0 {
            layer.water_mm + rainfall - fluxes.runoff - esoil - perc
        } else {
            layer.water_mm - esoil - perc + perc_from_above
        };
        layer.water_mm = balance.max(layer.wilting_water);
        perc_from_above = perc;
    }

    soil.daily_water = fluxes.clone();
}

/// Relax surface and layer temperatures toward the day's radiative
/// balance, damped with depth.
fn soil_temperature(soil: &Soil, weather: &WeatherDay, day: u16, fluxes: &mut WaterFluxes) {
    let biomass = weather.biomass;
    let bulk_density = soil.layers[0].bulk_density;

    let cover = (-5.0e-5 * biomass).exp();
    let albedo = 0.23 * (1.0 - cover) + soil.soil_albedo * cover;
    let radiate = (weather.radiation * (1.0 - albedo) - 14.0) / 20.0;
    let bare_temperature = weather.t_avg + radiate * weather.t_avg;

    let cover_factor = biomass / (biomass + (7.563 - 0.000_129_7 * (-biomass)).exp());
    let snow: f64 = if snow_season(day) { 0.8 } else { 0.0 };
    let snow_factor = snow * 10.0 / (snow * 10.0 + (6.055 - 0.3002 * snow * 10.0).exp());
    let bcv = cover_factor.max(snow_factor);

    fluxes.surface_temperature =
        bcv * soil.surface_temperature + (1.0 - bcv) * bare_temperature;

    let scale = soil.sum_soil_water() / ((0.356 - 0.144 * bulk_density) * soil.profile_depth);
    let dd_max = 1000.0 + (2500.0 * bulk_density)
        / (bulk_density + 686.0 * (-5.63 * bulk_density).exp());
    let damping_depth =
        dd_max * ((500.0 / dd_max).ln() * ((1.0 - scale) / (1.0 + scale)).powi(2)).exp();

    let mut previous_bottom = 0.0;
    for layer in &soil.layers {
        let center = (layer.bottom_depth + previous_bottom) / 2.0;
        previous_bottom = layer.bottom_depth;

        let zd = center / damping_depth;
        let depth_factor = zd / (zd + (-0.867 - 2.078 * zd).exp());
        let target = depth_factor * (MEAN_ANNUAL_AIR_TEMP - fluxes.surface_temperature)
            + fluxes.surface_temperature;
        fluxes
            .layer_temperature
            .push(TEMPERATURE_LAG * layer.temperature + (1.0 - TEMPERATURE_LAG) * target);
    }
}

/// SCS curve-number runoff with the soil-moisture retention adjustment.
/// The frozen-soil check uses the temperature just computed for today.
fn curve_number_runoff(soil: &Soil, rainfall: f64, fluxes: &mut WaterFluxes) {
    let cn2 = soil.cn2;
    let cn1 = cn2 - (20.0 * (100.0 - cn2)) / (100.0 - cn2 + (2.533 - 0.0636 * (100.0 - cn2)).exp());
    let cn3 = cn2 * (0.00673 * (100.0 - cn2)).exp();

    let s_max = 25.4 * (1000.0 / cn1 - 10.0);
    let s3 = 25.4 * (1000.0 / cn3 - 10.0);

    let fc = soil.profile_depth * soil.layers[0].field_capacity;
    let sat = soil.profile_depth * soil.layers[0].saturation;
    let sw = soil.sum_soil_water() - soil.sum_wilting_water();

    let w2 = ((fc / (1.0 - s3 / s_max) - fc).ln() - (sat / (1.0 - 2.54 / s_max) - sat).ln())
        / (sat - fc);
    let w1 = (fc / (1.0 - s3 / s_max) - fc).ln() + w2 * fc;

    let mut retention = s_max * (1.0 - sw / (sw + (w1 - w2 * sw).exp()));
    if fluxes.layer_temperature[0] <= 2.0 {
        retention = s_max * (1.0 - (-0.000_862 * retention).exp());
    }

    let runoff = if rainfall > 0.2 * retention {
        (rainfall - 0.2 * retention).powi(2) / (rainfall + 0.8 * retention)
    } else {
        0.0
    };

    fluxes.runoff = runoff;
    fluxes.infiltration = rainfall - runoff;
}

/// Hargreaves potential ET split into crop transpiration and soil
/// evaporation, with the soil share partitioned across layers by depth.
fn evapotranspiration(soil: &Soil, weather: &WeatherDay, fluxes: &mut WaterFluxes) {
    let latent_heat = 2.501 - 2.361e-3 * weather.t_avg;
    let e0 = (0.0023
        * weather.radiation
        * (weather.t_max - weather.t_min).max(0.0).sqrt()
        * (weather.t_avg + 17.8)
        / latent_heat)
        .max(0.001);
    fluxes.potential_et = e0;

    let leaf_area_index = weather.biomass / 1500.0;
    let transpiration = if (0.0..=3.0).contains(&leaf_area_index) {
        e0 * leaf_area_index / 3.0
    } else {
        e0
    };
    fluxes.transpiration = transpiration;

    let soil_cover = (-5.0e-5 * weather.biomass).exp();
    let esoil_demand = (e0 - transpiration) * soil_cover;
    fluxes.soil_evaporation = if esoil_demand + transpiration > 0.0 {
        esoil_demand.min(esoil_demand * e0 / (esoil_demand + transpiration))
    } else {
        0.0
    };

    // demand depth profile; one layer cannot compensate for another
    let mut top_demand = 0.0;
    for layer in &soil.layers {
        let bottom_demand = esoil_demand * layer.bottom_depth
            / (layer.bottom_depth + (2.374 - 0.00713 * layer.bottom_depth).exp());
        let mut layer_demand = bottom_demand - top_demand;
        if layer.water_mm <= layer.fc_water {
            layer_demand *= (2.5 * (layer.water_mm - layer.fc_water)
                / (layer.fc_water - layer.wilting_water))
                .exp();
        }
        fluxes.layer_evaporation.push(layer_demand);
        top_demand = bottom_demand;
    }
}

/// Water above field capacity drains to the next layer with an
/// exponential travel time set by saturated conductivity.
fn percolation(soil: &Soil, fluxes: &mut WaterFluxes) {
    for layer in &soil.layers {
        let drainable = if layer.water_mm >= layer.fc_water {
            layer.water_mm - layer.fc_water
        } else {
            0.0
        };
        let travel_time = (layer.saturation * layer.depth - layer.fc_water) / layer.ksat;
        fluxes
            .percolation
            .push(drainable * (1.0 - (-24.0 / travel_time).exp()));
    }
}

/// MUSLE sediment yield from the day's runoff, with the erodibility,
/// cover, and topographic factors, discounted under snow cover.
fn erosion(soil: &Soil, weather: &WeatherDay, day: u16, fluxes: &mut WaterFluxes) {
    let rainfall = weather.rainfall;

    let time_of_concentration = (soil.slope_length.powf(0.6) * soil.manning.powf(0.6))
        / (18.0 * soil.field_slope.powf(0.3));
    let alpha_mean = (0.02083 + (1.0 - (-125.0 / (rainfall + 5.0)).exp())) / 2.0;
    let alpha = 1.0 - (2.0 * time_of_concentration * (1.0 - alpha_mean).ln()).exp();
    let intensity = alpha * rainfall / time_of_concentration;

    let peak_runoff = if rainfall != 0.0 {
        (fluxes.runoff / rainfall) * intensity * soil.field_size / 3.6
    } else {
        0.0
    };

    let f_csand = 0.2 + 0.3 * (-0.256 * soil.sand * (1.0 - soil.silt / 100.0)).exp();
    let f_clsi = (soil.silt / (soil.layers[0].clay + soil.silt)).powf(0.3);
    let f_orgc = 1.0 - (0.25 * soil.org_c) / (soil.org_c + (3.72 - 2.95 * soil.org_c).exp());
    let sand_fraction = 1.0 - soil.sand / 100.0;
    let f_sand = 1.0
        - (0.7 * sand_fraction)
            / (sand_fraction + (-5.51 + 22.9 / (soil.sand / 100.0)).exp());
    let erodibility = f_csand * f_clsi * f_orgc * f_sand;

    let cover = ((0.8f64.ln() - 0.05f64.ln()) * (-0.00115 * weather.biomass).exp()
        + 0.05f64.ln())
    .exp();

    let m = 0.6 * (1.0 - (-35.835 * soil.field_slope).exp());
    let hill_angle = soil.field_slope.atan();
    let topographic = (soil.slope_length / 22.1).powf(m)
        * (65.41 * hill_angle.sin().powi(2) + 4.56 * hill_angle.sin() + 0.065);

    let sediment = 11.8
        * (fluxes.runoff * peak_runoff).powf(0.56)
        * erodibility
        * cover
        * soil.practice_factor
        * topographic;

    fluxes.sediment = sediment;
    fluxes.snow_corrected_sediment = if snow_season(day) {
        sediment / (3.0f64 * 20.0 / 25.4).exp()
    } else {
        sediment
    };
}
