//! Daily nitrogen cycle over five pools: fresh organic (top layer only),
//! active organic, stable organic, ammonium, and nitrate.
//!
//! `compute` rates every transformation against the committed water state
//! of the previous evening plus the temperatures the water kernel just
//! produced; `apply` commits the fluxes to the pools. Two loss terms are
//! deliberately charged one day late: the nitrate runoff and the active-N
//! erosion loss each reduce their pool using the amount committed the
//! previous day, while the ammonium runoff and erosion losses use the
//! current day's amounts.

use super::water::WaterFluxes;
use super::Soil;

/// One day of nitrogen fluxes (kg/ha unless noted).
#[derive(Clone, Debug, Default)]
pub struct NitrogenFluxes {
    // per-layer transformations, top to bottom
    pub denitrification: Vec<f64>,
    pub nitrification: Vec<f64>,
    pub volatilization: Vec<f64>,
    pub tot_nitri_volatil: Vec<f64>,
    pub no3_perc: Vec<f64>,
    pub nh4_perc: Vec<f64>,
    pub active_n_perc: Vec<f64>,
    pub n_min_act: Vec<f64>,
    pub n_trans: Vec<f64>,

    // residue decomposition, top layer only
    pub c_to_n: f64,
    pub c_to_p: f64,
    pub decay_rate: f64,
    pub fresh_min: f64,
    pub fresh_decomp: f64,

    // surface losses in runoff water
    pub runoff_no3_conc: f64,
    pub no3_runoff: f64,
    pub runoff_nh4_conc: f64,
    pub nh4_runoff: f64,

    // surface pool concentrations (mg/kg) and erosion losses
    pub fresh_n_conc: f64,
    pub stable_n_conc: f64,
    pub nh4_conc: f64,
    pub active_n_conc: f64,
    pub enrichment_ratio: f64,
    pub fresh_n_loss: f64,
    pub active_n_loss: f64,
    pub stable_n_loss: f64,
    pub nh4_loss: f64,
}

/// Compute the day's nitrogen fluxes. The soil state is not modified.
pub fn compute(soil: &Soil, water: &WaterFluxes, rainfall: f64) -> NitrogenFluxes {
    let previous = &soil.daily_nitrogen;
    let layer_count = soil.layers.len();

    let mut fluxes = NitrogenFluxes {
        denitrification: Vec::with_capacity(layer_count),
        nitrification: Vec::with_capacity(layer_count),
        volatilization: Vec::with_capacity(layer_count),
        tot_nitri_volatil: Vec::with_capacity(layer_count),
        no3_perc: Vec::with_capacity(layer_count),
        nh4_perc: Vec::with_capacity(layer_count),
        active_n_perc: Vec::with_capacity(layer_count),
        n_min_act: Vec::with_capacity(layer_count),
        n_trans: Vec::with_capacity(layer_count),
        // runoff concentrations fall back to yesterday's when the layer
        // holds no water
        runoff_no3_conc: previous.runoff_no3_conc,
        runoff_nh4_conc: previous.runoff_nh4_conc,
        ..NitrogenFluxes::default()
    };

    let sediment = water.snow_corrected_sediment;
    let runoff = water.runoff;

    let mut perc_above = 0.0;
    let mut previous_bottom = 0.0;

    for (index, layer) in soil.layers.iter().enumerate() {
        let top = index == 0;
        let temperature = water.layer_temperature[index];
        let sw = layer.water_mm;
        let perc = water.percolation[index];

        let temp_fac =
            (0.1 + 0.9 * temperature / (temperature + (9.93 - 0.312 * temperature).exp()))
                .max(0.1);
        let water_fac = (sw / layer.fc_water).clamp(0.05, 1.0);

        // working copies of the pools; the state stays untouched
        let mut no3 = layer.no3;
        let mut nh4 = layer.nh4;
        let mut active_n = layer.active_n;
        let stable_n = layer.stable_n;

        // residue decomposition and fresh N mineralization, surface only
        if top {
            let fresh_organic_p =
                soil.residue * 0.0003 * layer.bulk_density * layer.bottom_depth / 100.0;
            let n_denominator = soil.fresh_n + no3;
            let p_denominator = fresh_organic_p + layer.labile_p;
            if n_denominator > 0.0 && p_denominator > 0.0 {
                fluxes.c_to_n = 0.58 * soil.residue / n_denominator;
                fluxes.c_to_p = 0.58 * soil.residue / p_denominator;

                let residue_factor = (-0.693 * (fluxes.c_to_n - 25.0) / 25.0).exp().min(1.0);
                fluxes.decay_rate =
                    residue_factor * soil.fresh_n_mineral_rate * (temp_fac * water_fac).sqrt();
                fluxes.fresh_min = 0.8 * fluxes.decay_rate * soil.fresh_n;
                fluxes.fresh_decomp = 0.2 * fluxes.decay_rate * soil.fresh_n;
            }
        }

        // nitrification and volatilization share one first-order pull on NH4
        let nitr_t_fac = if temperature > 5.0 {
            (0.41 * (temperature - 5.0) / 10.0).min(1.0)
        } else {
            0.0
        };
        let depth_fac = if top {
            0.95
        } else {
            let midpoint = (previous_bottom + layer.bottom_depth) / 2.0;
            1.0 - midpoint / (midpoint + (4.706 - 0.0305 * midpoint).exp())
        };
        let nitr_reg = temp_fac * water_fac * 0.1;
        let volatil_reg = nitr_t_fac * depth_fac * layer.volatile_exchange_factor;

        let tot_nitri_volatil = nh4 * (1.0 - (-nitr_reg - volatil_reg).exp());
        let volatilization = nh4 * volatil_reg;
        let nitrification = (nh4 - volatilization) * nitr_reg;

        // denitrification fires only in near-saturated layers
        let denitrification = if sw > layer.sat_water * 0.6 {
            no3 * (1.0 - (-layer.denitrification_rate * temp_fac * layer.org_c).exp())
        } else {
            0.0
        };
        no3 = (no3 - denitrification).max(0.0);

        if top && sw != 0.0 {
            fluxes.runoff_no3_conc = (1.0 - ((-sw - rainfall) / (layer.sat_water + rainfall)).exp())
                * no3
                / (sw + rainfall)
                / 25.0;
        }
        if top {
            // yesterday's committed runoff loss
            no3 = (no3 - previous.no3_runoff).max(0.0);
        }

        let no3_conc = if sw != 0.0 {
            (1.0 - (-sw / layer.sat_water).exp()) / sw * no3 / 5.0
        } else {
            0.0
        };
        if top {
            fluxes.no3_runoff = fluxes.runoff_no3_conc * runoff;
        }
        let no3_perc = no3_conc * perc;

        nh4 = (nh4 - tot_nitri_volatil).max(0.0);
        if top {
            if sw != 0.0 {
                fluxes.runoff_nh4_conc =
                    (1.0 - ((-sw - rainfall) / (layer.sat_water + rainfall)).exp()) * nh4
                        / (sw + rainfall)
                        / 5.0;
            }
            fluxes.nh4_runoff = fluxes.runoff_nh4_conc * runoff;
            nh4 = (nh4 - fluxes.nh4_runoff).max(0.0);
        }

        // surface pool concentrations feeding the erosion losses
        if top {
            fluxes.fresh_n_conc = 100.0 * soil.fresh_n / (layer.bulk_density / layer.bottom_depth);
            fluxes.stable_n_conc = 100.0 * stable_n / layer.bulk_density / layer.bottom_depth;
            fluxes.nh4_conc = 100.0 * nh4 / layer.bulk_density / layer.bottom_depth;
            fluxes.active_n_conc = 100.0 * active_n / layer.bulk_density / layer.bottom_depth;

            // yesterday's committed erosion loss
            active_n = (active_n - previous.active_n_loss).max(0.0);
        }

        let active_n_conc = if sw != 0.0 {
            (1.0 - (-sw / layer.sat_water).exp()) * active_n / sw / 15.0
        } else {
            0.0
        };
        let active_n_perc = active_n_conc * perc;

        if sediment != 0.0 {
            fluxes.enrichment_ratio = (1.21 - 0.16 * (sediment * 1000.0).ln()).exp().max(1.0);
        }
        if top && sediment > 0.0 {
            let scale = 0.001 * sediment * fluxes.enrichment_ratio;
            fluxes.fresh_n_loss = fluxes.fresh_n_conc * scale;
            fluxes.active_n_loss = fluxes.active_n_conc * scale;
            fluxes.stable_n_loss = fluxes.stable_n_conc * scale;
            fluxes.nh4_loss = fluxes.nh4_conc * scale;
        }

        let n_min_act = layer.active_mineral_rate * (temp_fac * water_fac).sqrt() * active_n;

        // the surface erosion loss dampens the equilibrium transfer in
        // every layer
        let stable_after_loss = (stable_n - fluxes.stable_n_loss).max(0.0);
        active_n -= active_n_perc;
        if !top {
            active_n += perc_above;
        }
        active_n = (active_n - n_min_act).max(0.0);
        let n_trans =
            1.0e-5 * (active_n * (1.0 / layer.frac_active_n - 1.0) - stable_after_loss);

        if top {
            nh4 = (nh4 - fluxes.nh4_loss).max(0.0);
        }
        let nh4_conc = if sw != 0.0 {
            (1.0 - (-sw / layer.sat_water).exp()) * nh4 / sw
        } else {
            0.0
        };
        let nh4_perc = nh4_conc * perc;

        fluxes.denitrification.push(denitrification);
        fluxes.nitrification.push(nitrification);
        fluxes.volatilization.push(volatilization);
        fluxes.tot_nitri_volatil.push(tot_nitri_volatil);
        fluxes.no3_perc.push(no3_perc);
        fluxes.nh4_perc.push(nh4_perc);
        fluxes.active_n_perc.push(active_n_perc);
        fluxes.n_min_act.push(n_min_act);
        fluxes.n_trans.push(n_trans);

        perc_above = active_n_perc;
        previous_bottom = layer.bottom_depth;
    }

    fluxes
}

/// Commit the day's fluxes to the pools. Every subtraction clamps its
/// pool at zero before the next term is charged; leachate removed from
/// one layer arrives in the layer below. `added_n` is the day's
/// atmospheric and applied nitrogen input, split 10% to surface ammonium
/// and 90% to surface active organic N.
pub fn apply(soil: &mut Soil, fluxes: &NitrogenFluxes, added_n: f64) {
    let mut no3_above = 0.0;
    let mut nh4_above = 0.0;
    let mut active_above = 0.0;

    for (index, layer) in soil.layers.iter_mut().enumerate() {
        let top = index == 0;

        let mut no3 = layer.no3;
        no3 = (no3 - fluxes.denitrification[index]).max(0.0);
        if top {
            no3 = (no3 - fluxes.no3_runoff).max(0.0);
        }
        no3 = (no3 - fluxes.no3_perc[index] + if top { 0.0 } else { no3_above }).max(0.0);
        no3 += fluxes.nitrification[index];
        layer.no3 = no3;

        let mut nh4 = layer.nh4;
        nh4 = (nh4 - fluxes.tot_nitri_volatil[index]).max(0.0);
        if top {
            nh4 = (nh4 - fluxes.nh4_runoff).max(0.0);
            nh4 = (nh4 - fluxes.nh4_loss).max(0.0);
        }
        nh4 = (nh4 - fluxes.nh4_perc[index] + if top { 0.0 } else { nh4_above }).max(0.0);
        nh4 += fluxes.n_min_act[index];
        if top {
            nh4 += fluxes.fresh_min * 0.8 + added_n * 0.1;
        }
        layer.nh4 = nh4;

        let mut active_n = layer.active_n;
        if top {
            active_n = (active_n - fluxes.active_n_loss).max(0.0);
        }
        active_n = (active_n - fluxes.active_n_perc[index]
            + if top { 0.0 } else { active_above })
        .max(0.0);
        active_n = (active_n - fluxes.n_min_act[index]).max(0.0);
        active_n = (active_n - fluxes.n_trans[index]).max(0.0);
        if top {
            active_n += fluxes.fresh_min * 0.2 + added_n * 0.9;
        }
        layer.active_n = active_n;

        let mut stable_n = layer.stable_n;
        if top {
            stable_n = (stable_n - fluxes.stable_n_loss).max(0.0);
        }
        stable_n = (stable_n + fluxes.n_trans[index]).max(0.0);
        layer.stable_n = stable_n;

        no3_above = fluxes.no3_perc[index];
        nh4_above = fluxes.nh4_perc[index];
        active_above = fluxes.active_n_perc[index];
    }

    soil.fresh_n =
        (soil.fresh_n - fluxes.fresh_min - fluxes.fresh_decomp - fluxes.fresh_n_loss).max(0.0);

    soil.daily_nitrogen = fluxes.clone();
}
