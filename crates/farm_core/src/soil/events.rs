//! Scheduled field operations.
//!
//! Each event type carries a `(year, day)` key and fires at most once, on
//! the morning of its scheduled day before any soil kernel runs. Manure
//! applications are the only operation with a working mass balance today:
//! they feed the cumulative manure accounting used by the annual reports.
//! Fertilizer, tillage, and crop-uptake events are acknowledged in the
//! trace log but do not yet move mass between pools; the redistribution
//! rules for those operations are still being ported from the field
//! protocol and land here once they are settled.

use serde::Deserialize;
use tracing::debug;

use super::Soil;

#[derive(Clone, Debug, Deserialize)]
pub struct FertilizerEvent {
    pub name: String,
    pub year: u32,
    pub day: u16,
    /// Elemental phosphorus applied (kg).
    pub p_mass: f64,
    /// Incorporation depth (mm).
    #[serde(default)]
    pub depth: f64,
    /// Fraction of the application left on the surface.
    #[serde(default)]
    pub surface_fraction: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ManureEvent {
    pub name: String,
    pub year: u32,
    pub day: u16,
    /// Wet mass applied (kg).
    pub mass: f64,
    /// Total phosphorus fraction of the wet mass.
    pub total_p: f64,
    #[serde(default)]
    pub depth: f64,
    #[serde(default)]
    pub surface_fraction: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TillageEvent {
    pub name: String,
    pub year: u32,
    pub day: u16,
    /// Mixing depth (mm).
    pub depth: f64,
    /// Fraction of each affected pool that is mixed.
    pub mixing_efficiency: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CropUptakeEvent {
    pub name: String,
    pub year: u32,
    pub day: u16,
    /// Nitrogen removed by the crop (kg/ha).
    pub n_mass: f64,
}

/// Fire every operation scheduled for this simulation day.
pub fn apply_scheduled(soil: &mut Soil, year: u32, day: u16) {
    let manure: Vec<ManureEvent> = soil
        .manure_events
        .iter()
        .filter(|event| event.year == year && event.day == day)
        .cloned()
        .collect();
    for event in manure {
        soil.cumulative_manure_mass += event.mass;
        soil.cumulative_manure_p += event.mass * event.total_p;
        debug!(
            name = %event.name,
            mass = event.mass,
            total_p = event.total_p,
            "manure application recorded"
        );
    }

    for event in &soil.fertilizer_events {
        if event.year == year && event.day == day {
            debug!(name = %event.name, p_mass = event.p_mass, "fertilizer event scheduled; pool redistribution pending");
        }
    }
    for event in &soil.tillage_events {
        if event.year == year && event.day == day {
            debug!(name = %event.name, depth = event.depth, "tillage event scheduled; pool redistribution pending");
        }
    }
    for event in &soil.uptake_events {
        if event.year == year && event.day == day {
            debug!(name = %event.name, n_mass = event.n_mass, "crop uptake event scheduled; pool redistribution pending");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::test_fixtures::soil_section;

    fn soil_with_manure(year: u32, day: u16) -> Soil {
        let mut section = soil_section();
        section.manure = vec![ManureEvent {
            name: "spring slurry".into(),
            year,
            day,
            mass: 12_000.0,
            total_p: 0.004,
            depth: 0.0,
            surface_fraction: 1.0,
        }];
        Soil::from_config(&section).unwrap()
    }

    #[test]
    fn manure_accumulates_mass_and_phosphorus_on_its_day() {
        let mut soil = soil_with_manure(1, 90);
        apply_scheduled(&mut soil, 1, 90);
        assert_eq!(soil.cumulative_manure_mass, 12_000.0);
        assert_eq!(soil.cumulative_manure_p, 12_000.0 * 0.004);
    }

    #[test]
    fn events_on_other_days_leave_accumulators_untouched() {
        let mut soil = soil_with_manure(1, 90);
        apply_scheduled(&mut soil, 1, 89);
        apply_scheduled(&mut soil, 2, 90);
        assert_eq!(soil.cumulative_manure_mass, 0.0);
        assert_eq!(soil.cumulative_manure_p, 0.0);
    }

    #[test]
    fn repeated_applications_accumulate() {
        let mut soil = soil_with_manure(1, 90);
        soil.manure_events.push(ManureEvent {
            name: "fall slurry".into(),
            year: 1,
            day: 280,
            mass: 8_000.0,
            total_p: 0.005,
            depth: 0.0,
            surface_fraction: 1.0,
        });
        apply_scheduled(&mut soil, 1, 90);
        apply_scheduled(&mut soil, 1, 280);
        assert_eq!(soil.cumulative_manure_mass, 20_000.0);
        assert!((soil.cumulative_manure_p - (48.0 + 40.0)).abs() < 1e-12);
    }
}
