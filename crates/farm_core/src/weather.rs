use crate::clock::DAYS_PER_YEAR;

/// Climate inputs for a single simulated day.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeatherDay {
    /// Rainfall (mm).
    pub rainfall: f64,
    /// Daily maximum air temperature (°C).
    pub t_max: f64,
    /// Daily minimum air temperature (°C).
    pub t_min: f64,
    /// Daily mean air temperature (°C).
    pub t_avg: f64,
    /// Above-ground biomass and residue index (kg/ha).
    pub biomass: f64,
    /// Daily solar radiation (MJ/m²).
    pub radiation: f64,
    /// Atmospheric nitrogen deposition (kg/ha).
    pub added_n: f64,
}

/// Immutable per-day climate series covering the whole simulation.
///
/// Days are addressed by (year, day-of-year), both 1-based. Slots that were
/// never filled by the loader read as all-zero weather; the series never
/// errors on a covered (year, day) pair.
#[derive(Clone, Debug)]
pub struct WeatherSeries {
    days: Vec<WeatherDay>,
    duration: u32,
}

impl WeatherSeries {
    /// Build a series for `duration` years from a flat day-indexed record
    /// list. Records beyond `duration * 365` are ignored; missing trailing
    /// records leave their slots zeroed.
    pub fn from_records(records: &[WeatherDay], duration: u32) -> Self {
        let capacity = duration as usize * DAYS_PER_YEAR as usize;
        let mut days = vec![WeatherDay::default(); capacity];
        for (slot, record) in days.iter_mut().zip(records.iter()) {
            *slot = *record;
        }
        Self { days, duration }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Weather for the given 1-based (year, day-of-year).
    pub fn day(&self, year: u32, day: u16) -> WeatherDay {
        debug_assert!(year >= 1 && day >= 1 && day <= DAYS_PER_YEAR);
        let index = (year as usize - 1) * DAYS_PER_YEAR as usize + day as usize - 1;
        self.days.get(index).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rainfall: f64) -> WeatherDay {
        WeatherDay {
            rainfall,
            ..WeatherDay::default()
        }
    }

    #[test]
    fn day_lookup_uses_absolute_index() {
        let mut records = vec![WeatherDay::default(); 400];
        records[365] = record(4.2); // year 2, day 1
        let series = WeatherSeries::from_records(&records, 2);
        assert_eq!(series.day(2, 1).rainfall, 4.2);
        assert_eq!(series.day(1, 1).rainfall, 0.0);
    }

    #[test]
    fn missing_days_read_as_zero() {
        let series = WeatherSeries::from_records(&[record(1.0)], 2);
        assert_eq!(series.day(1, 1).rainfall, 1.0);
        assert_eq!(series.day(2, 365), WeatherDay::default());
    }

    #[test]
    fn extra_records_beyond_duration_are_ignored() {
        let records = vec![record(9.0); 3 * 365];
        let series = WeatherSeries::from_records(&records, 1);
        assert_eq!(series.day(1, 365).rainfall, 9.0);
    }
}
