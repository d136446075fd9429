/// Number of simulated days in every year. Leap days are not modeled.
pub const DAYS_PER_YEAR: u16 = 365;

/// Tracks the current simulated date as a (year, day-of-year) pair.
///
/// The clock uses a fixed 365-day calendar. `day` is always in `1..=365`
/// after [`SimClock::advance`] returns; the year rolls over in the same
/// call that would push the day past 365.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimClock {
    pub year: u32,
    pub day: u16,
    duration: u32,
}

impl SimClock {
    pub fn new(duration: u32) -> Self {
        Self {
            year: 1,
            day: 1,
            duration,
        }
    }

    /// Simulation duration in years.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Advance the clock by one day, rolling into the next year when the
    /// day would exceed 365.
    pub fn advance(&mut self) {
        self.day += 1;
        if self.day > DAYS_PER_YEAR {
            self.day = 1;
            self.year += 1;
        }
    }

    /// True on the last day of the current year. Callers must query this
    /// before calling [`SimClock::advance`] in the same daily cycle.
    pub fn is_year_end(&self) -> bool {
        self.day == DAYS_PER_YEAR
    }

    /// True once the clock has advanced past the final simulated year.
    pub fn is_simulation_end(&self) -> bool {
        self.year > self.duration
    }
}

impl std::fmt::Display for SimClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "year {} day {}", self.year, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_year_of_advances_rolls_the_year() {
        let mut clock = SimClock::new(2);
        for _ in 0..DAYS_PER_YEAR {
            clock.advance();
        }
        assert_eq!(clock.day, 1);
        assert_eq!(clock.year, 2);
    }

    #[test]
    fn year_end_is_visible_only_on_day_365() {
        let mut clock = SimClock::new(1);
        let mut year_end_days = Vec::new();
        for _ in 0..DAYS_PER_YEAR {
            if clock.is_year_end() {
                year_end_days.push(clock.day);
            }
            clock.advance();
        }
        assert_eq!(year_end_days, vec![DAYS_PER_YEAR]);
    }

    #[test]
    fn simulation_ends_exactly_after_the_final_year() {
        let duration = 3;
        let mut clock = SimClock::new(duration);
        while clock.year <= duration {
            assert!(!clock.is_simulation_end());
            clock.advance();
        }
        assert_eq!(clock.year, duration + 1);
        assert!(clock.is_simulation_end());
    }

    proptest! {
        #[test]
        fn day_stays_normalized(steps in 0usize..2_000) {
            let mut clock = SimClock::new(10);
            for _ in 0..steps {
                clock.advance();
            }
            prop_assert!(clock.day >= 1);
            prop_assert!(clock.day <= DAYS_PER_YEAR);
            // total elapsed days is recoverable, so no day was lost
            let elapsed = (clock.year as usize - 1) * DAYS_PER_YEAR as usize
                + clock.day as usize - 1;
            prop_assert_eq!(elapsed, steps);
        }
    }
}
