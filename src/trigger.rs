// src/trigger.rs
use crate::errors::PriceError;
use crate::types::{PriceEntry, Strategy, TriggerState};

/// Compute the trigger price for one series under the chosen strategy.
/// Pure function of its inputs; fails only on an empty series.
///
/// For the ratio strategy the configured hour count is scaled by the series
/// length (24 hourly entries and 96 quarter-hour entries both work), the
/// prices are sorted ascending and the value at the scaled ordinal becomes
/// the trigger. Only the cheapest h/24 fraction of intervals falls strictly
/// below it.
pub fn compute(strategy: Strategy, series: &[PriceEntry]) -> Result<f64, PriceError> {
    if series.is_empty() {
        return Err(PriceError::EmptySeries);
    }

    match strategy {
        Strategy::Fixed(value) => Ok(value),
        Strategy::Ratio(hours) => {
            let mut prices: Vec<f64> = series.iter().map(|entry| entry.sek_per_kwh).collect();
            prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let index = ((hours as f64 / 24.0) * prices.len() as f64).floor() as usize;
            // Clamp: a short series or a large hour count must select the
            // last entry, not fault.
            let index = index.min(prices.len() - 1);
            Ok(prices[index])
        }
    }
}

impl TriggerState {
    /// Recompute both triggers for the cycle. Today and tomorrow use the
    /// same strategy on their own series; tomorrow's trigger is absent
    /// whenever tomorrow's series is.
    pub fn recompute(
        strategy: Strategy,
        today: &[PriceEntry],
        tomorrow: Option<&[PriceEntry]>,
    ) -> Result<TriggerState, PriceError> {
        let today_trigger = compute(strategy, today)?;
        let tomorrow_trigger = match tomorrow {
            Some(series) if !series.is_empty() => Some(compute(strategy, series)?),
            _ => None,
        };
        Ok(TriggerState {
            today: today_trigger,
            tomorrow: tomorrow_trigger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn series_of(prices: &[f64]) -> Vec<PriceEntry> {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &sek_per_kwh)| {
                let interval_start = offset
                    .with_ymd_and_hms(2024, 6, 1, i as u32, 0, 0)
                    .unwrap();
                PriceEntry {
                    sek_per_kwh,
                    eur_per_kwh: None,
                    exchange_rate: None,
                    interval_start,
                    interval_end: Some(interval_start + chrono::Duration::hours(1)),
                }
            })
            .collect()
    }

    #[test]
    fn fixed_trigger_ignores_series_content() {
        let series = series_of(&[9.0, 0.1, 3.7]);
        assert_eq!(compute(Strategy::Fixed(1.25), &series).unwrap(), 1.25);
        assert_eq!(compute(Strategy::Fixed(42.0), &series).unwrap(), 42.0);
    }

    #[test]
    fn ratio_trigger_scales_with_series_length() {
        let series = series_of(&[1.0, 2.0, 3.0, 4.0]);
        // h=6 over 4 entries: floor(6/24 * 4) = 1 -> second cheapest
        assert_eq!(compute(Strategy::Ratio(6), &series).unwrap(), 2.0);
        // h=12: floor(12/24 * 4) = 2
        assert_eq!(compute(Strategy::Ratio(12), &series).unwrap(), 3.0);
    }

    #[test]
    fn ratio_trigger_is_an_element_of_the_series() {
        let series = series_of(&[0.42, 3.14, 1.61, 2.72, 0.58]);
        for hours in 1..=23 {
            let trigger = compute(Strategy::Ratio(hours), &series).unwrap();
            assert!(
                series.iter().any(|e| e.sek_per_kwh == trigger),
                "trigger {} not in series for h={}",
                trigger,
                hours
            );
        }
    }

    #[test]
    fn ratio_trigger_is_monotonic_in_hours() {
        let series = series_of(&[0.9, 0.1, 2.4, 1.7, 3.3, 0.5, 2.0, 1.2]);
        let mut previous = f64::MIN;
        for hours in 1..=23 {
            let trigger = compute(Strategy::Ratio(hours), &series).unwrap();
            assert!(trigger >= previous, "trigger dropped at h={}", hours);
            previous = trigger;
        }
    }

    #[test]
    fn ratio_index_clamps_on_short_series() {
        let series = series_of(&[1.0]);
        assert_eq!(compute(Strategy::Ratio(23), &series).unwrap(), 1.0);
    }

    #[test]
    fn empty_series_is_rejected() {
        assert!(matches!(
            compute(Strategy::Ratio(6), &[]),
            Err(PriceError::EmptySeries)
        ));
        assert!(matches!(
            compute(Strategy::Fixed(1.0), &[]),
            Err(PriceError::EmptySeries)
        ));
    }

    #[test]
    fn tomorrow_trigger_absent_without_series() {
        let today = series_of(&[1.0, 2.0]);
        let state = TriggerState::recompute(Strategy::Fixed(3.0), &today, None).unwrap();
        assert_eq!(state.today, 3.0);
        assert_eq!(state.tomorrow, None);

        let tomorrow = series_of(&[5.0, 6.0]);
        let state =
            TriggerState::recompute(Strategy::Ratio(12), &today, Some(&tomorrow)).unwrap();
        assert_eq!(state.today, 2.0);
        assert_eq!(state.tomorrow, Some(6.0));
    }
}
