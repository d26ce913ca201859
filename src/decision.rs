// src/decision.rs
use chrono::{DateTime, FixedOffset, Local};
use log::{debug, error, info, warn};
use tokio::time::interval;

use crate::config::Config;
use crate::controller::DeviceController;
use crate::price_store::PriceStore;
use crate::registry::DeviceRegistry;
use crate::types::{ControlDecision, PowerAction, PriceEntry, TriggerState};

/// Mutable state threaded through the control cycles. Owned solely by the
/// loop; there are no ambient globals.
///
/// `last_action` starts unknown so the first cycle always issues a command.
/// `current_price` keeps the previous cycle's value when no interval matches
/// the clock; defaulting to zero would bias the comparison toward ON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopState {
    pub last_action: Option<PowerAction>,
    pub current_price: Option<f64>,
}

/// The entry whose `[interval_start, interval_end)` contains `now`.
pub fn current_entry(
    series: &[PriceEntry],
    now: DateTime<FixedOffset>,
) -> Option<&PriceEntry> {
    series.iter().find(|entry| entry.contains(now))
}

pub fn average_price(series: &[PriceEntry]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    let sum: f64 = series.iter().map(|entry| entry.sek_per_kwh).sum();
    Some(sum / series.len() as f64)
}

/// The per-cycle transition rule: ON below the trigger, OFF at or above it.
/// Pure; whether a command actually goes out is `should_dispatch` on the
/// returned decision.
pub fn decide(
    current_price: f64,
    trigger_price: f64,
    last_action: Option<PowerAction>,
    override_active: bool,
) -> ControlDecision {
    let desired_state = if current_price < trigger_price {
        PowerAction::On
    } else {
        PowerAction::Off
    };
    ControlDecision {
        desired_state,
        current_price,
        trigger_price,
        last_action,
        override_active,
    }
}

/// Drive the decision loop forever. Strictly sequential: a cycle's fetches
/// and device commands all complete before the next tick is awaited, so
/// cycles never overlap.
pub async fn run_control_loop(
    config: &Config,
    registry: &DeviceRegistry,
    store: &PriceStore,
    controller: &DeviceController,
) {
    info!(
        "[LOOP] Control loop started. Interval: {}s, strategy: {:?}, override: {}, {} device(s) registered.",
        config.update_interval.as_secs(),
        config.strategy,
        config.override_repeat,
        registry.len()
    );
    if registry.is_empty() {
        warn!("[LOOP] No devices registered; decisions will be computed but nothing will be switched.");
    }

    let mut state = LoopState::default();
    let mut timer = interval(config.update_interval);

    loop {
        timer.tick().await;
        run_cycle(config, registry, store, controller, &mut state).await;
    }
}

/// One fetch-compute-act sequence.
pub async fn run_cycle(
    config: &Config,
    registry: &DeviceRegistry,
    store: &PriceStore,
    controller: &DeviceController,
    state: &mut LoopState,
) {
    let now = Local::now();
    let today = now.date_naive();
    let tomorrow = today + chrono::Duration::days(1);

    let todays_prices = store.fetch_today(today).await;
    let tomorrows_prices = store.fetch_day(tomorrow).await;
    if tomorrows_prices.is_none() {
        debug!("[LOOP] Tomorrows price not yet available");
    }

    let triggers = match TriggerState::recompute(
        config.strategy,
        &todays_prices,
        tomorrows_prices.as_deref(),
    ) {
        Ok(triggers) => triggers,
        Err(e) => {
            error!("[LOOP] Trigger computation failed: {}", e);
            return;
        }
    };
    if let Some(tomorrow_trigger) = triggers.tomorrow {
        debug!("[LOOP] Trigger price tomorrow: {:.2} SEK", tomorrow_trigger);
    }

    match current_entry(&todays_prices, now.fixed_offset()) {
        Some(entry) => state.current_price = Some(entry.sek_per_kwh),
        None => warn!(
            "[LOOP] No price interval matches the current time; keeping previous price {:?}",
            state.current_price
        ),
    }
    let current_price = match state.current_price {
        Some(price) => price,
        None => {
            warn!("[LOOP] No current price known yet; skipping device control this cycle");
            return;
        }
    };

    let decision = decide(
        current_price,
        triggers.today,
        state.last_action,
        config.override_repeat,
    );

    if decision.should_dispatch() {
        info!("[LOOP] Switching {}", decision.desired_state);
        controller
            .apply_state(decision.desired_state, &registry.list())
            .await;
    } else {
        debug!("[LOOP] Already {}", decision.desired_state);
    }
    // Partial dispatch failure still counts as acted; there is no retry
    // within a cycle, override mode is the escape hatch.
    state.last_action = Some(decision.desired_state);

    if let Some(avg) = average_price(&todays_prices) {
        info!(
            "[LOOP] Cycle complete. Price now: {:.2} SEK, trigger: {:.2} SEK, todays avg: {:.2} SEK, state: {}.",
            decision.current_price, decision.trigger_price, avg, decision.desired_state
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cycle_always_dispatches() {
        let decision = decide(1.0, 2.0, None, false);
        assert_eq!(decision.desired_state, PowerAction::On);
        assert!(decision.should_dispatch());
    }

    #[test]
    fn unchanged_state_is_not_repeated() {
        let decision = decide(1.0, 2.0, Some(PowerAction::On), false);
        assert_eq!(decision.desired_state, PowerAction::On);
        assert!(!decision.should_dispatch());

        let decision = decide(5.0, 2.0, Some(PowerAction::Off), false);
        assert_eq!(decision.desired_state, PowerAction::Off);
        assert!(!decision.should_dispatch());
    }

    #[test]
    fn state_change_dispatches() {
        let decision = decide(5.0, 2.0, Some(PowerAction::On), false);
        assert_eq!(decision.desired_state, PowerAction::Off);
        assert!(decision.should_dispatch());
    }

    #[test]
    fn override_repeats_unchanged_state() {
        let decision = decide(1.0, 2.0, Some(PowerAction::On), true);
        assert_eq!(decision.desired_state, PowerAction::On);
        assert!(decision.should_dispatch());
    }

    #[test]
    fn price_at_trigger_switches_off() {
        let decision = decide(2.0, 2.0, None, false);
        assert_eq!(decision.desired_state, PowerAction::Off);
    }
}
