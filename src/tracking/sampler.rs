// Signal sampler - debounced reversal detection
//
// Turns the held/released control state into direction changes. Holding the
// control means "decrease"; releasing it means "increase". A direction change
// only counts as a reversal when it arrives more than the debounce interval
// after the previous one; too-early candidates are dropped entirely, so the
// direction does not flip either.

use std::time::Duration;

use crate::tracking::state::RunState;

/// Outcome of sampling the control once
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerEvent {
    /// Control agrees with the current direction
    Unchanged,
    /// Direction change accepted
    Reversal { count: u32, level: f64 },
    /// Direction change rejected by the debounce window
    Debounced { since_last: Duration },
}

#[derive(Debug, Clone, Copy)]
pub struct SignalSampler {
    debounce: Duration,
}

impl SignalSampler {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Sample the control state for one tick
    ///
    /// # Arguments
    /// * `state` - Run state to update on an accepted reversal
    /// * `held` - Whether the decrease control is held, read once per tick
    /// * `now` - Time since run start
    pub fn observe(&self, state: &mut RunState, held: bool, now: Duration) -> SamplerEvent {
        let implied_increasing = !held;
        if implied_increasing == state.is_increasing() {
            return SamplerEvent::Unchanged;
        }

        if let Some(last) = state.last_reversal_at() {
            let since_last = now.saturating_sub(last);
            if since_last <= self.debounce {
                return SamplerEvent::Debounced { since_last };
            }
        }

        state.confirm_reversal(now, implied_increasing);
        SamplerEvent::Reversal {
            count: state.reversal_count(),
            level: state.current_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_released_control_keeps_increasing() {
        let sampler = SignalSampler::new(1000);
        let mut state = RunState::new(50.0, 1.0);

        assert_eq!(sampler.observe(&mut state, false, ms(100)), SamplerEvent::Unchanged);
        assert!(state.is_increasing());
        assert_eq!(state.reversal_count(), 0);
    }

    #[test]
    fn test_first_press_is_accepted_immediately() {
        let sampler = SignalSampler::new(1000);
        let mut state = RunState::new(50.0, 1.0);

        let event = sampler.observe(&mut state, true, ms(200));
        assert_eq!(event, SamplerEvent::Reversal { count: 1, level: 50.0 });
        assert!(!state.is_increasing());
        assert_eq!(state.last_reversal_at(), Some(ms(200)));
    }

    #[test]
    fn test_reversals_closer_than_debounce_count_once() {
        let sampler = SignalSampler::new(1000);
        let mut state = RunState::new(50.0, 1.0);

        assert!(matches!(
            sampler.observe(&mut state, true, ms(5000)),
            SamplerEvent::Reversal { count: 1, .. }
        ));
        // Release 400 ms later: rejected, direction stays "decreasing"
        assert_eq!(
            sampler.observe(&mut state, false, ms(5400)),
            SamplerEvent::Debounced {
                since_last: ms(400)
            }
        );
        assert!(!state.is_increasing());
        assert_eq!(state.reversal_count(), 1);
    }

    #[test]
    fn test_exact_debounce_interval_is_still_rejected() {
        let sampler = SignalSampler::new(1000);
        let mut state = RunState::new(50.0, 1.0);

        sampler.observe(&mut state, true, ms(2000));
        assert!(matches!(
            sampler.observe(&mut state, false, ms(3000)),
            SamplerEvent::Debounced { .. }
        ));
        assert!(matches!(
            sampler.observe(&mut state, false, ms(3001)),
            SamplerEvent::Reversal { count: 2, .. }
        ));
        assert!(state.is_increasing());
    }

    #[test]
    fn test_reversal_captures_current_level() {
        let sampler = SignalSampler::new(1000);
        let mut state = RunState::new(50.0, 1.0);
        state.set_level(57.25, 1.0);

        sampler.observe(&mut state, true, ms(1500));
        assert_eq!(state.reversal_levels(), &[57.25]);
    }
}
