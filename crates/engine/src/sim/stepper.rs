use std::time::{Duration, Instant};

use tracing::warn;

use super::FIXED_STEP_SECONDS;

const DEFAULT_STEP: Duration = Duration::from_nanos(16_666_667);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperConfig {
    /// Simulated time handed to every tick.
    pub step: Duration,
    /// Wall-clock stretch factor. 2.0 runs the simulation at half speed.
    pub slow: f64,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            slow: 1.0,
            max_frame_delta: Duration::from_secs(1),
            max_ticks_per_frame: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

/// Fixed-timestep pacing: wall-clock time goes in, a whole number of ticks comes out.
#[derive(Debug, Clone)]
pub struct Stepper {
    config: StepperConfig,
    wall_step: Duration,
    accumulator: Duration,
    last_instant: Option<Instant>,
}

impl Stepper {
    pub fn new(config: StepperConfig) -> Self {
        let defaults = StepperConfig::default();
        let step = normalize_non_zero_duration(config.step, defaults.step);
        let stretched = if config.slow.is_finite() && config.slow > 0.0 {
            stretch_step(step, config.slow).map(|wall_step| (config.slow, wall_step))
        } else {
            None
        };
        let (slow, wall_step) = stretched.unwrap_or_else(|| {
            warn!(slow = config.slow, "invalid slow factor; falling back to 1.0");
            (1.0, step)
        });
        let config = StepperConfig {
            step,
            slow,
            max_frame_delta: normalize_non_zero_duration(
                config.max_frame_delta,
                defaults.max_frame_delta,
            ),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
        };
        Self {
            config,
            wall_step,
            accumulator: Duration::ZERO,
            last_instant: None,
        }
    }

    pub fn config(&self) -> StepperConfig {
        self.config
    }

    pub fn step_seconds(&self) -> f64 {
        self.config.step.as_secs_f64()
    }

    /// Timestamp-driven entry point for the host loop. The first call only primes the clock.
    pub fn advance_to(&mut self, now: Instant) -> StepPlan {
        let elapsed = match self.last_instant {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_instant = Some(now);
        self.advance_by(elapsed)
    }

    pub fn advance_by(&mut self, elapsed: Duration) -> StepPlan {
        let clamped = clamp_frame_delta(elapsed, self.config.max_frame_delta);
        self.accumulator = self.accumulator.saturating_add(clamped);
        let plan = plan_sim_steps(
            self.accumulator,
            self.wall_step,
            self.config.max_ticks_per_frame,
        );
        self.accumulator = plan.remaining_accumulator;
        plan
    }

    pub fn remainder(&self) -> Duration {
        self.accumulator
    }

    /// Leftover time in simulation seconds, for renderers that interpolate.
    pub fn render_lag_seconds(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.config.slow
    }

    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.wall_step.as_secs_f64()
    }
}

/// Drains whole steps while the accumulator strictly exceeds one step. Hitting the tick cap
/// drops the whole backlog.
pub fn plan_sim_steps(
    mut accumulator: Duration,
    wall_step: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator > wall_step && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(wall_step);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator > wall_step {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

pub fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

/// None when the stretched step does not fit a `Duration` or rounds down to zero.
fn stretch_step(step: Duration, slow: f64) -> Option<Duration> {
    if slow == 1.0 {
        return Some(step);
    }
    Duration::try_from_secs_f64(step.as_secs_f64() * slow)
        .ok()
        .filter(|wall_step| !wall_step.is_zero())
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP_NANOS: u64 = 16_666_667;

    #[test]
    fn default_step_matches_fixed_step_seconds() {
        let step = StepperConfig::default().step;
        assert_eq!(step, Duration::from_nanos(STEP_NANOS));
        assert!((step.as_secs_f64() - FIXED_STEP_SECONDS).abs() < 1e-9);
    }

    fn uncapped() -> StepperConfig {
        StepperConfig {
            max_ticks_per_frame: 1_000,
            ..StepperConfig::default()
        }
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_secs(1);
        assert_eq!(
            clamp_frame_delta(Duration::from_secs(30), max_frame_delta),
            max_frame_delta
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(5), max_frame_delta),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn exactly_one_step_waits_for_more_time() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(32), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 1);
        assert_eq!(result.remaining_accumulator, fixed_dt);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn stepper_carries_remainder_between_frames() {
        let mut stepper = Stepper::new(uncapped());

        let first = stepper.advance_by(Duration::from_millis(10));
        assert_eq!(first.ticks_to_run, 0);

        let second = stepper.advance_by(Duration::from_millis(10));
        assert_eq!(second.ticks_to_run, 1);
        assert_eq!(
            stepper.remainder(),
            Duration::from_millis(20) - Duration::from_nanos(STEP_NANOS)
        );
    }

    #[test]
    fn long_stall_is_clamped_to_one_second() {
        let mut stepper = Stepper::new(uncapped());

        let plan = stepper.advance_by(Duration::from_secs(30));

        assert_eq!(plan.ticks_to_run, 59);
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
        assert!(stepper.remainder() < Duration::from_nanos(STEP_NANOS));
    }

    #[test]
    fn default_tick_cap_bounds_catch_up() {
        let mut stepper = Stepper::new(StepperConfig::default());

        let plan = stepper.advance_by(Duration::from_secs(1));

        assert_eq!(plan.ticks_to_run, 10);
        assert!(plan.dropped_backlog > Duration::ZERO);
        assert_eq!(stepper.remainder(), Duration::ZERO);
    }

    #[test]
    fn slow_factor_stretches_wall_step_but_not_sim_step() {
        let mut stepper = Stepper::new(StepperConfig {
            slow: 2.0,
            ..uncapped()
        });

        let plan = stepper.advance_by(Duration::from_millis(50));

        assert_eq!(plan.ticks_to_run, 1);
        assert!((stepper.step_seconds() - FIXED_STEP_SECONDS).abs() < 1e-9);
        let remainder = stepper.remainder().as_secs_f64();
        assert!((stepper.render_lag_seconds() - remainder / 2.0).abs() < 1e-12);
        assert!(stepper.interpolation_alpha() < 1.0);
    }

    #[test]
    fn invalid_config_values_fall_back() {
        let stepper = Stepper::new(StepperConfig {
            step: Duration::ZERO,
            slow: f64::NAN,
            max_frame_delta: Duration::ZERO,
            max_ticks_per_frame: 0,
        });

        let config = stepper.config();
        assert_eq!(config.step, StepperConfig::default().step);
        assert_eq!(config.slow, 1.0);
        assert_eq!(config.max_frame_delta, Duration::from_secs(1));
        assert_eq!(config.max_ticks_per_frame, 1);
    }

    #[test]
    fn huge_slow_factor_falls_back_instead_of_overflowing() {
        let mut stepper = Stepper::new(StepperConfig {
            slow: 1e30,
            ..uncapped()
        });

        assert_eq!(stepper.config().slow, 1.0);
        let plan = stepper.advance_by(Duration::from_millis(20));
        assert_eq!(plan.ticks_to_run, 1);
    }

    #[test]
    fn tiny_slow_factor_falls_back_instead_of_zero_step() {
        let mut stepper = Stepper::new(StepperConfig {
            slow: 1e-12,
            ..uncapped()
        });

        assert_eq!(stepper.config().slow, 1.0);
        let plan = stepper.advance_by(Duration::from_millis(20));
        assert_eq!(plan.ticks_to_run, 1);
        assert!(stepper.interpolation_alpha().is_finite());
        assert!(stepper.interpolation_alpha() < 1.0);
    }

    #[test]
    fn first_timestamp_only_primes_clock() {
        let mut stepper = Stepper::new(uncapped());
        let start = Instant::now();

        let first = stepper.advance_to(start);
        let second = stepper.advance_to(start + Duration::from_millis(40));

        assert_eq!(first.ticks_to_run, 0);
        assert_eq!(second.ticks_to_run, 2);
    }
}
