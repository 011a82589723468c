//! Cooperative fixed-step scheduling.
//!
//! One [`Scheduler`] owns every recurring timer of the game and the game
//! clock. The network loop polls it with measured wall-clock time; tests poll
//! it with synthetic durations.

use crate::creature;
use shared::Species;
use std::time::Duration;

/// Most intervals a timer may owe after a stall. Older backlog is dropped.
const MAX_BACKLOG: u32 = 4;

/// Drift-corrected fixed-step timer.
///
/// Elapsed time accumulates and a tick is due once a full interval has built
/// up. Firing subtracts exactly one interval, so jitter in the polling period
/// never shifts the long-run tick rate.
#[derive(Debug, Clone)]
pub struct FixedStep {
    interval: Duration,
    accumulated: Duration,
    max_backlog: Duration,
}

impl FixedStep {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
            max_backlog: interval.checked_mul(MAX_BACKLOG).unwrap_or(Duration::MAX),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Adds `elapsed` and fires at most once.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.accumulated = self.accumulated.saturating_add(elapsed).min(self.max_backlog);
        if self.interval.is_zero() || self.accumulated < self.interval {
            return false;
        }
        self.accumulated -= self.interval;
        true
    }
}

/// Timers that fired during one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ticks {
    pub simulation: bool,
    pub cycle: bool,
    pub respawns: Vec<Species>,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    clock: Duration,
    simulation: FixedStep,
    cycle: FixedStep,
    respawn: Vec<(Species, FixedStep)>,
    simulation_ticks: u64,
}

impl Scheduler {
    pub fn new(tick: Duration, cycle: Duration) -> Self {
        let respawn = Species::ALL
            .iter()
            .map(|&species| {
                let interval = creature::template(species).respawn_interval;
                (species, FixedStep::new(interval))
            })
            .collect();

        Self {
            clock: Duration::ZERO,
            simulation: FixedStep::new(tick),
            cycle: FixedStep::new(cycle),
            respawn,
            simulation_ticks: 0,
        }
    }

    /// Game time: the sum of all polled durations.
    pub fn now(&self) -> Duration {
        self.clock
    }

    pub fn tick_interval(&self) -> Duration {
        self.simulation.interval()
    }

    pub fn simulation_ticks(&self) -> u64 {
        self.simulation_ticks
    }

    /// Advances the clock and reports which timers fired.
    pub fn poll(&mut self, elapsed: Duration) -> Ticks {
        self.clock += elapsed;

        let simulation = self.simulation.advance(elapsed);
        if simulation {
            self.simulation_ticks += 1;
        }

        Ticks {
            simulation,
            cycle: self.cycle.advance(elapsed),
            respawns: self
                .respawn
                .iter_mut()
                .filter_map(|(species, timer)| timer.advance(elapsed).then_some(*species))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_full_interval() {
        let mut step = FixedStep::new(Duration::from_millis(100));
        assert!(!step.advance(Duration::from_millis(60)));
        assert!(step.advance(Duration::from_millis(60)));
        assert_eq!(step.accumulated(), Duration::from_millis(20));
    }

    #[test]
    fn test_remainder_carries_over() {
        let mut step = FixedStep::new(Duration::from_millis(100));
        let mut fired = 0;
        // 34 polls of 30 ms cover 1020 ms.
        for _ in 0..34 {
            if step.advance(Duration::from_millis(30)) {
                fired += 1;
            }
        }
        assert_eq!(fired, 10);
    }

    #[test]
    fn test_fires_at_most_once_per_poll() {
        let mut step = FixedStep::new(Duration::from_millis(100));
        assert!(step.advance(Duration::from_millis(350)));
        assert_eq!(step.accumulated(), Duration::from_millis(250));
        assert!(step.advance(Duration::ZERO));
        assert!(step.advance(Duration::ZERO));
        assert!(!step.advance(Duration::ZERO));
    }

    #[test]
    fn test_backlog_is_capped() {
        let mut step = FixedStep::new(Duration::from_millis(100));
        step.advance(Duration::from_secs(60));
        let mut fired = 1;
        while step.advance(Duration::ZERO) {
            fired += 1;
        }
        assert_eq!(fired, MAX_BACKLOG);
    }

    #[test]
    fn test_huge_interval_does_not_overflow_backlog() {
        let mut step = FixedStep::new(Duration::MAX / 2);
        assert!(!step.advance(Duration::from_secs(5)));
        assert_eq!(step.accumulated(), Duration::from_secs(5));
    }

    #[test]
    fn test_scheduler_clock_and_timers() {
        let mut scheduler = Scheduler::new(Duration::from_millis(100), Duration::from_secs(1));
        let mut cycles = 0;
        let mut simulations = 0;
        for _ in 0..50 {
            let ticks = scheduler.poll(Duration::from_millis(100));
            simulations += ticks.simulation as u32;
            cycles += ticks.cycle as u32;
        }
        assert_eq!(scheduler.now(), Duration::from_secs(5));
        assert_eq!(simulations, 50);
        assert_eq!(cycles, 5);
        assert_eq!(scheduler.simulation_ticks(), 50);
    }

    #[test]
    fn test_respawn_timer_per_species() {
        let mut scheduler = Scheduler::new(Duration::from_millis(100), Duration::from_secs(5));
        let interval = creature::WOLF.respawn_interval;
        assert!(scheduler.poll(interval / 2).respawns.is_empty());
        assert_eq!(scheduler.poll(interval / 2).respawns, vec![Species::Wolf]);
    }
}
