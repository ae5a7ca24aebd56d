//! Hour playback: advances the hour slot on a fixed cadence while running.
//!
//! The controller owns no thread. Its owner polls it with the current time
//! (from a UI frame callback or a sleep loop) and gets one callback per
//! elapsed tick, so stopping is immediate and deterministic.

use std::time::{Duration, Instant};

/// Cadence used by the play button.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1500);
const MIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timer {
    tick: Duration,
    next: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackController {
    timer: Option<Timer>,
}

/// Slot after `index`, wrapping to the first one.
pub fn next_hour_index(index: usize, hour_count: usize) -> usize {
    if hour_count == 0 {
        0
    } else {
        (index + 1) % hour_count
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `tick` from `now`; restarts a running timer.
    pub fn start(&mut self, tick: Duration, now: Instant) {
        let tick = tick.max(MIN_TICK);
        if self.timer.is_some() {
            log::debug!("restarting playback");
        }
        log::info!("playback started, tick {}ms", tick.as_millis());
        self.timer = Some(Timer {
            tick,
            next: now + tick,
        });
    }

    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            log::info!("playback stopped");
        }
    }

    /// Play button semantics. Returns whether playback is now running.
    pub fn toggle(&mut self, tick: Duration, now: Instant) -> bool {
        if self.is_running() {
            self.stop();
        } else {
            self.start(tick, now);
        }
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn tick(&self) -> Option<Duration> {
        self.timer.map(|t| t.tick)
    }

    /// When the next tick is due, if running.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.next)
    }

    /// Fire every tick due at `now`, each advancing `hour_index` by one slot.
    ///
    /// Returns the resulting index. A backlog longer than one full cycle is
    /// collapsed into a single cycle.
    pub fn poll<F: FnMut(usize)>(
        &mut self,
        now: Instant,
        hour_index: usize,
        hour_count: usize,
        mut on_tick: F,
    ) -> usize {
        let Some(timer) = self.timer.as_mut() else {
            return hour_index;
        };
        if hour_count == 0 {
            return hour_index;
        }

        let mut index = hour_index;
        let mut fired = 0;
        while now >= timer.next {
            index = next_hour_index(index, hour_count);
            on_tick(index);
            fired += 1;
            timer.next += timer.tick;
            if fired >= hour_count {
                timer.next = now + timer.tick;
                break;
            }
        }
        index
    }
}
