//! Per-tick sampling state.
//!
//! The running counters of a sampling run live in a small value type that is advanced
//! once per tick: old state and the tick's classification in, new state and a report out.

use crate::classifier::Classification;

/// Erase percentage at which the half-erase time is latched.
pub const HALF_ERASED_PERCENT: f64 = 50.0;

/// Outcome of one tick of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Keep sampling
    Continue,
    /// The erased streak satisfied the completion threshold
    Done,
    /// The run exceeded its timeout before completing
    TimedOut,
}

/// Counters carried from tick to tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SamplingState {
    /// Ticks taken so far (the last tick's 1-based index)
    pub iter: u64,
    /// Length of the current unbroken run of fully erased samples
    pub consecutive_erased: u64,
    /// Elapsed seconds at the first tick of the current erased streak
    pub streak_start: Option<f64>,
    /// Elapsed seconds when the image first read at least 50% erased; never overwritten
    pub half_erase_time: Option<f64>,
}

/// Values derived for one tick, written into its `read` record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// 1-based index of this tick
    pub iter: u64,
    /// `100 * consecutive_erased / iter`
    pub complete_percent: f64,
    /// `complete_percent` rescaled so that 100% means the threshold is met
    pub end_check: f64,
    /// Set on the tick where the half-erase time was latched
    pub half_erased_now: bool,
    /// `Done` once the threshold is met; ticks never report `TimedOut`
    pub status: RunStatus,
}

impl SamplingState {
    /// Advance by one tick sampled at `elapsed` seconds.
    ///
    /// A single non-erased sample resets the streak. The run is done once the trailing
    /// streak covers `erased_threshold` percent of all ticks.
    pub fn advance(
        &self,
        elapsed: f64,
        sample: Classification,
        erased_threshold: f64,
    ) -> (SamplingState, TickReport) {
        let iter = self.iter + 1;
        let (consecutive_erased, streak_start) = if sample.erased {
            (
                self.consecutive_erased + 1,
                self.streak_start.or(Some(elapsed)),
            )
        } else {
            (0, None)
        };

        let half_erased_now =
            self.half_erase_time.is_none() && sample.erase_percent >= HALF_ERASED_PERCENT;
        let half_erase_time = if half_erased_now {
            Some(elapsed)
        } else {
            self.half_erase_time
        };

        let complete_percent = 100.0 * consecutive_erased as f64 / iter as f64;
        let end_check = 100.0 * complete_percent / erased_threshold;
        let status = if end_check >= 100.0 {
            RunStatus::Done
        } else {
            RunStatus::Continue
        };

        let next = SamplingState {
            iter,
            consecutive_erased,
            streak_start,
            half_erase_time,
        };
        let report = TickReport {
            iter,
            complete_percent,
            end_check,
            half_erased_now,
            status,
        };
        (next, report)
    }

    /// Status of the next tick, checked before its read: [`RunStatus::TimedOut`] once
    /// `elapsed` reaches `timeout`, otherwise [`RunStatus::Continue`].
    pub fn check_timeout(&self, elapsed: f64, timeout: Option<f64>) -> RunStatus {
        if timeout.is_some_and(|limit| elapsed >= limit) {
            RunStatus::TimedOut
        } else {
            RunStatus::Continue
        }
    }
}
