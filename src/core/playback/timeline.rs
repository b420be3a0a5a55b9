//! core/playback/timeline.rs
//! The single logical playhead and everything derived from it.
//!
//! Narration eligibility is decided here and nowhere else:
//! - opening: `playhead < closing_start` (and the opening still has audio left)
//! - closing: `playhead >= closing_start` (and a closing track exists)
//!
//! The boundary makes them mutually exclusive.

use std::time::{Duration, Instant};

use crate::core::types::EngineState;

/// Which narration, if any, should be sounding at a given playhead, and at
/// what offset into its own file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NarrationCue {
    Opening { offset: f64 },
    Closing { offset: f64 },
    Silent,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    soundscape_duration: f64,
    opening_duration: f64,
    closing_duration: f64,
    closing_start: f64,
    state: EngineState,
}

impl Timeline {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fixes the session length. Called once, when the soundscape loads.
    pub fn set_soundscape(&mut self, duration: f64) {
        self.soundscape_duration = duration.max(0.0);
        self.state.total_duration = self.soundscape_duration.floor() as u32;
        self.state.time_remaining = self.state.total_duration;
        self.state.progress = 0.0;
        self.recompute_closing_start();
    }

    pub fn set_opening(&mut self, duration: f64) {
        self.opening_duration = duration.max(0.0);
    }

    pub fn set_closing(&mut self, duration: f64) {
        self.closing_duration = duration.max(0.0);
        self.recompute_closing_start();
    }

    fn recompute_closing_start(&mut self) {
        // No closing track: start sits at the very end and is never reached
        // by a narration that doesn't exist.
        self.closing_start = if self.closing_duration > 0.0 {
            (self.soundscape_duration - self.closing_duration).max(0.0)
        } else {
            self.soundscape_duration
        };
    }

    pub fn is_empty(&self) -> bool {
        self.state.total_duration == 0
    }

    pub fn closing_start(&self) -> f64 {
        self.closing_start
    }

    pub fn has_closing(&self) -> bool {
        self.closing_duration > 0.0
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.state.is_playing = playing;
    }

    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining
    }

    /// Whole seconds elapsed according to the countdown.
    pub fn elapsed(&self) -> u32 {
        self.state.elapsed()
    }

    /// Clamp a seek target onto the timeline. NaN goes to the top.
    pub fn clamp(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }
        seconds.clamp(0.0, self.soundscape_duration)
    }

    /// Positional publish after a seek or scrub, and when the ticker starts.
    pub fn publish_time_from(&mut self, seconds: f64) {
        let total = self.state.total_duration;
        self.state.time_remaining = total.saturating_sub(seconds.max(0.0).floor() as u32);
        self.state.progress = if total > 0 {
            (seconds / total as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// One countdown step. Returns false when there was nothing left.
    pub fn step(&mut self) -> bool {
        if self.state.time_remaining == 0 {
            return false;
        }
        self.state.time_remaining -= 1;
        if self.state.total_duration > 0 {
            self.state.progress = self.elapsed() as f64 / self.state.total_duration as f64;
        }
        true
    }

    /// True once the playhead is at or past the closing narration start.
    pub fn in_closing(&self, playhead: f64) -> bool {
        self.has_closing() && playhead >= self.closing_start
    }

    /// The mutual-exclusion rule, as a pure function of the playhead.
    pub fn cue_at(&self, playhead: f64) -> NarrationCue {
        if playhead < self.closing_start {
            if playhead < self.opening_duration {
                return NarrationCue::Opening {
                    offset: playhead.max(0.0),
                };
            }
            return NarrationCue::Silent;
        }

        if self.has_closing() {
            let offset = (playhead - self.closing_start).clamp(0.0, self.closing_duration);
            return NarrationCue::Closing { offset };
        }

        NarrationCue::Silent
    }

    /// Offset into the closing track for a soundscape position.
    pub fn closing_offset(&self, playhead: f64) -> f64 {
        (playhead - self.closing_start).clamp(0.0, self.closing_duration)
    }
}

pub const TICK: Duration = Duration::from_secs(1);

/// A cooperative repeating 1 s timer. At most one deadline is ever pending.
#[derive(Debug, Default)]
pub struct Ticker {
    next: Option<Instant>,
}

impl Ticker {
    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }

    /// Schedules the first tick unless one is already pending.
    pub fn start(&mut self, now: Instant) {
        if self.next.is_none() {
            self.next = Some(now + TICK);
        }
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next.is_some_and(|d| now >= d)
    }

    /// Consumes the due deadline and schedules the next one.
    pub fn advance(&mut self) {
        if let Some(d) = self.next {
            self.next = Some(d + TICK);
        }
    }

    /// How long the owner may block before the next tick.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.next.map(|d| d.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn timeline(total: f64, opening: f64, closing: f64) -> Timeline {
        let mut t = Timeline::empty();
        t.set_soundscape(total);
        t.set_opening(opening);
        t.set_closing(closing);
        t
    }

    #[test]
    fn closing_start_without_closing_is_the_sentinel() {
        let t = timeline(600.0, 60.0, 0.0);
        assert_eq!(t.closing_start(), 600.0);
        assert!(!t.in_closing(600.0));
        assert_eq!(t.cue_at(599.0), NarrationCue::Silent);
    }

    #[test]
    fn closing_start_is_total_minus_closing() {
        let t = timeline(600.0, 60.0, 45.0);
        assert_eq!(t.closing_start(), 555.0);
        assert!(!t.in_closing(554.0));
        assert!(t.in_closing(555.0));
        assert_eq!(t.cue_at(555.0), NarrationCue::Closing { offset: 0.0 });
        assert_eq!(t.cue_at(570.5), NarrationCue::Closing { offset: 15.5 });
    }

    #[test]
    fn closing_load_order_does_not_matter() {
        let mut t = Timeline::empty();
        t.set_closing(45.0);
        t.set_soundscape(600.0);
        assert_eq!(t.closing_start(), 555.0);
    }

    #[test]
    fn overlong_closing_clamps_start_to_zero() {
        let t = timeline(30.0, 10.0, 45.0);
        assert_eq!(t.closing_start(), 0.0);
        assert_eq!(t.cue_at(0.0), NarrationCue::Closing { offset: 0.0 });
    }

    #[test]
    fn narrations_are_mutually_exclusive_everywhere() {
        for (total, opening, closing) in [
            (600.0, 60.0, 45.0),
            (600.0, 590.0, 45.0),
            (120.0, 0.0, 30.0),
            (120.0, 30.0, 0.0),
            (0.0, 10.0, 10.0),
        ] {
            let t = timeline(total, opening, closing);
            let mut p = 0.0;
            while p <= total {
                match t.cue_at(p) {
                    NarrationCue::Opening { offset } => {
                        assert!(p < t.closing_start());
                        assert!(offset >= 0.0 && offset < opening);
                    }
                    NarrationCue::Closing { offset } => {
                        assert!(p >= t.closing_start());
                        assert!(offset >= 0.0 && offset <= closing);
                    }
                    NarrationCue::Silent => {}
                }
                p += 0.25;
            }
        }
    }

    #[test]
    fn gap_between_narrations_is_silent() {
        let t = timeline(600.0, 60.0, 45.0);
        assert_eq!(t.cue_at(30.0), NarrationCue::Opening { offset: 30.0 });
        assert_eq!(t.cue_at(60.0), NarrationCue::Silent);
        assert_eq!(t.cue_at(300.0), NarrationCue::Silent);
    }

    #[test]
    fn publish_time_from_matches_floor_rule() {
        let mut t = timeline(600.0, 0.0, 0.0);
        for target in [0.0, 0.4, 1.0, 59.99, 300.5, 599.9, 600.0] {
            t.publish_time_from(target);
            assert_eq!(t.time_remaining(), 600 - target.floor() as u32);
            assert_abs_diff_eq!(t.state().progress, target / 600.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_timeline_has_no_progress() {
        let mut t = Timeline::empty();
        assert!(t.is_empty());
        t.publish_time_from(12.0);
        assert_eq!(t.time_remaining(), 0);
        assert_eq!(t.state().progress, 0.0);
        assert!(!t.step());
    }

    #[test]
    fn step_counts_down_to_zero_and_stops() {
        let mut t = timeline(3.0, 0.0, 0.0);
        assert!(t.step());
        assert_abs_diff_eq!(t.state().progress, 1.0 / 3.0, epsilon = 1e-12);
        assert!(t.step());
        assert!(t.step());
        assert_eq!(t.time_remaining(), 0);
        assert_abs_diff_eq!(t.state().progress, 1.0, epsilon = 1e-12);
        assert!(!t.step());
        assert_eq!(t.time_remaining(), 0);
    }

    #[test]
    fn fractional_soundscape_floors_total() {
        let t = timeline(600.7, 0.0, 45.0);
        assert_eq!(t.state().total_duration, 600);
        assert_abs_diff_eq!(t.closing_start(), 555.7, epsilon = 1e-9);
        assert_eq!(t.clamp(-3.0), 0.0);
        assert_eq!(t.clamp(f64::NAN), 0.0);
        assert_abs_diff_eq!(t.clamp(900.0), 600.7, epsilon = 1e-9);
    }

    #[test]
    fn ticker_keeps_a_single_deadline() {
        let now = Instant::now();
        let mut ticker = Ticker::default();
        assert!(!ticker.is_active());
        assert_eq!(ticker.timeout(now), None);

        ticker.start(now);
        ticker.start(now + Duration::from_millis(500));
        assert_eq!(ticker.timeout(now), Some(TICK));
        assert!(!ticker.is_due(now));
        assert!(ticker.is_due(now + TICK));

        ticker.advance();
        assert_eq!(ticker.timeout(now), Some(TICK * 2));

        ticker.stop();
        ticker.advance();
        assert!(!ticker.is_active());
    }
}
