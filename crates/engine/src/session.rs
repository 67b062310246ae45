//! Session-scoped runtime state: flags, keyed scalars, and the playback
//! clock.
//!
//! A [`Session`] is owned by the playback controller and handed to whoever
//! needs to read or tweak it; there are no process-wide globals. Flags and
//! common data outlive individual playback sessions; a [`PlaybackClock`]
//! lives for exactly one.

use std::time::{Duration, Instant};

/// Named boolean state bits. No bit implies another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeFlags(u32);

impl RuntimeFlags {
    pub const INITIALIZED: u32 = 0x1;
    pub const NO_AUDIO: u32 = 0x2;
    pub const PAUSED: u32 = 0x4;
    pub const FULLSCREEN: u32 = 0x8;
    pub const DISABLE_CURSOR: u32 = 0x10;
    pub const USE_VSYNC: u32 = 0x20;

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn set(&mut self, flag: u32, on: bool) {
        if on {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

pub const WINDOW_W: usize = 0;
pub const WINDOW_H: usize = 1;

const COMMON_SLOTS: usize = 2;
const DEFAULT_WINDOW_WIDTH: i32 = 1000;
const DEFAULT_WINDOW_HEIGHT: i32 = 800;

/// Small keyed integer store shared between initialisation and the
/// controller; currently the window dimensions.
///
/// Out-of-range reads return the −1 sentinel and out-of-range writes are
/// no-ops, so a miskeyed caller degrades instead of crashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonData([i32; COMMON_SLOTS]);

impl CommonData {
    pub fn get(&self, index: usize) -> i32 {
        self.0.get(index).copied().unwrap_or(-1)
    }

    pub fn set(&mut self, index: usize, value: i32) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = value;
        }
    }
}

impl Default for CommonData {
    fn default() -> Self {
        Self([DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT])
    }
}

/// Flags plus common data, owned by the controller and exposed to callers
/// through accessors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Session {
    flags: RuntimeFlags,
    data: CommonData,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self, flag: u32) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: u32, on: bool) {
        self.flags.set(flag, on);
    }

    pub fn get(&self, index: usize) -> i32 {
        self.data.get(index)
    }

    pub fn set(&mut self, index: usize, value: i32) {
        self.data.set(index, value);
    }

    /// Window dimensions as submitted to the `screen` uniform.
    pub fn viewport(&self) -> (i32, i32) {
        (self.data.get(WINDOW_W), self.data.get(WINDOW_H))
    }
}

/// Elapsed-time tracking for one playback session, with paused spans
/// excluded.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    start: Instant,
    paused_total: Duration,
    pause_anchor: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            paused_total: Duration::ZERO,
            pause_anchor: None,
        }
    }

    /// Session time at `now`. While paused the value is frozen at the moment
    /// the pause began; after resuming, the paused span never re-enters it.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let paused = match self.pause_anchor {
            Some(anchor) => self.paused_total + now.saturating_duration_since(anchor),
            None => self.paused_total,
        };
        now.saturating_duration_since(self.start).saturating_sub(paused)
    }

    pub fn pause(&mut self, now: Instant) {
        if self.pause_anchor.is_none() {
            self.pause_anchor = Some(now);
        }
    }

    /// Re-anchors after a pause, folding the paused span into the excluded
    /// total.
    pub fn resume(&mut self, now: Instant) {
        if let Some(anchor) = self.pause_anchor.take() {
            self.paused_total += now.saturating_duration_since(anchor);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_anchor.is_some()
    }
}

/// Where frame timestamps come from.
///
/// Production uses the monotonic system clock; tests drive playback with a
/// manual source so every timing property is deterministic.
pub trait TimeSource {
    fn now(&mut self) -> Instant;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Deterministic time source: every reading advances a synthetic clock by a
/// fixed step.
#[derive(Debug, Clone, Copy)]
pub struct ManualTimeSource {
    current: Instant,
    step: Duration,
}

impl ManualTimeSource {
    pub fn new(step: Duration) -> Self {
        Self {
            current: Instant::now(),
            step,
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.current += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&mut self) -> Instant {
        let reading = self.current;
        self.current += self.step;
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent_bits() {
        let mut session = Session::new();
        session.set_flag(RuntimeFlags::PAUSED, true);
        session.set_flag(RuntimeFlags::USE_VSYNC, true);
        assert!(session.flag(RuntimeFlags::PAUSED));
        assert!(session.flag(RuntimeFlags::USE_VSYNC));
        assert!(!session.flag(RuntimeFlags::NO_AUDIO));
        session.set_flag(RuntimeFlags::PAUSED, false);
        assert!(!session.flag(RuntimeFlags::PAUSED));
        assert!(session.flag(RuntimeFlags::USE_VSYNC));
    }

    #[test]
    fn out_of_range_get_returns_sentinel_without_mutation() {
        let mut session = Session::new();
        assert_eq!(session.get(5), -1);
        session.set(5, 123);
        assert_eq!(session.get(WINDOW_W), 1000);
        assert_eq!(session.get(WINDOW_H), 800);
        assert_eq!(session.get(5), -1);
    }

    #[test]
    fn window_slots_are_writable() {
        let mut session = Session::new();
        session.set(WINDOW_W, 1920);
        session.set(WINDOW_H, 1080);
        assert_eq!(session.viewport(), (1920, 1080));
    }

    #[test]
    fn pausing_excludes_the_paused_span_from_elapsed() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        let secs = |s| Duration::from_secs(s);

        assert_eq!(clock.elapsed(start + secs(3)), secs(3));
        clock.pause(start + secs(3));
        // Frozen while paused.
        assert_eq!(clock.elapsed(start + secs(10)), secs(3));
        clock.resume(start + secs(10));
        // 7 paused seconds never re-enter elapsed.
        assert_eq!(clock.elapsed(start + secs(12)), secs(5));
    }

    #[test]
    fn redundant_pause_and_resume_are_harmless() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        let secs = |s| Duration::from_secs(s);

        clock.resume(start + secs(1));
        clock.pause(start + secs(2));
        clock.pause(start + secs(4));
        clock.resume(start + secs(5));
        assert_eq!(clock.elapsed(start + secs(6)), secs(3));
    }

    #[test]
    fn manual_time_source_steps_per_reading() {
        let mut source = ManualTimeSource::new(Duration::from_millis(10));
        let first = source.now();
        let second = source.now();
        assert_eq!(second - first, Duration::from_millis(10));
    }
}
