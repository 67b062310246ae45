//! Elapsed-time progression for demo playback.
//!
//! A [`Timeline`] walks an ordered list of effects, advancing whenever the
//! active segment has been on screen for its full duration. [`Breakpoints`]
//! is the companion mode for demos that keep a single program bound and only
//! need a running cue index. [`FramePacer`] caps the render loop at a minimum
//! frame period. All three are pure over a caller-supplied clock value so the
//! playback controller can feed them session time with paused spans removed.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("timeline contains no effects")]
    Empty,
}

/// One timed segment of the demo: a program handle plus its display duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect<P> {
    pub program: P,
    pub duration: Duration,
}

impl<P> Effect<P> {
    pub fn new(program: P, duration: Duration) -> Self {
        Self { program, duration }
    }
}

/// Ordered effect sequence, immutable once playback begins.
///
/// The active entry advances strictly by elapsed time; the last entry holds
/// until the caller stops the session.
#[derive(Debug)]
pub struct Timeline<P> {
    effects: Vec<Effect<P>>,
    active: usize,
    segment_start: Duration,
}

impl<P> Timeline<P> {
    pub fn new(effects: Vec<Effect<P>>) -> Result<Self, TimelineError> {
        if effects.is_empty() {
            return Err(TimelineError::Empty);
        }
        Ok(Self {
            effects,
            active: 0,
            segment_start: Duration::ZERO,
        })
    }

    /// Anchors the first segment at `now`. Call once when playback starts.
    pub fn begin(&mut self, now: Duration) {
        self.active = 0;
        self.segment_start = now;
    }

    pub fn active(&self) -> &Effect<P> {
        &self.effects[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn effects(&self) -> &[Effect<P>] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Time the active segment has been on screen at `now`.
    pub fn segment_elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.segment_start)
    }

    /// Sum of all segment durations; playback without audio runs this long.
    pub fn total_duration(&self) -> Duration {
        self.effects.iter().map(|effect| effect.duration).sum()
    }

    /// Per-frame evaluation of the transition rule.
    ///
    /// Advances when the active segment has shown for at least its duration
    /// (equality counts) and a next entry exists, re-anchoring the segment at
    /// `now` and returning the newly active effect so the caller can bind its
    /// program. The final entry never advances: the last effect holds until
    /// the session ends.
    pub fn advance_if_elapsed(&mut self, now: Duration) -> Option<&Effect<P>> {
        if self.segment_elapsed(now) >= self.effects[self.active].duration
            && self.active + 1 < self.effects.len()
        {
            self.active += 1;
            self.segment_start = now;
            return Some(&self.effects[self.active]);
        }
        None
    }
}

/// Breakpoint-mode timeline: a cue list for one continuously bound program.
///
/// Each entry is the duration its point stays current, so a list like
/// `[2s, 1s]` holds point 0 for two seconds and then point 1. The running
/// index steps forward once the active point has been current for its full
/// duration, re-anchoring at the advance time, and the final point holds
/// until the session ends. Callers feed the current index to the shader as a
/// uniform instead of switching programs.
#[derive(Debug)]
pub struct Breakpoints {
    durations: Vec<Duration>,
    index: usize,
    point_start: Duration,
}

impl Breakpoints {
    pub fn new(durations: Vec<Duration>) -> Result<Self, TimelineError> {
        if durations.is_empty() {
            return Err(TimelineError::Empty);
        }
        Ok(Self {
            durations,
            index: 0,
            point_start: Duration::ZERO,
        })
    }

    /// Anchors the first point at `now`. Call once when playback starts.
    pub fn begin(&mut self, now: Duration) {
        self.index = 0;
        self.point_start = now;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Time the active point has been current at `now`.
    pub fn point_elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.point_start)
    }

    /// Sum of all point durations; playback without audio runs this long.
    pub fn total_duration(&self) -> Duration {
        self.durations.iter().copied().sum()
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Same advance rule as [`Timeline::advance_if_elapsed`]: steps the index
    /// once the active point has been current for its duration (equality
    /// counts), re-anchoring at `now` and clamping at the final index.
    /// Returns the new index when a step happened.
    pub fn advance_if_elapsed(&mut self, now: Duration) -> Option<usize> {
        if self.point_elapsed(now) >= self.durations[self.index]
            && self.index + 1 < self.durations.len()
        {
            self.index += 1;
            self.point_start = now;
            return Some(self.index);
        }
        None
    }
}

/// Caps the render loop at a minimum frame period.
///
/// The pacer sleeps off whatever slack the previous frame left and nothing
/// more: a slow frame is rendered at whatever cadence results, with no
/// catch-up across frames. Frame rate is bounded from above only.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    min_dt: Duration,
}

impl FramePacer {
    pub fn new(min_dt: Duration) -> Self {
        Self { min_dt }
    }

    /// Builds a pacer from a frames-per-second cap; zero or negative means
    /// uncapped.
    pub fn from_fps(fps: f32) -> Self {
        if fps > 0.0 {
            Self::new(Duration::from_secs_f32(1.0 / fps))
        } else {
            Self::new(Duration::ZERO)
        }
    }

    pub fn min_dt(&self) -> Duration {
        self.min_dt
    }

    /// Slack left after a frame that took `busy`; zero when the frame ran
    /// over budget. Never negative.
    pub fn slack(&self, busy: Duration) -> Duration {
        self.min_dt.saturating_sub(busy)
    }

    /// Sleeps off the slack before the next frame's timing starts.
    pub fn wait(&self, busy: Duration) {
        let slack = self.slack(busy);
        if !slack.is_zero() {
            std::thread::sleep(slack);
        }
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::from_fps(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    fn two_segment_timeline() -> Timeline<u32> {
        Timeline::new(vec![
            Effect::new(1, secs(2.0)),
            Effect::new(2, secs(3.0)),
        ])
        .unwrap()
    }

    #[test]
    fn empty_timeline_is_rejected() {
        assert!(matches!(
            Timeline::<u32>::new(Vec::new()),
            Err(TimelineError::Empty)
        ));
    }

    #[test]
    fn active_index_matches_prefix_sums() {
        let mut timeline = Timeline::new(vec![
            Effect::new(1, secs(1.0)),
            Effect::new(2, secs(2.0)),
            Effect::new(3, secs(0.5)),
        ])
        .unwrap();
        timeline.begin(Duration::ZERO);

        // Fine-grained evaluation: the active index at time t must be the
        // smallest k whose prefix sum exceeds t, clamped to the last entry.
        let mut now = Duration::ZERO;
        let step = secs(0.01);
        while now < secs(5.0) {
            timeline.advance_if_elapsed(now);
            let t = now.as_secs_f64();
            let expected = if t < 1.0 {
                0
            } else if t < 3.0 {
                1
            } else {
                2
            };
            assert_eq!(timeline.active_index(), expected, "t = {t}");
            now += step;
        }
    }

    #[test]
    fn exact_boundary_advances() {
        let mut timeline = two_segment_timeline();
        timeline.begin(Duration::ZERO);
        assert!(timeline.advance_if_elapsed(secs(1.999)).is_none());
        let next = timeline.advance_if_elapsed(secs(2.0)).copied();
        assert_eq!(next.map(|effect| effect.program), Some(2));
        assert_eq!(timeline.active_index(), 1);
    }

    #[test]
    fn last_effect_holds() {
        let mut timeline = two_segment_timeline();
        timeline.begin(Duration::ZERO);
        timeline.advance_if_elapsed(secs(2.0));
        assert_eq!(timeline.active_index(), 1);
        // Way past the final segment's duration: still held.
        assert!(timeline.advance_if_elapsed(secs(60.0)).is_none());
        assert_eq!(timeline.active_index(), 1);
    }

    #[test]
    fn advancing_reanchors_the_segment() {
        let mut timeline = two_segment_timeline();
        timeline.begin(secs(10.0));
        assert_eq!(timeline.segment_elapsed(secs(11.5)), secs(1.5));
        timeline.advance_if_elapsed(secs(12.0));
        assert_eq!(timeline.segment_elapsed(secs(12.25)), secs(0.25));
    }

    #[test]
    fn total_duration_sums_segments() {
        assert_eq!(two_segment_timeline().total_duration(), secs(5.0));
    }

    #[test]
    fn breakpoints_hold_each_point_for_its_duration() {
        let mut points =
            Breakpoints::new(vec![secs(1.0), secs(1.0), secs(1.0)]).unwrap();
        points.begin(Duration::ZERO);
        assert_eq!(points.advance_if_elapsed(secs(0.5)), None);
        assert_eq!(points.advance_if_elapsed(secs(1.0)), Some(1));
        // Re-anchored at 1.0: the second point gets its full second too,
        // never a zero-length flash.
        assert_eq!(points.advance_if_elapsed(secs(1.0)), None);
        assert_eq!(points.advance_if_elapsed(secs(1.5)), None);
        assert_eq!(points.advance_if_elapsed(secs(2.0)), Some(2));
        // Final point holds.
        assert_eq!(points.advance_if_elapsed(secs(100.0)), None);
        assert_eq!(points.index(), 2);
    }

    #[test]
    fn decreasing_point_durations_are_valid() {
        let mut points = Breakpoints::new(vec![secs(2.0), secs(1.0)]).unwrap();
        points.begin(Duration::ZERO);
        assert_eq!(points.advance_if_elapsed(secs(1.9)), None);
        assert_eq!(points.advance_if_elapsed(secs(2.0)), Some(1));
        assert_eq!(points.total_duration(), secs(3.0));
    }

    #[test]
    fn empty_breakpoints_are_rejected() {
        assert!(matches!(
            Breakpoints::new(Vec::new()),
            Err(TimelineError::Empty)
        ));
    }

    #[test]
    fn pacer_slack_is_never_negative() {
        let pacer = FramePacer::new(secs(1.0 / 60.0));
        assert_eq!(pacer.slack(secs(1.0)), Duration::ZERO);
        assert_eq!(pacer.slack(pacer.min_dt()), Duration::ZERO);
        let slack = pacer.slack(secs(0.01));
        assert!(slack > Duration::ZERO && slack < pacer.min_dt());
    }

    #[test]
    fn zero_fps_means_uncapped() {
        let pacer = FramePacer::from_fps(0.0);
        assert_eq!(pacer.min_dt(), Duration::ZERO);
        assert_eq!(pacer.slack(Duration::ZERO), Duration::ZERO);
    }
}
