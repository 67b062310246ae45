//! Playback controller: the per-frame loop tying clock, scheduler, audio,
//! and providers together.

use std::sync::Arc;
use std::time::{Duration, Instant};

use timeline::{Breakpoints, Effect, FramePacer, Timeline};

use crate::audio::{AudioTrack, DrainBuffer};
use crate::compile::ProgramCompiler;
use crate::error::EngineError;
use crate::gfx::{AudioOutput, Graphics, ProgramHandle, WindowEvents};
use crate::session::{PlaybackClock, RuntimeFlags, Session, TimeSource};

/// Immutable snapshot handed to the frame sink once per iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Session time, paused spans excluded.
    pub elapsed: Duration,
    /// Time since the active segment or breakpoint became current.
    pub segment_elapsed: Duration,
    pub segment_index: usize,
    pub viewport: (i32, i32),
}

/// Per-frame hook invoked by the controller after uniforms are submitted and
/// before the draw. Synchronous and non-blocking by contract.
pub trait FrameSink {
    fn frame(&mut self, ctx: &FrameContext);
}

/// What drives the playback session forward.
pub enum Playlist {
    /// Ordered effects, one program per segment.
    Effects(Timeline<ProgramHandle>),
    /// One continuously bound program stepped through a cue list of per-point
    /// durations; the running point index is fed to the shader as the `point`
    /// uniform.
    Breakpoints {
        program: ProgramHandle,
        points: Breakpoints,
    },
}

impl Playlist {
    fn validate(&self) -> Result<(), EngineError> {
        match self {
            Playlist::Effects(timeline) => {
                for (index, effect) in timeline.effects().iter().enumerate() {
                    if effect.program.is_null() {
                        return Err(EngineError::NullProgram { index });
                    }
                }
            }
            Playlist::Breakpoints { program, .. } => {
                if program.is_null() {
                    return Err(EngineError::NullProgram { index: 0 });
                }
            }
        }
        Ok(())
    }

    /// How long a silent session plays before it counts as exhausted.
    fn silent_cutoff(&self) -> Duration {
        match self {
            Playlist::Effects(timeline) => timeline.total_duration(),
            Playlist::Breakpoints { points, .. } => points.total_duration(),
        }
    }
}

/// Compiles every entry into an effect timeline.
///
/// A single failure tears down the programs built so far and reports which
/// entry broke: a timeline containing a failed compile is a configuration
/// error, never something to play around.
pub fn build_timeline<G: Graphics>(
    compiler: &ProgramCompiler,
    gfx: &mut G,
    entries: &[(String, Duration)],
) -> Result<Timeline<ProgramHandle>, EngineError> {
    let mut effects = Vec::with_capacity(entries.len());
    for (index, (source, duration)) in entries.iter().enumerate() {
        match compiler.compile(gfx, source) {
            Ok(program) => effects.push(Effect::new(program, *duration)),
            Err(err) => {
                for effect in &effects {
                    gfx.delete_program(effect.program);
                }
                return Err(EngineError::Effect { index, source: err });
            }
        }
    }
    Ok(Timeline::new(effects)?)
}

/// Top-level playback loop over the provider seams.
///
/// Owns the session, the compiled playlist, and (when audio is live) the
/// drain buffer shared with the audio notification context. All GPU and
/// device resources are released on every exit path when [`run`] returns.
///
/// [`run`]: Player::run
pub struct Player<G, W, A, T> {
    gfx: G,
    window: W,
    audio: A,
    clock: T,
    session: Session,
    compiler: Option<ProgramCompiler>,
    playlist: Playlist,
    track: Option<AudioTrack>,
    buffer: Option<Arc<DrainBuffer>>,
    audio_open: bool,
    pacer: FramePacer,
    sink: Option<Box<dyn FrameSink>>,
}

impl<G, W, A, T> Player<G, W, A, T>
where
    G: Graphics,
    W: WindowEvents,
    A: AudioOutput,
    T: TimeSource,
{
    /// Assembles a player; refuses any playlist carrying a null program.
    pub fn new(
        gfx: G,
        window: W,
        audio: A,
        clock: T,
        session: Session,
        compiler: ProgramCompiler,
        playlist: Playlist,
        track: Option<AudioTrack>,
    ) -> Result<Self, EngineError> {
        playlist.validate()?;
        Ok(Self {
            gfx,
            window,
            audio,
            clock,
            session,
            compiler: Some(compiler),
            playlist,
            track,
            buffer: None,
            audio_open: false,
            pacer: FramePacer::default(),
            sink: None,
        })
    }

    pub fn with_pacer(mut self, pacer: FramePacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_frame_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Plays the session to completion and releases every resource,
    /// returning the session state for the next run.
    ///
    /// The loop ends when a quit signal arrives or the audio buffer empties;
    /// a silent session substitutes timeline completion for the latter.
    pub fn run(mut self) -> Session {
        self.session.set_flag(RuntimeFlags::INITIALIZED, true);
        self.open_audio();
        self.play_session();
        self.teardown();
        self.session
    }

    fn open_audio(&mut self) {
        if self.session.flag(RuntimeFlags::NO_AUDIO) {
            tracing::debug!("audio disabled by session flag");
            return;
        }
        let Some(track) = self.track.take() else {
            tracing::warn!("no audio track supplied; continuing without sound");
            self.session.set_flag(RuntimeFlags::NO_AUDIO, true);
            return;
        };
        let buffer = Arc::new(DrainBuffer::new(track.pcm));
        match self.audio.open(track.spec, Arc::clone(&buffer)) {
            Ok(()) => {
                self.buffer = Some(buffer);
                self.audio_open = true;
            }
            Err(err) => {
                // Degraded mode: the visuals still play, silently.
                tracing::warn!(%err, "audio device unavailable; continuing without sound");
                self.session.set_flag(RuntimeFlags::NO_AUDIO, true);
            }
        }
    }

    fn play_session(&mut self) {
        let start = self.clock.now();
        let mut clock = PlaybackClock::new(start);
        match &mut self.playlist {
            Playlist::Effects(timeline) => {
                timeline.begin(Duration::ZERO);
                let program = timeline.active().program;
                self.gfx.use_program(program);
            }
            Playlist::Breakpoints { program, points } => {
                points.begin(Duration::ZERO);
                self.gfx.use_program(*program);
            }
        }
        let silent_cutoff = self.playlist.silent_cutoff();
        let mut dt = Duration::ZERO;

        loop {
            self.pacer.wait(dt);
            let frame_start = self.clock.now();

            let input = self.window.poll();
            if input.quit {
                tracing::info!("quit requested");
                break;
            }
            if input.toggle_pause {
                self.toggle_pause(&mut clock, frame_start);
            }

            let elapsed = clock.elapsed(frame_start);
            let exhausted = match &self.buffer {
                Some(buffer) => buffer.remaining() == 0,
                None => elapsed >= silent_cutoff,
            };
            if exhausted {
                tracing::info!(
                    elapsed_secs = elapsed.as_secs_f64(),
                    "playback complete"
                );
                break;
            }

            self.gfx.clear();

            let (segment_elapsed, segment_index) = match &mut self.playlist {
                Playlist::Effects(timeline) => {
                    let switched = timeline
                        .advance_if_elapsed(elapsed)
                        .map(|effect| effect.program);
                    if let Some(program) = switched {
                        tracing::debug!(
                            index = timeline.active_index(),
                            "effect transition"
                        );
                        self.gfx.use_program(program);
                    }
                    (timeline.segment_elapsed(elapsed), timeline.active_index())
                }
                Playlist::Breakpoints { points, .. } => {
                    if let Some(index) = points.advance_if_elapsed(elapsed) {
                        tracing::debug!(index, "breakpoint reached");
                    }
                    (points.point_elapsed(elapsed), points.index())
                }
            };

            let (width, height) = self.session.viewport();
            self.gfx
                .set_uniform_vec2("screen", [width as f32, height as f32]);
            self.gfx.set_uniform_f32("time", elapsed.as_secs_f32());
            self.gfx
                .set_uniform_f32("eff_time", segment_elapsed.as_secs_f32());
            if matches!(self.playlist, Playlist::Breakpoints { .. }) {
                self.gfx.set_uniform_f32("point", segment_index as f32);
            }

            if let Some(sink) = self.sink.as_mut() {
                sink.frame(&FrameContext {
                    elapsed,
                    segment_elapsed,
                    segment_index,
                    viewport: (width, height),
                });
            }

            self.gfx.draw_fullscreen();
            self.gfx.present();

            dt = self
                .clock
                .now()
                .saturating_duration_since(frame_start);
        }
    }

    fn toggle_pause(&mut self, clock: &mut PlaybackClock, now: Instant) {
        let paused = !self.session.flag(RuntimeFlags::PAUSED);
        self.session.set_flag(RuntimeFlags::PAUSED, paused);
        if paused {
            clock.pause(now);
        } else {
            clock.resume(now);
        }
        if let Some(buffer) = &self.buffer {
            buffer.set_paused(paused);
        }
        tracing::debug!(paused, "pause toggled");
    }

    /// Releases everything, in the reverse order it was acquired. Runs on
    /// every exit path, normal or not.
    fn teardown(&mut self) {
        self.gfx.use_program(ProgramHandle::NULL);
        if self.audio_open {
            self.audio.close();
            self.audio_open = false;
        }
        self.buffer = None;
        match &self.playlist {
            Playlist::Effects(timeline) => {
                for effect in timeline.effects() {
                    self.gfx.delete_program(effect.program);
                }
            }
            Playlist::Breakpoints { program, .. } => {
                self.gfx.delete_program(*program);
            }
        }
        if let Some(compiler) = self.compiler.take() {
            compiler.release(&mut self.gfx);
        }
        tracing::debug!("playback resources released");
    }
}
