//! Playback engine for timeline-driven shader demos.
//!
//! The engine owns the runtime synchronization problem — elapsed time,
//! effect transitions, frame pacing, pause/resume, and the audio buffer a
//! device callback drains concurrently — and reaches every device through a
//! provider trait. The overall flow is:
//!
//! ```text
//!   manifest / embedding app
//!          │ compiled effects + PCM track
//!          ▼
//!   Player::run ──▶ FramePacer ──▶ Timeline ──▶ Graphics (uniforms, draw)
//!          │                                        ▲
//!          └─▶ DrainBuffer ◀── audio notification ──┘
//! ```
//!
//! [`ProgramCompiler`] turns fragment sources into linked programs against
//! one fixed vertex stage; [`Player`] runs the per-frame loop and releases
//! every GPU and device resource on all exit paths. The `headless` module
//! provides null providers for tests and dry runs.

mod audio;
mod compile;
mod error;
pub mod gfx;
pub mod headless;
mod player;
mod session;

pub use audio::{AudioError, AudioTrack, DrainBuffer};
pub use compile::{CompileError, ProgramCompiler, VERTEX_SHADER};
pub use error::EngineError;
pub use gfx::{
    AudioOutput, AudioSpec, FrameInput, Graphics, ProgramHandle, StageHandle, StageKind,
    WindowEvents,
};
pub use player::{build_timeline, FrameContext, FrameSink, Player, Playlist};
pub use session::{
    CommonData, ManualTimeSource, PlaybackClock, RuntimeFlags, Session, SystemTimeSource,
    TimeSource, WINDOW_H, WINDOW_W,
};

pub use timeline::{Breakpoints, Effect, FramePacer, Timeline, TimelineError};
