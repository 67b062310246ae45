//! Provider traits for the external collaborators.
//!
//! The engine never talks to a real window, GPU, or sound card directly; it
//! drives these seams and leaves device setup to the embedding application.
//! `headless` ships null implementations for tests and dry runs.

use std::sync::Arc;

use crate::audio::{AudioError, DrainBuffer};

/// Shader stage kinds the compiler creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

/// Opaque handle to a shader stage object owned by the graphics provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageHandle(pub u32);

/// Opaque handle to a linked program.
///
/// Id 0 is the null sentinel: a failed compile or link yields [`NULL`], and
/// binding [`NULL`] unbinds the current program.
///
/// [`NULL`]: ProgramHandle::NULL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

impl ProgramHandle {
    pub const NULL: ProgramHandle = ProgramHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for ProgramHandle {
    fn default() -> Self {
        ProgramHandle::NULL
    }
}

/// OpenGL-family context surface the engine needs.
///
/// Uniform setters target the currently bound program, mirroring how the
/// underlying API resolves uniform locations. All calls happen on the thread
/// owning the context; nothing here is invoked concurrently with itself.
pub trait Graphics {
    /// Creates a shader stage object; `None` when the context refuses.
    fn create_stage(&mut self, kind: StageKind) -> Option<StageHandle>;
    fn stage_source(&mut self, stage: StageHandle, source: &str);
    /// Compiles the staged source, returning the compile status.
    fn compile_stage(&mut self, stage: StageHandle) -> bool;
    /// Fetches the full info log for a stage, bounded by its reported length.
    fn stage_log(&mut self, stage: StageHandle) -> String;
    fn delete_stage(&mut self, stage: StageHandle);

    fn create_program(&mut self) -> Option<ProgramHandle>;
    fn attach_stage(&mut self, program: ProgramHandle, stage: StageHandle);
    /// Links the attached stages, returning the link status.
    fn link_program(&mut self, program: ProgramHandle) -> bool;
    fn program_log(&mut self, program: ProgramHandle) -> String;
    fn delete_program(&mut self, program: ProgramHandle);
    /// Binds `program` as current; [`ProgramHandle::NULL`] unbinds.
    fn use_program(&mut self, program: ProgramHandle);

    fn set_uniform_f32(&mut self, name: &str, value: f32);
    fn set_uniform_vec2(&mut self, name: &str, value: [f32; 2]);

    fn clear(&mut self);
    /// Issues the fixed full-screen quad draw.
    fn draw_fullscreen(&mut self);
    /// Swaps buffers; may block on vertical sync when the provider enables it.
    fn present(&mut self);
}

/// Input observed during one frame's event poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Window close, escape, or end was seen.
    pub quit: bool,
    /// Space or `p` was pressed this frame.
    pub toggle_pause: bool,
}

impl FrameInput {
    pub const QUIT: FrameInput = FrameInput {
        quit: true,
        toggle_pause: false,
    };
    pub const TOGGLE_PAUSE: FrameInput = FrameInput {
        quit: false,
        toggle_pause: true,
    };
}

/// Windowing/input provider: close and key events collapsed to the two
/// signals the controller acts on.
pub trait WindowEvents {
    fn poll(&mut self) -> FrameInput;
}

/// Format of the decoded PCM track handed to the audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpec {
    pub frequency: u32,
    pub channels: u8,
}

impl Default for AudioSpec {
    fn default() -> Self {
        Self {
            frequency: 44_100,
            channels: 2,
        }
    }
}

/// Pull-based audio device provider.
///
/// After a successful `open` the device invokes [`DrainBuffer::drain`] on its
/// own schedule, possibly from another execution context; the buffer is the
/// only state shared across that boundary. A failed open is reported, never
/// propagated as a panic: the controller downgrades to a silent session.
pub trait AudioOutput {
    fn open(&mut self, spec: AudioSpec, buffer: Arc<DrainBuffer>) -> Result<(), AudioError>;
    fn close(&mut self);
}
