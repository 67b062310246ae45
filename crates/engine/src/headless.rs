//! Null provider implementations.
//!
//! These back the CLI's manifest check and timing dry-run paths and double
//! as test fixtures. `NullGraphics` models just enough of a context to
//! exercise the compile/link/cleanup protocol: it accepts any non-empty
//! source, tracks object lifetimes, and remembers what was bound and drawn.
//! Clones share one underlying context, so a caller can keep a probe handle
//! while the player owns the "device".

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::{AudioError, DrainBuffer};
use crate::gfx::{
    AudioOutput, AudioSpec, FrameInput, Graphics, ProgramHandle, StageHandle, StageKind,
    WindowEvents,
};

#[derive(Debug)]
struct StageRecord {
    kind: StageKind,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    fragment_source: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    stages: HashMap<StageHandle, StageRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    bound: ProgramHandle,
    bound_history: Vec<ProgramHandle>,
    frames_presented: u64,
}

/// Graphics provider that renders nothing.
///
/// Compilation fails only for blank sources, which gives tests and the CLI
/// check mode a deterministic failure path with a non-empty diagnostic.
#[derive(Debug, Default, Clone)]
pub struct NullGraphics {
    state: Arc<Mutex<State>>,
}

impl NullGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_stages(&self) -> usize {
        self.state.lock().stages.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.lock().programs.len()
    }

    pub fn bound_program(&self) -> ProgramHandle {
        self.state.lock().bound
    }

    /// Every `use_program` call in order, including the final unbind.
    pub fn bound_history(&self) -> Vec<ProgramHandle> {
        self.state.lock().bound_history.clone()
    }

    pub fn frames_presented(&self) -> u64 {
        self.state.lock().frames_presented
    }

    /// Fragment source captured when the stage was attached to `program`.
    pub fn program_fragment_source(&self, program: ProgramHandle) -> Option<String> {
        self.state
            .lock()
            .programs
            .get(&program)?
            .fragment_source
            .clone()
    }
}

impl Graphics for NullGraphics {
    fn create_stage(&mut self, kind: StageKind) -> Option<StageHandle> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = StageHandle(state.next_id);
        state.stages.insert(
            handle,
            StageRecord {
                kind,
                source: String::new(),
                compiled: false,
            },
        );
        Some(handle)
    }

    fn stage_source(&mut self, stage: StageHandle, source: &str) {
        if let Some(record) = self.state.lock().stages.get_mut(&stage) {
            record.source = source.to_owned();
        }
    }

    fn compile_stage(&mut self, stage: StageHandle) -> bool {
        match self.state.lock().stages.get_mut(&stage) {
            Some(record) => {
                record.compiled = !record.source.trim().is_empty();
                record.compiled
            }
            None => false,
        }
    }

    fn stage_log(&mut self, stage: StageHandle) -> String {
        match self.state.lock().stages.get(&stage) {
            Some(record) if !record.compiled => {
                format!("{:?} stage: expected a non-empty source", record.kind)
            }
            _ => String::new(),
        }
    }

    fn delete_stage(&mut self, stage: StageHandle) {
        self.state.lock().stages.remove(&stage);
    }

    fn create_program(&mut self) -> Option<ProgramHandle> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = ProgramHandle(state.next_id);
        state.programs.insert(handle, ProgramRecord::default());
        Some(handle)
    }

    fn attach_stage(&mut self, program: ProgramHandle, stage: StageHandle) {
        let mut state = self.state.lock();
        let fragment_source = match state.stages.get(&stage) {
            Some(record) if record.kind == StageKind::Fragment => record.source.clone(),
            _ => return,
        };
        if let Some(record) = state.programs.get_mut(&program) {
            record.fragment_source = Some(fragment_source);
        }
    }

    fn link_program(&mut self, program: ProgramHandle) -> bool {
        self.state.lock().programs.contains_key(&program)
    }

    fn program_log(&mut self, _program: ProgramHandle) -> String {
        String::new()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.state.lock().programs.remove(&program);
    }

    fn use_program(&mut self, program: ProgramHandle) {
        let mut state = self.state.lock();
        state.bound = program;
        state.bound_history.push(program);
    }

    fn set_uniform_f32(&mut self, _name: &str, _value: f32) {}

    fn set_uniform_vec2(&mut self, _name: &str, _value: [f32; 2]) {}

    fn clear(&mut self) {}

    fn draw_fullscreen(&mut self) {}

    fn present(&mut self) {
        self.state.lock().frames_presented += 1;
    }
}

/// Window provider that replays a scripted event sequence, then reports
/// nothing. An empty script is a fully inert window.
#[derive(Debug, Default)]
pub struct NullWindow {
    script: VecDeque<FrameInput>,
}

impl NullWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(script: impl IntoIterator<Item = FrameInput>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl WindowEvents for NullWindow {
    fn poll(&mut self) -> FrameInput {
        self.script.pop_front().unwrap_or_default()
    }
}

/// Audio provider with no device behind it.
///
/// `open` either accepts the buffer and never drains it, or fails on request
/// so the degraded silent path can be exercised.
#[derive(Debug, Default)]
pub struct NullAudioOutput {
    fail_open: bool,
    opened: Option<Arc<DrainBuffer>>,
}

impl NullAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            opened: None,
        }
    }

    pub fn buffer(&self) -> Option<&Arc<DrainBuffer>> {
        self.opened.as_ref()
    }
}

impl AudioOutput for NullAudioOutput {
    fn open(&mut self, _spec: AudioSpec, buffer: Arc<DrainBuffer>) -> Result<(), AudioError> {
        if self.fail_open {
            return Err(AudioError::DeviceOpen(
                "no audio backend compiled in".into(),
            ));
        }
        self.opened = Some(buffer);
        Ok(())
    }

    fn close(&mut self) {
        self.opened = None;
    }
}
