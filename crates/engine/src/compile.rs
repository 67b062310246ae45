//! Fragment program compilation against the fixed vertex stage.

use crate::gfx::{Graphics, ProgramHandle, StageHandle, StageKind};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("graphics context refused to create a {0:?} stage object")]
    CreateStage(StageKind),
    #[error("fixed vertex stage failed to compile")]
    Vertex { log: String },
    #[error("fragment stage failed to compile")]
    Fragment { log: String },
    #[error("graphics context refused to create a program object")]
    CreateProgram,
    #[error("program failed to link")]
    Link { log: String },
}

/// Minimal pass-through vertex shader shared by every effect program.
pub const VERTEX_SHADER: &str = "#version 330\n\
in vec2 pos;\n\
void main() {\n\
    gl_Position = vec4(pos.x, pos.y, 0.0, 1.0);\n\
}\n";

/// Compiles fragment sources into full programs.
///
/// The vertex stage is compiled once at construction and reused by every
/// link; without it no effect can ever render, so a vertex compile failure is
/// fatal to setup. An optional shared preamble is concatenated ahead of each
/// fragment source and the combined text compiled as a single unit — the
/// preamble is never validated on its own.
#[derive(Debug)]
pub struct ProgramCompiler {
    vertex: StageHandle,
    preamble: Option<String>,
}

impl ProgramCompiler {
    pub fn new<G: Graphics>(gfx: &mut G) -> Result<Self, CompileError> {
        let vertex = gfx
            .create_stage(StageKind::Vertex)
            .ok_or(CompileError::CreateStage(StageKind::Vertex))?;
        gfx.stage_source(vertex, VERTEX_SHADER);
        if !gfx.compile_stage(vertex) {
            let log = gfx.stage_log(vertex);
            tracing::error!(%log, "fixed vertex stage failed to compile");
            gfx.delete_stage(vertex);
            return Err(CompileError::Vertex { log });
        }
        Ok(Self {
            vertex,
            preamble: None,
        })
    }

    /// Sets the shared preamble injected before every fragment source.
    pub fn set_preamble(&mut self, source: impl Into<String>) {
        self.preamble = Some(source.into());
    }

    pub fn clear_preamble(&mut self) {
        self.preamble = None;
    }

    /// Compiles `fragment_src` and links it with the fixed vertex stage.
    ///
    /// The fragment stage object is transient: it is deleted on every path,
    /// success included — the linked program is the durable artifact.
    /// Compile and link diagnostics go to the error log verbatim; they are
    /// advisory and never parsed.
    pub fn compile<G: Graphics>(
        &self,
        gfx: &mut G,
        fragment_src: &str,
    ) -> Result<ProgramHandle, CompileError> {
        let stage = gfx
            .create_stage(StageKind::Fragment)
            .ok_or(CompileError::CreateStage(StageKind::Fragment))?;
        let result = self.link_with_fragment(gfx, stage, fragment_src);
        gfx.delete_stage(stage);
        result
    }

    fn link_with_fragment<G: Graphics>(
        &self,
        gfx: &mut G,
        stage: StageHandle,
        fragment_src: &str,
    ) -> Result<ProgramHandle, CompileError> {
        let combined = self.combined_source(fragment_src);
        gfx.stage_source(stage, &combined);
        if !gfx.compile_stage(stage) {
            let log = gfx.stage_log(stage);
            tracing::error!(%log, "fragment stage failed to compile");
            return Err(CompileError::Fragment { log });
        }

        let program = gfx.create_program().ok_or(CompileError::CreateProgram)?;
        gfx.attach_stage(program, self.vertex);
        gfx.attach_stage(program, stage);
        if !gfx.link_program(program) {
            let log = gfx.program_log(program);
            tracing::error!(%log, "program failed to link");
            gfx.delete_program(program);
            return Err(CompileError::Link { log });
        }
        Ok(program)
    }

    fn combined_source(&self, fragment_src: &str) -> String {
        match &self.preamble {
            Some(preamble) => {
                let mut combined =
                    String::with_capacity(preamble.len() + fragment_src.len());
                combined.push_str(preamble);
                combined.push_str(fragment_src);
                combined
            }
            None => fragment_src.to_owned(),
        }
    }

    /// Deletes the fixed vertex stage. Call when the compiler is retired.
    pub fn release<G: Graphics>(self, gfx: &mut G) {
        gfx.delete_stage(self.vertex);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::NullGraphics;

    const FRAGMENT: &str = "void main() { gl_FragColor = vec4(1.0); }";

    #[test]
    fn successful_compile_deletes_the_fragment_stage() {
        let mut gfx = NullGraphics::new();
        let compiler = ProgramCompiler::new(&mut gfx).unwrap();
        let program = compiler.compile(&mut gfx, FRAGMENT).unwrap();
        assert!(!program.is_null());
        // Only the fixed vertex stage survives a successful link.
        assert_eq!(gfx.live_stages(), 1);
        assert_eq!(gfx.live_programs(), 1);
    }

    #[test]
    fn failed_compile_surfaces_a_diagnostic_and_cleans_up() {
        let mut gfx = NullGraphics::new();
        let compiler = ProgramCompiler::new(&mut gfx).unwrap();
        let err = compiler.compile(&mut gfx, "").unwrap_err();
        match err {
            CompileError::Fragment { log } => assert!(!log.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gfx.live_stages(), 1);
        assert_eq!(gfx.live_programs(), 0);
    }

    #[test]
    fn preamble_is_prepended_to_the_fragment_source() {
        let mut gfx = NullGraphics::new();
        let mut compiler = ProgramCompiler::new(&mut gfx).unwrap();
        compiler.set_preamble("#define TAU 6.28318\n");
        let program = compiler.compile(&mut gfx, FRAGMENT).unwrap();
        let source = gfx.program_fragment_source(program).unwrap();
        assert!(source.starts_with("#define TAU"));
        assert!(source.ends_with(FRAGMENT));
    }

    #[test]
    fn release_deletes_the_vertex_stage() {
        let mut gfx = NullGraphics::new();
        let compiler = ProgramCompiler::new(&mut gfx).unwrap();
        compiler.release(&mut gfx);
        assert_eq!(gfx.live_stages(), 0);
    }
}
