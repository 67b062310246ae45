use timeline::TimelineError;

use crate::compile::CompileError;

/// Top-level engine failures.
///
/// Whether any of these is fatal or merely degrades the session is the
/// caller's call, based on when it occurred; the engine itself only reports.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("effect {index} failed to build")]
    Effect {
        index: usize,
        #[source]
        source: CompileError,
    },
    #[error("effect {index} carries a null program handle")]
    NullProgram { index: usize },
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
