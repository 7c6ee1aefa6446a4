//! Stage composition.

use std::fmt;
use std::sync::Arc;

use melchett_core::{Context, Next, Stage, StageResult, Terminal};

/// An ordered stage list around a terminal, resolved once per client.
///
/// Running it threads one [`Context`] through every stage, outermost first,
/// down to the terminal and back out again.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn Stage>]>,
    terminal: Arc<dyn Terminal>,
}

impl Pipeline {
    /// Composes `stages` (outermost first) around `terminal`.
    pub fn new(stages: Vec<Arc<dyn Stage>>, terminal: Arc<dyn Terminal>) -> Self {
        Self {
            stages: stages.into(),
            terminal,
        }
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline only consists of the terminal.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the whole chain on `ctx`.
    pub async fn run(&self, ctx: &mut Context) -> StageResult {
        Next::new(&self.stages, self.terminal.as_ref()).run(ctx).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}
