use bevy::prelude::*;
use tokio::runtime::Runtime;

/// Tokio runtime the tile loads run on
#[derive(Resource)]
pub struct TokioRuntime(pub Runtime);

impl TokioRuntime {
    pub fn new() -> Self {
        Self(Runtime::new().expect("Failed to create Tokio runtime"))
    }

    pub fn handle(&self) -> tokio::runtime::Handle {
        self.0.handle().clone()
    }
}

impl Default for TokioRuntime {
    fn default() -> Self {
        Self::new()
    }
}
