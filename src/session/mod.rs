//! Model session domain — the lifecycle of loaded models and the client
//! state machine that drives uploads and predictions.
//!
//! External code goes through `ClientState` and its events; the command
//! layer owns the only instance (behind a Tauri-managed lock).

mod history;
mod state;

pub use history::{ModelHistory, HISTORY_CAP};
pub use state::{ClientState, Effect, Event, Phase, PredictionResult, SelectedModel, TestImage};

use crate::routing::ModelFormat;

/// One loaded model as the client knows it: backend-assigned identity,
/// taxonomy, and the endpoint it was uploaded to.
///
/// A session only exists once the backend has assigned `model_id`;
/// prediction requires one.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSession {
    pub model_id: String,
    /// Original filename, shown in the history list.
    pub name: String,
    pub format: ModelFormat,
    /// Class labels indexed by class id, as declared by the backend.
    pub class_names: Vec<String>,
    /// Resolved backend base URL this model lives on.
    pub endpoint: String,
}
