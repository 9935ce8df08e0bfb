//! Client state machine — pure functional core.
//!
//! Every user action and every completed request is an [`Event`]; applying
//! one advances the state and may yield an [`Effect`] (a network intent the
//! command layer executes). No I/O happens in here, which is what makes
//! the lifecycle testable without a backend.
//!
//! Stale-response guard: each dispatched request carries the epoch it was
//! born under, and completion events whose epoch no longer matches are
//! dropped on the floor. Two counters, because the identities differ:
//! the session epoch (bumped when the model selection changes) guards
//! upload completions, and the predict epoch (bumped additionally when
//! the test image changes) guards predict completions. Picking a new test
//! image therefore never invalidates an upload already in flight.

use super::{ModelHistory, ModelSession};
use crate::routing::ModelFormat;
use crate::summary::Detection;
use std::path::PathBuf;

/// Where the client is in the model-loading lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing selected yet.
    #[default]
    Empty,
    /// A supported model file is chosen and routed, not yet uploaded.
    FileSelected,
    /// Upload in flight; no second upload may start.
    Uploading,
    /// Backend assigned a model id; predictions may run.
    Ready,
}

/// A chosen model file after routing succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedModel {
    pub path: PathBuf,
    pub name: String,
    pub format: ModelFormat,
    pub endpoint: String,
}

/// The chosen test image.
#[derive(Debug, Clone, PartialEq)]
pub struct TestImage {
    pub path: PathBuf,
    pub name: String,
}

/// A completed prediction as displayed: annotated image plus the raw
/// detection list. Replaced atomically, never partially updated.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub image_base64: String,
    pub detections: Vec<Detection>,
}

/// Everything that can happen to the client.
#[derive(Debug, Clone)]
pub enum Event {
    /// A supported model file was chosen (routing already resolved).
    ModelFileSelected(SelectedModel),
    /// The user confirmed the upload.
    UploadRequested,
    /// Backend accepted the upload. `format` is the backend-declared
    /// format when it sent one, else the client's extension sniff.
    UploadSucceeded {
        epoch: u64,
        model_id: String,
        format: ModelFormat,
        class_names: Vec<String>,
    },
    UploadFailed {
        epoch: u64,
    },
    TestImageSelected(TestImage),
    /// A history entry was clicked.
    HistoryActivated {
        model_id: String,
    },
    /// The user pressed Run Inference.
    PredictRequested,
    PredictSucceeded {
        epoch: u64,
        image_base64: String,
        detections: Vec<Detection>,
    },
    PredictFailed {
        epoch: u64,
    },
}

/// Network intent produced by a transition, for the command layer to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartUpload {
        endpoint: String,
        filename: String,
        path: PathBuf,
        epoch: u64,
    },
    StartPredict {
        endpoint: String,
        model_id: String,
        image_filename: String,
        image_path: PathBuf,
        epoch: u64,
    },
}

/// The single client state, owned by the command layer.
#[derive(Debug, Default)]
pub struct ClientState {
    phase: Phase,
    selected: Option<SelectedModel>,
    history: ModelHistory,
    test_image: Option<TestImage>,
    result: Option<PredictionResult>,
    predict_in_flight: bool,
    session_epoch: u64,
    predict_epoch: u64,
}

impl ClientState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The session predictions run against (Ready or re-activated).
    pub fn active_session(&self) -> Option<&ModelSession> {
        self.history.current()
    }

    pub fn selected(&self) -> Option<&SelectedModel> {
        self.selected.as_ref()
    }

    pub fn test_image(&self) -> Option<&TestImage> {
        self.test_image.as_ref()
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &ModelHistory {
        &self.history
    }

    pub fn predict_in_flight(&self) -> bool {
        self.predict_in_flight
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn predict_epoch(&self) -> u64 {
        self.predict_epoch
    }

    /// Advance the state machine. Returns the network intent to execute,
    /// if the event calls for one. Invalid or stale events are no-ops.
    pub fn apply(&mut self, event: Event) -> Option<Effect> {
        match event {
            Event::ModelFileSelected(selected) => {
                self.selected = Some(selected);
                self.phase = Phase::FileSelected;
                // The previous Ready session stays in history; only the
                // current pointer and the display are reset.
                self.history.clear_current();
                self.supersede_session();
                None
            }

            Event::UploadRequested => {
                if self.phase != Phase::FileSelected {
                    return None;
                }
                let selected = self.selected.as_ref()?;
                self.phase = Phase::Uploading;
                Some(Effect::StartUpload {
                    endpoint: selected.endpoint.clone(),
                    filename: selected.name.clone(),
                    path: selected.path.clone(),
                    epoch: self.session_epoch,
                })
            }

            Event::UploadSucceeded {
                epoch,
                model_id,
                format,
                class_names,
            } => {
                if epoch != self.session_epoch {
                    log::warn!("[UPLOAD] Stale completion discarded (model_id={})", model_id);
                    return None;
                }
                let selected = self.selected.as_ref()?;
                self.history.append(ModelSession {
                    model_id,
                    name: selected.name.clone(),
                    format,
                    class_names,
                    endpoint: selected.endpoint.clone(),
                });
                self.phase = Phase::Ready;
                self.result = None;
                None
            }

            Event::UploadFailed { epoch } => {
                if epoch != self.session_epoch {
                    log::warn!("[UPLOAD] Stale failure discarded");
                    return None;
                }
                // Revert; no partial session was created.
                if self.phase == Phase::Uploading {
                    self.phase = Phase::FileSelected;
                }
                None
            }

            Event::TestImageSelected(image) => {
                self.test_image = Some(image);
                // Image identity changed, session identity did not: an
                // upload in flight must still land, only an outstanding
                // predict is invalidated.
                self.supersede_prediction();
                None
            }

            Event::HistoryActivated { model_id } => {
                if self.history.activate(&model_id).is_none() {
                    log::warn!("[HISTORY] Unknown model id: {}", model_id);
                    return None;
                }
                log::info!("[HISTORY] Activated {}", model_id);
                self.phase = Phase::Ready;
                self.selected = None;
                self.supersede_session();
                None
            }

            Event::PredictRequested => {
                // Preconditions are a silent no-op, not an error: the
                // trigger is disabled until they hold.
                if self.predict_in_flight || self.phase != Phase::Ready {
                    return None;
                }
                let session = self.history.current()?;
                let image = self.test_image.as_ref()?;
                self.predict_in_flight = true;
                Some(Effect::StartPredict {
                    endpoint: session.endpoint.clone(),
                    model_id: session.model_id.clone(),
                    image_filename: image.name.clone(),
                    image_path: image.path.clone(),
                    epoch: self.predict_epoch,
                })
            }

            Event::PredictSucceeded {
                epoch,
                image_base64,
                detections,
            } => {
                if epoch != self.predict_epoch {
                    log::warn!("[PREDICT] Stale result discarded");
                    return None;
                }
                self.predict_in_flight = false;
                self.result = Some(PredictionResult {
                    image_base64,
                    detections,
                });
                None
            }

            Event::PredictFailed { epoch } => {
                if epoch != self.predict_epoch {
                    log::warn!("[PREDICT] Stale failure discarded");
                    return None;
                }
                self.predict_in_flight = false;
                // The input preview stays visible; only results clear.
                self.result = None;
                None
            }
        }
    }

    /// Session identity changed: late completions of either kind are
    /// discarded and the display clears.
    fn supersede_session(&mut self) {
        self.session_epoch += 1;
        self.supersede_prediction();
    }

    /// Image identity changed: only an outstanding predict is invalidated.
    fn supersede_prediction(&mut self) {
        self.predict_epoch += 1;
        self.predict_in_flight = false;
        self.result = None;
    }
}
