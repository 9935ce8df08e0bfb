//! Model Bench — Tauri application entry point.
//!
//! The app shell that wires together:
//! - Backend routing (routing.rs)
//! - The client state machine (session/)
//! - The HTTP transport (backend.rs)
//! - Tauri command handlers for frontend communication
//!
//! Commands apply events to the state machine, execute the returned
//! network effect without holding the lock, then feed the completion back
//! in. Stale completions (the user switched model or image meanwhile) are
//! discarded by the reducer's epoch check.

pub mod backend;
pub mod preview;
pub mod routing;
pub mod session;
pub mod summary;

use backend::BackendClient;
use routing::{ModelFormat, RoutingConfig};
use serde::Serialize;
use session::{ClientState, Effect, Event, Phase, SelectedModel, TestImage};
use std::path::{Path, PathBuf};
use summary::DetectionSummary;
use tokio::sync::Mutex;

/// Global app state, managed by Tauri. The `ClientState` lock is never
/// held across a network await.
pub struct AppState {
    routing: RoutingConfig,
    client: BackendClient,
    state: Mutex<ClientState>,
}

impl AppState {
    pub fn new(routing: RoutingConfig) -> Self {
        Self {
            routing,
            client: BackendClient::new(),
            state: Mutex::new(ClientState::default()),
        }
    }
}

// ── View structs returned to the frontend ───────────────────────────

/// A chosen model file, after routing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelChoiceView {
    pub name: String,
    pub format_label: String,
    pub endpoint: String,
}

/// A Ready session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub model_id: String,
    pub name: String,
    pub format_label: String,
    pub class_names: Vec<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryView {
    pub model_id: String,
    pub name: String,
    pub format_label: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestImageView {
    pub name: String,
    /// `data:{mime};base64,...`, ready for an `<img>` src.
    pub preview: String,
}

/// A completed prediction: annotated image (base64 as received), raw
/// detections for drawing, and the per-class summary for the stats card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    pub image_base64: String,
    pub detections: Vec<summary::Detection>,
    pub summary: DetectionSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub phase: &'static str,
    pub session: Option<SessionView>,
    pub test_image_name: Option<String>,
    pub has_result: bool,
}

fn session_view(session: &session::ModelSession) -> SessionView {
    SessionView {
        model_id: session.model_id.clone(),
        name: session.name.clone(),
        format_label: session.format.label(),
        class_names: session.class_names.clone(),
        endpoint: session.endpoint.clone(),
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Empty => "empty",
        Phase::FileSelected => "file_selected",
        Phase::Uploading => "uploading",
        Phase::Ready => "ready",
    }
}

fn file_name_of(path: &Path) -> Result<String, String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| "Invalid file path".to_string())
}

// ── Commands ────────────────────────────────────────────────────────

/// Tauri command: a model file was picked. Routes it by extension; an
/// unsupported type is rejected here, before any network call.
#[tauri::command]
pub async fn select_model_file(
    state: tauri::State<'_, AppState>,
    path: String,
) -> Result<ModelChoiceView, String> {
    let path = PathBuf::from(path);
    let name = file_name_of(&path)?;

    let Some((format, endpoint)) = routing::resolve(&name, &state.routing) else {
        log::warn!("[ROUTE] Unsupported model file: {}", name);
        return Err(format!("Unsupported model file type: {}", name));
    };
    log::info!("[ROUTE] {} ({}) -> {}", name, format.label(), endpoint);

    let view = ModelChoiceView {
        name: name.clone(),
        format_label: format.label(),
        endpoint: endpoint.clone(),
    };

    let mut client = state.state.lock().await;
    client.apply(Event::ModelFileSelected(SelectedModel {
        path,
        name,
        format,
        endpoint,
    }));
    Ok(view)
}

/// Tauri command: upload the selected model file to its backend.
///
/// Returns the Ready session on success; `Ok(None)` when the completion
/// arrived stale (the user switched models mid-upload) and was ignored.
/// On failure the lifecycle reverts to the selected file so the user can
/// retry.
#[tauri::command]
pub async fn upload_model(
    state: tauri::State<'_, AppState>,
) -> Result<Option<SessionView>, String> {
    let effect = {
        let mut client = state.state.lock().await;
        client.apply(Event::UploadRequested)
    };
    let Some(Effect::StartUpload {
        endpoint,
        filename,
        path,
        epoch,
    }) = effect
    else {
        return Err("No model file selected".to_string());
    };

    let outcome = match tokio::fs::read(&path).await {
        Ok(bytes) => state.client.upload_model(&endpoint, &filename, bytes).await,
        Err(e) => {
            let mut client = state.state.lock().await;
            client.apply(Event::UploadFailed { epoch });
            return Err(format!("Could not read {}: {}", filename, e));
        }
    };

    match outcome {
        Ok(response) => {
            // Backend-declared format wins over the extension sniff.
            let format = response
                .model_format
                .as_deref()
                .and_then(ModelFormat::from_extension)
                .or_else(|| ModelFormat::from_filename(&filename))
                .ok_or_else(|| format!("Unsupported model file type: {}", filename))?;

            let mut client = state.state.lock().await;
            client.apply(Event::UploadSucceeded {
                epoch,
                model_id: response.model_id.clone(),
                format,
                class_names: response.class_names.unwrap_or_default(),
            });

            match client.active_session() {
                Some(session) if session.model_id == response.model_id => {
                    Ok(Some(session_view(session)))
                }
                // Superseded while the request was in flight; ignored, not
                // an error.
                _ => Ok(None),
            }
        }
        Err(e) => {
            let mut client = state.state.lock().await;
            client.apply(Event::UploadFailed { epoch });
            Err(e.to_string())
        }
    }
}

/// Tauri command: a test image was picked. Validates it decodes and
/// returns a preview data URL; any previous prediction display is cleared.
#[tauri::command]
pub async fn select_test_image(
    state: tauri::State<'_, AppState>,
    path: String,
) -> Result<TestImageView, String> {
    let path = PathBuf::from(path);
    let name = file_name_of(&path)?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Could not read {}: {}", name, e))?;
    let preview = preview::image_preview_data_url(&bytes).map_err(|e| e.to_string())?;

    let mut client = state.state.lock().await;
    client.apply(Event::TestImageSelected(TestImage {
        path,
        name: name.clone(),
    }));
    log::info!("[PREDICT] Test image selected: {}", name);
    Ok(TestImageView { name, preview })
}

/// Tauri command: run inference with the active session and test image.
///
/// `Ok(None)` means a precondition was unmet (no image, no Ready session,
/// or a prediction already in flight) or the result arrived stale; both
/// are silent no-ops, not errors.
#[tauri::command]
pub async fn run_inference(
    state: tauri::State<'_, AppState>,
) -> Result<Option<PredictionView>, String> {
    let (effect, class_names) = {
        let mut client = state.state.lock().await;
        let effect = client.apply(Event::PredictRequested);
        let class_names = client
            .active_session()
            .map(|s| s.class_names.clone())
            .unwrap_or_default();
        (effect, class_names)
    };
    let Some(Effect::StartPredict {
        endpoint,
        model_id,
        image_filename,
        image_path,
        epoch,
    }) = effect
    else {
        return Ok(None);
    };

    let outcome = match tokio::fs::read(&image_path).await {
        Ok(bytes) => {
            state
                .client
                .predict(&endpoint, &model_id, &image_filename, bytes)
                .await
        }
        Err(e) => {
            let mut client = state.state.lock().await;
            client.apply(Event::PredictFailed { epoch });
            return Err(format!("Could not read {}: {}", image_filename, e));
        }
    };

    match outcome {
        Ok(response) => {
            let detections = response.detections.unwrap_or_default();
            let mut client = state.state.lock().await;
            client.apply(Event::PredictSucceeded {
                epoch,
                image_base64: response.image.clone(),
                detections: detections.clone(),
            });
            if client.predict_epoch() != epoch {
                // Superseded while the request was in flight.
                return Ok(None);
            }
            let summary = summary::summarize(&detections, &class_names);
            Ok(Some(PredictionView {
                image_base64: response.image,
                detections,
                summary,
            }))
        }
        Err(e) => {
            let mut client = state.state.lock().await;
            client.apply(Event::PredictFailed { epoch });
            Err(e.to_string())
        }
    }
}

/// Tauri command: re-activate a model from history. No network call; the
/// stored session (class names, endpoint) is restored as-is.
#[tauri::command]
pub async fn activate_model(
    state: tauri::State<'_, AppState>,
    model_id: String,
) -> Result<SessionView, String> {
    let mut client = state.state.lock().await;
    client.apply(Event::HistoryActivated {
        model_id: model_id.clone(),
    });
    match client.active_session() {
        Some(session) if session.model_id == model_id => Ok(session_view(session)),
        _ => Err(format!("Unknown model id: {}", model_id)),
    }
}

/// Tauri command: history entries in render order (newest upload first).
#[tauri::command]
pub async fn get_history(
    state: tauri::State<'_, AppState>,
) -> Result<Vec<HistoryEntryView>, String> {
    let client = state.state.lock().await;
    Ok(client
        .history()
        .iter()
        .map(|(session, active)| HistoryEntryView {
            model_id: session.model_id.clone(),
            name: session.name.clone(),
            format_label: session.format.label(),
            active,
        })
        .collect())
}

/// Tauri command: snapshot of the client state for initial render.
#[tauri::command]
pub async fn get_state(state: tauri::State<'_, AppState>) -> Result<StateView, String> {
    let client = state.state.lock().await;
    Ok(StateView {
        phase: phase_name(client.phase()),
        session: client.active_session().map(session_view),
        test_image_name: client.test_image().map(|i| i.name.clone()),
        has_result: client.result().is_some(),
    })
}

/// Entry point — called by the Tauri runtime.
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let routing = RoutingConfig::from_env();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(AppState::new(routing))
        .invoke_handler(tauri::generate_handler![
            select_model_file,
            upload_model,
            select_test_image,
            run_inference,
            activate_model,
            get_history,
            get_state
        ])
        .setup(|_app| {
            log::info!("Model Bench starting up");
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("Error running Model Bench");
}
