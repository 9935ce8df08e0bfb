//! Integration tests for the client session lifecycle.
//!
//! Drives the state machine the way the commands do, with completions fed
//! in by hand instead of a live backend: routing, upload round trips,
//! history re-activation, predict guards, and the stale-response check.

use model_bench_lib::routing::{self, ModelFormat, RoutingConfig};
use model_bench_lib::session::{ClientState, Effect, Event, Phase, SelectedModel, TestImage};
use model_bench_lib::summary::{summarize, Detection};
use std::path::PathBuf;

fn select(state: &mut ClientState, filename: &str) {
    let config = RoutingConfig::default();
    let (format, endpoint) = routing::resolve(filename, &config).expect(filename);
    state.apply(Event::ModelFileSelected(SelectedModel {
        path: PathBuf::from(format!("/models/{}", filename)),
        name: filename.to_string(),
        format,
        endpoint,
    }));
}

fn upload(state: &mut ClientState, model_id: &str, class_names: &[&str]) {
    let Some(Effect::StartUpload { epoch, filename, .. }) = state.apply(Event::UploadRequested)
    else {
        panic!("upload effect expected");
    };
    let format = ModelFormat::from_filename(&filename).unwrap();
    state.apply(Event::UploadSucceeded {
        epoch,
        model_id: model_id.to_string(),
        format,
        class_names: class_names.iter().map(|s| s.to_string()).collect(),
    });
}

fn pick_image(state: &mut ClientState, name: &str) {
    state.apply(Event::TestImageSelected(TestImage {
        path: PathBuf::from(format!("/images/{}", name)),
        name: name.to_string(),
    }));
}

fn det(cls: i64, conf: f64) -> Detection {
    Detection {
        cls,
        conf,
        extra: serde_json::Map::new(),
    }
}

// ── Routing through the lifecycle ───────────────────────────────────

#[test]
fn yolo_and_keras_files_route_to_their_backends() {
    let mut state = ClientState::default();

    select(&mut state, "best.pt");
    let Some(Effect::StartUpload { endpoint, .. }) = state.apply(Event::UploadRequested) else {
        panic!("upload effect expected");
    };
    assert_eq!(endpoint, "/api/yolo");

    select(&mut state, "classifier.keras");
    let Some(Effect::StartUpload { endpoint, .. }) = state.apply(Event::UploadRequested) else {
        panic!("upload effect expected");
    };
    assert_eq!(endpoint, "/api/keras");
}

#[test]
fn unsupported_file_never_enters_the_lifecycle() {
    let config = RoutingConfig::default();
    assert!(routing::resolve("model.zip", &config).is_none());
    assert!(routing::resolve("README", &config).is_none());
}

// ── Upload round trip and history ───────────────────────────────────

#[test]
fn upload_then_switch_then_reactivate_restores_session_exactly() {
    let mut state = ClientState::default();

    select(&mut state, "best.pt");
    upload(&mut state, "m1", &["x", "y"]);
    assert_eq!(state.phase(), Phase::Ready);

    select(&mut state, "net.h5");
    upload(&mut state, "m2", &["z"]);
    assert_eq!(state.history().len(), 2);

    // Back to m1 without any re-upload.
    state.apply(Event::HistoryActivated {
        model_id: "m1".to_string(),
    });
    let session = state.active_session().expect("m1 active");
    assert_eq!(session.model_id, "m1");
    assert_eq!(session.class_names, vec!["x", "y"]);
    assert_eq!(session.format, ModelFormat::YoloTorch);
    assert_eq!(session.endpoint, "/api/yolo");
}

#[test]
fn history_order_is_upload_order_newest_first() {
    let mut state = ClientState::default();
    select(&mut state, "one.pt");
    upload(&mut state, "m1", &[]);
    select(&mut state, "two.onnx");
    upload(&mut state, "m2", &[]);
    select(&mut state, "three.h5");
    upload(&mut state, "m3", &[]);

    state.apply(Event::HistoryActivated {
        model_id: "m1".to_string(),
    });

    let ids: Vec<String> = state
        .history()
        .iter()
        .map(|(s, _)| s.model_id.clone())
        .collect();
    assert_eq!(ids, vec!["m3", "m2", "m1"], "activation must not reorder");
}

#[test]
fn activation_clears_previous_prediction_display() {
    let mut state = ClientState::default();
    select(&mut state, "best.pt");
    upload(&mut state, "m1", &["cat"]);
    pick_image(&mut state, "cat.jpg");

    let Some(Effect::StartPredict { epoch, .. }) = state.apply(Event::PredictRequested) else {
        panic!("predict effect expected");
    };
    state.apply(Event::PredictSucceeded {
        epoch,
        image_base64: "QUJD".to_string(),
        detections: vec![det(0, 0.9)],
    });
    assert!(state.result().is_some());

    // Re-activating the very same model still resets the display.
    state.apply(Event::HistoryActivated {
        model_id: "m1".to_string(),
    });
    assert!(state.result().is_none());
}

// ── Predict guards ──────────────────────────────────────────────────

#[test]
fn predict_before_ready_dispatches_nothing() {
    let mut state = ClientState::default();
    pick_image(&mut state, "cat.jpg");
    assert!(state.apply(Event::PredictRequested).is_none());

    select(&mut state, "best.pt");
    // FileSelected but not uploaded: still a no-op.
    assert!(state.apply(Event::PredictRequested).is_none());
    assert_eq!(state.phase(), Phase::FileSelected);
}

#[test]
fn only_one_predict_in_flight_per_session() {
    let mut state = ClientState::default();
    select(&mut state, "best.pt");
    upload(&mut state, "m1", &[]);
    pick_image(&mut state, "cat.jpg");

    assert!(state.apply(Event::PredictRequested).is_some());
    assert!(state.apply(Event::PredictRequested).is_none());
}

#[test]
fn image_selection_during_upload_lets_the_upload_land() {
    let mut state = ClientState::default();
    select(&mut state, "best.pt");
    let Some(Effect::StartUpload { epoch, .. }) = state.apply(Event::UploadRequested) else {
        panic!("upload effect expected");
    };

    // The user picks the test image while the model is still uploading,
    // a perfectly ordinary sequence.
    pick_image(&mut state, "cat.jpg");

    state.apply(Event::UploadSucceeded {
        epoch,
        model_id: "m1".to_string(),
        format: ModelFormat::YoloTorch,
        class_names: vec!["cat".to_string()],
    });
    assert_eq!(state.phase(), Phase::Ready);
    assert_eq!(state.active_session().expect("session ready").model_id, "m1");

    // And the whole flow continues to a prediction.
    assert!(state.apply(Event::PredictRequested).is_some());
}

#[test]
fn stale_predict_completion_after_model_switch_is_dropped() {
    let mut state = ClientState::default();
    select(&mut state, "best.pt");
    upload(&mut state, "m1", &[]);
    pick_image(&mut state, "cat.jpg");

    let Some(Effect::StartPredict { epoch, .. }) = state.apply(Event::PredictRequested) else {
        panic!("predict effect expected");
    };

    // The user loads a different model while the request is out.
    select(&mut state, "net.h5");
    upload(&mut state, "m2", &[]);

    state.apply(Event::PredictSucceeded {
        epoch,
        image_base64: "QUJD".to_string(),
        detections: vec![det(0, 0.9)],
    });
    assert!(
        state.result().is_none(),
        "late result for the old model must not corrupt the new session"
    );
}

// ── Summary over a realistic detection set ──────────────────────────

#[test]
fn summary_matches_the_stats_card_numbers() {
    let class_names: Vec<String> = ["person", "bicycle", "car"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let detections = vec![
        det(2, 0.91),
        det(0, 0.88),
        det(2, 0.79),
        det(2, 0.65),
        det(7, 0.40), // index beyond the taxonomy
    ];

    let summary = summarize(&detections, &class_names);
    assert_eq!(summary.total, 5);

    let labels: Vec<&str> = summary.classes.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["car", "person", "Class 7"]);
    assert_eq!(summary.classes[0].count, 3);
    assert_eq!(summary.classes[0].percentage, 60.0);
    assert_eq!(summary.classes[1].percentage, 20.0);

    // mean(0.91, 0.88, 0.79, 0.65, 0.40) = 0.726 -> 72.6%
    assert_eq!(summary.mean_confidence_pct, Some(72.6));
}
