//! Backend routing — maps a model file to the backend that can serve it.
//!
//! Pure lookup logic: the file extension picks a model family, and the
//! routing configuration (read from the environment once at startup) picks
//! the base URL for that family. No network, no side effects.

use serde::Serialize;

/// Shared base-URL value that means "no explicit override configured".
/// Mirrors the nginx default used by the deployment configs.
pub const SHARED_API_PLACEHOLDER: &str = "/api";

/// Static fallback paths used when nothing is configured.
const DEFAULT_YOLO_BASE: &str = "/api/yolo";
const DEFAULT_KERAS_BASE: &str = "/api/keras";

/// Model artifact format, derived from the lowercased file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// `.pt` — PyTorch checkpoint
    YoloTorch,
    /// `.onnx` — ONNX export
    YoloOnnx,
    /// `.pth` — PyTorch state dict
    YoloWeights,
    /// `.h5` — legacy Keras HDF5
    KerasH5,
    /// `.keras` — native Keras archive
    KerasNative,
}

/// Backend family a format routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Yolo,
    Keras,
}

impl ModelFormat {
    /// Classify a bare extension (already stripped of the dot).
    /// Case-insensitive. Unknown or empty extensions yield `None`.
    pub fn from_extension(ext: &str) -> Option<ModelFormat> {
        match ext.to_ascii_lowercase().as_str() {
            "pt" => Some(ModelFormat::YoloTorch),
            "onnx" => Some(ModelFormat::YoloOnnx),
            "pth" => Some(ModelFormat::YoloWeights),
            "h5" => Some(ModelFormat::KerasH5),
            "keras" => Some(ModelFormat::KerasNative),
            _ => None,
        }
    }

    /// Classify a full filename by its extension.
    ///
    /// Everything after the last dot counts as the extension, so a
    /// dotfile like `.pt` routes as `pt`.
    pub fn from_filename(filename: &str) -> Option<ModelFormat> {
        let (_, ext) = filename.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        ModelFormat::from_extension(ext)
    }

    pub fn family(self) -> ModelFamily {
        match self {
            ModelFormat::YoloTorch | ModelFormat::YoloOnnx | ModelFormat::YoloWeights => {
                ModelFamily::Yolo
            }
            ModelFormat::KerasH5 | ModelFormat::KerasNative => ModelFamily::Keras,
        }
    }

    /// Extension string as the backends spell it (`pt`, `onnx`, ...).
    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::YoloTorch => "pt",
            ModelFormat::YoloOnnx => "onnx",
            ModelFormat::YoloWeights => "pth",
            ModelFormat::KerasH5 => "h5",
            ModelFormat::KerasNative => "keras",
        }
    }

    /// Uppercased tag shown next to the model name in the UI.
    pub fn label(self) -> String {
        self.extension().to_ascii_uppercase()
    }
}

/// Routing overrides, resolved from the environment at process start and
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct RoutingConfig {
    /// Base URL for the YOLO backend (`MODEL_BENCH_YOLO_API`).
    pub yolo_api: Option<String>,
    /// Base URL for the Keras backend (`MODEL_BENCH_KERAS_API`).
    pub keras_api: Option<String>,
    /// Single shared base URL when only one backend is deployed
    /// (`MODEL_BENCH_API_BASE`). Ignored when set to the placeholder.
    pub shared_api: Option<String>,
}

impl RoutingConfig {
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let config = Self {
            yolo_api: get("MODEL_BENCH_YOLO_API"),
            keras_api: get("MODEL_BENCH_KERAS_API"),
            shared_api: get("MODEL_BENCH_API_BASE"),
        };
        log::info!(
            "[ROUTE] Config: yolo={:?} keras={:?} shared={:?}",
            config.yolo_api,
            config.keras_api,
            config.shared_api
        );
        config
    }
}

/// Resolve the backend base URL for a model filename.
///
/// Precedence: family-specific override, then the shared override (unless
/// it is the `/api` placeholder), then the static per-family path. Returns
/// `None` for unsupported or missing extensions so callers can surface a
/// message instead of crashing.
pub fn resolve(filename: &str, config: &RoutingConfig) -> Option<(ModelFormat, String)> {
    let format = ModelFormat::from_filename(filename)?;

    let family_override = match format.family() {
        ModelFamily::Yolo => config.yolo_api.as_deref(),
        ModelFamily::Keras => config.keras_api.as_deref(),
    };
    if let Some(base) = family_override {
        return Some((format, base.to_string()));
    }

    if let Some(shared) = config.shared_api.as_deref() {
        if shared != SHARED_API_PLACEHOLDER {
            return Some((format, shared.to_string()));
        }
    }

    let base = match format.family() {
        ModelFamily::Yolo => DEFAULT_YOLO_BASE,
        ModelFamily::Keras => DEFAULT_KERAS_BASE,
    };
    Some((format, base.to_string()))
}
