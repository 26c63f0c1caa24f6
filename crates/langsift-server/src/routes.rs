//! HTTP routes and handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use langsift_core::{Error, PredictionResult};
use langsift_serve::{
    InferenceService, LoadedModel, ModelCache, ModelDescriptor, Rebuilder, RegistryStore,
    UploadPolicy, UploadRejection,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Model catalogue
    pub store: Arc<RegistryStore>,

    /// Rebuilds artifacts from the corpus
    pub rebuilder: Arc<Rebuilder>,

    /// Memoized model loader
    pub cache: Arc<ModelCache>,

    /// Screening rules for uploaded files
    pub upload_policy: UploadPolicy,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    /// Wire up the lifecycle components from configuration
    pub fn new(config: ServerConfig, metrics_handle: PrometheusHandle) -> Self {
        let store = Arc::new(config.registry_store());
        let rebuilder = Arc::new(Rebuilder::new(
            config.corpus_source(),
            Arc::clone(&store),
            config.rebuild.clone(),
        ));
        let cache = Arc::new(ModelCache::new(Arc::clone(&store), Arc::clone(&rebuilder)));
        let upload_policy = config.upload_policy();
        Self {
            config: Arc::new(config),
            store,
            rebuilder,
            cache,
            upload_policy,
            metrics_handle,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/v1/models", get(list_models))
        .route("/v1/models/:id", delete(remove_model))
        .route("/v1/predict", post(predict))
        .route("/v1/predict/file", post(predict_file))
        .fallback(fallback)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn render_metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Catalogue listing: active models plus the default selection
#[derive(Debug, Serialize)]
struct ModelsResponse {
    models: Vec<ModelDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_model_id: Option<String>,
}

async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    metrics::counter!("langsift_requests_total").increment(1);

    let registry = state.store.load().await?;
    Ok(Json(ModelsResponse {
        models: registry.active_models().cloned().collect(),
        default_model_id: registry.default_model_id.clone(),
    }))
}

async fn remove_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    metrics::counter!("langsift_requests_total").increment(1);

    state.store.remove(&id).await?;
    state.cache.invalidate(&id).await;
    info!(model_id = %id, "model removed from the catalogue");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    text: String,
    #[serde(default)]
    model_id: Option<String>,
}

async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictionResult>, ApiError> {
    metrics::counter!("langsift_requests_total").increment(1);
    run_prediction(&state, req.model_id.as_deref(), &req.text).await
}

#[derive(Debug, Deserialize)]
struct PredictFileRequest {
    filename: String,
    content: String,
    #[serde(default)]
    model_id: Option<String>,
}

async fn predict_file(
    State(state): State<AppState>,
    Json(req): Json<PredictFileRequest>,
) -> Result<Json<PredictionResult>, ApiError> {
    metrics::counter!("langsift_requests_total").increment(1);

    // screen the upload before any model work happens
    if let Err(rejection) = state
        .upload_policy
        .validate(&req.filename, req.content.len() as u64)
    {
        warn!(filename = %req.filename, %rejection, "upload rejected");
        return Err(ApiError::Upload(rejection));
    }

    run_prediction(&state, req.model_id.as_deref(), &req.content).await
}

async fn run_prediction(
    state: &AppState,
    model_id: Option<&str>,
    text: &str,
) -> Result<Json<PredictionResult>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let model = resolve_model(state, model_id).await?;

    let started = Instant::now();
    let result = InferenceService::new(Arc::clone(&model)).predict(text);
    metrics::histogram!("langsift_inference_latency_us")
        .record(started.elapsed().as_micros() as f64);

    let outcome = if result.success { "success" } else { "failure" };
    metrics::counter!("langsift_predictions_total", "outcome" => outcome).increment(1);
    info!(
        %request_id,
        model_id = model.id(),
        success = result.success,
        language = result.predicted_language.as_deref().unwrap_or("-"),
        "prediction served"
    );

    Ok(Json(result))
}

/// Pick the requested model, or fall back to the catalogue default
async fn resolve_model(
    state: &AppState,
    requested: Option<&str>,
) -> Result<Arc<LoadedModel>, ApiError> {
    let id = match requested {
        Some(id) => id.to_string(),
        None => {
            let registry = state.store.load().await?;
            registry
                .default_model_id
                .clone()
                .ok_or_else(|| ApiError::NotFound("the catalogue has no models".to_string()))?
        }
    };
    Ok(state.cache.get(&id).await?)
}

async fn fallback() -> &'static str {
    "Not found"
}

/// Error handling
#[derive(Debug)]
enum ApiError {
    Upload(UploadRejection),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::ModelNotFound(_) => ApiError::NotFound(err.to_string()),
            Error::RegistryUnreadable(_) | Error::ArtifactCorrupt(_) | Error::RebuildFailed(_) => {
                ApiError::Unavailable(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Upload(rejection @ UploadRejection::TooLarge { .. }) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "upload_rejected",
                rejection.to_string(),
            ),
            ApiError::Upload(rejection) => (
                StatusCode::BAD_REQUEST,
                "upload_rejected",
                rejection.to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "model_not_found", msg),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };
        metrics::counter!("langsift_errors_total", "type" => kind).increment(1);

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use langsift_data::CodeSample;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tempfile::TempDir;

    const RUST_SNIPPETS: &[&str] = &[
        "fn main() { println!(\"hello\"); }",
        "pub struct Point { x: f64, y: f64 }",
        "let mut total: u32 = 0; for i in 0..10 { total += i; }",
        "impl Token { fn text(&self) -> &str { &self.text } }",
        "match value { Some(v) => v, None => return None }",
        "use std::collections::HashMap; let mut counts = HashMap::new();",
        "#[derive(Debug, Clone)] pub enum Shape { Circle(f64), Square(f64) }",
        "let names: Vec<String> = rows.iter().map(|r| r.name.clone()).collect();",
    ];

    const PYTHON_SNIPPETS: &[&str] = &[
        "def main():\n    print('hello')",
        "class Point:\n    def __init__(self, x, y):\n        self.x = x",
        "total = 0\nfor i in range(10):\n    total += i",
        "import json\nwith open('config.json') as fh:\n    config = json.load(fh)",
        "def parse(line):\n    return [int(part) for part in line.split(',')]",
        "counts = {}\nfor name in names:\n    counts[name] = counts.get(name, 0) + 1",
        "try:\n    value = lookup[key]\nexcept KeyError:\n    value = None",
        "names = [row['name'] for row in rows if row['active']]",
    ];

    async fn fixture() -> (AppState, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");

        let mut lines = Vec::new();
        for code in RUST_SNIPPETS {
            lines.push(serde_json::to_string(&CodeSample::new("Rust", *code)).expect("json"));
        }
        for code in PYTHON_SNIPPETS {
            lines.push(serde_json::to_string(&CodeSample::new("Python", *code)).expect("json"));
        }
        let corpus_path = dir.path().join("corpus.jsonl");
        std::fs::write(&corpus_path, lines.join("\n")).expect("write corpus");

        // Small corpus, so relax the production thresholds.
        let yaml = format!(
            r#"
registry_path: {registry}
models_dir: {models}
corpus:
  source: jsonl
  path: {corpus}
max_upload_mb: 1
rebuild:
  min_samples_per_class: 4
  test_fraction: 0.25
  training:
    vectorizer:
      min_df: 1
"#,
            registry = dir.path().join("models/registry.json").display(),
            models = dir.path().join("models").display(),
            corpus = corpus_path.display(),
        );
        let config: ServerConfig = serde_yaml::from_str(&yaml).expect("fixture config");

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::new(config, handle);
        state
            .rebuilder
            .ensure_default(&state.config.default_descriptor())
            .await
            .expect("bootstrap default model");
        (state, dir)
    }

    #[tokio::test]
    async fn predict_falls_back_to_the_default_model() {
        let (state, _dir) = fixture().await;

        let Json(result) = predict(
            State(state),
            Json(PredictRequest {
                text: "fn main() { println!(\"hi\"); }".to_string(),
                model_id: None,
            }),
        )
        .await
        .expect("predict");

        assert!(result.success);
        assert_eq!(result.predicted_language.as_deref(), Some("Rust"));
        let top = result.top_predictions.expect("ranked predictions");
        assert_eq!(top[0].language, "Rust");
    }

    #[tokio::test]
    async fn unknown_model_id_maps_to_not_found() {
        let (state, _dir) = fixture().await;

        let err = predict(
            State(state),
            Json(PredictRequest {
                text: "print('hi')".to_string(),
                model_id: Some("ghost".to_string()),
            }),
        )
        .await
        .expect_err("must fail");

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_screening_happens_before_inference() {
        let (state, _dir) = fixture().await;

        let err = predict_file(
            State(state.clone()),
            Json(PredictFileRequest {
                filename: "tool.exe".to_string(),
                content: "MZ".to_string(),
                model_id: None,
            }),
        )
        .await
        .expect_err("extension must be rejected");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = predict_file(
            State(state),
            Json(PredictFileRequest {
                filename: "big.py".to_string(),
                content: "x".repeat(1024 * 1024 + 1),
                model_id: None,
            }),
        )
        .await
        .expect_err("size must be rejected");
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn accepted_file_upload_is_classified() {
        let (state, _dir) = fixture().await;

        let Json(result) = predict_file(
            State(state),
            Json(PredictFileRequest {
                filename: "script.py".to_string(),
                content: "import os\ndef main():\n    print(os.getcwd())".to_string(),
                model_id: None,
            }),
        )
        .await
        .expect("predict");

        assert!(result.success);
        assert_eq!(result.predicted_language.as_deref(), Some("Python"));
    }

    #[tokio::test]
    async fn catalogue_lists_the_bootstrapped_model() {
        let (state, _dir) = fixture().await;

        let Json(listing) = list_models(State(state)).await.expect("list");

        assert_eq!(listing.models.len(), 1);
        assert_eq!(listing.default_model_id.as_deref(), Some("lr_baseline_001"));
        let entry = &listing.models[0];
        assert_eq!(entry.id, "lr_baseline_001");
        assert!(entry.accuracy > 0.0, "metrics must be measured");
        assert!(entry.is_active);
    }

    #[tokio::test]
    async fn removing_the_only_model_empties_the_catalogue() {
        let (state, _dir) = fixture().await;

        let status = remove_model(State(state.clone()), Path("lr_baseline_001".to_string()))
            .await
            .expect("remove");
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(listing) = list_models(State(state)).await.expect("list");
        assert!(listing.models.is_empty());
        assert!(listing.default_model_id.is_none());
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        assert_eq!(health_check().await, "OK");
    }
}
