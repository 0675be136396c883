use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use contract_analysis::{
    AnalysisError, AnalysisHistory, AnalysisRecord, AnalysisStore, AnalyzeResponse, Identity,
    IdentityProvider, OidcUserinfoProvider, OpenRouterClient, PostgresAnalysisStore,
    UploadPipeline, UploadedDocument,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

/// Contracts with scanned exhibits run large; axum's 2 MB default is too
/// small for them.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// Maps the pipeline failure taxonomy onto HTTP statuses. Client mistakes are
/// 4xx, a misbehaving model service is a bad gateway, and everything the
/// deployment got wrong is a 500.
fn analysis_error_response(err: &AnalysisError) -> ApiError {
    let status = match err {
        AnalysisError::Unauthorized => StatusCode::UNAUTHORIZED,
        AnalysisError::UnsupportedFormat(_) | AnalysisError::EmptyInput => StatusCode::BAD_REQUEST,
        AnalysisError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Configuration(_) | AnalysisError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AnalysisError::EmptyResponse
        | AnalysisError::MalformedResponse(_)
        | AnalysisError::Schema(_)
        | AnalysisError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };

    (status, Json(json!({ "error": err.to_string() })))
}

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub pipeline: Arc<UploadPipeline>,
    pub store: Arc<dyn AnalysisStore>,
}

pub async fn create_app() -> Router {
    let app_state = create_app_state().await;
    build_router(app_state)
}

async fn create_app_state() -> AppState {
    let model = OpenRouterClient::from_env().unwrap_or_else(|e| {
        error!("Model service configuration error: {}", e);
        std::process::exit(1);
    });

    let identity = OidcUserinfoProvider::from_env().unwrap_or_else(|e| {
        error!("Identity provider configuration error: {}", e);
        std::process::exit(1);
    });

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable must be set");

    let store = PostgresAnalysisStore::connect(&database_url)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::process::exit(1);
        });

    AppState {
        identity: Arc::new(identity),
        pipeline: Arc::new(UploadPipeline::new(Arc::new(model))),
        store: Arc::new(store),
    }
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/contracts/analyze", post(analyze_contract))
        .route("/contracts/analyses", get(list_analyses))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Contract Analysis Service",
        "version": "1.0.0",
        "description": "AI-powered contract review: upload a PDF, get a structured legal analysis",
        "endpoints": {
            "POST /contracts/analyze": "Upload a contract PDF for analysis",
            "GET /contracts/analyses": "List the caller's saved analyses, newest first",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze_contract(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<AnalyzeResponse> {
    // Identity is resolved before the body is touched, so an unauthenticated
    // caller learns nothing about how uploads are handled.
    let identity = resolve_identity(&state, &headers).await?;

    let document = read_document(multipart).await?;
    info!(
        user_id = %identity.user_id,
        file_name = %document.file_name,
        "received contract upload"
    );

    let response = state
        .pipeline
        .handle_upload(Some(&identity), document)
        .await
        .map_err(|e| {
            error!("Contract analysis failed: {}", e);
            analysis_error_response(&e)
        })?;

    persist_record(&state, &identity, &response).await?;

    Ok(Json(response))
}

async fn list_analyses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<AnalysisHistory> {
    let identity = resolve_identity(&state, &headers).await?;

    let analyses = state
        .store
        .list_for_user(&identity.user_id)
        .await
        .map_err(|e| {
            error!("Failed to load analyses for {}: {}", identity.user_id, e);
            analysis_error_response(&e)
        })?;

    Ok(Json(AnalysisHistory { analyses }))
}

async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let token = bearer_token(headers);
    let identity = state.identity.current_user(token).await.map_err(|e| {
        error!("Identity resolution failed: {}", e);
        analysis_error_response(&e)
    })?;

    identity.ok_or_else(|| analysis_error_response(&AnalysisError::Unauthorized))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Pull the single expected `file` field out of the multipart form.
async fn read_document(mut multipart: Multipart) -> Result<UploadedDocument, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request_error("Invalid multipart payload"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|s: &str| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|_| bad_request_error("Failed to read uploaded file"))?;

        return Ok(UploadedDocument::new(file_name, content_type, bytes.to_vec()));
    }

    Err(bad_request_error("Missing file"))
}

async fn persist_record(
    state: &AppState,
    identity: &Identity,
    response: &AnalyzeResponse,
) -> Result<(), ApiError> {
    let record = AnalysisRecord::new(
        identity.user_id.clone(),
        response.file_name.clone(),
        response.analysis.clone(),
    );

    state.store.insert(record).await.map_err(|e| {
        error!("Failed to persist analysis: {}", e);
        analysis_error_response(&e)
    })
}
