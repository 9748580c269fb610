use crate::commentary::{CommentaryClient, CommentaryError, CommentaryFacts};
use crate::config::LlmSettings;
use crate::frontier::FrontierResult;
use crate::session::{AssetId, FrontierState, Session, SessionError, SessionView, Snapshot};
use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const INDEX_HTML: &str = include_str!("../web/index.html");
const APP_JS: &str = include_str!("../web/app.js");

#[derive(Clone)]
struct WebState {
    session: Arc<Mutex<Session>>,
    commentary: CommentaryClient,
}

#[derive(Clone, Debug, Serialize)]
struct ApiError {
    error: String,
}

#[derive(Clone, Debug, Serialize)]
struct StateResponse {
    session: SessionView,
    snapshot: Snapshot,
    frontier: FrontierState,
    commentary_configured: bool,
    updated_at: String,
}

#[derive(Debug, Serialize)]
struct CommentaryResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AddAssetRequest {
    ticker: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetWeightRequest {
    id: AssetId,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct SeedRequest {
    seed: u64,
    months: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    id: AssetId,
    filename: Option<String>,
    text: String,
}

#[derive(Debug, Deserialize, Default)]
struct CommentaryRequest {
    note: Option<String>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub async fn run_webui_server(port: u16, session: Session, llm: LlmSettings) -> Result<()> {
    let commentary = CommentaryClient::new(llm);
    if !commentary.is_configured() {
        warn!("PORTFOLIO_LAB_LLM_API_KEY is not set; commentary requests will fail");
    }
    let state = WebState {
        session: Arc::new(Mutex::new(session)),
        commentary,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/app.js", get(app_js))
        .route("/api/health", get(health))
        .route("/api/state", get(full_state))
        .route("/api/assets", post(add_asset))
        .route("/api/assets/:id", delete(remove_asset))
        .route("/api/weights", post(set_weight))
        .route("/api/weights/reset", post(reset_weights))
        .route("/api/weights/randomize", post(randomize_weights))
        .route("/api/seed", post(set_seed))
        .route("/api/upload", post(upload))
        .route("/api/upload/:id", delete(clear_upload))
        .route("/api/frontier", post(generate_frontier))
        .route("/api/commentary", post(self::commentary))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    info!("WebUI listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript; charset=utf-8")], APP_JS)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

fn state_of(session: &mut Session, commentary: &CommentaryClient) -> StateResponse {
    session.recompute();
    StateResponse {
        session: session.view(),
        snapshot: session.snapshot().clone(),
        frontier: session.frontier().clone(),
        commentary_configured: commentary.is_configured(),
        updated_at: chrono::Local::now().to_rfc3339(),
    }
}

async fn full_state(State(state): State<WebState>) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn add_asset(
    State(state): State<WebState>,
    Json(req): Json<AddAssetRequest>,
) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    session
        .add_asset(&req.ticker, req.name.as_deref())
        .map_err(session_err)?;
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn remove_asset(
    State(state): State<WebState>,
    Path(id): Path<u64>,
) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    session.remove_asset(AssetId(id)).map_err(session_err)?;
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn set_weight(
    State(state): State<WebState>,
    Json(req): Json<SetWeightRequest>,
) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    session.set_weight(req.id, req.value).map_err(session_err)?;
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn reset_weights(State(state): State<WebState>) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    session.reset_weights();
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn randomize_weights(State(state): State<WebState>) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    session.randomize_weights();
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn set_seed(
    State(state): State<WebState>,
    Json(req): Json<SeedRequest>,
) -> ApiResult<StateResponse> {
    if req.months.is_some_and(|m| m < 2) {
        return Err(api_err(StatusCode::BAD_REQUEST, "months must be at least 2"));
    }
    let mut session = state.session.lock().await;
    session.set_seed(req.seed, req.months);
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn upload(
    State(state): State<WebState>,
    Json(req): Json<UploadRequest>,
) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    if let Err(e) = session.upload_csv(req.id, req.filename.as_deref(), &req.text) {
        warn!("Rejected upload: {}", e);
        return Err(session_err(e));
    }
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn clear_upload(
    State(state): State<WebState>,
    Path(id): Path<u64>,
) -> ApiResult<StateResponse> {
    let mut session = state.session.lock().await;
    session.clear_upload(AssetId(id)).map_err(session_err)?;
    Ok(Json(state_of(&mut session, &state.commentary)))
}

async fn generate_frontier(State(state): State<WebState>) -> ApiResult<FrontierResult> {
    let mut session = state.session.lock().await;
    Ok(Json(session.generate_frontier().clone()))
}

async fn commentary(
    State(state): State<WebState>,
    body: Option<Json<CommentaryRequest>>,
) -> ApiResult<CommentaryResponse> {
    let note = body.map(|Json(r)| r).unwrap_or_default().note.unwrap_or_default();
    let facts = {
        let mut session = state.session.lock().await;
        session.recompute();
        CommentaryFacts::from_session(&session, &note)
    };

    match state.commentary.request(&facts).await {
        Ok(text) => Ok(Json(CommentaryResponse { text })),
        Err(e) => {
            warn!("Commentary failed: {}", e);
            let status = match e {
                CommentaryError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            Err(api_err(status, &e.to_string()))
        }
    }
}

fn api_err(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

fn session_err(err: SessionError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        SessionError::UnknownAsset(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    api_err(status, &err.to_string())
}
