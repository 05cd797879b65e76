use std::path::Path;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    barcode::BarcodeService,
    config::Config,
    error::{error_response, RenderError},
    render,
    rxnorm::RxNormClient,
    types::{ScanRequest, UrlCheckRequest},
    ui::{self, ScanView, UrlCheckView},
    virustotal::VirusTotalClient,
};

/// Shared, read-only handler state. Each request builds its own view.
#[derive(Clone)]
pub struct AppState {
    pub virustotal: VirusTotalClient,
    pub barcodes: BarcodeService,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let virustotal = VirusTotalClient::new(&cfg.virustotal).context("building VirusTotal client")?;
        let names = if cfg.rxnorm.enabled {
            Some(RxNormClient::from_config(&cfg.rxnorm).context("building RxNorm client")?)
        } else {
            None
        };
        let barcodes = BarcodeService::new(names, cfg.rxnorm.product_name.clone(), cfg.shelf);
        Ok(Self { virustotal, barcodes })
    }
}

/// JSON body extractor whose rejections are `{ "error": ... }` like every other API error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanForm {
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub is_sealed: Option<String>,
}

/// Build the application router; static assets fall back to `ui_dir`.
pub fn router(state: AppState, ui_dir: impl AsRef<Path>) -> Router {
    let api = Router::new()
        .route("/api/check-url", post(post_check_url))
        .route("/scan_barcode", post(post_scan_barcode))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let pages = Router::new()
        .route("/", get(get_index))
        .route("/check", post(post_check_page))
        .route("/scan", get(get_scan_page).post(post_scan_page));

    let static_svc = ServeDir::new(ui_dir.as_ref()).append_index_html_on_directories(false);

    Router::new()
        .merge(api)
        .merge(pages)
        .with_state(state)
        .fallback_service(static_svc)
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` is cancelled.
pub async fn spawn_server(cfg: Config, shutdown: CancellationToken) -> Result<()> {
    let state = AppState::from_config(&cfg)?;
    if !state.virustotal.is_configured() {
        tracing::warn!("no VirusTotal API key configured; URL checks will fail");
    }
    let app = router(state, &cfg.ui_dir);

    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    info!("serving UI on http://{}", cfg.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("server stopped");
    Ok(())
}

async fn post_check_url(State(app): State<AppState>, ApiJson(req): ApiJson<UrlCheckRequest>) -> Response {
    match app.virustotal.check_url(&req.url).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::warn!(url = %req.url, "url check failed: {e}");
            e.into_response()
        }
    }
}

async fn post_scan_barcode(State(app): State<AppState>, ApiJson(req): ApiJson<ScanRequest>) -> Response {
    match app.barcodes.scan(&req).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_index() -> Result<Html<String>, RenderError> {
    Ok(Html(render::render_check_page(&UrlCheckView::new())?))
}

async fn post_check_page(
    State(app): State<AppState>,
    Form(form): Form<CheckForm>,
) -> Result<Html<String>, RenderError> {
    let mut view = UrlCheckView::with_input(form.url);
    ui::check_url(&mut view, &app.virustotal).await;
    Ok(Html(render::render_check_page(&view)?))
}

async fn get_scan_page() -> Result<Html<String>, RenderError> {
    Ok(Html(render::render_scan_page(&ScanView::Idle)?))
}

async fn post_scan_page(
    State(app): State<AppState>,
    Form(form): Form<ScanForm>,
) -> Result<Html<String>, RenderError> {
    let mut view = ScanView::default();
    let sealed = form.is_sealed.as_deref().is_some_and(|v| v == "true" || v == "on");
    ui::scan_once(&mut view, &app.barcodes, form.barcode.trim(), sealed).await;
    Ok(Html(render::render_scan_page(&view)?))
}
