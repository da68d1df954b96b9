use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::providers::{self, Provider};
use crate::reencode::{self, OutputFormat};
use crate::settings::Settings;
use crate::store;

use super::models::{ExportRequest, TranslateResponse};
use super::state::ServerState;
use super::translate::{ServerError, translate_upload};
use super::upload::normalize_upload;

pub async fn run_server(settings: Settings, addr: Option<String>) -> Result<()> {
    let provider = providers::build_provider(&settings.translation);
    if !provider.is_configured() {
        warn!(
            "no API key found in {} or TRANSLATION_API_KEY; translations will fail until one is set",
            settings.translation.api_key_env
        );
    }
    let store = store::build_store(&settings.store)?;
    let addr = addr.unwrap_or_else(|| settings.server.addr.clone());
    let state = Arc::new(ServerState::new(settings, provider, store)?);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router<P: Provider>(state: Arc<ServerState<P>>) -> Router {
    let body_limit = state.settings.server.max_upload_bytes();
    Router::new()
        .route("/", get(index::<P>))
        .route("/health", get(health))
        .route("/api/translate", post(translate::<P>))
        .route("/api/export", post(export::<P>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn index<P: Provider>(State(state): State<Arc<ServerState<P>>>) -> Html<String> {
    Html(state.page.clone())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
    headers.insert(
        "access-control-expose-headers",
        HeaderValue::from_static("content-disposition"),
    );
}

async fn translate<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranslateResponse>, ServerError> {
    let request = normalize_upload(multipart, &state.spool_dir)
        .await
        .map_err(|err| {
            warn!("rejected upload: {}", err);
            ServerError::from(err)
        })?;
    let response = translate_upload(state.as_ref(), request).await?;
    Ok(Json(response))
}

async fn export<P: Provider>(
    State(state): State<Arc<ServerState<P>>>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response<Body>, ServerError> {
    let Json(request) = payload.map_err(|err| {
        ServerError::bad_request("Invalid export request").with_details(err.body_text())
    })?;
    let format = OutputFormat::parse(&request.format).map_err(|err| {
        ServerError::bad_request("Unsupported export format").with_details(err.to_string())
    })?;
    let export_settings = state.settings.export.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        reencode::reencode(
            &request.text,
            format,
            request.file_name.as_deref(),
            &export_settings,
        )
    })
    .await
    .map_err(|err| ServerError::internal("Failed to export translation").with_details(err.to_string()))?
    .map_err(|err| {
        error!("export to {} failed: {:#}", format.extension(), err);
        ServerError::internal("Failed to export translation").with_details(format!("{:#}", err))
    })?;

    let mut response = Response::new(Body::from(encoded.bytes));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(encoded.mime));
    let disposition = HeaderValue::from_str(&content_disposition(&encoded.file_name))
        .map_err(|err| ServerError::internal("Failed to export translation").with_details(err.to_string()))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// `attachment` header with an ASCII fallback name and an RFC 5987 UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|ch| {
            if (ch.is_ascii_graphic() && ch != '"' && ch != '\\') || ch == ' ' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", file_name);
    }
    let mut encoded = String::new();
    for byte in file_name.as_bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(byte) {
            encoded.push(*byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
