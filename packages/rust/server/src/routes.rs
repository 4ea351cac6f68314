//! Route handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::{info, instrument};
use url::Url;

use webclip_core::convert_to_markdown;

use crate::AppState;
use crate::api::{
    ConvertRequest, ConvertResponse, Endpoints, ErrorCode, HealthResponse, IndexResponse,
};
use crate::error::ApiError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "WebClip API".into(),
        version: VERSION.into(),
        endpoints: Endpoints {
            convert: "POST /convert".into(),
            health: "GET /health".into(),
        },
    })
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: VERSION.into(),
    })
}

/// `POST /convert`: fetch the page, apply the template, return Markdown.
#[instrument(skip_all, fields(url))]
pub(crate) async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let Json(request) = payload?;

    let raw_url = request
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request(ErrorCode::InvalidUrl, "URL is required"))?;
    let template = request
        .template
        .ok_or_else(|| ApiError::bad_request(ErrorCode::TemplateError, "Template is required"))?;
    let url = parse_http_url(&raw_url).ok_or_else(|| {
        ApiError::bad_request(
            ErrorCode::InvalidUrl,
            "Invalid URL format. Must be http:// or https://",
        )
    })?;
    tracing::Span::current().record("url", url.as_str());

    let page = state.extractor.fetch_and_extract_page(&url).await?;
    let markdown = convert_to_markdown(&page, &template, state.renderer.as_ref()).await?;

    info!(
        markdown_len = markdown.len(),
        word_count = page.word_count,
        "converted"
    );
    Ok(Json(ConvertResponse::new(markdown, &page)))
}

fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
