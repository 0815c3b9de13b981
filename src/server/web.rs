use axum::{
  Json, Router,
  extract::{Path, Query, State},
  response::{Html, IntoResponse, Redirect, Response},
  routing::get,
};
use http::{StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::{
  client::ContentScope,
  content::Cursor,
  pages::listing::PageView,
  preview,
  util::Error,
};

use super::{BlogService, PostOutcome};

#[derive(rust_embed::RustEmbed)]
#[folder = "assets/"]
struct Assets;

pub fn router() -> Router<BlogService> {
  Router::new()
    .route("/", get(handle_home))
    .route("/post/:slug", get(handle_post))
    .route("/api/preview", get(preview::handle_enter_preview))
    .route("/api/exit-preview", get(preview::handle_exit_preview))
    .route("/api/posts", get(handle_next_page))
    .route("/assets/*path", get(handle_asset))
}

async fn handle_home(
  State(service): State<BlogService>,
  scope: ContentScope,
) -> Result<Html<String>, WebError> {
  Ok(Html(service.home_page(&scope).await?))
}

async fn handle_post(
  State(service): State<BlogService>,
  Path(slug): Path<String>,
  scope: ContentScope,
) -> Result<Response, WebError> {
  let resp = match service.post_page(&slug, &scope).await? {
    PostOutcome::Page(html) => Html(html).into_response(),
    PostOutcome::Missing => Redirect::temporary("/").into_response(),
    PostOutcome::NotServed => {
      (StatusCode::NOT_FOUND, "Page not found").into_response()
    }
  };
  Ok(resp)
}

#[derive(Deserialize)]
struct NextPageParams {
  cursor: Option<String>,
}

async fn handle_next_page(
  State(service): State<BlogService>,
  Query(params): Query<NextPageParams>,
) -> Result<Json<PageView>, WebError> {
  let cursor = params
    .cursor
    .filter(|cursor| !cursor.is_empty())
    .ok_or_else(|| Error::InvalidCursor(String::new()))?;

  Ok(Json(service.next_page(&Cursor::new(cursor)).await?))
}

async fn handle_asset(Path(path): Path<String>) -> Response {
  let Some(file) = Assets::get(&path) else {
    return (StatusCode::NOT_FOUND, "Asset not found").into_response();
  };

  let content_type = content_type(&path).to_string();
  ([(header::CONTENT_TYPE, content_type)], file.data).into_response()
}

fn content_type(path: &str) -> mime::Mime {
  match path.rsplit_once('.').map(|(_, ext)| ext) {
    Some("css") => mime::TEXT_CSS_UTF_8,
    Some("js") => mime::APPLICATION_JAVASCRIPT_UTF_8,
    Some("svg") => mime::IMAGE_SVG,
    Some("png") => mime::IMAGE_PNG,
    _ => mime::APPLICATION_OCTET_STREAM,
  }
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct WebError(#[from] Error);

impl IntoResponse for WebError {
  fn into_response(self) -> Response {
    match self.0 {
      Error::InvalidCursor(cursor) => {
        warn!("rejected cursor {cursor:?}");
        let body = Json(json!({ "message": "Invalid cursor" }));
        (StatusCode::BAD_REQUEST, body).into_response()
      }
      e => {
        error!("request failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
          .into_response()
      }
    }
  }
}
