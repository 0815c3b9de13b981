//! Preview sessions.
//!
//! Editors land on `/api/preview` from the CMS with a preview token. Once the
//! token is validated it is kept in a signed cookie, and every request
//! carrying that cookie reads content from the preview ref instead of the
//! published one.

use std::convert::Infallible;

use axum::{
  Json,
  extract::{FromRef, FromRequestParts, Query, State},
  response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
  SignedCookieJar,
  cookie::{Cookie, Key, SameSite},
};
use http::{StatusCode, request::Parts};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{client::ContentScope, server::BlogService, util::local_path};

pub const PREVIEW_COOKIE: &str = "preview_session";

/// What the preview cookie carries.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PreviewSession {
  #[serde(rename = "ref")]
  pub reference: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub document_id: Option<String>,
}

impl PreviewSession {
  fn to_cookie(
    &self,
    secure: bool,
  ) -> Result<Cookie<'static>, serde_json::Error> {
    let value = urlencoding::encode(&serde_json::to_string(self)?).into_owned();
    let cookie = Cookie::build((PREVIEW_COOKIE, value))
      .path("/")
      .http_only(true)
      .same_site(SameSite::Lax)
      .secure(secure)
      .build();
    Ok(cookie)
  }

  /// Only cookies with a valid signature and a well-formed payload count.
  fn from_jar(jar: &SignedCookieJar) -> Option<Self> {
    let cookie = jar.get(PREVIEW_COOKIE)?;
    let value = urlencoding::decode(cookie.value()).ok()?;
    serde_json::from_str(&value).ok()
  }

  pub fn scope(&self) -> ContentScope {
    ContentScope::Preview(self.reference.clone())
  }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for ContentScope
where
  S: Send + Sync,
  Key: FromRef<S>,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    let jar = SignedCookieJar::<Key>::from_request_parts(parts, state).await?;
    let scope = PreviewSession::from_jar(&jar)
      .map(|session| session.scope())
      .unwrap_or_default();
    Ok(scope)
  }
}

#[derive(Deserialize)]
pub struct EnterPreviewParams {
  token: Option<String>,
  #[serde(rename = "documentId")]
  document_id: Option<String>,
}

pub async fn handle_enter_preview(
  State(service): State<BlogService>,
  jar: SignedCookieJar,
  Query(params): Query<EnterPreviewParams>,
) -> Response {
  let Some(token) = params.token.filter(|token| !token.is_empty()) else {
    return invalid_token();
  };
  let document_id = params.document_id.filter(|id| !id.is_empty());

  let target = match service
    .client()
    .resolve_preview(&token, document_id.as_deref(), service.links())
    .await
  {
    Ok(Some(target)) => target,
    Ok(None) => return invalid_token(),
    Err(e) => {
      error!("failed to resolve preview: {e}");
      return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
  };

  let session = PreviewSession {
    reference: token,
    document_id,
  };
  let cookie = match session.to_cookie(service.secure_cookie()) {
    Ok(cookie) => cookie,
    Err(e) => {
      error!("failed to encode preview session: {e}");
      return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
  };

  info!("entering preview, redirecting to {target}");
  (jar.add(cookie), redirect_document(&target)).into_response()
}

#[derive(Deserialize)]
pub struct ExitPreviewParams {
  #[serde(rename = "currentUrl")]
  current_url: Option<String>,
}

pub async fn handle_exit_preview(
  jar: SignedCookieJar,
  Query(params): Query<ExitPreviewParams>,
) -> Response {
  let mut removal = Cookie::build((PREVIEW_COOKIE, ""))
    .path("/")
    .http_only(true)
    .build();
  removal.make_removal();

  let target = local_path(params.current_url.as_deref());
  (jar.add(removal), Redirect::temporary(target)).into_response()
}

fn invalid_token() -> Response {
  let body = Json(json!({ "message": "Invalid token" }));
  (StatusCode::UNAUTHORIZED, body).into_response()
}

/// A page that sends the browser on to `target`. The cookie has to be
/// stored before the preview page is requested, which a plain redirect
/// does not guarantee with `SameSite=Lax` from a cross-site origin.
fn redirect_document(target: &str) -> Markup {
  let target_js = serde_json::to_string(target)
    .unwrap_or_else(|_| "\"/\"".to_owned())
    .replace("</", "<\\/");
  let redirect_js = format!("window.location.replace({target_js});");

  html! {
    (DOCTYPE)
    html {
      head {
        meta charset="utf-8";
        meta http-equiv="refresh" content={ "0; url=" (target) };
        script { (PreEscaped(redirect_js)) }
      }
      body {
        a href=(target) { "Continuar" }
      }
    }
  }
}
