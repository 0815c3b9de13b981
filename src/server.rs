mod blog_service;
mod web;

use axum::{Router, routing::get};
use clap::Parser;
use http::StatusCode;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

pub use self::blog_service::{BlogService, PostOutcome};

use crate::{config::SiteConfig, util::Result};

#[derive(Parser)]
pub struct ServerConfig {
  #[clap(long, short, default_value = "127.0.0.1:4080")]
  bind: String,
}

impl ServerConfig {
  pub async fn run(self, config: SiteConfig) -> Result<()> {
    let service = BlogService::try_from(config).await?;
    serve(&self.bind, service).await
  }
}

pub fn router(service: BlogService) -> Router {
  Router::new()
    .merge(web::router())
    .route("/health", get(|| async { "ok" }))
    .fallback(|| async { (StatusCode::NOT_FOUND, "Page not found") })
    .layer(CompressionLayer::new().gzip(true))
    .layer(TraceLayer::new_for_http())
    .with_state(service)
}

async fn serve(bind: &str, service: BlogService) -> Result<()> {
  info!("listening on {bind}");
  let listener = tokio::net::TcpListener::bind(bind).await?;

  info!("starting server");
  Ok(axum::serve(listener, router(service)).await?)
}
