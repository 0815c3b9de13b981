//! Page view models and markup.

pub mod listing;
pub mod post;

use std::collections::HashSet;

use chrono::Locale;
use maud::{DOCTYPE, Markup, html};

use crate::{
  cache::TimedLruCache,
  client::ContentScope,
  config::SiteConfig,
  content::LinkResolver,
  util::ConfigError,
};

/// Rendered HTML keyed by request path.
pub type PageCache = TimedLruCache<String, String>;

pub fn home_key() -> String {
  "/".to_owned()
}

pub fn post_key(slug: &str) -> String {
  format!("/post/{slug}")
}

/// How a post page gets its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
  /// Rendered at startup, served from the page cache until it goes stale.
  Precomputed,
  /// Not known at startup; fetched and rendered when first requested.
  ResolveOnRequest,
}

/// Allow-list of slugs known at startup.
#[derive(Clone, Debug, Default)]
pub struct RenderPolicy {
  known: HashSet<String>,
  fallback: bool,
}

impl RenderPolicy {
  pub fn new(known: impl IntoIterator<Item = String>, fallback: bool) -> Self {
    Self {
      known: known.into_iter().collect(),
      fallback,
    }
  }

  /// `None` means the slug is not served at all. Previews always resolve
  /// on request since drafts are never part of the allow-list.
  pub fn resolution(
    &self,
    slug: &str,
    scope: &ContentScope,
  ) -> Option<Resolution> {
    if scope.is_preview() {
      return Some(Resolution::ResolveOnRequest);
    }
    if self.known.contains(slug) {
      return Some(Resolution::Precomputed);
    }
    self.fallback.then_some(Resolution::ResolveOnRequest)
  }

  pub fn len(&self) -> usize {
    self.known.len()
  }
}

/// Everything page rendering needs from the configuration.
#[derive(Clone, Debug)]
pub struct RenderSettings {
  pub site_name: String,
  pub locale: Locale,
  /// BCP 47 tag for the `lang` attribute.
  pub lang: String,
  pub page_size: usize,
  pub words_per_minute: usize,
  pub links: LinkResolver,
}

impl RenderSettings {
  pub fn from_config(config: &SiteConfig) -> Result<Self, ConfigError> {
    Ok(Self {
      site_name: config.site_name.clone(),
      locale: config.locale()?,
      lang: config.locale.replace('_', "-"),
      page_size: config.page_size,
      words_per_minute: config.words_per_minute,
      links: LinkResolver::new(&config.document_type),
    })
  }
}

/// Shared page chrome. `current` is where exiting preview mode returns to.
pub fn layout(
  settings: &RenderSettings,
  title: &str,
  scope: &ContentScope,
  current: &str,
  body: Markup,
) -> Markup {
  html! {
    (DOCTYPE)
    html lang=(settings.lang) {
      head {
        meta charset="utf-8";
        meta name="viewport" content="width=device-width, initial-scale=1";
        title { (title) }
        link rel="stylesheet" href="/assets/style.css";
        script src="/assets/listing.js" defer {}
      }
      body {
        header .site-header {
          a href="/" { (settings.site_name) }
        }
        (body)
        @if scope.is_preview() {
          aside .preview-banner {
            a href={
              "/api/exit-preview?currentUrl=" (urlencoding::encode(current))
            } {
              "Sair do modo Preview"
            }
          }
        }
      }
    }
  }
}
