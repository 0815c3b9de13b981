use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tracing::{debug, info, warn};

use crate::{
  client::{ContentClient, ContentScope},
  config::SiteConfig,
  content::{Cursor, LinkResolver},
  pages::{
    self, PageCache, RenderPolicy, RenderSettings, Resolution,
    listing::{self, PageView, PostListing},
    post,
  },
  util::Result,
};

/// What a post request turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
  Page(String),
  /// No post has this slug in the request's scope.
  Missing,
  /// The slug is outside the allow-list and on-demand rendering is off.
  NotServed,
}

#[derive(Clone)]
pub struct BlogService {
  inner: Arc<Inner>,
}

struct Inner {
  client: ContentClient,
  settings: RenderSettings,
  policy: RenderPolicy,
  pages: PageCache,
  key: Key,
  secure_cookie: bool,
}

impl FromRef<BlogService> for Key {
  fn from_ref(service: &BlogService) -> Self {
    service.inner.key.clone()
  }
}

impl BlogService {
  pub async fn try_from(config: SiteConfig) -> Result<Self> {
    let client = config.build_client()?;
    Self::with_client(&config, client).await
  }

  /// Enumerate the published posts and render them ahead of time.
  pub async fn with_client(
    config: &SiteConfig,
    client: ContentClient,
  ) -> Result<Self> {
    let settings = RenderSettings::from_config(config)?;
    let slugs = post::resolve_paths(&client, config.prerender_limit).await?;
    info!("found {} published posts to prerender", slugs.len());

    let inner = Inner {
      client,
      settings,
      policy: RenderPolicy::new(slugs.iter().cloned(), config.fallback),
      pages: PageCache::new(config.page_cache_size, config.revalidate),
      key: config.cookie_key(),
      secure_cookie: config.secure_cookie,
    };
    let service = Self {
      inner: Arc::new(inner),
    };

    service.prerender(&slugs).await;
    info!("{} post pages known at startup", service.policy().len());
    Ok(service)
  }

  async fn prerender(&self, slugs: &[String]) {
    let published = ContentScope::Published;
    if let Err(e) = self.home_page(&published).await {
      warn!("failed to prerender home page: {e}");
    }

    for slug in slugs {
      match self.post_page(slug, &published).await {
        Ok(PostOutcome::Page(_)) => debug!("prerendered /post/{slug}"),
        Ok(_) => warn!("post {slug} disappeared while prerendering"),
        Err(e) => warn!("failed to prerender post {slug}: {e}"),
      }
    }
  }

  pub fn client(&self) -> &ContentClient {
    &self.inner.client
  }

  pub fn links(&self) -> &LinkResolver {
    &self.inner.settings.links
  }

  pub fn secure_cookie(&self) -> bool {
    self.inner.secure_cookie
  }

  pub fn policy(&self) -> &RenderPolicy {
    &self.inner.policy
  }

  fn cached(&self, key: &str, scope: &ContentScope) -> Option<String> {
    if scope.is_preview() {
      return None;
    }
    self.inner.pages.get_cached(&key.to_owned())
  }

  fn store(&self, key: String, html: &str, scope: &ContentScope) {
    if !scope.is_preview() {
      self.inner.pages.insert(key, html.to_owned());
    }
  }

  pub async fn home_page(&self, scope: &ContentScope) -> Result<String> {
    let key = pages::home_key();
    if let Some(html) = self.cached(&key, scope) {
      return Ok(html);
    }

    let settings = &self.inner.settings;
    let initial =
      listing::load_initial_page(self.client(), settings.page_size, scope)
        .await?;
    let listing = PostListing::new(initial);
    let html = listing::render_home(&listing, settings, scope).into_string();

    self.store(key, &html, scope);
    Ok(html)
  }

  pub async fn post_page(
    &self,
    slug: &str,
    scope: &ContentScope,
  ) -> Result<PostOutcome> {
    let resolution = match self.inner.policy.resolution(slug, scope) {
      Some(resolution) => resolution,
      None => return Ok(PostOutcome::NotServed),
    };

    let key = pages::post_key(slug);
    if let Some(html) = self.cached(&key, scope) {
      return Ok(PostOutcome::Page(html));
    }
    match resolution {
      Resolution::Precomputed => debug!("regenerating /post/{slug}"),
      Resolution::ResolveOnRequest => {
        debug!("rendering /post/{slug} on request")
      }
    }

    let settings = &self.inner.settings;
    let Some(page) =
      post::load_post_page(self.client(), slug, scope, settings).await?
    else {
      return Ok(PostOutcome::Missing);
    };
    let html = post::render_post(&page, settings, scope).into_string();

    self.store(key, &html, scope);
    Ok(PostOutcome::Page(html))
  }

  pub async fn next_page(&self, cursor: &Cursor) -> Result<PageView> {
    let page = listing::load_next_page(self.client(), cursor).await?;
    Ok(PageView::new(&page, &self.inner.settings))
  }
}
