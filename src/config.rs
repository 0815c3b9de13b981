use std::{path::Path, sync::Arc, time::Duration};

use axum_extra::extract::cookie::Key;
use chrono::Locale;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::{
  client::{ClientConfig, ContentClient},
  util::{ConfigError, Result, date::parse_locale},
};

/// Posts shown on the first listing page and fetched per "load more".
pub const DEFAULT_PAGE_SIZE: usize = 1;
/// Assumed reading speed for the reading-time estimate.
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;
/// Number of post pages rendered at startup.
pub const DEFAULT_PRERENDER_LIMIT: usize = 100;

const MIN_SECRET_LEN: usize = 16;
const KEY_CONTEXT: &str = "prismic-blog 2024 preview session cookie";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SiteConfig {
  /// Content API entry point, e.g. `https://<repo>.cdn.prismic.io/api/v2`
  pub api_endpoint: Url,
  #[serde(default)]
  pub access_token: Option<String>,
  #[serde(default = "default_document_type")]
  pub document_type: String,
  #[serde(default = "default_site_name")]
  pub site_name: String,
  #[serde(default = "default_page_size")]
  pub page_size: usize,
  #[serde(default = "default_words_per_minute")]
  pub words_per_minute: usize,
  #[serde(default = "default_prerender_limit")]
  pub prerender_limit: usize,
  #[serde(default = "default_locale")]
  pub locale: String,
  /// Rendered pages are served from memory for this long.
  #[serde(default = "default_revalidate")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  pub revalidate: Duration,
  #[serde(default = "default_page_cache_size")]
  pub page_cache_size: usize,
  /// Render posts that were not known at startup on first request. When
  /// off, such requests get a 404.
  #[serde(default = "default_fallback")]
  pub fallback: bool,
  #[serde(default)]
  pub cookie_secret: Option<String>,
  #[serde(default)]
  pub secure_cookie: bool,
  #[serde(default)]
  pub client: ClientConfig,
}

impl SiteConfig {
  pub fn new(api_endpoint: Url) -> Self {
    Self {
      api_endpoint,
      access_token: None,
      document_type: default_document_type(),
      site_name: default_site_name(),
      page_size: default_page_size(),
      words_per_minute: default_words_per_minute(),
      prerender_limit: default_prerender_limit(),
      locale: default_locale(),
      revalidate: default_revalidate(),
      page_cache_size: default_page_cache_size(),
      fallback: default_fallback(),
      cookie_secret: None,
      secure_cookie: false,
      client: ClientConfig::default(),
    }
  }

  pub fn load_from_file(path: &Path) -> Result<Self> {
    let f = std::fs::File::open(path)?;
    let config: Self = serde_yaml::from_reader(f).map_err(ConfigError::from)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.page_size == 0 {
      return Err(ConfigError::Message("page_size must be positive".into()));
    }
    if self.words_per_minute == 0 {
      return Err(ConfigError::Message(
        "words_per_minute must be positive".into(),
      ));
    }
    if let Some(secret) = &self.cookie_secret {
      if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Message(format!(
          "cookie_secret must be at least {MIN_SECRET_LEN} characters"
        )));
      }
    }
    self.locale()?;
    Ok(())
  }

  pub fn locale(&self) -> Result<Locale, ConfigError> {
    parse_locale(&self.locale)
      .ok_or_else(|| ConfigError::UnknownLocale(self.locale.clone()))
  }

  /// Signing key for the preview cookie. Without a configured secret the
  /// key is random and sessions do not survive a restart.
  pub fn cookie_key(&self) -> Key {
    let Some(secret) = &self.cookie_secret else {
      warn!("no cookie_secret configured, using a random signing key");
      return Key::generate();
    };

    let mut material = [0u8; 64];
    let mut hasher = blake3::Hasher::new_derive_key(KEY_CONTEXT);
    hasher.update(secret.as_bytes());
    hasher.finalize_xof().fill(&mut material);
    Key::from(&material[..])
  }

  pub fn build_client(&self) -> Result<ContentClient> {
    let api = self
      .client
      .build(self.api_endpoint.clone(), self.access_token.clone())?;
    Ok(ContentClient::new(Arc::new(api), &self.document_type))
  }
}

fn default_document_type() -> String {
  "posts".into()
}

fn default_site_name() -> String {
  "Blog".into()
}

fn default_page_size() -> usize {
  DEFAULT_PAGE_SIZE
}

fn default_words_per_minute() -> usize {
  DEFAULT_WORDS_PER_MINUTE
}

fn default_prerender_limit() -> usize {
  DEFAULT_PRERENDER_LIMIT
}

fn default_locale() -> String {
  "pt_BR".into()
}

fn default_revalidate() -> Duration {
  Duration::from_secs(30 * 60)
}

fn default_page_cache_size() -> usize {
  256
}

fn default_fallback() -> bool {
  true
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_parse_minimal_config() {
    let config: SiteConfig = serde_yaml::from_str(
      "api_endpoint: https://blog.cdn.prismic.io/api/v2\n",
    )
    .unwrap();

    assert_eq!(config.document_type, "posts");
    assert_eq!(config.page_size, 1);
    assert_eq!(config.words_per_minute, 200);
    assert_eq!(config.prerender_limit, 100);
    assert_eq!(config.revalidate, Duration::from_secs(1800));
    assert!(config.fallback);
    assert_eq!(config.locale().unwrap(), Locale::pt_BR);
    config.validate().unwrap();
  }

  #[test]
  fn test_parse_full_config() {
    const YAML_CONFIG: &str = r#"
api_endpoint: https://blog.cdn.prismic.io/api/v2
access_token: token
document_type: article
site_name: My Blog
page_size: 5
words_per_minute: 250
prerender_limit: 10
locale: en-US
revalidate: 5m
fallback: false
cookie_secret: a-long-enough-secret
secure_cookie: true
client:
  timeout: 3s
"#;

    let config: SiteConfig = serde_yaml::from_str(YAML_CONFIG).unwrap();
    assert_eq!(config.document_type, "article");
    assert_eq!(config.page_size, 5);
    assert_eq!(config.revalidate, Duration::from_secs(300));
    assert!(!config.fallback);
    assert!(config.secure_cookie);
    assert_eq!(config.locale().unwrap(), Locale::en_US);
    config.validate().unwrap();
  }

  #[test]
  fn test_invalid_config() {
    let base = SiteConfig::new(
      Url::parse("https://blog.cdn.prismic.io/api/v2").unwrap(),
    );

    let config = SiteConfig {
      page_size: 0,
      ..base.clone()
    };
    assert!(config.validate().is_err());

    let config = SiteConfig {
      locale: "klingon".into(),
      ..base.clone()
    };
    assert!(matches!(
      config.validate(),
      Err(ConfigError::UnknownLocale(_))
    ));

    let config = SiteConfig {
      cookie_secret: Some("short".into()),
      ..base
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_cookie_key_is_stable() {
    let mut config = SiteConfig::new(
      Url::parse("https://blog.cdn.prismic.io/api/v2").unwrap(),
    );
    config.cookie_secret = Some("a-long-enough-secret".into());
    assert_eq!(config.cookie_key().master(), config.cookie_key().master());

    config.cookie_secret = Some("another-long-secret".into());
    let other = config.cookie_key();
    config.cookie_secret = Some("a-long-enough-secret".into());
    assert_ne!(other.master(), config.cookie_key().master());
  }
}
