pub mod date;

pub const USER_AGENT: &str =
  concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("YAML parse error")]
  Yaml(#[from] serde_yaml::Error),

  #[error("Invalid URL {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Unknown locale {0:?}")]
  UnknownLocale(String),

  #[error("{0}")]
  Message(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("IO error")]
  Io(#[from] std::io::Error),

  #[error("Invalid URL {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Reqwest client error {0:?}")]
  Reqwest(#[from] reqwest::Error),

  #[error("HTTP status error {0} (url: {1})")]
  HttpStatus(reqwest::StatusCode, url::Url),

  #[error("JSON error {0}")]
  Json(#[from] serde_json::Error),

  #[error("Cursor does not belong to the content API: {0}")]
  InvalidCursor(String),

  #[error("Config error {0:?}")]
  Config(#[from] ConfigError),

  #[error("{0}")]
  Message(String),
}

impl Error {
  /// The content API rejected the request itself (unknown ref, malformed
  /// query), as opposed to failing to answer it.
  pub fn is_client_rejection(&self) -> bool {
    matches!(self, Error::HttpStatus(status, _) if status.is_client_error())
  }
}

/// Keep only same-site paths. Anything that could leave the site (absolute
/// URLs, scheme-relative `//host` paths) or that cannot be sent back in a
/// `Location` header collapses to the root.
pub fn local_path(target: Option<&str>) -> &str {
  match target {
    Some(path)
      if path.starts_with('/')
        && !path.starts_with("//")
        && !path.starts_with("/\\")
        && http::HeaderValue::from_str(path).is_ok() =>
    {
      path
    }
    _ => "/",
  }
}
