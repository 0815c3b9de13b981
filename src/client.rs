mod prismic;
mod query;

use std::{sync::Arc, time::Duration};

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::{
  content::{Cursor, Document, LinkResolver, SearchResponse},
  util::Result,
};

pub use self::prismic::PrismicApi;
pub use self::query::{Ordering, Predicate, SearchQuery, SortOrder};

/// The content API caps `pageSize` at this value.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
  user_agent: Option<String>,
  #[serde(default = "default_timeout")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  timeout: Duration,
  /// How long the master ref is reused before the API root is asked again.
  #[serde(default = "default_ref_ttl")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  ref_ttl: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      user_agent: None,
      timeout: default_timeout(),
      ref_ttl: default_ref_ttl(),
    }
  }
}

impl ClientConfig {
  fn to_builder(&self) -> reqwest::ClientBuilder {
    let mut builder = reqwest::Client::builder();

    if let Some(user_agent) = &self.user_agent {
      builder = builder.user_agent(user_agent);
    } else {
      builder = builder.user_agent(crate::util::USER_AGENT);
    }

    let mut header_map = HeaderMap::new();
    header_map.append("Accept", HeaderValue::from_static("application/json"));
    builder = builder.default_headers(header_map);

    builder.timeout(self.timeout)
  }

  pub fn build(
    &self,
    endpoint: Url,
    access_token: Option<String>,
  ) -> Result<PrismicApi> {
    let client = self.to_builder().build()?;
    Ok(PrismicApi::new(endpoint, access_token, client, self.ref_ttl))
  }
}

/// Which snapshot of the content a request reads. Resolved once per request
/// from the preview cookie and passed to every query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentScope {
  #[default]
  Published,
  Preview(String),
}

impl ContentScope {
  pub fn reference(&self) -> Option<&str> {
    match self {
      ContentScope::Published => None,
      ContentScope::Preview(reference) => Some(reference),
    }
  }

  pub fn is_preview(&self) -> bool {
    matches!(self, ContentScope::Preview(_))
  }
}

/// Transport to the content API.
#[async_trait::async_trait]
pub trait ContentApi: Send + Sync {
  async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;

  /// Fetch the page a cursor from an earlier response points at.
  async fn follow(&self, cursor: &Cursor) -> Result<SearchResponse>;
}

/// Typed queries for one document type.
#[derive(Clone)]
pub struct ContentClient {
  api: Arc<dyn ContentApi>,
  document_type: String,
}

impl ContentClient {
  pub fn new(
    api: Arc<dyn ContentApi>,
    document_type: impl Into<String>,
  ) -> Self {
    Self {
      api,
      document_type: document_type.into(),
    }
  }

  fn type_predicate(&self) -> Predicate {
    Predicate::DocumentType(self.document_type.clone())
  }

  /// Field names are given without the type prefix.
  fn fetch_fields<'a>(
    &'a self,
    fields: &'a [&str],
  ) -> impl Iterator<Item = String> + 'a {
    fields
      .iter()
      .map(move |field| format!("{}.{field}", self.document_type))
  }

  pub async fn query_by_type(
    &self,
    page_size: usize,
    fields: &[&str],
    scope: &ContentScope,
  ) -> Result<SearchResponse> {
    let query = SearchQuery::new(self.type_predicate())
      .page_size(page_size)
      .fetch(self.fetch_fields(fields))
      .scoped(scope);
    self.api.search(&query).await
  }

  pub async fn follow(&self, cursor: &Cursor) -> Result<SearchResponse> {
    debug!(cursor = cursor.as_str(), "following cursor");
    self.api.follow(cursor).await
  }

  pub async fn get_by_uid(
    &self,
    uid: &str,
    scope: &ContentScope,
  ) -> Result<Option<Document>> {
    let predicate = Predicate::Uid {
      doc_type: self.document_type.clone(),
      uid: uid.to_owned(),
    };
    let query = SearchQuery::new(predicate).page_size(1).scoped(scope);
    let resp = self.api.search(&query).await?;
    Ok(resp.results.into_iter().next())
  }

  pub async fn get_by_id(
    &self,
    id: &str,
    scope: &ContentScope,
  ) -> Result<Option<Document>> {
    let query = SearchQuery::new(Predicate::DocumentId(id.to_owned()))
      .page_size(1)
      .scoped(scope);
    let resp = self.api.search(&query).await?;
    Ok(resp.results.into_iter().next())
  }

  /// The single document following `after_id` when sorted by publication
  /// date in `order`.
  pub async fn adjacent(
    &self,
    after_id: &str,
    order: SortOrder,
    fields: &[&str],
    scope: &ContentScope,
  ) -> Result<Option<Document>> {
    let query = SearchQuery::new(self.type_predicate())
      .page_size(1)
      .fetch(self.fetch_fields(fields))
      .ordering(Ordering::by_publication(order))
      .after(after_id)
      .scoped(scope);
    let resp = self.api.search(&query).await?;
    Ok(resp.results.into_iter().next())
  }

  /// Up to `limit` published uids, following cursors past the API's page
  /// size cap when needed.
  pub async fn list_uids(&self, limit: usize) -> Result<Vec<String>> {
    let mut uids = Vec::new();
    if limit == 0 {
      return Ok(uids);
    }

    let page_size = limit.min(MAX_PAGE_SIZE);
    let mut resp = self
      .query_by_type(page_size, &["title"], &ContentScope::Published)
      .await?;

    loop {
      uids.extend(resp.results.into_iter().filter_map(|doc| doc.uid));
      let next = match resp.next_page {
        Some(next) if uids.len() < limit => next,
        _ => break,
      };
      resp = self.follow(&next).await?;
    }

    uids.truncate(limit);
    Ok(uids)
  }

  /// Validate a preview token and work out where the preview should land.
  ///
  /// Returns `None` when the API rejects the token as a content reference.
  /// A valid token whose document cannot be found (or no document at all)
  /// lands on the home page.
  pub async fn resolve_preview(
    &self,
    token: &str,
    document_id: Option<&str>,
    resolver: &LinkResolver,
  ) -> Result<Option<String>> {
    let scope = ContentScope::Preview(token.to_owned());

    let lookup = match document_id {
      Some(id) => self.get_by_id(id, &scope).await,
      None => self
        .query_by_type(1, &["title"], &scope)
        .await
        .map(|_| None),
    };

    let doc = match lookup {
      Ok(doc) => doc,
      Err(e) if e.is_client_rejection() => {
        info!("preview token rejected by content API: {e}");
        return Ok(None);
      }
      Err(e) => return Err(e),
    };

    let target = match doc {
      Some(doc) => resolver.resolve_document(&doc.doc_type, doc.uid.as_deref()),
      None => "/".to_owned(),
    };
    Ok(Some(target))
  }
}

fn default_timeout() -> Duration {
  Duration::from_secs(10)
}

fn default_ref_ttl() -> Duration {
  Duration::from_secs(5)
}
