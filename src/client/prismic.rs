use std::time::Duration;

use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use crate::{
  cache::TimedLruCache,
  content::{Cursor, SearchResponse},
  util::{Error, Result},
};

use super::{ContentApi, SearchQuery};

const ACCESS_TOKEN: &str = "access_token";

/// The API root lists the available content references.
#[derive(Deserialize, Debug)]
struct ApiInfo {
  refs: Vec<ApiRef>,
}

#[derive(Deserialize, Debug)]
struct ApiRef {
  #[serde(rename = "ref")]
  reference: String,
  #[serde(rename = "isMasterRef", default)]
  is_master_ref: bool,
}

/// HTTP transport for the Prismic REST API (v2).
pub struct PrismicApi {
  endpoint: Url,
  access_token: Option<String>,
  client: reqwest::Client,
  master_ref: TimedLruCache<(), String>,
}

impl PrismicApi {
  pub fn new(
    endpoint: Url,
    access_token: Option<String>,
    client: reqwest::Client,
    ref_ttl: Duration,
  ) -> Self {
    Self {
      endpoint,
      access_token,
      client,
      master_ref: TimedLruCache::new(1, ref_ttl),
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, mut url: Url) -> Result<T> {
    debug!(url = %strip_access_token(&url), "querying content API");
    self.authorize(&mut url);

    let resp = self.client.get(url).send().await?;
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
      return Err(Error::HttpStatus(status, strip_access_token(resp.url())));
    }

    Ok(resp.json().await?)
  }

  async fn master_ref(&self) -> Result<String> {
    if let Some(reference) = self.master_ref.get_cached(&()) {
      return Ok(reference);
    }

    let info: ApiInfo = self.get_json(self.endpoint.clone()).await?;
    let reference = info
      .refs
      .into_iter()
      .find(|r| r.is_master_ref)
      .map(|r| r.reference)
      .ok_or_else(|| Error::Message("content API has no master ref".into()))?;

    self.master_ref.insert((), reference.clone());
    Ok(reference)
  }

  fn authorize(&self, url: &mut Url) {
    let Some(token) = &self.access_token else {
      return;
    };
    if url.query_pairs().all(|(k, _)| k != ACCESS_TOKEN) {
      url.query_pairs_mut().append_pair(ACCESS_TOKEN, token);
    }
  }

  fn search_url(&self, query: &SearchQuery, reference: &str) -> Result<Url> {
    let mut url = self.endpoint.clone();
    url
      .path_segments_mut()
      .map_err(|_| {
        Error::Message(format!("not a valid API endpoint: {}", self.endpoint))
      })?
      .pop_if_empty()
      .extend(["documents", "search"]);

    let mut pairs = url.query_pairs_mut();
    pairs.append_pair("ref", reference);
    pairs.append_pair("q", &query.predicate.to_string());
    if let Some(page_size) = query.page_size {
      pairs.append_pair("pageSize", &page_size.to_string());
    }
    if let Some(page) = query.page {
      pairs.append_pair("page", &page.to_string());
    }
    if !query.fetch.is_empty() {
      pairs.append_pair("fetch", &query.fetch.join(","));
    }
    if let Some(ordering) = &query.ordering {
      pairs.append_pair("orderings", &ordering.to_string());
    }
    if let Some(after) = &query.after {
      pairs.append_pair("after", after);
    }
    drop(pairs);

    Ok(url)
  }

  /// Cursors must point back at the configured API. Anything else would
  /// let a client make us fetch arbitrary URLs.
  fn cursor_url(&self, cursor: &Cursor) -> Result<Url> {
    let invalid = || Error::InvalidCursor(cursor.as_str().to_owned());
    let url = Url::parse(cursor.as_str()).map_err(|_| invalid())?;

    let same_origin = url.origin() == self.endpoint.origin();
    let base_path = self.endpoint.path().trim_end_matches('/');
    let under_base = url
      .path()
      .strip_prefix(base_path)
      .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if !same_origin || !under_base {
      return Err(invalid());
    }

    Ok(url)
  }
}

/// Cursors end up in pages served to browsers, so they never carry the
/// access token. It is added back when the cursor is followed.
fn strip_access_token(url: &Url) -> Url {
  let pairs: Vec<(String, String)> = url
    .query_pairs()
    .filter(|(k, _)| k != ACCESS_TOKEN)
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  let mut url = url.clone();
  if pairs.is_empty() {
    url.set_query(None);
  } else {
    url.query_pairs_mut().clear().extend_pairs(pairs);
  }
  url
}

fn strip_cursor(cursor: Option<Cursor>) -> Option<Cursor> {
  cursor.map(|cursor| match Url::parse(cursor.as_str()) {
    Ok(url) => Cursor::new(strip_access_token(&url).to_string()),
    Err(_) => cursor,
  })
}

fn sanitize(mut resp: SearchResponse) -> SearchResponse {
  resp.next_page = strip_cursor(resp.next_page);
  resp.prev_page = strip_cursor(resp.prev_page);
  resp
}

#[async_trait::async_trait]
impl ContentApi for PrismicApi {
  async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
    let reference = match &query.reference {
      Some(reference) => reference.clone(),
      None => self.master_ref().await?,
    };
    let url = self.search_url(query, &reference)?;
    self.get_json(url).await.map(sanitize)
  }

  async fn follow(&self, cursor: &Cursor) -> Result<SearchResponse> {
    let url = self.cursor_url(cursor)?;
    self.get_json(url).await.map(sanitize)
  }
}
