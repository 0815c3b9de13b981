use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
  },
};

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use url::Url;

use crate::{
  client::{ContentApi, ContentClient, Predicate, SearchQuery, SortOrder},
  config::SiteConfig,
  content::{Cursor, Document, SearchResponse},
  server::BlogService,
  util::{Error, Result, date::parse_date},
};

const FIXTURE_BASE: &str = "https://fixture.test/api/v2/documents/search";
const DEFAULT_PAGE_SIZE: usize = 20;

/// `n` posts, `post-1` published first. Ids are `ID1..IDn`.
pub fn fixture_posts(n: usize) -> Vec<Document> {
  (1..=n).map(fixture_post).collect()
}

pub fn fixture_post(i: usize) -> Document {
  let published = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap()
    + Duration::days(i as i64);
  let date = published.format("%Y-%m-%dT%H:%M:%S+0000").to_string();

  serde_json::from_value(json!({
    "id": format!("ID{i}"),
    "uid": format!("post-{i}"),
    "type": "posts",
    "first_publication_date": date,
    "last_publication_date": date,
    "data": {
      "title": format!("Post {i}"),
      "subtitle": format!("Subtitle {i}"),
      "author": "Ana",
      "banner": { "url": null },
      "content": [{
        "heading": format!("Heading {i}"),
        "body": [{ "type": "paragraph", "text": "some body text", "spans": [] }]
      }]
    }
  }))
  .expect("fixture document")
}

/// A started service over `api`, with the site config adjusted by `tweak`.
pub async fn test_service(
  api: FixtureApi,
  tweak: impl FnOnce(&mut SiteConfig),
) -> (BlogService, Arc<FixtureApi>) {
  let endpoint = Url::parse("https://fixture.test/api/v2").expect("url");
  let mut config = SiteConfig::new(endpoint);
  config.cookie_secret = Some("a-long-enough-secret".into());
  tweak(&mut config);

  let api = Arc::new(api);
  let client = ContentClient::new(api.clone(), "posts");
  let service = BlogService::with_client(&config, client)
    .await
    .expect("service");
  (service, api)
}

/// In-memory content API. Documents are returned in insertion order unless
/// the query asks for a publication-date ordering.
pub struct FixtureApi {
  published: Vec<Document>,
  previews: HashMap<String, Vec<Document>>,
  calls: AtomicUsize,
}

impl FixtureApi {
  pub fn new(published: Vec<Document>) -> Self {
    Self {
      published,
      previews: HashMap::new(),
      calls: AtomicUsize::new(0),
    }
  }

  /// Accept `reference` as a preview ref showing the published content.
  pub fn with_preview_ref(self, reference: &str) -> Self {
    let docs = self.published.clone();
    self.with_preview(reference, docs)
  }

  /// Accept `reference` as a preview ref showing `docs`.
  pub fn with_preview(mut self, reference: &str, docs: Vec<Document>) -> Self {
    self.previews.insert(reference.to_owned(), docs);
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(AtomicOrdering::SeqCst)
  }

  fn snapshot(&self, reference: Option<&str>) -> Result<&[Document]> {
    match reference {
      None | Some("master") => Ok(&self.published),
      Some(reference) => match self.previews.get(reference) {
        Some(docs) => Ok(docs),
        None => {
          let url = Url::parse(FIXTURE_BASE).expect("fixture url");
          Err(Error::HttpStatus(reqwest::StatusCode::BAD_REQUEST, url))
        }
      },
    }
  }

  fn run(&self, query: &SearchQuery) -> Result<SearchResponse> {
    self.calls.fetch_add(1, AtomicOrdering::SeqCst);

    let mut docs: Vec<&Document> = self
      .snapshot(query.reference.as_deref())?
      .iter()
      .filter(|doc| matches_predicate(&query.predicate, doc))
      .collect();

    if let Some(ordering) = &query.ordering {
      docs.sort_by_key(|doc| {
        doc.first_publication_date.as_deref().and_then(parse_date)
      });
      if ordering.order == SortOrder::Descending {
        docs.reverse();
      }
    }

    if let Some(after) = &query.after {
      if let Some(pos) = docs.iter().position(|doc| &doc.id == after) {
        docs = docs.split_off(pos + 1);
      }
    }

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let total = docs.len();
    let total_pages = total.div_ceil(page_size);

    let results: Vec<Document> = docs
      .into_iter()
      .skip((page - 1) * page_size)
      .take(page_size)
      .cloned()
      .collect();

    let next_page = match &query.predicate {
      Predicate::DocumentType(doc_type) if page < total_pages => {
        let mut url = Url::parse(FIXTURE_BASE).expect("fixture url");
        url
          .query_pairs_mut()
          .append_pair("type", doc_type)
          .append_pair("page", &(page + 1).to_string())
          .append_pair("pageSize", &page_size.to_string())
          .append_pair("ref", query.reference.as_deref().unwrap_or("master"));
        Some(Cursor::new(url.to_string()))
      }
      _ => None,
    };

    Ok(SearchResponse {
      page,
      results_per_page: page_size,
      total_results_size: total,
      total_pages,
      next_page,
      prev_page: None,
      results,
    })
  }
}

fn matches_predicate(predicate: &Predicate, doc: &Document) -> bool {
  match predicate {
    Predicate::DocumentType(doc_type) => &doc.doc_type == doc_type,
    Predicate::DocumentId(id) => &doc.id == id,
    Predicate::Uid { doc_type, uid } => {
      &doc.doc_type == doc_type && doc.uid.as_deref() == Some(uid.as_str())
    }
  }
}

#[async_trait::async_trait]
impl ContentApi for FixtureApi {
  async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
    self.run(query)
  }

  async fn follow(&self, cursor: &Cursor) -> Result<SearchResponse> {
    let invalid = || Error::InvalidCursor(cursor.as_str().to_owned());
    let url = Url::parse(cursor.as_str()).map_err(|_| invalid())?;
    if url.host_str() != Some("fixture.test") {
      return Err(invalid());
    }

    let param = |name: &str| {
      url
        .query_pairs()
        .find_map(|(k, v)| (k == name).then(|| v.into_owned()))
    };

    let doc_type = param("type").ok_or_else(invalid)?;
    let page = param("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size = param("pageSize")
      .and_then(|p| p.parse().ok())
      .unwrap_or(DEFAULT_PAGE_SIZE);

    let mut query = SearchQuery::new(Predicate::DocumentType(doc_type))
      .page(page)
      .page_size(page_size);
    query.reference = param("ref").filter(|r| r != "master");
    self.run(&query)
  }
}
