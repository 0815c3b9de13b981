pub mod rich_text;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

use crate::util::date::parse_date;

pub use self::rich_text::Block;

/// A document as returned by the content API search endpoint.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
  /// Internal API identifier. This is what `after` cursors refer to.
  pub id: String,
  pub uid: Option<String>,
  #[serde(rename = "type")]
  pub doc_type: String,
  #[serde(default)]
  pub first_publication_date: Option<String>,
  #[serde(default)]
  pub last_publication_date: Option<String>,
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub data: PostData,
}

/// The `data` of a post document. Queries restricted with `fetch` return a
/// subset of these fields; the rest fall back to their defaults.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PostData {
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub title: String,
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub subtitle: String,
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub author: String,
  #[serde(default)]
  pub banner: Option<Image>,
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub content: Vec<Section>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Image {
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub alt: Option<String>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Section {
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub heading: String,
  #[serde_as(deserialize_as = "DefaultOnNull")]
  #[serde(default)]
  pub body: Vec<Block>,
}

/// One page of search results.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SearchResponse {
  #[serde(default)]
  pub page: usize,
  #[serde(default)]
  pub results_per_page: usize,
  #[serde(default)]
  pub total_results_size: usize,
  #[serde(default)]
  pub total_pages: usize,
  #[serde(default)]
  pub next_page: Option<Cursor>,
  #[serde(default)]
  pub prev_page: Option<Cursor>,
  pub results: Vec<Document>,
}

/// Opaque continuation token issued by the content API. It happens to be a
/// URL, but nothing outside the client should rely on that.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// A post ready for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
  pub id: String,
  pub slug: String,
  pub first_publication_date: Option<DateTime<FixedOffset>>,
  pub last_publication_date: Option<DateTime<FixedOffset>>,
  pub title: String,
  pub subtitle: String,
  pub author: String,
  pub banner: Option<Image>,
  pub content: Vec<Section>,
}

/// The listing projection of a post.
#[derive(Clone, Debug, PartialEq)]
pub struct PostSummary {
  pub slug: String,
  pub first_publication_date: Option<DateTime<FixedOffset>>,
  pub title: String,
  pub subtitle: String,
  pub author: String,
}

/// Maps documents to site paths. Posts live under `/post/<uid>`; every
/// other document type has no page of its own and resolves to the home page.
#[derive(Clone, Debug)]
pub struct LinkResolver {
  post_type: String,
}

impl LinkResolver {
  pub fn new(post_type: impl Into<String>) -> Self {
    Self {
      post_type: post_type.into(),
    }
  }

  pub fn resolve_document(&self, doc_type: &str, uid: Option<&str>) -> String {
    match uid {
      Some(uid) if doc_type == self.post_type => self.resolve_post(uid),
      _ => "/".to_owned(),
    }
  }

  pub fn resolve_post(&self, uid: &str) -> String {
    format!("/post/{}", urlencoding::encode(uid))
  }

  pub fn resolve_link(&self, link: &rich_text::LinkData) -> String {
    if let Some(url) = &link.url {
      return url.clone();
    }

    match &link.doc_type {
      Some(doc_type) => self.resolve_document(doc_type, link.uid.as_deref()),
      None => "/".to_owned(),
    }
  }
}

impl Post {
  /// Documents without a uid cannot be addressed by `/post/<slug>`.
  pub fn from_document(doc: Document) -> Option<Self> {
    let slug = doc.uid?;
    Some(Self {
      id: doc.id,
      slug,
      first_publication_date: doc
        .first_publication_date
        .as_deref()
        .and_then(parse_date),
      last_publication_date: doc
        .last_publication_date
        .as_deref()
        .and_then(parse_date),
      title: doc.data.title,
      subtitle: doc.data.subtitle,
      author: doc.data.author,
      banner: doc.data.banner.filter(|image| image.url.is_some()),
      content: doc.data.content,
    })
  }

  pub fn was_edited(&self) -> bool {
    match (self.first_publication_date, self.last_publication_date) {
      (Some(first), Some(last)) => last > first,
      _ => false,
    }
  }
}

impl PostSummary {
  pub fn from_document(doc: Document) -> Option<Self> {
    let slug = doc.uid?;
    Some(Self {
      slug,
      first_publication_date: doc
        .first_publication_date
        .as_deref()
        .and_then(parse_date),
      title: doc.data.title,
      subtitle: doc.data.subtitle,
      author: doc.data.author,
    })
  }
}
