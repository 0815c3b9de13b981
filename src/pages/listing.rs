use maud::{Markup, html};
use serde::Serialize;

use crate::{
  client::{ContentClient, ContentScope},
  content::{Cursor, PostSummary, SearchResponse},
  util::{Result, date::display_date},
};

use super::{RenderSettings, layout};

/// Fields a listing entry needs.
pub const SUMMARY_FIELDS: &[&str] = &["title", "subtitle", "author"];

/// One page of the post listing plus the cursor to the page after it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListingPage {
  pub items: Vec<PostSummary>,
  pub cursor: Option<Cursor>,
}

impl From<SearchResponse> for ListingPage {
  fn from(resp: SearchResponse) -> Self {
    Self {
      items: resp
        .results
        .into_iter()
        .filter_map(PostSummary::from_document)
        .collect(),
      cursor: resp.next_page,
    }
  }
}

pub async fn load_initial_page(
  client: &ContentClient,
  page_size: usize,
  scope: &ContentScope,
) -> Result<ListingPage> {
  let resp = client
    .query_by_type(page_size, SUMMARY_FIELDS, scope)
    .await?;
  Ok(resp.into())
}

pub async fn load_next_page(
  client: &ContentClient,
  cursor: &Cursor,
) -> Result<ListingPage> {
  let resp = client.follow(cursor).await?;
  Ok(resp.into())
}

/// Accumulated listing state. Items only ever grow; the cursor always
/// belongs to the most recently appended page.
#[derive(Clone, Debug, Default)]
pub struct PostListing {
  items: Vec<PostSummary>,
  cursor: Option<Cursor>,
}

impl PostListing {
  pub fn new(initial: ListingPage) -> Self {
    Self {
      items: initial.items,
      cursor: initial.cursor,
    }
  }

  pub fn append(&mut self, page: ListingPage) {
    self.items.extend(page.items);
    self.cursor = page.cursor;
  }

  pub fn items(&self) -> &[PostSummary] {
    &self.items
  }

  pub fn cursor(&self) -> Option<&Cursor> {
    self.cursor.as_ref()
  }

  /// Fetch and append the next page. Returns `false` without touching
  /// the network once the listing is exhausted.
  pub async fn load_more(&mut self, client: &ContentClient) -> Result<bool> {
    let Some(cursor) = self.cursor.clone() else {
      return Ok(false);
    };
    let page = load_next_page(client, &cursor).await?;
    self.append(page);
    Ok(true)
  }
}

/// JSON shape of a listing entry, as consumed by the "load more" script.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryView {
  pub slug: String,
  pub url: String,
  pub first_publication_date: Option<String>,
  pub display_date: Option<String>,
  pub title: String,
  pub subtitle: String,
  pub author: String,
}

impl SummaryView {
  pub fn new(summary: &PostSummary, settings: &RenderSettings) -> Self {
    Self {
      slug: summary.slug.clone(),
      url: settings.links.resolve_post(&summary.slug),
      first_publication_date: summary
        .first_publication_date
        .map(|date| date.to_rfc3339()),
      display_date: summary
        .first_publication_date
        .map(|date| display_date(&date, settings.locale)),
      title: summary.title.clone(),
      subtitle: summary.subtitle.clone(),
      author: summary.author.clone(),
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PageView {
  pub results: Vec<SummaryView>,
  /// Where the browser asks for the page after this one.
  pub next_page: Option<String>,
}

impl PageView {
  pub fn new(page: &ListingPage, settings: &RenderSettings) -> Self {
    Self {
      results: page
        .items
        .iter()
        .map(|summary| SummaryView::new(summary, settings))
        .collect(),
      next_page: page.cursor.as_ref().map(next_page_url),
    }
  }
}

pub fn next_page_url(cursor: &Cursor) -> String {
  format!("/api/posts?cursor={}", urlencoding::encode(cursor.as_str()))
}

pub fn render_home(
  listing: &PostListing,
  settings: &RenderSettings,
  scope: &ContentScope,
) -> Markup {
  let body = html! {
    main .container {
      div #posts {
        @for summary in listing.items() {
          (summary_fragment(&SummaryView::new(summary, settings)))
        }
      }
      @if let Some(cursor) = listing.cursor() {
        button #load-more .load-more type="button"
          data-next=(next_page_url(cursor)) {
          "Carregar mais posts"
        }
      }
    }
  };

  layout(settings, &settings.site_name, scope, "/", body)
}

fn summary_fragment(view: &SummaryView) -> Markup {
  html! {
    article .post-summary {
      a href=(view.url) {
        strong { (view.title) }
        p { (view.subtitle) }
        div .post-meta {
          @if let (Some(iso), Some(shown)) =
            (&view.first_publication_date, &view.display_date) {
            time datetime=(iso) { (shown) }
          }
          span .author { (view.author) }
        }
      }
    }
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use url::Url;

  use super::*;
  use crate::{
    config::SiteConfig,
    test_utils::{FixtureApi, fixture_posts},
  };

  fn client(n: usize) -> ContentClient {
    ContentClient::new(Arc::new(FixtureApi::new(fixture_posts(n))), "posts")
  }

  fn settings() -> RenderSettings {
    let endpoint = Url::parse("https://blog.cdn.prismic.io/api/v2").unwrap();
    let config = SiteConfig::new(endpoint);
    RenderSettings::from_config(&config).unwrap()
  }

  #[tokio::test]
  async fn test_load_initial_page() {
    let client = client(3);
    let page = load_initial_page(&client, 1, &ContentScope::Published)
      .await
      .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].slug, "post-1");
    assert!(page.cursor.is_some());

    let page = load_initial_page(&client, 10, &ContentScope::Published)
      .await
      .unwrap();
    assert_eq!(page.items.len(), 3);
    assert!(page.cursor.is_none());
  }

  #[tokio::test]
  async fn test_load_more_until_exhausted() {
    let client = client(3);
    let initial = load_initial_page(&client, 1, &ContentScope::Published)
      .await
      .unwrap();
    let mut listing = PostListing::new(initial);

    assert!(listing.load_more(&client).await.unwrap());
    assert!(listing.load_more(&client).await.unwrap());
    assert!(listing.cursor().is_none());
    assert!(!listing.load_more(&client).await.unwrap());

    let slugs: Vec<_> =
      listing.items().iter().map(|s| s.slug.as_str()).collect();
    assert_eq!(slugs, ["post-1", "post-2", "post-3"]);
  }

  #[test]
  fn test_append_keeps_existing_items() {
    let summary = |slug: &str| PostSummary {
      slug: slug.into(),
      first_publication_date: None,
      title: slug.into(),
      subtitle: String::new(),
      author: String::new(),
    };

    let mut listing = PostListing::new(ListingPage {
      items: vec![summary("a"), summary("b")],
      cursor: Some(Cursor::new("c1")),
    });
    listing.append(ListingPage {
      items: vec![summary("c")],
      cursor: Some(Cursor::new("c2")),
    });
    assert_eq!(listing.items().len(), 3);
    assert_eq!(listing.items()[0].slug, "a");
    assert_eq!(listing.cursor(), Some(&Cursor::new("c2")));

    // an empty last page still replaces the cursor
    listing.append(ListingPage::default());
    assert_eq!(listing.items().len(), 3);
    assert!(listing.cursor().is_none());
  }

  #[tokio::test]
  async fn test_invalid_cursor_is_rejected() {
    let client = client(3);
    let err = load_next_page(&client, &Cursor::new("https://evil.example/"))
      .await
      .unwrap_err();
    assert!(matches!(err, crate::util::Error::InvalidCursor(_)));
  }

  #[tokio::test]
  async fn test_render_home() {
    let client = client(2);
    let settings = settings();
    let initial = load_initial_page(&client, 1, &ContentScope::Published)
      .await
      .unwrap();
    let listing = PostListing::new(initial);

    let html = render_home(&listing, &settings, &ContentScope::Published)
      .into_string();
    assert!(html.contains("href=\"/post/post-1\""));
    assert!(html.contains("02 jan 2021"));
    assert!(html.contains("Carregar mais posts"));
    assert!(html.contains("data-next=\"/api/posts?cursor="));

    let view = PageView::new(
      &ListingPage {
        items: listing.items().to_vec(),
        cursor: None,
      },
      &settings,
    );
    assert_eq!(view.next_page, None);
    assert_eq!(view.results[0].display_date.as_deref(), Some("02 jan 2021"));
    assert_eq!(view.results[0].url, "/post/post-1");
  }
}
