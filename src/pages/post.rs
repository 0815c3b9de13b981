use chrono::{DateTime, FixedOffset};
use maud::{Markup, html};

use crate::{
  client::{ContentClient, ContentScope, SortOrder},
  content::{Post, Section, rich_text},
  util::{Result, date::display_date},
};

use super::{RenderSettings, layout};

const NEIGHBOR_FIELDS: &[&str] = &["title"];
const EDITED_FORMAT: &str = "%d %b %Y, às %H:%M";

/// Slugs of published posts to render ahead of time, newest API order.
pub async fn resolve_paths(
  client: &ContentClient,
  limit: usize,
) -> Result<Vec<String>> {
  client.list_uids(limit).await
}

pub async fn load_post(
  client: &ContentClient,
  slug: &str,
  scope: &ContentScope,
) -> Result<Option<Post>> {
  let doc = client.get_by_uid(slug, scope).await?;
  Ok(doc.and_then(Post::from_document))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostLink {
  pub slug: String,
  pub title: String,
}

/// The posts published right before and right after a given post.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Neighbors {
  pub previous: Option<PostLink>,
  pub next: Option<PostLink>,
}

pub async fn find_neighbors(
  client: &ContentClient,
  post: &Post,
  scope: &ContentScope,
) -> Result<Neighbors> {
  let (previous, next) = futures::try_join!(
    client.adjacent(&post.id, SortOrder::Descending, NEIGHBOR_FIELDS, scope),
    client.adjacent(&post.id, SortOrder::Ascending, NEIGHBOR_FIELDS, scope),
  )?;

  let link = |doc: crate::content::Document| {
    doc.uid.map(|slug| PostLink {
      slug,
      title: doc.data.title,
    })
  };

  Ok(Neighbors {
    previous: previous.and_then(link),
    next: next.and_then(link),
  })
}

pub fn word_count(sections: &[Section]) -> usize {
  sections
    .iter()
    .map(|section| {
      section.heading.split_whitespace().count()
        + rich_text::as_text(&section.body).split_whitespace().count()
    })
    .sum()
}

/// Whole minutes, rounded up.
pub fn reading_time(sections: &[Section], words_per_minute: usize) -> usize {
  word_count(sections).div_ceil(words_per_minute.max(1))
}

/// Everything the post page renders.
#[derive(Clone, Debug)]
pub struct PostPage {
  pub post: Post,
  pub neighbors: Neighbors,
  pub reading_time: usize,
}

/// `None` when no post has this slug in the given scope.
pub async fn load_post_page(
  client: &ContentClient,
  slug: &str,
  scope: &ContentScope,
  settings: &RenderSettings,
) -> Result<Option<PostPage>> {
  let Some(post) = load_post(client, slug, scope).await? else {
    return Ok(None);
  };
  let neighbors = find_neighbors(client, &post, scope).await?;
  let reading_time = reading_time(&post.content, settings.words_per_minute);

  Ok(Some(PostPage {
    post,
    neighbors,
    reading_time,
  }))
}

fn date_fragment(
  date: &DateTime<FixedOffset>,
  settings: &RenderSettings,
) -> Markup {
  html! {
    time datetime=(date.to_rfc3339()) { (display_date(date, settings.locale)) }
  }
}

pub fn render_post(
  page: &PostPage,
  settings: &RenderSettings,
  scope: &ContentScope,
) -> Markup {
  let post = &page.post;
  let links = &settings.links;
  let current = links.resolve_post(&post.slug);
  let banner = post.banner.as_ref().and_then(|image| {
    Some((image.url.as_deref()?, image.alt.as_deref().unwrap_or("")))
  });

  let body = html! {
    @if let Some((src, alt)) = banner {
      img .banner src=(src) alt=(alt);
    }
    main .container {
      article .post {
        h1 { (post.title) }
        div .post-meta {
          @if let Some(date) = &post.first_publication_date {
            (date_fragment(date, settings))
          }
          span .author { (post.author) }
          span .reading-time { (page.reading_time) " min" }
        }
        @if post.was_edited() {
          @if let Some(edited) = &post.last_publication_date {
            p .edited {
              "* editado em "
              (edited.format_localized(EDITED_FORMAT, settings.locale))
            }
          }
        }
        @for section in &post.content {
          section {
            h2 { (section.heading) }
            div .post-body { (rich_text::as_html(&section.body, links)) }
          }
        }
      }
      nav .post-navigation {
        @if let Some(previous) = &page.neighbors.previous {
          div .previous {
            span { (previous.title) }
            a href=(links.resolve_post(&previous.slug)) { "Post anterior" }
          }
        }
        @if let Some(next) = &page.neighbors.next {
          div .next {
            span { (next.title) }
            a href=(links.resolve_post(&next.slug)) { "Próximo post" }
          }
        }
      }
    }
  };

  let title = format!("{} | {}", post.title, settings.site_name);
  layout(settings, &title, scope, &current, body)
}
