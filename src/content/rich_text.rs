//! Rendering of structured text fields.
//!
//! A structured text field is a list of blocks. Text blocks carry inline
//! spans whose `start`/`end` are offsets in UTF-16 code units, so they have
//! to be mapped back onto byte offsets before slicing.

use std::collections::BTreeSet;

use htmlescape::{encode_attribute, encode_minimal};
use itertools::Itertools;
use maud::PreEscaped;
use serde::{Deserialize, Serialize};

use super::LinkResolver;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
  Heading1,
  Heading2,
  Heading3,
  Heading4,
  Heading5,
  Heading6,
  Paragraph,
  Preformatted,
  ListItem,
  OListItem,
  Image,
  Embed,
  #[serde(other)]
  Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Block {
  #[serde(rename = "type")]
  pub kind: BlockKind,
  #[serde(default)]
  pub text: String,
  #[serde(default)]
  pub spans: Vec<Span>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub alt: Option<String>,
  #[serde(default)]
  pub oembed: Option<Embed>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Embed {
  #[serde(default)]
  pub embed_url: Option<String>,
  #[serde(default)]
  pub title: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Span {
  pub start: usize,
  pub end: usize,
  #[serde(rename = "type")]
  pub kind: SpanKind,
  #[serde(default)]
  pub data: Option<LinkData>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
  Strong,
  Em,
  Hyperlink,
  Label,
  #[serde(other)]
  Unknown,
}

/// Target of a hyperlink span: either a web link (`url`) or a link to
/// another document (`type` + `uid`).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LinkData {
  #[serde(default)]
  pub link_type: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub uid: Option<String>,
  #[serde(default, rename = "type")]
  pub doc_type: Option<String>,
  #[serde(default)]
  pub target: Option<String>,
}

impl Block {
  fn list_kind(&self) -> Option<BlockKind> {
    match self.kind {
      BlockKind::ListItem | BlockKind::OListItem => Some(self.kind),
      _ => None,
    }
  }
}

/// Plain text of all text blocks, separated by single spaces.
pub fn as_text(blocks: &[Block]) -> String {
  blocks
    .iter()
    .filter(|block| !matches!(block.kind, BlockKind::Image | BlockKind::Embed))
    .map(|block| block.text.as_str())
    .join(" ")
}

/// Sanitized HTML for a structured text field.
pub fn as_html(
  blocks: &[Block],
  resolver: &LinkResolver,
) -> PreEscaped<String> {
  let mut out = String::new();

  for (list_kind, group) in &blocks.iter().group_by(|block| block.list_kind()) {
    match list_kind {
      Some(kind) => {
        let tag = if kind == BlockKind::OListItem { "ol" } else { "ul" };
        out.push_str(&format!("<{tag}>"));
        for block in group {
          out.push_str("<li>");
          out.push_str(&render_spans(&block.text, &block.spans, resolver));
          out.push_str("</li>");
        }
        out.push_str(&format!("</{tag}>"));
      }
      None => {
        for block in group {
          render_block(&mut out, block, resolver);
        }
      }
    }
  }

  PreEscaped(ammonia::clean(&out))
}

fn render_block(out: &mut String, block: &Block, resolver: &LinkResolver) {
  let tag = match block.kind {
    BlockKind::Heading1 => "h1",
    BlockKind::Heading2 => "h2",
    BlockKind::Heading3 => "h3",
    BlockKind::Heading4 => "h4",
    BlockKind::Heading5 => "h5",
    BlockKind::Heading6 => "h6",
    BlockKind::Paragraph => "p",
    BlockKind::Preformatted => "pre",
    BlockKind::Image => {
      if let Some(url) = &block.url {
        let alt = block.alt.as_deref().unwrap_or_default();
        out.push_str(&format!(
          r#"<p><img src="{}" alt="{}"></p>"#,
          encode_attribute(url),
          encode_attribute(alt)
        ));
      }
      return;
    }
    BlockKind::Embed => {
      let Some(embed) = &block.oembed else { return };
      if let Some(url) = &embed.embed_url {
        let title = embed.title.as_deref().unwrap_or(url);
        out.push_str(&format!(
          r#"<p><a href="{}">{}</a></p>"#,
          encode_attribute(url),
          encode_minimal(title)
        ));
      }
      return;
    }
    BlockKind::ListItem | BlockKind::OListItem | BlockKind::Unknown => "p",
  };

  out.push_str(&format!("<{tag}>"));
  out.push_str(&render_spans(&block.text, &block.spans, resolver));
  out.push_str(&format!("</{tag}>"));
}

fn render_spans(text: &str, spans: &[Span], resolver: &LinkResolver) -> String {
  let text_len = text.encode_utf16().count();

  // outer spans first: earlier start, then longer extent
  let spans: Vec<&Span> = spans
    .iter()
    .filter(|span| span.start < span.end && span.start < text_len)
    .sorted_by_key(|span| (span.start, std::cmp::Reverse(span.end)))
    .collect();

  let mut boundaries = BTreeSet::from([0, text_len]);
  for span in &spans {
    boundaries.insert(span.start);
    boundaries.insert(span.end.min(text_len));
  }

  let mut out = String::new();
  let mut open: Vec<usize> = Vec::new();

  for (from, to) in boundaries.into_iter().tuple_windows() {
    let active: Vec<usize> = spans
      .iter()
      .enumerate()
      .filter(|(_, span)| span.start <= from && span.end >= to)
      .map(|(i, _)| i)
      .collect();

    let common = open
      .iter()
      .zip(&active)
      .take_while(|(a, b)| a == b)
      .count();
    while open.len() > common {
      if let Some(i) = open.pop() {
        out.push_str(close_tag(spans[i]));
      }
    }
    for &i in &active[common..] {
      out.push_str(&open_tag(spans[i], resolver));
      open.push(i);
    }

    let segment = &text[utf16_to_byte(text, from)..utf16_to_byte(text, to)];
    out.push_str(&encode_minimal(segment).replace('\n', "<br>"));
  }

  while let Some(i) = open.pop() {
    out.push_str(close_tag(spans[i]));
  }

  out
}

fn open_tag(span: &Span, resolver: &LinkResolver) -> String {
  match span.kind {
    SpanKind::Strong => "<strong>".into(),
    SpanKind::Em => "<em>".into(),
    SpanKind::Hyperlink => {
      let data = span.data.clone().unwrap_or_default();
      let href = resolver.resolve_link(&data);
      match data.target.as_deref() {
        Some(target) => format!(
          r#"<a href="{}" target="{}">"#,
          encode_attribute(&href),
          encode_attribute(target)
        ),
        None => format!(r#"<a href="{}">"#, encode_attribute(&href)),
      }
    }
    SpanKind::Label | SpanKind::Unknown => "<span>".into(),
  }
}

fn close_tag(span: &Span) -> &'static str {
  match span.kind {
    SpanKind::Strong => "</strong>",
    SpanKind::Em => "</em>",
    SpanKind::Hyperlink => "</a>",
    SpanKind::Label | SpanKind::Unknown => "</span>",
  }
}

fn utf16_to_byte(text: &str, offset: usize) -> usize {
  let mut units = 0;
  for (byte, c) in text.char_indices() {
    if units >= offset {
      return byte;
    }
    units += c.len_utf16();
  }
  text.len()
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;

  fn blocks(value: serde_json::Value) -> Vec<Block> {
    serde_json::from_value(value).unwrap()
  }

  fn resolver() -> LinkResolver {
    LinkResolver::new("posts")
  }

  #[test]
  fn test_as_text() {
    let blocks = blocks(json!([
      { "type": "heading2", "text": "Title", "spans": [] },
      { "type": "paragraph", "text": "first paragraph", "spans": [] },
      { "type": "image", "url": "https://images.prismic.io/a.png" },
      { "type": "list-item", "text": "item", "spans": [] }
    ]));
    assert_eq!(as_text(&blocks), "Title first paragraph item");
  }

  #[test]
  fn test_unknown_block_type() {
    let blocks = blocks(json!([
      { "type": "table", "text": "cells", "spans": [] }
    ]));
    assert_eq!(blocks[0].kind, BlockKind::Unknown);
    assert_eq!(as_html(&blocks, &resolver()).0, "<p>cells</p>");
  }

  #[test]
  fn test_spans() {
    let blocks = blocks(json!([{
      "type": "paragraph",
      "text": "a bold and linked word",
      "spans": [
        { "start": 2, "end": 6, "type": "strong" },
        { "start": 11, "end": 17, "type": "hyperlink",
          "data": { "link_type": "Web", "url": "https://example.com" } }
      ]
    }]));

    let html = as_html(&blocks, &resolver()).0;
    assert!(html.starts_with(
      "<p>a <strong>bold</strong> and <a href=\"https://example.com\""
    ));
    assert!(html.contains(">linked</a> word</p>"));
  }

  #[test]
  fn test_overlapping_spans() {
    let blocks = blocks(json!([{
      "type": "paragraph",
      "text": "abcdef",
      "spans": [
        { "start": 0, "end": 4, "type": "strong" },
        { "start": 2, "end": 6, "type": "em" }
      ]
    }]));

    assert_eq!(
      as_html(&blocks, &resolver()).0,
      "<p><strong>ab<em>cd</em></strong><em>ef</em></p>"
    );
  }

  #[test]
  fn test_utf16_offsets() {
    // "é" is one UTF-16 unit but two bytes; the emoji is two units
    let blocks = blocks(json!([{
      "type": "paragraph",
      "text": "é 😀 ok",
      "spans": [{ "start": 5, "end": 7, "type": "em" }]
    }]));

    assert_eq!(as_html(&blocks, &resolver()).0, "<p>é 😀 <em>ok</em></p>");
  }

  #[test]
  fn test_document_links() {
    let blocks = blocks(json!([{
      "type": "paragraph",
      "text": "see this",
      "spans": [{ "start": 4, "end": 8, "type": "hyperlink",
        "data": { "link_type": "Document", "type": "posts", "uid": "other" } }]
    }]));

    let html = as_html(&blocks, &resolver()).0;
    assert!(html.contains("href=\"/post/other\""));
  }

  #[test]
  fn test_lists_are_grouped() {
    let blocks = blocks(json!([
      { "type": "list-item", "text": "one", "spans": [] },
      { "type": "list-item", "text": "two", "spans": [] },
      { "type": "o-list-item", "text": "first", "spans": [] },
      { "type": "paragraph", "text": "after", "spans": [] }
    ]));

    assert_eq!(
      as_html(&blocks, &resolver()).0,
      "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
    );
  }

  #[test]
  fn test_escaping_and_sanitizing() {
    let blocks = blocks(json!([
      { "type": "paragraph", "text": "<script>alert(1)</script>", "spans": [] },
      { "type": "paragraph", "text": "click",
        "spans": [{ "start": 0, "end": 5, "type": "hyperlink",
          "data": { "link_type": "Web", "url": "javascript:alert(1)" } }] }
    ]));

    let html = as_html(&blocks, &resolver()).0;
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("javascript:"));
  }

  #[test]
  fn test_line_breaks() {
    let blocks = blocks(json!([
      { "type": "preformatted", "text": "line 1\nline 2", "spans": [] }
    ]));
    assert_eq!(as_html(&blocks, &resolver()).0, "<pre>line 1<br>line 2</pre>");
  }
}
