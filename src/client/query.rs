use std::fmt;

use super::ContentScope;

/// Ordering field the neighbor lookups sort on.
pub const PUBLICATION_DATE: &str = "document.first_publication_date";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
  DocumentType(String),
  DocumentId(String),
  Uid { doc_type: String, uid: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
  Ascending,
  Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ordering {
  pub field: String,
  pub order: SortOrder,
}

/// A structured search request. The transport decides how to encode it;
/// for the HTTP API this becomes the `documents/search` query string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
  pub predicate: Predicate,
  pub page_size: Option<usize>,
  pub page: Option<usize>,
  pub fetch: Vec<String>,
  pub ordering: Option<Ordering>,
  /// Internal document id to continue after, in `ordering` order.
  pub after: Option<String>,
  /// Content reference; `None` means the published (master) snapshot.
  pub reference: Option<String>,
}

impl Ordering {
  pub fn by_publication(order: SortOrder) -> Self {
    Self {
      field: PUBLICATION_DATE.to_owned(),
      order,
    }
  }
}

impl SearchQuery {
  pub fn new(predicate: Predicate) -> Self {
    Self {
      predicate,
      page_size: None,
      page: None,
      fetch: Vec::new(),
      ordering: None,
      after: None,
      reference: None,
    }
  }

  pub fn page_size(mut self, page_size: usize) -> Self {
    self.page_size = Some(page_size);
    self
  }

  pub fn page(mut self, page: usize) -> Self {
    self.page = Some(page);
    self
  }

  pub fn fetch<S: Into<String>>(
    mut self,
    fields: impl IntoIterator<Item = S>,
  ) -> Self {
    self.fetch = fields.into_iter().map(Into::into).collect();
    self
  }

  pub fn ordering(mut self, ordering: Ordering) -> Self {
    self.ordering = Some(ordering);
    self
  }

  pub fn after(mut self, id: impl Into<String>) -> Self {
    self.after = Some(id.into());
    self
  }

  pub fn scoped(mut self, scope: &ContentScope) -> Self {
    self.reference = scope.reference().map(ToOwned::to_owned);
    self
  }
}

fn quote(value: &str) -> String {
  let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
  format!("\"{escaped}\"")
}

impl fmt::Display for Predicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Predicate::DocumentType(doc_type) => {
        write!(f, "[[at(document.type, {})]]", quote(doc_type))
      }
      Predicate::DocumentId(id) => {
        write!(f, "[[at(document.id, {})]]", quote(id))
      }
      Predicate::Uid { doc_type, uid } => {
        write!(f, "[[at(my.{doc_type}.uid, {})]]", quote(uid))
      }
    }
  }
}

impl fmt::Display for Ordering {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.order {
      SortOrder::Ascending => write!(f, "[{}]", self.field),
      SortOrder::Descending => write!(f, "[{} desc]", self.field),
    }
  }
}
