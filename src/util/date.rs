use chrono::{DateTime, FixedOffset, Locale, NaiveDate, NaiveDateTime};

/// Dates are shown as `dd MMM yyyy` with the locale's month abbreviation.
pub const DISPLAY_FORMAT: &str = "%d %b %Y";

const COMMON_DATE_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%z",  // Prismic format, e.g. 2021-03-25T19:25:28+0000
  "%Y-%m-%d %H:%M:%S %z", // Common format with timezone
  "%Y-%m-%d %H:%M:%S",    // Common format without timezone
];

pub fn parse_date(date_str: impl AsRef<str>) -> Option<DateTime<FixedOffset>> {
  let date_str = date_str.as_ref().trim();
  if date_str.is_empty() {
    return None;
  }

  if let Ok(parsed) = DateTime::parse_from_rfc3339(date_str) {
    return Some(parsed);
  }

  if let Ok(parsed) = DateTime::parse_from_rfc2822(date_str) {
    return Some(parsed);
  }

  for fmt in COMMON_DATE_FORMATS {
    if let Ok(parsed) = DateTime::parse_from_str(date_str, fmt) {
      return Some(parsed);
    }

    // timestamps without an offset are taken as UTC
    if let Ok(parsed) = NaiveDateTime::parse_from_str(date_str, fmt) {
      return Some(parsed.and_utc().fixed_offset());
    }
  }

  NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|date| date.and_utc().fixed_offset())
}

/// Accepts both `pt_BR` and `pt-BR` spellings.
pub fn parse_locale(name: &str) -> Option<Locale> {
  let normalized = name.trim().replace('-', "_");
  Locale::try_from(normalized.as_str()).ok()
}

pub fn display_date(date: &DateTime<FixedOffset>, locale: Locale) -> String {
  date.format_localized(DISPLAY_FORMAT, locale).to_string()
}
