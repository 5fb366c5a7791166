//! Query-string form of a [`FilterSnapshot`].
//!
//! Encoding omits every field that equals its default so the URL stays minimal;
//! decoding is lenient and falls back to the default for anything it cannot read.

use url::form_urlencoded;

use tracing::{debug, warn};

use crate::filter::FilterSnapshot;

pub const SEARCH: &str = "search";
pub const STATUS: &str = "status";
pub const PRIORITY: &str = "priority";
pub const CATEGORY: &str = "category";
pub const PAGE: &str = "page";
pub const PAGE_SIZE: &str = "pageSize";

pub fn encode(snapshot: &FilterSnapshot) -> String {
    encode_with(snapshot, &FilterSnapshot::default())
}

/// Encodes `snapshot`, leaving out fields equal to the ones in `defaults`.
pub fn encode_with(snapshot: &FilterSnapshot, defaults: &FilterSnapshot) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());

    if !snapshot.search.is_empty() {
        out.append_pair(SEARCH, &snapshot.search);
    }
    if !snapshot.status.is_all() {
        out.append_pair(STATUS, &snapshot.status.to_string());
    }
    if !snapshot.priority.is_all() {
        out.append_pair(PRIORITY, &snapshot.priority.to_string());
    }
    if !snapshot.category.is_all() {
        out.append_pair(CATEGORY, &snapshot.category.to_string());
    }
    if snapshot.effective_page() > 1 {
        out.append_pair(PAGE, &snapshot.effective_page().to_string());
    }
    if snapshot.effective_page_size() != defaults.effective_page_size() {
        out.append_pair(PAGE_SIZE, &snapshot.effective_page_size().to_string());
    }

    out.finish()
}

pub fn decode(query: &str) -> FilterSnapshot {
    decode_with(query, FilterSnapshot::default())
}

/// Seeds a snapshot from `query`. Accepts a bare query, `?query`, or a path/URL
/// carrying one. The first occurrence of a key wins.
#[tracing::instrument(skip(defaults))]
pub fn decode_with(query: &str, defaults: FilterSnapshot) -> FilterSnapshot {
    let mut snapshot = defaults;
    let mut seen: Vec<String> = Vec::new();

    for (key, value) in form_urlencoded::parse(query_part(query).as_bytes()) {
        if seen.iter().any(|k| *k == key) {
            continue;
        }
        seen.push(key.to_string());

        match key.as_ref() {
            SEARCH => snapshot.search = value.into_owned(),
            STATUS => match value.parse() {
                Ok(status) => snapshot.status = status,
                Err(err) => warn!(error = %err, "ignoring status from URL"),
            },
            PRIORITY => match value.parse() {
                Ok(priority) => snapshot.priority = priority,
                Err(err) => warn!(error = %err, "ignoring priority from URL"),
            },
            CATEGORY => match value.parse() {
                Ok(category) => snapshot.category = category,
                Err(err) => warn!(error = %err, "ignoring category from URL"),
            },
            PAGE => match value.trim().parse::<u32>() {
                Ok(page) if page >= 1 => snapshot.page = page,
                _ => warn!(value = %value, "ignoring page from URL"),
            },
            PAGE_SIZE => match value.trim().parse::<u32>() {
                Ok(size) if size >= 1 => snapshot.page_size = size,
                _ => warn!(value = %value, "ignoring pageSize from URL"),
            },
            other => debug!(key = other, "ignoring unknown query parameter"),
        }
    }

    snapshot
}

fn query_part(raw: &str) -> &str {
    let without_fragment = raw.split_once('#').map_or(raw, |(before, _)| before);
    match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None if without_fragment.contains('=') => without_fragment,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_with, encode, encode_with};
    use crate::filter::{Choice, FilterSnapshot};
    use crate::task::{Priority, Status};

    #[test]
    fn defaults_encode_to_an_empty_query() {
        assert_eq!(encode(&FilterSnapshot::default()), "");
    }

    #[test]
    fn only_non_default_fields_are_written() {
        let snapshot = FilterSnapshot {
            search: "api docs".to_string(),
            status: Choice::Only(Status::Active),
            category: Choice::Only("DevOps".to_string()),
            page: 3,
            ..FilterSnapshot::default()
        };
        assert_eq!(
            encode(&snapshot),
            "search=api+docs&status=active&category=DevOps&page=3"
        );

        let sized = FilterSnapshot {
            priority: Choice::Only(Priority::Low),
            page_size: 20,
            ..FilterSnapshot::default()
        };
        assert_eq!(encode(&sized), "priority=low&pageSize=20");
    }

    #[test]
    fn page_size_is_compared_with_the_supplied_default() {
        let defaults = FilterSnapshot {
            page_size: 20,
            ..FilterSnapshot::default()
        };
        let snapshot = FilterSnapshot {
            page_size: 20,
            ..FilterSnapshot::default()
        };
        assert_eq!(encode_with(&snapshot, &defaults), "");
        assert_eq!(encode(&snapshot), "pageSize=20");
    }

    #[test]
    fn decode_reads_what_encode_writes() {
        let snapshot = FilterSnapshot {
            search: "a&b=c".to_string(),
            status: Choice::Only(Status::Cancelled),
            priority: Choice::Only(Priority::High),
            category: Choice::Only("Back end".to_string()),
            page: 2,
            page_size: 50,
        };
        assert_eq!(decode(&encode(&snapshot)), snapshot);
    }

    #[test]
    fn decode_accepts_paths_and_ignores_garbage() {
        let snapshot = decode("/dashboard?status=bogus&page=0&pageSize=0&priority=medium&x=1#top");
        assert_eq!(snapshot.status, Choice::All);
        assert_eq!(snapshot.page, 1);
        assert_eq!(snapshot.page_size, 10);
        assert_eq!(snapshot.priority, Choice::Only(Priority::Medium));

        assert_eq!(decode("/dashboard"), FilterSnapshot::default());
        assert_eq!(decode(""), FilterSnapshot::default());
    }

    #[test]
    fn any_positive_page_size_survives_the_round_trip() {
        for size in [1, 3, 1000] {
            let snapshot = decode(&format!("?pageSize={size}"));
            assert_eq!(snapshot.page_size, size);
            assert_eq!(encode(&snapshot), format!("pageSize={size}"));
        }
        assert_eq!(decode("?pageSize=-2").page_size, 10);
        assert_eq!(decode("?pageSize=ten").page_size, 10);
    }

    #[test]
    fn first_occurrence_wins_and_defaults_seed_missing_fields() {
        let defaults = FilterSnapshot {
            page_size: 20,
            ..FilterSnapshot::default()
        };
        let snapshot = decode_with("?page=4&page=9", defaults);
        assert_eq!(snapshot.page, 4);
        assert_eq!(snapshot.page_size, 20);
    }
}
