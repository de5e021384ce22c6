//! Link parsing helpers
//!
//! Links come in two flavours that address the same resources:
//! - id-based (self links): `dbs/1KtjAA==/colls/1KtjAImkcgw=/docs/...`
//! - name-based: `dbs/mydb/colls/orders/docs/order-1`
//!
//! A link is id-based when its database segment is an 8-character resource
//! id that decodes to exactly 4 bytes; anything else is a name.

use crate::constants::segments;
use crate::resource_id;

/// Strip one leading and one trailing `/`
pub fn trim_slashes(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Non-empty segments of a link
pub fn split_segments(link: &str) -> Vec<&str> {
    trim_slashes(link).split('/').collect()
}

/// True when `link` addresses resources by user-assigned names
pub fn is_name_based(link: &str) -> bool {
    let parts = split_segments(link);
    if parts.len() < 2 || parts[0].is_empty() || !parts[0].eq_ignore_ascii_case(segments::DATABASES)
    {
        return false;
    }

    let database = parts[1];
    if database.is_empty() {
        return false;
    }
    if database.len() != 8 {
        return true;
    }

    !matches!(resource_id::decode_text(database), Ok(bytes) if bytes.len() == 4)
}

/// True when `link` is exactly `dbs/<database>`
pub fn is_database_link(link: &str) -> bool {
    let parts = split_segments(link);
    parts.len() == 2 && parts[0].eq_ignore_ascii_case(segments::DATABASES) && !parts[1].is_empty()
}

/// The `dbs/<db>/colls/<coll>` prefix of a link, if the link reaches that deep
pub fn collection_path(link: &str) -> Option<&str> {
    let trimmed = trim_slashes(link);
    let parts: Vec<&str> = trimmed.splitn(5, '/').collect();
    if parts.len() < 4
        || !parts[0].eq_ignore_ascii_case(segments::DATABASES)
        || !parts[2].eq_ignore_ascii_case(segments::COLLECTIONS)
        || parts[1].is_empty()
        || parts[3].is_empty()
    {
        return None;
    }
    let end = parts[0].len() + parts[1].len() + parts[2].len() + parts[3].len() + 3;
    Some(&trimmed[..end])
}

/// The innermost resource id named by an id-based link
///
/// For a feed link (`.../colls/<rid>/docs`) this is the owner's id.
pub fn last_resource_id(link: &str) -> Option<&str> {
    let parts = split_segments(link);
    let idx = if parts.len() % 2 == 0 {
        parts.len().checked_sub(1)?
    } else {
        parts.len().checked_sub(2)?
    };
    parts.get(idx).copied().filter(|s| !s.is_empty())
}

/// True when the link ends in a resource-type segment (addresses a feed)
pub fn is_feed_link(link: &str) -> bool {
    let parts = split_segments(link);
    !parts.is_empty() && !parts[0].is_empty() && parts.len() % 2 == 1
}

/// Join two link fragments as `/<a>/<b>/`
pub fn join(a: &str, b: &str) -> String {
    let mut result = format!("/{}/", trim_slashes(a));
    let b = trim_slashes(b);
    if !b.is_empty() {
        result.push_str(b);
        result.push('/');
    }
    result
}
