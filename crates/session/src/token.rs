//! Session token wire format
//!
//! A single token is `<partition-range-id>:<lsn>`. A composite token joins
//! several with `,`: `0:120,1:87,4:3`. The format is wire-visible and must
//! round-trip byte-for-byte.

use docdb_core::{DocDbError, DocDbResult};
use std::fmt;
use std::str::FromStr;

/// Separator between partition range id and LSN
pub const PAIR_SEPARATOR: char = ':';
/// Separator between pairs of a composite token
pub const TOKEN_SEPARATOR: char = ',';

/// Highest LSN observed for one partition range
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken {
    range_id: String,
    lsn: u64,
}

impl SessionToken {
    /// Create a token
    pub fn new(range_id: impl Into<String>, lsn: u64) -> Self {
        Self {
            range_id: range_id.into(),
            lsn,
        }
    }

    /// Partition range id
    pub fn range_id(&self) -> &str {
        &self.range_id
    }

    /// Logical sequence number
    pub fn lsn(&self) -> u64 {
        self.lsn
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.range_id, PAIR_SEPARATOR, self.lsn)
    }
}

impl FromStr for SessionToken {
    type Err = DocDbError;

    fn from_str(s: &str) -> DocDbResult<Self> {
        let (range_id, lsn) = s.trim().split_once(PAIR_SEPARATOR).ok_or_else(|| {
            DocDbError::invalid_input(format!("session token '{}' has no range separator", s))
        })?;
        if range_id.is_empty() {
            return Err(DocDbError::invalid_input(format!(
                "session token '{}' has an empty range id",
                s
            )));
        }
        let lsn = lsn.parse::<u64>().map_err(|e| {
            DocDbError::invalid_input(format!("session token '{}' has a bad lsn: {}", s, e))
        })?;
        Ok(SessionToken::new(range_id, lsn))
    }
}

/// Parse a composite token
///
/// Empty segments (e.g. a trailing comma) are skipped.
///
/// # Errors
///
/// Returns `InvalidInput` if any non-empty pair is malformed.
pub fn parse_composite(composite: &str) -> DocDbResult<Vec<SessionToken>> {
    composite
        .split(TOKEN_SEPARATOR)
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<SessionToken>())
        .collect()
}

/// Format tokens as a composite token, in iteration order
pub fn format_composite<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a SessionToken>,
{
    let mut out = String::new();
    for (i, token) in tokens.into_iter().enumerate() {
        if i > 0 {
            out.push(TOKEN_SEPARATOR);
        }
        out.push_str(&token.to_string());
    }
    out
}
