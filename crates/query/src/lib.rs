//! Paginated feeds and queries for docdb
//!
//! - [`feed`]: per-read options and decoded pages
//! - [`cursor`]: the lazy, forward-only [`QueryCursor`]
//! - [`multi`]: concatenating cursors over several collections

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod feed;
pub mod multi;

pub use cursor::{PageFetch, QueryCursor};
pub use feed::{partition_key_header, FeedOptions, FeedPage};
pub use multi::MultiCollectionCursor;
