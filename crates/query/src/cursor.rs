//! Forward-only paginated cursor
//!
//! A [`QueryCursor`] lazily walks the pages of a feed or query. It keeps a
//! buffer of decoded items and asks for the next page only when the buffer is
//! drained. A page may legitimately be empty while still carrying a
//! continuation (the service ran out of time budget before finding matches);
//! the cursor keeps fetching until it gets items or the continuation ends.
//!
//! ```text
//! Idle ──fetch──► Fetching ──items──► ItemsAvailable ──drained──► Fetching
//!                    │                                                │
//!                    └──────────── no continuation, empty ────────────┴──► Exhausted
//! ```
//!
//! Pages are fetched strictly one after another. The cursor is not `Sync`;
//! share it between threads by moving it.

use docdb_core::constants::headers;
use docdb_core::{DocDbResult, DocumentServiceRequest};
use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::feed::{FeedOptions, FeedPage};

/// Fetches one page for the request it is handed
pub type PageFetch<'a, T> =
    Box<dyn FnMut(&mut DocumentServiceRequest) -> DocDbResult<FeedPage<T>> + Send + 'a>;

/// Lazy sequence over the pages of one feed
pub struct QueryCursor<'a, T> {
    request: DocumentServiceRequest,
    initial_continuation: Option<String>,
    continuation: Option<String>,
    started: bool,
    buffer: VecDeque<T>,
    response_headers: HashMap<String, String>,
    pages_fetched: usize,
    fetch: PageFetch<'a, T>,
}

impl<'a, T> QueryCursor<'a, T> {
    /// Cursor over the feed addressed by `request`
    ///
    /// `options` are written onto the request once; their continuation, if
    /// any, is where the first page (and every `reset`) starts.
    pub fn new<F>(mut request: DocumentServiceRequest, options: &FeedOptions, fetch: F) -> Self
    where
        F: FnMut(&mut DocumentServiceRequest) -> DocDbResult<FeedPage<T>> + Send + 'a,
    {
        options.apply_to(&mut request);
        let initial_continuation = options.request_continuation.clone();
        Self {
            request,
            continuation: initial_continuation.clone(),
            initial_continuation,
            started: false,
            buffer: VecDeque::new(),
            response_headers: HashMap::new(),
            pages_fetched: 0,
            fetch: Box::new(fetch),
        }
    }

    /// True until a page without continuation has been received
    fn has_more_pages(&self) -> bool {
        !self.started || self.continuation.is_some()
    }

    /// Fetch pages until an item is buffered or the feed ends
    fn fill_buffer(&mut self) -> DocDbResult<()> {
        while self.buffer.is_empty() && self.has_more_pages() {
            self.fetch_page()?;
        }
        Ok(())
    }

    fn fetch_page(&mut self) -> DocDbResult<()> {
        match &self.continuation {
            Some(token) => self.request.set_header(headers::CONTINUATION, token.clone()),
            None => {
                self.request.remove_header(headers::CONTINUATION);
            }
        }

        let page = (self.fetch)(&mut self.request)?;
        self.started = true;
        self.pages_fetched += 1;

        tracing::debug!(
            target: "docdb::query",
            path = self.request.path(),
            page = self.pages_fetched,
            items = page.items.len(),
            has_continuation = page.continuation.is_some(),
            "Fetched feed page"
        );

        self.continuation = page.continuation;
        self.response_headers = page.headers;
        self.buffer.extend(page.items);
        Ok(())
    }

    /// True when another item is available, fetching pages as needed
    ///
    /// # Errors
    ///
    /// Returns the page fetch failure; calling again retries the same page.
    pub fn has_next(&mut self) -> DocDbResult<bool> {
        self.fill_buffer()?;
        Ok(!self.buffer.is_empty())
    }

    /// Everything currently buffered plus, if the buffer was empty, the next
    /// non-empty page; `None` once the feed is exhausted
    ///
    /// # Errors
    ///
    /// Returns the page fetch failure.
    pub fn fetch_next_block(&mut self) -> DocDbResult<Option<Vec<T>>> {
        self.fill_buffer()?;
        if self.buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.buffer.drain(..).collect()))
    }

    /// Drain the remaining items eagerly
    ///
    /// # Errors
    ///
    /// Returns the first page fetch failure.
    pub fn to_list(&mut self) -> DocDbResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(block) = self.fetch_next_block()? {
            items.extend(block);
        }
        Ok(items)
    }

    /// Start over from the initial continuation
    pub fn reset(&mut self) {
        self.continuation = self.initial_continuation.clone();
        self.started = false;
        self.buffer.clear();
        self.response_headers.clear();
        self.pages_fetched = 0;
    }

    /// Headers of the last page received
    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.response_headers
    }

    /// Continuation the next page fetch will send
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Pages fetched since creation or the last `reset`
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Request template sent for every page
    pub fn request(&self) -> &DocumentServiceRequest {
        &self.request
    }
}

impl<'a, T> Iterator for QueryCursor<'a, T> {
    type Item = DocDbResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.fill_buffer() {
            return Some(Err(e));
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl<'a, T> fmt::Debug for QueryCursor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCursor")
            .field("path", &self.request.path())
            .field("continuation", &self.continuation)
            .field("started", &self.started)
            .field("buffered", &self.buffer.len())
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}
