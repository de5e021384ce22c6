//! Reads spanning several collections
//!
//! When a partition resolver maps a read to more than one collection, each
//! collection gets its own [`QueryCursor`] and the results are concatenated
//! in resolver order. Collections are drained one after another; nothing is
//! merged or re-sorted across them.

use docdb_core::DocDbResult;
use std::collections::HashMap;

use crate::cursor::QueryCursor;

/// Concatenation of per-collection cursors
#[derive(Debug)]
pub struct MultiCollectionCursor<'a, T> {
    cursors: Vec<QueryCursor<'a, T>>,
    current: usize,
}

impl<'a, T> MultiCollectionCursor<'a, T> {
    /// Cursor draining `cursors` in order
    pub fn new(cursors: Vec<QueryCursor<'a, T>>) -> Self {
        Self { cursors, current: 0 }
    }

    /// Number of collections spanned
    pub fn collection_count(&self) -> usize {
        self.cursors.len()
    }

    /// Advance `current` to the first cursor that still has an item
    fn advance(&mut self) -> DocDbResult<bool> {
        while let Some(cursor) = self.cursors.get_mut(self.current) {
            if cursor.has_next()? {
                return Ok(true);
            }
            self.current += 1;
        }
        Ok(false)
    }

    /// True when any remaining collection has another item
    ///
    /// # Errors
    ///
    /// Returns the page fetch failure of the collection being read.
    pub fn has_next(&mut self) -> DocDbResult<bool> {
        self.advance()
    }

    /// Next non-empty block from the collection being read
    ///
    /// # Errors
    ///
    /// Returns the page fetch failure of the collection being read.
    pub fn fetch_next_block(&mut self) -> DocDbResult<Option<Vec<T>>> {
        if !self.advance()? {
            return Ok(None);
        }
        match self.cursors.get_mut(self.current) {
            Some(cursor) => cursor.fetch_next_block(),
            None => Ok(None),
        }
    }

    /// Drain every collection
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

    /// Start every collection over
    pub fn reset(&mut self) {
        for cursor in &mut self.cursors {
            cursor.reset();
        }
        self.current = 0;
    }

    /// Headers of the last page of the collection being read
    pub fn response_headers(&self) -> Option<&HashMap<String, String>> {
        self.cursors
            .get(self.current)
            .or_else(|| self.cursors.last())
            .map(QueryCursor::response_headers)
    }
}

impl<'a, T> Iterator for MultiCollectionCursor<'a, T> {
    type Item = DocDbResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(true) => self.cursors.get_mut(self.current)?.next(),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedOptions, FeedPage};
    use docdb_core::{DocumentServiceRequest, OperationType, ResourceType};

    fn cursor_over(collection: &'static str, pages: Vec<Vec<&'static str>>) -> QueryCursor<'static, String> {
        let request = DocumentServiceRequest::new(
            OperationType::Query,
            ResourceType::Document,
            format!("dbs/db/colls/{}/docs", collection),
        );
        // The continuation is the index of the page to serve.
        let total = pages.len();
        QueryCursor::new(request, &FeedOptions::default(), move |request: &mut DocumentServiceRequest| {
            let index: usize = request
                .header(docdb_core::constants::headers::CONTINUATION)
                .map_or(0, |c| c.parse().unwrap());
            let items = pages[index].iter().map(|s| format!("{}:{}", collection, s)).collect();
            let continuation = (index + 1 < total).then(|| (index + 1).to_string());
            Ok(FeedPage::new(items, continuation))
        })
    }

    #[test]
    fn test_collections_are_concatenated_in_order() {
        let mut multi = MultiCollectionCursor::new(vec![
            cursor_over("a", vec![vec!["1", "2"], vec!["3"]]),
            cursor_over("b", vec![vec![]]),
            cursor_over("c", vec![vec![], vec!["1"]]),
        ]);

        assert_eq!(multi.collection_count(), 3);
        assert_eq!(multi.to_list().unwrap(), vec!["a:1", "a:2", "a:3", "c:1"]);
        assert!(!multi.has_next().unwrap());
    }

    #[test]
    fn test_iterator_and_reset() {
        let mut multi = MultiCollectionCursor::new(vec![
            cursor_over("a", vec![vec!["1"]]),
            cursor_over("b", vec![vec!["1"]]),
        ]);

        let first: Vec<String> = multi.by_ref().collect::<DocDbResult<_>>().unwrap();
        assert_eq!(first, vec!["a:1", "b:1"]);

        multi.reset();
        assert_eq!(multi.fetch_next_block().unwrap(), Some(vec!["a:1".to_owned()]));
    }

    #[test]
    fn test_no_collections() {
        let mut multi: MultiCollectionCursor<'_, String> = MultiCollectionCursor::new(Vec::new());
        assert!(multi.next().is_none());
        assert!(multi.response_headers().is_none());
    }
}
