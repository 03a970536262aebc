//! Per-instrument book registry.

use crate::book::OrderBook;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of order books keyed by instrument id.
///
/// A book is created on first reference and persists for the process
/// lifetime; reconnects do not reset it, the first post-reconnect
/// snapshot replaces its contents instead. Shared `Arc` handles keep a
/// book usable by the read path and the emission path concurrently.
#[derive(Debug, Default)]
pub struct BookRegistry {
    books: RwLock<HashMap<String, Arc<OrderBook>>>,
}

impl BookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the book for the instrument, creating it on first reference.
    #[must_use]
    pub fn book(&self, instrument_id: &str) -> Arc<OrderBook> {
        if let Some(book) = self.books.read().get(instrument_id) {
            return Arc::clone(book);
        }
        let mut books = self.books.write();
        Arc::clone(books.entry(instrument_id.to_string()).or_insert_with(|| {
            debug!(instrument = %instrument_id, "order book created");
            Arc::new(OrderBook::new(instrument_id))
        }))
    }

    /// Returns the book for the instrument without creating it.
    #[must_use]
    pub fn get(&self, instrument_id: &str) -> Option<Arc<OrderBook>> {
        self.books.read().get(instrument_id).map(Arc::clone)
    }

    /// Returns all tracked instrument ids.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.books.read().keys().cloned().collect()
    }

    /// Returns the number of tracked books.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.read().len()
    }

    /// Returns true when no book has been referenced yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.read().is_empty()
    }

    /// Empties every tracked book, keeping the handles alive.
    ///
    /// Explicit reset only; holders of a book `Arc` observe empty sides.
    pub fn clear_all(&self) {
        for book in self.books.read().values() {
            book.clear();
        }
    }
}
