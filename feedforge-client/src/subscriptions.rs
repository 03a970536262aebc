//! Durable subscription state.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The set of instrument ids currently subscribed.
///
/// Durable across reconnects: the server forgets subscription state when a
/// connection drops, so the session re-sends this whole set on every
/// successful handshake. Clones share the same underlying set, letting the
/// façade buffer requests made before streaming is reached.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    inner: Arc<Mutex<BTreeSet<String>>>,
}

impl SubscriptionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instrument. Returns true when it was not present before.
    pub fn add(&self, instrument_id: impl Into<String>) -> bool {
        self.inner.lock().insert(instrument_id.into())
    }

    /// Removes an instrument. Returns true when it was present.
    pub fn remove(&self, instrument_id: &str) -> bool {
        self.inner.lock().remove(instrument_id)
    }

    /// Returns true when the instrument is subscribed.
    #[must_use]
    pub fn contains(&self, instrument_id: &str) -> bool {
        self.inner.lock().contains(instrument_id)
    }

    /// Returns the subscribed instruments in deterministic order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Returns the number of subscribed instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true when nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
