//! Order book state.

use feedforge_core::{BookSnapshot, LevelUpdate, PriceLevel, SIZE_EPSILON, Side, TopOfBook};
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// One side of the book: price to size, unique keys.
///
/// Best price is the last key on the bid side and the first on the ask
/// side; a level at or below [`SIZE_EPSILON`] is removed, never stored.
#[derive(Debug, Default)]
struct SideState {
    levels: BTreeMap<OrderedFloat<f64>, f64>,
}

impl SideState {
    fn update(&mut self, price: f64, size: f64) {
        if size <= SIZE_EPSILON {
            self.levels.remove(&OrderedFloat(price));
        } else {
            self.levels.insert(OrderedFloat(price), size);
        }
    }

    fn best(&self, side: Side) -> Option<PriceLevel> {
        let entry = if side.is_bid() {
            self.levels.iter().next_back()
        } else {
            self.levels.iter().next()
        };
        entry.map(|(price, size)| PriceLevel {
            price: price.into_inner(),
            size: *size,
        })
    }

    fn levels_best_first(&self, side: Side) -> Vec<PriceLevel> {
        let to_level = |(price, size): (&OrderedFloat<f64>, &f64)| PriceLevel {
            price: price.into_inner(),
            size: *size,
        };
        if side.is_bid() {
            self.levels.iter().rev().map(to_level).collect()
        } else {
            self.levels.iter().map(to_level).collect()
        }
    }
}

#[derive(Debug, Default)]
struct BookState {
    bids: SideState,
    asks: SideState,
}

impl BookState {
    fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

/// Thread-safe order book for one instrument.
///
/// All operations are atomic with respect to each other: mutation holds a
/// short mutex and a concurrent reader never observes a partially-applied
/// update. The critical section covers book state only; event emission
/// belongs outside it, so a slow consumer never blocks mutation.
#[derive(Debug)]
pub struct OrderBook {
    instrument_id: String,
    state: Mutex<BookState>,
}

impl OrderBook {
    /// Creates an empty book for the given instrument.
    #[must_use]
    pub fn new(instrument_id: impl Into<String>) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            state: Mutex::new(BookState::default()),
        }
    }

    /// Returns the instrument this book tracks.
    #[must_use]
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Upserts the level when `size > SIZE_EPSILON`, removes it otherwise.
    ///
    /// Idempotent: repeating an identical update leaves the book unchanged.
    pub fn update(&self, side: Side, price: f64, size: f64) {
        self.state.lock().side_mut(side).update(price, size);
    }

    /// Merges one decoded level delta into the existing book.
    pub fn apply_update(&self, update: &LevelUpdate) {
        self.update(update.side, update.price, update.size);
    }

    /// Replaces the entire book with the snapshot, atomically.
    ///
    /// Readers observe either the old book or the fully-applied snapshot,
    /// never a mixture.
    pub fn apply_snapshot(&self, snapshot: &BookSnapshot) {
        let mut state = self.state.lock();
        state.bids.levels.clear();
        state.asks.levels.clear();
        for level in &snapshot.bids {
            state.bids.update(level.price, level.size);
        }
        for level in &snapshot.asks {
            state.asks.update(level.price, level.size);
        }
    }

    /// Empties both sides atomically.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.bids.levels.clear();
        state.asks.levels.clear();
    }

    /// Returns the best bid and ask, `None` per empty side.
    #[must_use]
    pub fn top_of_book(&self) -> TopOfBook {
        let state = self.state.lock();
        TopOfBook {
            bid: state.bids.best(Side::Bid),
            ask: state.asks.best(Side::Ask),
        }
    }

    /// Returns the number of levels on a side.
    #[must_use]
    pub fn depth(&self, side: Side) -> usize {
        self.state.lock().side(side).levels.len()
    }

    /// Returns a side's levels, best price first.
    #[must_use]
    pub fn levels(&self, side: Side) -> Vec<PriceLevel> {
        self.state.lock().side(side).levels_best_first(side)
    }

    /// Returns true when best bid >= best ask.
    ///
    /// Crossed and stale books are tolerated states, not corruption.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        self.top_of_book().is_crossed()
    }

    /// Returns the mid price when both sides have levels.
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        self.top_of_book().mid_price()
    }

    /// Returns true when both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.bids.levels.is_empty() && state.asks.levels.is_empty()
    }
}
