//! Per-type cache of resolved event tables.
//!
//! `EventTableCache` resolves each application type's table once and hands
//! out shared `Arc`s, so the cost of building a table is independent of the
//! number of sessions.

use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use dashmap::DashMap;

use super::{EventTable, WebSocketEndpoint};

type ErasedTable = Arc<dyn Any + Send + Sync>;

/// Concurrent map from application type to its event table.
#[derive(Default)]
pub struct EventTableCache(DashMap<TypeId, ErasedTable>);

impl EventTableCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Table for `H`, building it on first use.
    pub fn get<H: WebSocketEndpoint>(&self) -> Arc<EventTable<H>> {
        let key = TypeId::of::<H>();
        if let Some(table) = self.0.get(&key).and_then(|entry| downcast::<H>(entry.value())) {
            return table;
        }

        // Build outside the map lock; a racing builder for the same type
        // loses and its table is dropped.
        let built: ErasedTable = Arc::new(H::event_table());
        let entry = self.0.entry(key).or_insert(built);
        downcast::<H>(entry.value()).unwrap_or_else(|| Arc::new(H::event_table()))
    }

    /// Number of types resolved so far.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no type has been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl std::fmt::Debug for EventTableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTableCache")
            .field("types", &self.0.len())
            .finish()
    }
}

fn downcast<H: WebSocketEndpoint>(table: &ErasedTable) -> Option<Arc<EventTable<H>>> {
    Arc::clone(table).downcast::<EventTable<H>>().ok()
}
