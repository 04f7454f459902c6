//! Sectioned, hand-reorderable list engine.
//!
//! A [`SectionedCollection`] keeps items partitioned into named sections,
//! renders them as one flat sequence of headers and item rows, and keeps a
//! sparse per-section order key on every item so reorders touch as few keys
//! as possible. Drag gestures go through a [`DragReorderSession`], which
//! applies each accepted frame live and assigns order keys once on drop.

pub mod classify;
pub mod collection;
pub mod drag;
pub mod flat;
pub mod notify;
pub mod order;

pub use classify::{SectionClassifier, SectionKey};
pub use collection::{OrderAssignment, Reclassified, SectionedCollection};
pub use drag::{CommittedMove, DragError, DragPhase, DragReorderSession, DropOutcome, OwnerHooks};
pub use flat::{FlatElement, FlatSequenceIndex, InvariantViolation};
pub use notify::Change;
pub use order::{DEFAULT_STEP, OrderKey, OrderKeyAllocator};

/// An item the engine can order.
///
/// The engine never creates or destroys entries; it only reads their identity
/// and reads/writes their order key.
pub trait Entry {
    type Id: PartialEq + Clone + std::fmt::Debug;

    /// Stable identity of the entry
    fn id(&self) -> &Self::Id;

    /// Current sparse rank within the entry's section
    fn order_key(&self) -> OrderKey;

    /// Overwrite the rank. Only the engine calls this.
    fn set_order_key(&mut self, key: OrderKey);
}

/// Sort items into display order: by section rank, then section id, then
/// order key. Stable, so items with equal keys keep their load order.
///
/// Owners call this on freshly fetched items before handing them to
/// [`SectionedCollection::reset`], which expects every section to be one
/// contiguous run.
pub fn sort_for_display<T, C>(items: &mut [T], classifier: &C)
where
    T: Entry,
    C: SectionClassifier<T> + ?Sized,
{
    items.sort_by_cached_key(|item| {
        let key = classifier.classify(item);
        (key.rank, key.id, item.order_key())
    });
}
