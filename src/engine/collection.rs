use std::ops::Range;

use tracing::debug;

use super::Entry;
use super::classify::{SectionClassifier, SectionKey};
use super::flat::{FlatSequenceIndex, InvariantViolation};
use super::notify::{Change, ChangeLog};
use super::order::{OrderKey, OrderKeyAllocator, strictly_increasing};

/// Items whose order keys were (re)assigned by one allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAssignment {
    /// True when the whole section had to be re-spaced
    pub rebalanced: bool,
    /// Logical indexes of every item whose key was written
    pub indices: Range<usize>,
}

/// Result of [`SectionedCollection::reclassify`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reclassified {
    /// Still in the same section; the row was marked changed
    Unchanged,
    /// Moved to another section
    Moved {
        from: SectionKey,
        to: SectionKey,
        index: usize,
        /// Keys written to make room, if the old key did not fit
        assignment: Option<OrderAssignment>,
    },
}

/// A list of items partitioned into ordered sections, with a flat rendering
/// of headers and rows kept in sync on every edit.
///
/// The item list is kept in display order: items of one section form one
/// contiguous run, runs appear in header order. Logical index `i` is the
/// `i`-th item row of the flat sequence.
///
/// Index arguments are expected to be valid; out-of-range indexes panic.
pub struct SectionedCollection<T> {
    items: Vec<T>,
    index: FlatSequenceIndex,
    classifier: Box<dyn SectionClassifier<T>>,
    allocator: OrderKeyAllocator,
    changes: ChangeLog,
}

impl<T: Entry> SectionedCollection<T> {
    pub fn new(classifier: impl SectionClassifier<T> + 'static) -> Self {
        Self::with_allocator(classifier, OrderKeyAllocator::default())
    }

    pub fn with_allocator(
        classifier: impl SectionClassifier<T> + 'static,
        allocator: OrderKeyAllocator,
    ) -> Self {
        SectionedCollection {
            items: Vec::new(),
            index: FlatSequenceIndex::new(),
            classifier: Box::new(classifier),
            allocator,
            changes: ChangeLog::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn get(&self, logical: usize) -> &T {
        &self.items[logical]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn flat(&self) -> &FlatSequenceIndex {
        &self.index
    }

    pub fn allocator(&self) -> OrderKeyAllocator {
        self.allocator
    }

    /// Logical index of the item with `id`
    pub fn position_of(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Run the classifier on the item at `logical`
    pub fn classify(&self, logical: usize) -> SectionKey {
        self.classifier.classify(&self.items[logical])
    }

    /// Section the item at `logical` is currently displayed under
    pub fn section_of(&self, logical: usize) -> &SectionKey {
        let pos = self.flat_pos(logical);
        self.index
            .section_at(pos)
            .unwrap_or_else(|| panic!("item row {} has no header", pos))
    }

    /// Logical range of the section run that contains `logical`
    pub fn section_bounds(&self, logical: usize) -> Range<usize> {
        let pos = self.flat_pos(logical);
        self.index
            .section_logical_range(pos)
            .unwrap_or_else(|| panic!("item row {} has no header", pos))
    }

    /// Sections in display order with their item counts
    pub fn sections(&self) -> Vec<(SectionKey, usize)> {
        self.index.sections()
    }

    /// Take every change queued since the last call, in emission order
    pub fn drain_changes(&mut self) -> Vec<Change> {
        self.changes.drain()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Structural invariants plus strictly increasing keys in every section
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.index.verify(self.items.len())?;
        for (header, rows) in self.section_spans() {
            let start = self.index.logical_index_of(header);
            let run = &self.items[start..start + rows.len()];
            if !strictly_increasing(run) {
                let offset = run
                    .windows(2)
                    .position(|w| w[0].order_key() >= w[1].order_key())
                    .unwrap_or(0);
                let section = self.index.elements()[header]
                    .header()
                    .map(|k| k.id.clone())
                    .unwrap_or_default();
                return Err(InvariantViolation::OrderKeys {
                    section,
                    index: start + offset + 1,
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk loads
    // -----------------------------------------------------------------------

    /// Replace every item and rebuild the flat sequence.
    ///
    /// # Panics
    ///
    /// Panics if `items` are not grouped by section (see
    /// [`sort_for_display`](super::sort_for_display)).
    pub fn reset(&mut self, items: Vec<T>) {
        self.index.rebuild(&items, self.classifier.as_ref());
        self.items = items;
        debug!(
            items = self.items.len(),
            rows = self.index.len(),
            "reset collection"
        );
        self.changes.push(Change::FullReload);
        self.debug_verify();
    }

    /// Append a page of items after the existing ones.
    ///
    /// The first new item continues the last section if it classifies the
    /// same; every other section change opens a new header.
    ///
    /// # Panics
    ///
    /// Panics if the page reopens a section that is already displayed, or is
    /// not grouped by section itself. The collection is left untouched.
    pub fn append(&mut self, new_items: Vec<T>) {
        if new_items.is_empty() {
            return;
        }
        let start = self.index.len();
        let first_index = self.items.len();
        let added = self
            .index
            .append(&new_items, first_index, self.classifier.as_ref());
        self.items.extend(new_items);
        debug!(start, added, "append items");
        self.changes.push(Change::InsertRange { start, len: added });
        self.debug_verify();
    }

    // -----------------------------------------------------------------------
    // Single-item edits
    // -----------------------------------------------------------------------

    /// Remove and return the item at `logical`.
    ///
    /// Removes the section header too when the item was the last one in its
    /// section. Emits `RemoveAt` for the row (and the header), then
    /// `RangeChanged` for every row that moved up.
    pub fn remove_at(&mut self, logical: usize) -> T {
        let pos = self.flat_pos(logical);
        let item = self.items.remove(logical);
        let removal = self.index.remove_item(pos);
        debug!(logical, pos, header = ?removal.header_pos, "remove item");

        self.changes.push(Change::RemoveAt { pos });
        if let Some(header) = removal.header_pos {
            self.changes.push(Change::RemoveAt { pos: header });
        }
        let shifted = removal.header_pos.unwrap_or(pos);
        self.push_shifted(shifted);
        self.debug_verify();
        item
    }

    /// Move the item at `from` so it ends up at logical index `to` inside
    /// `to_section`.
    ///
    /// The item list is shifted by adjacent swaps between the two indexes, so
    /// every other item keeps its relative order. Order keys are left alone;
    /// the caller assigns them once the final place is known.
    ///
    /// Emits `MoveFlat` plus a `RangeChanged` over every row between the old
    /// and new position. When a header appears or disappears the row is
    /// removed and reinserted instead.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range, if the item is not displayed
    /// under `from_section`, or if `to` is not a legal place in `to_section`.
    pub fn move_committed(
        &mut self,
        from: usize,
        to: usize,
        from_section: &SectionKey,
        to_section: &SectionKey,
    ) {
        assert!(
            from < self.items.len() && to < self.items.len(),
            "move {} -> {} out of range for {} items",
            from,
            to,
            self.items.len()
        );
        let from_pos = self.flat_pos(from);
        assert_eq!(
            self.index.section_at(from_pos),
            Some(from_section),
            "item {} is not displayed under section {}",
            from,
            from_section.id
        );

        // rotating the span is the same as swapping neighbours one by one
        if from < to {
            self.items[from..=to].rotate_left(1);
        } else if to < from {
            self.items[to..=from].rotate_right(1);
        }

        let removal = self.index.remove_item(from_pos);
        let placement = self.index.insert_item(to, to_section);
        debug!(
            from,
            to,
            from_section = %from_section.id,
            to_section = %to_section.id,
            from_pos,
            to_pos = placement.item_pos,
            "move item"
        );

        match (removal.header_pos, placement.new_header) {
            (None, None) => {
                let to_pos = placement.item_pos;
                if from_pos != to_pos {
                    self.changes.push(Change::MoveFlat {
                        from: from_pos,
                        to: to_pos,
                    });
                }
                // every row in between now points at a shifted item, and the
                // moved row may sit under another header
                let start = from_pos.min(to_pos);
                self.changes.push(Change::RangeChanged {
                    start,
                    len: from_pos.max(to_pos) - start + 1,
                });
            }
            (removed_header, new_header) => {
                self.changes.push(Change::RemoveAt { pos: from_pos });
                if let Some(header) = removed_header {
                    self.changes.push(Change::RemoveAt { pos: header });
                }
                let insert_at = new_header.unwrap_or(placement.item_pos);
                let inserted = placement.item_pos + 1 - insert_at;
                self.changes.push(Change::InsertRange {
                    start: insert_at,
                    len: inserted,
                });
                let first_removed = removed_header.unwrap_or(from_pos);
                self.push_shifted(first_removed.min(insert_at));
            }
        }
        self.debug_verify();
    }

    /// Insert a new item at the end of its section, creating the section at
    /// its rank position if it has no header yet, and give it an order key.
    /// Returns the item's logical index.
    pub fn insert_sorted(&mut self, mut item: T) -> usize {
        let section = self.classifier.classify(&item);
        let target = self.target_index(&section, None, None);

        let prev = match self.index.header_position(&section) {
            Some(_) if target > 0 => Some(self.items[target - 1].order_key()),
            _ => None,
        };
        let key = if self.allocator.needs_rebalance(prev, None) {
            None
        } else {
            Some(self.allocator.key_between(prev, None))
        };
        if let Some(key) = key {
            item.set_order_key(key);
        }

        self.items.insert(target, item);
        let placement = self.index.insert_item(target, &section);
        debug!(target, section = %section.id, "insert item");

        let start = placement.new_header.unwrap_or(placement.item_pos);
        self.changes.push(Change::InsertRange {
            start,
            len: placement.item_pos + 1 - start,
        });
        self.push_shifted(placement.item_pos + 1);
        if key.is_none() {
            self.rebalance_run(target);
        }
        self.debug_verify();
        target
    }

    /// Re-run the classifier on the item at `logical` and move it if its
    /// section changed.
    ///
    /// In the new section the item goes where its current order key sorts;
    /// a fresh key is allocated only if that key no longer fits between its
    /// new neighbours.
    pub fn reclassify(&mut self, logical: usize) -> Reclassified {
        let section = self.classify(logical);
        let current = self.section_of(logical).clone();
        if section == current {
            let pos = self.flat_pos(logical);
            self.changes.push(Change::RangeChanged { start: pos, len: 1 });
            return Reclassified::Unchanged;
        }

        let key = self.items[logical].order_key();
        let to = self.target_index(&section, Some(key), Some(logical));
        self.move_committed(logical, to, &current, &section);

        let bounds = self.section_bounds(to);
        let prev = (to > bounds.start).then(|| self.items[to - 1].order_key());
        let next = (to + 1 < bounds.end).then(|| self.items[to + 1].order_key());
        let fits = prev.is_none_or(|p| p < key) && next.is_none_or(|n| key < n);
        let assignment = if fits {
            None
        } else {
            Some(self.assign_order_at(to))
        };
        debug!(logical, to, from = %current.id, to_section = %section.id, "reclassify");
        self.debug_verify();
        Reclassified::Moved {
            from: current,
            to: section,
            index: to,
            assignment,
        }
    }

    /// Let `f` modify the item at `logical`, then reclassify it.
    /// The item's order key is restored afterwards; only the engine writes
    /// keys.
    pub fn update(&mut self, logical: usize, f: impl FnOnce(&mut T)) -> Reclassified {
        let key = self.items[logical].order_key();
        f(&mut self.items[logical]);
        self.items[logical].set_order_key(key);
        self.reclassify(logical)
    }

    // -----------------------------------------------------------------------
    // Order keys
    // -----------------------------------------------------------------------

    /// Give the item at `logical` a key between its section neighbours,
    /// re-spacing the whole section if there is no room.
    pub fn assign_order_at(&mut self, logical: usize) -> OrderAssignment {
        let bounds = self.section_bounds(logical);
        let prev = (logical > bounds.start).then(|| self.items[logical - 1].order_key());
        let next = (logical + 1 < bounds.end).then(|| self.items[logical + 1].order_key());

        let assignment = if self.allocator.needs_rebalance(prev, next) {
            self.rebalance_run(logical)
        } else {
            let key = self.allocator.key_between(prev, next);
            self.items[logical].set_order_key(key);
            OrderAssignment {
                rebalanced: false,
                indices: logical..logical + 1,
            }
        };
        debug!(logical, ?prev, ?next, rebalanced = assignment.rebalanced, "assign order key");
        debug_assert!(
            strictly_increasing(&self.items[assignment_window(&assignment, &bounds)]),
            "order keys not increasing after allocation in {:?}",
            bounds
        );
        assignment
    }

    /// Re-space the keys of section `section_id`. Returns the logical range
    /// touched, or `None` if the section is not displayed.
    pub fn rebalance(&mut self, section_id: &str) -> Option<OrderAssignment> {
        let header = self
            .index
            .elements()
            .iter()
            .position(|e| e.header().is_some_and(|k| k.id == section_id))?;
        let first = self.index.logical_index_of(header);
        Some(self.rebalance_run(first))
    }

    fn rebalance_run(&mut self, logical: usize) -> OrderAssignment {
        let bounds = self.section_bounds(logical);
        self.allocator
            .rebalance_section(&mut self.items[bounds.clone()]);
        debug!(?bounds, step = self.allocator.step(), "rebalance section");
        OrderAssignment {
            rebalanced: true,
            indices: bounds,
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn item_mut(&mut self, logical: usize) -> &mut T {
        &mut self.items[logical]
    }

    fn flat_pos(&self, logical: usize) -> usize {
        self.index
            .flat_position_of(logical)
            .unwrap_or_else(|| panic!("no flat row for logical index {}", logical))
    }

    /// Logical index (counted without `moving`) where an item of `section`
    /// goes: by `key` inside an existing run, at the end of the run when
    /// `key` is `None`, or at the rank boundary when the section has no
    /// header.
    fn target_index(
        &self,
        section: &SectionKey,
        key: Option<OrderKey>,
        moving: Option<usize>,
    ) -> usize {
        let target = match self.index.header_position(section) {
            Some(header) => {
                let run = self
                    .index
                    .section_logical_range(header)
                    .unwrap_or(0..0);
                match key {
                    Some(key) => run
                        .clone()
                        .find(|&i| Some(i) != moving && self.items[i].order_key() > key)
                        .unwrap_or(run.end),
                    None => run.end,
                }
            }
            None => self
                .index
                .elements()
                .iter()
                .enumerate()
                .find(|(_, e)| e.header().is_some_and(|k| section.sorts_before(k)))
                .map(|(pos, _)| self.index.logical_index_of(pos))
                .unwrap_or(self.items.len()),
        };
        match moving {
            Some(m) if m < target => target - 1,
            _ => target,
        }
    }

    fn section_spans(&self) -> Vec<(usize, Range<usize>)> {
        self.index
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_header())
            .filter_map(|(pos, _)| self.index.section_span(pos))
            .collect()
    }

    fn push_shifted(&mut self, start: usize) {
        let len = self.index.len().saturating_sub(start);
        if len > 0 {
            self.changes.push(Change::RangeChanged { start, len });
        }
    }

    /// Structure only. Keys loaded from storage may be out of order until
    /// the owner rebalances; allocation checks its own keys.
    fn debug_verify(&self) {
        if cfg!(debug_assertions)
            && let Err(violation) = self.index.verify(self.items.len())
        {
            panic!("flat sequence invariant broken: {}", violation);
        }
    }
}

/// The assigned items plus their section neighbours
fn assignment_window(assignment: &OrderAssignment, bounds: &Range<usize>) -> Range<usize> {
    let start = assignment.indices.start.saturating_sub(1).max(bounds.start);
    let end = (assignment.indices.end + 1).min(bounds.end);
    start..end
}

impl<T: Entry + std::fmt::Debug> std::fmt::Debug for SectionedCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionedCollection")
            .field("items", &self.items)
            .field("flat", &self.index.elements())
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}
