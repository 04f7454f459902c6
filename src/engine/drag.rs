//! Drag-and-drop reorder protocol.
//!
//! A gesture is a stream of `on_move(from, to)` frames in flat positions
//! followed by exactly one `on_drop` or `cancel`:
//!
//! ```text
//! Idle --on_move (legal)--> Dragging --on_move--> Dragging
//!   |                           |
//!   +--on_drop--> Cancelled     +--on_drop--> Committed | Unchanged
//!                               +--cancel---> Cancelled
//! ```
//!
//! Every legal frame is applied to the collection right away so the list
//! follows the pointer. Order keys are only assigned on drop, from the
//! item's final neighbours.

use tracing::{debug, trace, warn};

use super::Entry;
use super::classify::SectionKey;
use super::collection::{OrderAssignment, SectionedCollection};
use super::order::OrderKey;

/// Callbacks from the engine to the owner of a collection.
///
/// Every method has a permissive no-op default; `()` is the owner that
/// accepts everything and persists nothing.
pub trait OwnerHooks<T> {
    /// Whether a dragged item may enter `section` from another section
    fn can_enter_section(&self, _section: &SectionKey) -> bool {
        true
    }

    /// Side effects of moving `item` between sections, run on drop before
    /// any key is reported. The hook should leave the item classified
    /// under `to`.
    fn on_section_transition(&mut self, _item: &mut T, _from: &SectionKey, _to: &SectionKey) {}

    /// `item` now has order key `key` and should be persisted
    fn on_order_assigned(&mut self, _item: &T, _key: OrderKey) {}
}

impl<T> OwnerHooks<T> for () {}

/// A rejected drag frame. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DragError {
    #[error("flat position {pos} is out of range ({len} rows)")]
    OutOfRange { pos: usize, len: usize },
    #[error("flat position {0} is a section header, not an item")]
    NotAnItem(usize),
    #[error("flat position {pos} is not the dragged item (it sits at {expected})")]
    NotDraggedItem { pos: usize, expected: usize },
    #[error("an item cannot be placed above the first section header")]
    NoSectionAbove,
    #[error("section {0} does not accept dragged items")]
    SectionLocked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
}

/// Final state of a gesture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// No legal frame was applied, or the gesture was cancelled
    Cancelled,
    /// Frames were applied but the item ended where it started
    Unchanged,
    Committed(CommittedMove),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedMove {
    pub from_index: usize,
    pub to_index: usize,
    pub from_section: SectionKey,
    pub to_section: SectionKey,
    pub assignment: OrderAssignment,
}

impl CommittedMove {
    pub fn section_changed(&self) -> bool {
        self.from_section != self.to_section
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Anchor {
    logical: usize,
    section: SectionKey,
}

/// One drag gesture over a [`SectionedCollection`].
///
/// Remembers where the item started (from the first accepted frame) and
/// where it is now (from the latest), never the path in between.
#[derive(Debug)]
pub struct DragReorderSession {
    start: Option<Anchor>,
    current: Option<Anchor>,
    frames: usize,
}

impl Default for DragReorderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DragReorderSession {
    pub fn new() -> Self {
        DragReorderSession {
            start: None,
            current: None,
            frames: 0,
        }
    }

    pub fn phase(&self) -> DragPhase {
        if self.start.is_some() {
            DragPhase::Dragging
        } else {
            DragPhase::Idle
        }
    }

    /// Number of accepted frames so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Logical index of the dragged item, once the drag has started
    pub fn current_index(&self) -> Option<usize> {
        self.current.as_ref().map(|a| a.logical)
    }

    /// Apply one frame: the row at flat position `from` now sits at `to`.
    ///
    /// Cross-section frames are checked against
    /// [`OwnerHooks::can_enter_section`]. On `Err` neither the collection
    /// nor the session changed, and the gesture may continue.
    pub fn on_move<T: Entry, H: OwnerHooks<T> + ?Sized>(
        &mut self,
        collection: &mut SectionedCollection<T>,
        hooks: &H,
        from: usize,
        to: usize,
    ) -> Result<(), DragError> {
        let flat = collection.flat();
        let len = flat.len();
        for pos in [from, to] {
            if pos >= len {
                return Err(DragError::OutOfRange { pos, len });
            }
        }
        if flat.elements()[from].is_header() {
            return Err(DragError::NotAnItem(from));
        }
        let from_logical = flat.logical_index_of(from);
        if let Some(current) = &self.current
            && current.logical != from_logical
        {
            let expected = flat.flat_position_of(current.logical).unwrap_or(len);
            return Err(DragError::NotDraggedItem {
                pos: from,
                expected,
            });
        }
        if from == to {
            return Ok(());
        }

        let from_section = collection.section_of(from_logical).clone();
        let (to_logical, to_section) = collection
            .flat()
            .resolve_move(from, to)
            .ok_or(DragError::NoSectionAbove)?;
        if to_section != from_section && !hooks.can_enter_section(&to_section) {
            trace!(section = %to_section.id, "drag frame rejected: section locked");
            return Err(DragError::SectionLocked(to_section.id));
        }

        if self.start.is_none() {
            debug!(from_logical, section = %from_section.id, "drag started");
            self.start = Some(Anchor {
                logical: from_logical,
                section: from_section.clone(),
            });
        }
        collection.move_committed(from_logical, to_logical, &from_section, &to_section);
        trace!(from, to, from_logical, to_logical, section = %to_section.id, "drag frame");
        self.current = Some(Anchor {
            logical: to_logical,
            section: to_section,
        });
        self.frames += 1;
        Ok(())
    }

    /// Finish the gesture and assign the dragged item's order key.
    ///
    /// On a section change the owner's transition hook runs first, then
    /// every written key is reported through
    /// [`OwnerHooks::on_order_assigned`].
    pub fn on_drop<T: Entry, H: OwnerHooks<T> + ?Sized>(
        self,
        collection: &mut SectionedCollection<T>,
        hooks: &mut H,
    ) -> DropOutcome {
        let (Some(start), Some(current)) = (self.start, self.current) else {
            debug!("drop without an accepted frame");
            return DropOutcome::Cancelled;
        };
        if start == current {
            debug!(logical = current.logical, "drop at the start position");
            return DropOutcome::Unchanged;
        }

        let assignment = collection.assign_order_at(current.logical);
        if start.section != current.section {
            let item = collection.item_mut(current.logical);
            hooks.on_section_transition(item, &start.section, &current.section);
            let classified = collection.classify(current.logical);
            if classified != current.section {
                warn!(
                    expected = %current.section.id,
                    classified = %classified.id,
                    "item classifies outside the section it was dropped in"
                );
            }
        }
        for i in assignment.indices.clone() {
            let item = collection.get(i);
            hooks.on_order_assigned(item, item.order_key());
        }

        debug!(
            from = start.logical,
            to = current.logical,
            from_section = %start.section.id,
            to_section = %current.section.id,
            frames = self.frames,
            keys = assignment.indices.len(),
            "drag committed"
        );
        DropOutcome::Committed(CommittedMove {
            from_index: start.logical,
            to_index: current.logical,
            from_section: start.section,
            to_section: current.section,
            assignment,
        })
    }

    /// Abandon the gesture without persisting anything.
    ///
    /// Frames already applied stay applied; the caller reloads the
    /// collection if it needs the pre-drag order back.
    pub fn cancel(self) -> DropOutcome {
        debug!(frames = self.frames, "drag cancelled");
        DropOutcome::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Row, by_section, ids};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        locked: Vec<String>,
        assigned: Vec<(String, OrderKey)>,
        transitions: Vec<(String, String, String)>,
    }

    impl OwnerHooks<Row> for Recorder {
        fn can_enter_section(&self, section: &SectionKey) -> bool {
            !self.locked.contains(&section.id)
        }

        fn on_section_transition(&mut self, item: &mut Row, from: &SectionKey, to: &SectionKey) {
            item.section = to.id.clone();
            self.transitions
                .push((item.id.clone(), from.id.clone(), to.id.clone()));
        }

        fn on_order_assigned(&mut self, item: &Row, key: OrderKey) {
            self.assigned.push((item.id.clone(), key));
        }
    }

    fn collection(layout: &[(&str, &str, i64)]) -> SectionedCollection<Row> {
        let mut c = SectionedCollection::new(by_section);
        c.reset(layout.iter().map(|(id, s, o)| Row::new(id, s, *o)).collect());
        c.drain_changes();
        c
    }

    fn sample() -> SectionedCollection<Row> {
        // [a] a1 a2 [b] b1 [c] c1
        collection(&[
            ("a1", "a", 1000),
            ("a2", "a", 2000),
            ("b1", "b", 1000),
            ("c1", "c", 1000),
        ])
    }

    #[test]
    fn test_drop_without_moves_is_cancelled() {
        let mut c = sample();
        let mut hooks = Recorder::default();
        let session = DragReorderSession::new();
        assert_eq!(session.phase(), DragPhase::Idle);
        assert_eq!(session.on_drop(&mut c, &mut hooks), DropOutcome::Cancelled);
        assert!(hooks.assigned.is_empty());
    }

    #[test]
    fn test_move_up_within_section() {
        let mut c = sample();
        let mut hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        session.on_move(&mut c, &hooks, 2, 1).unwrap();
        assert_eq!(session.phase(), DragPhase::Dragging);
        let outcome = session.on_drop(&mut c, &mut hooks);
        assert_eq!(ids(c.items()), vec!["a2", "a1", "b1", "c1"]);
        assert_eq!(hooks.assigned, vec![("a2".to_string(), 500)]);
        match outcome {
            DropOutcome::Committed(m) => {
                assert_eq!((m.from_index, m.to_index), (1, 0));
                assert!(!m.section_changed());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cross_section_move_runs_transition() {
        let mut c = sample();
        let mut hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        // a2 down onto header b
        session.on_move(&mut c, &hooks, 2, 3).unwrap();
        let outcome = session.on_drop(&mut c, &mut hooks);
        assert!(matches!(outcome, DropOutcome::Committed(ref m) if m.section_changed()));
        assert_eq!(
            hooks.transitions,
            vec![("a2".to_string(), "a".to_string(), "b".to_string())]
        );
        // first in b, before b1 (1000)
        assert_eq!(hooks.assigned, vec![("a2".to_string(), 500)]);
        assert_eq!(c.classify(1).id, "b");
        c.verify().unwrap();
    }

    #[test]
    fn test_locked_section_rejects_without_mutation() {
        let mut c = sample();
        let mut hooks = Recorder {
            locked: vec!["b".into()],
            ..Default::default()
        };
        let before = c.flat().elements().to_vec();
        let mut session = DragReorderSession::new();
        assert_eq!(
            session.on_move(&mut c, &hooks, 2, 3),
            Err(DragError::SectionLocked("b".into()))
        );
        assert_eq!(c.flat().elements(), before.as_slice());
        assert!(!c.has_pending_changes());
        assert_eq!(session.phase(), DragPhase::Idle);
        assert_eq!(session.on_drop(&mut c, &mut hooks), DropOutcome::Cancelled);
        assert!(hooks.assigned.is_empty());
        assert!(hooks.transitions.is_empty());
    }

    #[test]
    fn test_rejections_for_bad_frames() {
        let mut c = sample();
        let hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        assert_eq!(
            session.on_move(&mut c, &hooks, 0, 1),
            Err(DragError::NotAnItem(0))
        );
        assert_eq!(
            session.on_move(&mut c, &hooks, 1, 0),
            Err(DragError::NoSectionAbove)
        );
        assert_eq!(
            session.on_move(&mut c, &hooks, 1, 40),
            Err(DragError::OutOfRange { pos: 40, len: 7 })
        );
    }

    #[test]
    fn test_frame_must_follow_dragged_item() {
        let mut c = sample();
        let hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        session.on_move(&mut c, &hooks, 1, 2).unwrap();
        // a1 now sits at 2; a frame starting at 1 (a2) is someone else
        assert_eq!(
            session.on_move(&mut c, &hooks, 1, 2),
            Err(DragError::NotDraggedItem {
                pos: 1,
                expected: 2
            })
        );
    }

    #[test]
    fn test_multi_frame_drag_keeps_start_and_latest() {
        let mut c = sample();
        let mut hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        // a1 walks down: past a2, onto header b, past b1
        session.on_move(&mut c, &hooks, 1, 2).unwrap();
        session.on_move(&mut c, &hooks, 2, 3).unwrap();
        session.on_move(&mut c, &hooks, 3, 4).unwrap();
        assert_eq!(session.frames(), 3);
        assert_eq!(session.current_index(), Some(2));
        let outcome = session.on_drop(&mut c, &mut hooks);
        match outcome {
            DropOutcome::Committed(m) => {
                assert_eq!((m.from_index, m.to_index), (0, 2));
                assert_eq!(m.from_section.id, "a");
                assert_eq!(m.to_section.id, "b");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ids(c.items()), vec!["a2", "b1", "a1", "c1"]);
        // after b1 (1000), end of section
        assert_eq!(hooks.assigned, vec![("a1".to_string(), 2000)]);
        c.verify().unwrap();
    }

    #[test]
    fn test_drag_there_and_back_is_unchanged() {
        let mut c = sample();
        let mut hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        session.on_move(&mut c, &hooks, 1, 2).unwrap();
        session.on_move(&mut c, &hooks, 2, 1).unwrap();
        assert_eq!(session.on_drop(&mut c, &mut hooks), DropOutcome::Unchanged);
        assert!(hooks.assigned.is_empty());
        assert_eq!(ids(c.items()), vec!["a1", "a2", "b1", "c1"]);
    }

    #[test]
    fn test_cancel_keeps_applied_frames() {
        let mut c = sample();
        let hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        session.on_move(&mut c, &hooks, 2, 1).unwrap();
        assert_eq!(session.cancel(), DropOutcome::Cancelled);
        assert!(hooks.assigned.is_empty());
        assert_eq!(ids(c.items()), vec!["a2", "a1", "b1", "c1"]);
    }

    #[test]
    fn test_sole_item_leaves_section() {
        let mut c = sample();
        let mut hooks = Recorder::default();
        let mut session = DragReorderSession::new();
        // b1 (pos 4) up onto its header: joins the end of a, b disappears
        session.on_move(&mut c, &hooks, 4, 3).unwrap();
        assert_eq!(
            c.sections()
                .iter()
                .map(|(k, n)| (k.id.as_str(), *n))
                .collect::<Vec<_>>(),
            vec![("a", 3), ("c", 1)]
        );
        let outcome = session.on_drop(&mut c, &mut hooks);
        assert!(matches!(outcome, DropOutcome::Committed(_)));
        assert_eq!(hooks.assigned, vec![("b1".to_string(), 3000)]);
        c.verify().unwrap();
    }

    #[test]
    fn test_unit_owner_accepts_everything() {
        let mut c = sample();
        let mut session = DragReorderSession::new();
        session.on_move(&mut c, &(), 6, 5).unwrap();
        let outcome = session.on_drop(&mut c, &mut ());
        assert!(matches!(outcome, DropOutcome::Committed(_)));
        assert_eq!(c.section_of(3).id, "b");
    }
}
