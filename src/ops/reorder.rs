use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::engine::{
    DragReorderSession, DropOutcome, OrderKey, OrderKeyAllocator, OwnerHooks, Reclassified,
    SectionKey, SectionedCollection, sort_for_display,
};
use crate::model::config::{SectionsConfig, ShelfConfig};
use crate::model::grouping::Grouping;
use crate::model::item::MediaItem;
use crate::ops::item_ops::{ItemError, apply_section_transition, find_item};

/// Owner side of the engine for a shelf: honours locked sections, applies
/// section side effects, and remembers which items got new keys.
pub struct ShelfHooks<'a> {
    sections: &'a SectionsConfig,
    /// Ids of items whose order key was written, in assignment order
    pub assigned: Vec<(String, OrderKey)>,
}

impl<'a> ShelfHooks<'a> {
    pub fn new(sections: &'a SectionsConfig) -> Self {
        ShelfHooks {
            sections,
            assigned: Vec::new(),
        }
    }

    pub fn grouping(&self) -> Grouping {
        self.sections.grouping
    }
}

impl OwnerHooks<MediaItem> for ShelfHooks<'_> {
    fn can_enter_section(&self, section: &SectionKey) -> bool {
        !self.sections.is_locked(&section.id)
    }

    fn on_section_transition(&mut self, item: &mut MediaItem, from: &SectionKey, to: &SectionKey) {
        if !apply_section_transition(item, to, self.sections.grouping) {
            warn!(item = %item.id, from = %from.id, to = %to.id, "no transition for section");
        }
    }

    fn on_order_assigned(&mut self, item: &MediaItem, key: OrderKey) {
        self.assigned.push((item.id.clone(), key));
    }
}

/// Sort `items` for display and load them into a collection using the
/// shelf's grouping and key step.
pub fn open_collection(
    mut items: Vec<MediaItem>,
    config: &ShelfConfig,
) -> SectionedCollection<MediaItem> {
    let grouping = config.sections.grouping;
    sort_for_display(&mut items, &grouping);
    let mut collection =
        SectionedCollection::with_allocator(grouping, OrderKeyAllocator::new(config.order.step));
    collection.reset(items);
    collection.drain_changes();
    collection
}

// ---------------------------------------------------------------------------
// Scripted drags
// ---------------------------------------------------------------------------

/// Where `shelf mv` should put an item
#[derive(Debug, Clone)]
pub enum MoveTarget {
    /// Directly above the item with this id
    Before(String),
    /// Directly below the item with this id
    After(String),
    /// First row of the section
    Top(SectionKey),
    /// Last row of the section
    Bottom(SectionKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The item already was where it was asked to go
    Unchanged,
    Moved {
        index: usize,
        from_section: SectionKey,
        to_section: SectionKey,
        /// Number of order keys written
        keys: usize,
        rebalanced: bool,
    },
}

/// Move an item by replaying the drag a pointer would make: one frame per
/// row crossed, then a drop.
///
/// A section with no rows cannot be dragged into; for those the item's
/// fields are changed to match and it is reclassified instead. On `Err`
/// the collection may hold applied frames and must not be saved.
pub fn move_item(
    collection: &mut SectionedCollection<MediaItem>,
    hooks: &mut ShelfHooks<'_>,
    id: &str,
    target: &MoveTarget,
) -> Result<MoveOutcome, ItemError> {
    let logical = find_item(collection.items(), id)?;
    let target = resolve_anchor(collection, id, target)?;

    if let Goal::Section(section) | Goal::SectionEnd(section) = &target
        && collection.flat().header_position(section).is_none()
    {
        return move_to_empty_section(collection, hooks, logical, section);
    }

    let mut session = DragReorderSession::new();
    let frame_limit = 2 * collection.flat().len() + 2;
    for _ in 0..frame_limit {
        let current = session.current_index().unwrap_or(logical);
        let Some(pos) = collection.flat().flat_position_of(current) else {
            break;
        };
        let to = match direction(collection, pos, &target) {
            Ordering::Equal => break,
            Ordering::Less => pos - 1,
            Ordering::Greater => pos + 1,
        };
        if let Err(e) = session.on_move(collection, &*hooks, pos, to) {
            debug!(error = %e, "scripted drag rejected");
            session.cancel();
            return Err(e.into());
        }
    }

    match session.on_drop(collection, hooks) {
        DropOutcome::Cancelled | DropOutcome::Unchanged => Ok(MoveOutcome::Unchanged),
        DropOutcome::Committed(m) => Ok(MoveOutcome::Moved {
            index: m.to_index,
            keys: m.assignment.indices.len(),
            rebalanced: m.assignment.rebalanced,
            from_section: m.from_section,
            to_section: m.to_section,
        }),
    }
}

fn move_to_empty_section(
    collection: &mut SectionedCollection<MediaItem>,
    hooks: &mut ShelfHooks<'_>,
    logical: usize,
    section: &SectionKey,
) -> Result<MoveOutcome, ItemError> {
    if !hooks.can_enter_section(section) {
        return Err(ItemError::SectionLocked(section.id.clone()));
    }
    let grouping = hooks.grouping();
    let reclassified = collection.update(logical, |item| {
        apply_section_transition(item, section, grouping);
    });
    match reclassified {
        Reclassified::Unchanged => Ok(MoveOutcome::Unchanged),
        Reclassified::Moved {
            from,
            to,
            index,
            assignment,
        } => {
            let written = assignment
                .as_ref()
                .map_or(index..index + 1, |a| a.indices.clone());
            for i in written.clone() {
                let item = collection.get(i);
                hooks.on_order_assigned(item, item.order);
            }
            Ok(MoveOutcome::Moved {
                index,
                from_section: from,
                to_section: to,
                keys: written.len(),
                rebalanced: assignment.is_some_and(|a| a.rebalanced),
            })
        }
    }
}

/// A move target with item anchors resolved to exact ids
enum Goal {
    Before(String),
    After(String),
    Section(SectionKey),
    SectionEnd(SectionKey),
}

fn resolve_anchor(
    collection: &SectionedCollection<MediaItem>,
    id: &str,
    target: &MoveTarget,
) -> Result<Goal, ItemError> {
    let anchor = |other: &str| -> Result<String, ItemError> {
        if other.eq_ignore_ascii_case(id) {
            return Err(ItemError::SelfReference(id.to_string()));
        }
        let i = find_item(collection.items(), other)?;
        Ok(collection.get(i).id.clone())
    };
    Ok(match target {
        MoveTarget::Before(other) => Goal::Before(anchor(other)?),
        MoveTarget::After(other) => Goal::After(anchor(other)?),
        MoveTarget::Top(section) => Goal::Section(section.clone()),
        MoveTarget::Bottom(section) => Goal::SectionEnd(section.clone()),
    })
}

/// Which way the dragged row at `pos` still has to go
fn direction(
    collection: &SectionedCollection<MediaItem>,
    pos: usize,
    goal: &Goal,
) -> Ordering {
    let flat = collection.flat();
    let item_pos = |id: &String| {
        collection
            .position_of(id)
            .and_then(|logical| flat.flat_position_of(logical))
    };
    let wanted = match goal {
        Goal::Before(other) => item_pos(other).map(|x| x.saturating_sub(1)),
        Goal::After(other) => item_pos(other).map(|x| if pos < x { x } else { x + 1 }),
        Goal::Section(section) => flat.header_position(section).map(|h| {
            if pos < h { h } else { h + 1 }
        }),
        Goal::SectionEnd(section) => flat
            .header_position(section)
            .and_then(|h| flat.section_span(h))
            .map(|(_, rows)| rows.end.saturating_sub(1)),
    };
    match wanted {
        Some(wanted) => wanted.cmp(&pos),
        None => Ordering::Equal,
    }
}
