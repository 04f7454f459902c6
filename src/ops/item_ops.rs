use chrono::{Datelike, Local};

use crate::engine::SectionKey;
use crate::model::grouping::{
    Grouping, SECTION_DOING, SECTION_DONE, SECTION_HIGH, SECTION_PENDING, SECTION_UNDATED,
    SECTION_UPCOMING, parse_year_id,
};
use crate::model::item::{ItemStatus, MediaItem, MediaKind};

/// Error type for item operations
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("unknown section '{section}' for {grouping} grouping")]
    UnknownSection { section: String, grouping: Grouping },
    #[error("section {0} is locked")]
    SectionLocked(String),
    #[error("cannot move {0} relative to itself")]
    SelfReference(String),
    #[error("move rejected: {0}")]
    Drag(#[from] crate::engine::DragError),
}

// ---------------------------------------------------------------------------
// Status and section transitions
// ---------------------------------------------------------------------------

/// Direct status set, with completion-year bookkeeping.
///
/// Finishing an item stamps the current year unless one is recorded;
/// reopening clears it. `high` overrides the priority flag when given.
pub fn set_status(item: &mut MediaItem, status: ItemStatus, high: Option<bool>) {
    set_status_in(item, status, high, current_year());
}

fn set_status_in(item: &mut MediaItem, status: ItemStatus, high: Option<bool>, year: i32) {
    if item.status != status {
        if status == ItemStatus::Done {
            item.completed.get_or_insert(year);
        } else {
            item.completed = None;
        }
        item.status = status;
    }
    if let Some(high) = high {
        item.high_priority = high;
    }
}

/// Rewrite `item` so it classifies under `to`.
///
/// Run when an item is dragged across a section boundary. Returns false if
/// `to` is not a section of `grouping` (the item is left untouched).
pub fn apply_section_transition(item: &mut MediaItem, to: &SectionKey, grouping: Grouping) -> bool {
    apply_section_transition_in(item, to, grouping, current_year())
}

pub(crate) fn apply_section_transition_in(
    item: &mut MediaItem,
    to: &SectionKey,
    grouping: Grouping,
    this_year: i32,
) -> bool {
    match grouping {
        Grouping::Status => match to.id.as_str() {
            SECTION_HIGH => {
                if item.is_done() {
                    reopen(item);
                }
                item.high_priority = true;
            }
            SECTION_DOING => {
                item.status = ItemStatus::Doing;
                item.completed = None;
                item.high_priority = false;
            }
            SECTION_UPCOMING => {
                item.status = ItemStatus::Upcoming;
                item.completed = None;
                item.high_priority = false;
            }
            SECTION_DONE => {
                item.status = ItemStatus::Done;
                item.completed = Some(this_year);
            }
            _ => return false,
        },
        Grouping::Year => match to.id.as_str() {
            SECTION_PENDING => {
                if item.is_done() {
                    reopen(item);
                }
            }
            SECTION_UNDATED => {
                item.status = ItemStatus::Done;
                item.completed = None;
            }
            id => {
                let Some(year) = parse_year_id(id) else {
                    return false;
                };
                item.status = ItemStatus::Done;
                item.completed = Some(year);
            }
        },
    }
    true
}

fn reopen(item: &mut MediaItem) {
    item.status = ItemStatus::Upcoming;
    item.completed = None;
}

fn current_year() -> i32 {
    Local::now().year()
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Next free id for `kind`, e.g. `BOOK-004` when `BOOK-003` is the highest
pub fn next_id(items: &[MediaItem], kind: MediaKind) -> String {
    let prefix_dash = format!("{}-", kind.id_prefix());
    let max = items
        .iter()
        .filter_map(|i| i.id.strip_prefix(&prefix_dash))
        .filter_map(|n| n.parse::<usize>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", prefix_dash, max + 1)
}

/// Build a new item with a fresh id and today's date. Its order key is
/// assigned when it is inserted into a collection.
pub fn new_item(
    items: &[MediaItem],
    title: String,
    kind: MediaKind,
    status: ItemStatus,
    high: bool,
    owned: bool,
) -> MediaItem {
    let mut item = MediaItem::new(next_id(items, kind), title, kind);
    item.added = Some(Local::now().format("%Y-%m-%d").to_string());
    item.owned = owned;
    set_status(&mut item, status, Some(high));
    item
}

/// Index of the item with `id` (case-insensitive)
pub fn find_item(items: &[MediaItem], id: &str) -> Result<usize, ItemError> {
    items
        .iter()
        .position(|i| i.id.eq_ignore_ascii_case(id))
        .ok_or_else(|| ItemError::NotFound(id.to_string()))
}

/// Resolve a section id for `grouping`
pub fn resolve_section(grouping: Grouping, id: &str) -> Result<SectionKey, ItemError> {
    grouping
        .section(id)
        .ok_or_else(|| ItemError::UnknownSection {
            section: id.to_string(),
            grouping,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SectionClassifier;

    fn book(id: &str) -> MediaItem {
        MediaItem::new(id.into(), "Title".into(), MediaKind::Book)
    }

    #[test]
    fn test_set_status_stamps_and_clears_year() {
        let mut item = book("BOOK-001");
        set_status_in(&mut item, ItemStatus::Done, None, 2024);
        assert_eq!(item.completed, Some(2024));

        // already done: year kept
        set_status_in(&mut item, ItemStatus::Done, Some(true), 2030);
        assert_eq!(item.completed, Some(2024));
        assert!(item.high_priority);

        set_status_in(&mut item, ItemStatus::Doing, None, 2030);
        assert_eq!(item.completed, None);
        assert!(item.high_priority);
    }

    #[test]
    fn test_transition_lands_in_target_section() {
        let g = Grouping::Status;
        for target in ["high", "doing", "upcoming", "done"] {
            for start in ["high", "doing", "upcoming", "done"] {
                let mut item = book("BOOK-001");
                apply_section_transition_in(&mut item, &g.section(start).unwrap(), g, 2024);
                let to = g.section(target).unwrap();
                assert!(apply_section_transition_in(&mut item, &to, g, 2024));
                assert_eq!(g.classify(&item), to, "{} -> {}", start, target);
            }
        }
    }

    #[test]
    fn test_year_transitions() {
        let g = Grouping::Year;
        let mut item = book("BOOK-001");
        assert!(apply_section_transition_in(&mut item, &g.section("y2019").unwrap(), g, 2024));
        assert_eq!((item.status, item.completed), (ItemStatus::Done, Some(2019)));

        apply_section_transition_in(&mut item, &g.section("undated").unwrap(), g, 2024);
        assert_eq!((item.status, item.completed), (ItemStatus::Done, None));

        apply_section_transition_in(&mut item, &g.section("pending").unwrap(), g, 2024);
        assert_eq!(item.status, ItemStatus::Upcoming);
        assert_eq!(g.classify(&item).id, "pending");
    }

    #[test]
    fn test_done_transition_stamps_this_year() {
        let mut item = book("BOOK-001");
        let done = Grouping::Status.section("done").unwrap();
        apply_section_transition_in(&mut item, &done, Grouping::Status, 2025);
        assert_eq!(item.completed, Some(2025));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let mut item = book("BOOK-001");
        let before = item.clone();
        let bogus = SectionKey::new("later", "Later");
        assert!(!apply_section_transition_in(&mut item, &bogus, Grouping::Status, 2024));
        assert!(!apply_section_transition_in(&mut item, &bogus, Grouping::Year, 2024));
        assert_eq!(item, before);
    }

    #[test]
    fn test_next_id() {
        let items = vec![book("BOOK-001"), book("BOOK-007"), book("GAME-012")];
        assert_eq!(next_id(&items, MediaKind::Book), "BOOK-008");
        assert_eq!(next_id(&items, MediaKind::Movie), "MOVIE-001");
        assert_eq!(next_id(&[], MediaKind::Game), "GAME-001");
    }

    #[test]
    fn test_new_item() {
        let item = new_item(
            &[book("BOOK-001")],
            "Dune".into(),
            MediaKind::Book,
            ItemStatus::Doing,
            true,
            true,
        );
        assert_eq!(item.id, "BOOK-002");
        assert_eq!(item.status, ItemStatus::Doing);
        assert!(item.high_priority && item.owned);
        assert_eq!(item.added.as_deref().map(str::len), Some(10));
    }

    #[test]
    fn test_find_item() {
        let items = vec![book("BOOK-001"), book("BOOK-002")];
        assert_eq!(find_item(&items, "book-002").unwrap(), 1);
        assert!(matches!(
            find_item(&items, "BOOK-404"),
            Err(ItemError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_section() {
        assert_eq!(resolve_section(Grouping::Year, "2021").unwrap().id, "y2021");
        let err = resolve_section(Grouping::Status, "2021").unwrap_err();
        assert_eq!(err.to_string(), "unknown section '2021' for status grouping");
    }
}
