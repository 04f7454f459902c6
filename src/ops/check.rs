use indexmap::IndexMap;
use serde::Serialize;

use crate::engine::{InvariantViolation, OrderKey};
use crate::model::item::MediaItem;
use crate::model::shelf::Shelf;
use crate::ops::reorder::open_collection;

/// Structured result from `shelf check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A validation error (something that should be fixed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// The same id is used by more than one item
    #[serde(rename = "duplicate_id")]
    DuplicateId { item_id: String, count: usize },
    /// Neighbouring items in a section do not have increasing keys;
    /// `shelf rebalance` fixes this
    #[serde(rename = "order_collision")]
    OrderCollision {
        section: String,
        item_ids: Vec<String>,
        key: OrderKey,
    },
    /// The rendered sequence is inconsistent
    #[serde(rename = "invariant")]
    Invariant { message: String },
}

/// A validation warning (non-critical issue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// `[sections] locked` names a section the grouping never produces
    #[serde(rename = "unknown_locked_section")]
    UnknownLockedSection { section: String },
    /// Item was never given an order key
    #[serde(rename = "unassigned_order")]
    UnassignedOrder { item_id: String },
    #[serde(rename = "missing_added_date")]
    MissingAddedDate { item_id: String },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a shelf and return structured results. Read-only.
///
/// Checks performed:
/// 1. No duplicate item ids
/// 2. Order keys strictly increase within every section
/// 3. The flat rendering satisfies its structural invariants
/// 4. Warnings for unknown locked sections, unassigned keys, missing dates
pub fn check_shelf(shelf: &Shelf) -> CheckResult {
    let mut result = CheckResult::default();

    for (item_id, count) in find_duplicate_ids(&shelf.items) {
        result
            .errors
            .push(CheckError::DuplicateId { item_id, count });
    }

    let collection = open_collection(shelf.items.clone(), &shelf.config);
    let mut start = 0;
    for (section, len) in collection.sections() {
        let run = &collection.items()[start..start + len];
        for pair in run.windows(2) {
            if pair[0].order >= pair[1].order {
                result.errors.push(CheckError::OrderCollision {
                    section: section.id.clone(),
                    item_ids: vec![pair[0].id.clone(), pair[1].id.clone()],
                    key: pair[1].order,
                });
            }
        }
        start += len;
    }
    match collection.verify() {
        // already reported pair by pair
        Ok(()) | Err(InvariantViolation::OrderKeys { .. }) => {}
        Err(e) => result.errors.push(CheckError::Invariant {
            message: e.to_string(),
        }),
    }

    let grouping = shelf.config.sections.grouping;
    for section in &shelf.config.sections.locked {
        if grouping.section(section).is_none() {
            result.warnings.push(CheckWarning::UnknownLockedSection {
                section: section.clone(),
            });
        }
    }
    for item in &shelf.items {
        check_item(item, &mut result);
    }

    result.valid = result.errors.is_empty();
    result
}

fn check_item(item: &MediaItem, result: &mut CheckResult) {
    if item.order == 0 {
        result.warnings.push(CheckWarning::UnassignedOrder {
            item_id: item.id.clone(),
        });
    }
    if item.added.is_none() {
        result.warnings.push(CheckWarning::MissingAddedDate {
            item_id: item.id.clone(),
        });
    }
}

/// Ids used more than once, in first-seen order. Case-insensitive, since
/// lookups are.
fn find_duplicate_ids(items: &[MediaItem]) -> Vec<(String, usize)> {
    let mut seen: IndexMap<String, (String, usize)> = IndexMap::new();
    for item in items {
        seen.entry(item.id.to_ascii_uppercase())
            .or_insert_with(|| (item.id.clone(), 0))
            .1 += 1;
    }
    seen.into_values().filter(|(_, n)| *n > 1).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
