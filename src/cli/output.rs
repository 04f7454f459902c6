use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::engine::{FlatElement, OrderKey, SectionKey, SectionedCollection};
use crate::model::item::{ItemStatus, MediaItem, MediaKind};
use crate::ops::reorder::MoveOutcome;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    pub status: ItemStatus,
    pub high_priority: bool,
    pub owned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
    pub order: OrderKey,
}

#[derive(Serialize)]
pub struct SectionJson {
    pub id: String,
    pub name: String,
    pub items: Vec<ItemJson>,
}

#[derive(Serialize)]
pub struct ListJson {
    pub grouping: String,
    pub sections: Vec<SectionJson>,
}

#[derive(Serialize)]
pub struct MoveJson {
    pub id: String,
    pub moved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_section: Option<String>,
    pub order: OrderKey,
    pub keys_written: usize,
    pub rebalanced: bool,
}

#[derive(Serialize)]
pub struct RebalanceJson {
    pub section: String,
    pub items: usize,
}

pub fn item_to_json(item: &MediaItem) -> ItemJson {
    ItemJson {
        id: item.id.clone(),
        title: item.title.clone(),
        kind: item.kind,
        status: item.status,
        high_priority: item.high_priority,
        owned: item.owned,
        completed: item.completed,
        added: item.added.clone(),
        order: item.order,
    }
}

/// Sections in display order with their items
pub fn list_to_json(collection: &SectionedCollection<MediaItem>, grouping: &str) -> ListJson {
    let mut sections: Vec<SectionJson> = Vec::new();
    for element in collection.flat().elements() {
        match element {
            FlatElement::Header(key) => sections.push(SectionJson {
                id: key.id.clone(),
                name: key.display_name.clone(),
                items: Vec::new(),
            }),
            FlatElement::ItemRef { item_index, .. } => {
                if let Some(section) = sections.last_mut() {
                    section.items.push(item_to_json(collection.get(*item_index)));
                }
            }
        }
    }
    ListJson {
        grouping: grouping.to_string(),
        sections,
    }
}

pub fn move_to_json(item: &MediaItem, outcome: &MoveOutcome) -> MoveJson {
    match outcome {
        MoveOutcome::Unchanged => MoveJson {
            id: item.id.clone(),
            moved: false,
            from_section: None,
            to_section: None,
            order: item.order,
            keys_written: 0,
            rebalanced: false,
        },
        MoveOutcome::Moved {
            from_section,
            to_section,
            keys,
            rebalanced,
            ..
        } => MoveJson {
            id: item.id.clone(),
            moved: true,
            from_section: Some(from_section.id.clone()),
            to_section: Some(to_section.id.clone()),
            order: item.order,
            keys_written: *keys,
            rebalanced: *rebalanced,
        },
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn status_char(item: &MediaItem) -> char {
    match item.status {
        ItemStatus::Upcoming => ' ',
        ItemStatus::Doing => '>',
        ItemStatus::Done => 'x',
    }
}

/// Format a section header line
pub fn format_section_header(key: &SectionKey, count: usize) -> String {
    format!("== {} ({}) ==", key.display_name, count)
}

/// Format a single item as a one-line summary. Titles are padded to
/// `title_width` display columns so the kind column lines up.
pub fn format_item_line(item: &MediaItem, title_width: usize) -> String {
    let pad = title_width.saturating_sub(item.title.width());
    let mut flags = String::new();
    if item.high_priority {
        flags.push('!');
    }
    if item.owned {
        flags.push('$');
    }
    let year = item
        .completed
        .map(|y| format!(" {}", y))
        .unwrap_or_default();
    format!(
        "[{}] {:<10} {}{}  {:<5} {:>2}{}",
        status_char(item),
        item.id,
        item.title,
        " ".repeat(pad),
        item.kind,
        flags,
        year
    )
    .trim_end()
    .to_string()
}

/// The flat rendering: headers interleaved with item rows
pub fn format_listing(collection: &SectionedCollection<MediaItem>) -> Vec<String> {
    let title_width = collection
        .items()
        .iter()
        .map(|i| i.title.width())
        .max()
        .unwrap_or(0);
    let counts = collection.sections();
    let mut lines = Vec::new();
    let mut section = 0;
    for element in collection.flat().elements() {
        match element {
            FlatElement::Header(key) => {
                if !lines.is_empty() {
                    lines.push(String::new());
                }
                let count = counts.get(section).map_or(0, |(_, n)| *n);
                lines.push(format_section_header(key, count));
                section += 1;
            }
            FlatElement::ItemRef { item_index, .. } => {
                lines.push(format_item_line(collection.get(*item_index), title_width));
            }
        }
    }
    lines
}
