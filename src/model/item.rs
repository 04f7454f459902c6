use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::{Entry, OrderKey};

/// What kind of thing sits on the shelf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Book,
    Movie,
    Show,
    Game,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Book,
        MediaKind::Movie,
        MediaKind::Show,
        MediaKind::Game,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Book => "book",
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Game => "game",
        }
    }

    /// Prefix for generated ids, e.g. `BOOK-007`
    pub fn id_prefix(self) -> &'static str {
        match self {
            MediaKind::Book => "BOOK",
            MediaKind::Movie => "MOVIE",
            MediaKind::Show => "SHOW",
            MediaKind::Game => "GAME",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown kind '{}' (expected book, movie, show or game)", s))
    }
}

/// Progress through an item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Upcoming,
    Doing,
    Done,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Upcoming => "upcoming",
            ItemStatus::Doing => "doing",
            ItemStatus::Done => "done",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upcoming" => Ok(ItemStatus::Upcoming),
            "doing" => Ok(ItemStatus::Doing),
            "done" => Ok(ItemStatus::Done),
            _ => Err(format!(
                "unknown status '{}' (expected upcoming, doing or done)",
                s
            )),
        }
    }
}

/// One book, movie, show or game on the shelf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable id like `BOOK-003`
    pub id: String,
    pub title: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub high_priority: bool,
    #[serde(default)]
    pub owned: bool,
    /// Year the item was finished, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<i32>,
    /// `2025-05-14`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
    /// Sparse rank within the item's current section
    #[serde(default)]
    pub order: OrderKey,
}

impl MediaItem {
    pub fn new(id: String, title: String, kind: MediaKind) -> Self {
        MediaItem {
            id,
            title,
            kind,
            status: ItemStatus::Upcoming,
            high_priority: false,
            owned: false,
            completed: None,
            added: None,
            order: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ItemStatus::Done
    }
}

impl Entry for MediaItem {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }

    fn order_key(&self) -> OrderKey {
        self.order
    }

    fn set_order_key(&mut self, key: OrderKey) {
        self.order = key;
    }
}
