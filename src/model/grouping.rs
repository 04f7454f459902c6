use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::item::{ItemStatus, MediaItem};
use crate::engine::{SectionClassifier, SectionKey};

pub const SECTION_HIGH: &str = "high";
pub const SECTION_DOING: &str = "doing";
pub const SECTION_UPCOMING: &str = "upcoming";
pub const SECTION_DONE: &str = "done";
pub const SECTION_PENDING: &str = "pending";
pub const SECTION_UNDATED: &str = "undated";

/// How the shelf is split into sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    /// high / doing / upcoming / done
    #[default]
    Status,
    /// Unfinished first, then finished items by year, newest first
    Year,
}

impl Grouping {
    pub fn as_str(self) -> &'static str {
        match self {
            Grouping::Status => "status",
            Grouping::Year => "year",
        }
    }

    /// Resolve a section id typed by a user (`done`, `2023`, `y2023`).
    ///
    /// Sections are computed, so any well-formed id is accepted even if no
    /// item is in it yet.
    pub fn section(self, id: &str) -> Option<SectionKey> {
        match self {
            Grouping::Status => match id {
                SECTION_HIGH => Some(high()),
                SECTION_DOING => Some(doing()),
                SECTION_UPCOMING => Some(upcoming()),
                SECTION_DONE => Some(done()),
                _ => None,
            },
            Grouping::Year => match id {
                SECTION_PENDING => Some(pending()),
                SECTION_UNDATED => Some(undated()),
                _ => parse_year_id(id).map(year),
            },
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(Grouping::Status),
            "year" => Ok(Grouping::Year),
            _ => Err(format!("unknown grouping '{}' (expected status or year)", s)),
        }
    }
}

impl SectionClassifier<MediaItem> for Grouping {
    fn classify(&self, item: &MediaItem) -> SectionKey {
        match self {
            Grouping::Status => match item.status {
                ItemStatus::Done => done(),
                _ if item.high_priority => high(),
                ItemStatus::Doing => doing(),
                ItemStatus::Upcoming => upcoming(),
            },
            Grouping::Year => match (item.status, item.completed) {
                (ItemStatus::Done, Some(y)) => year(y),
                (ItemStatus::Done, None) => undated(),
                _ => pending(),
            },
        }
    }
}

fn high() -> SectionKey {
    SectionKey::new(SECTION_HIGH, "High priority").with_rank(0)
}

fn doing() -> SectionKey {
    SectionKey::new(SECTION_DOING, "Doing now").with_rank(1)
}

fn upcoming() -> SectionKey {
    SectionKey::new(SECTION_UPCOMING, "Upcoming").with_rank(2)
}

fn done() -> SectionKey {
    SectionKey::new(SECTION_DONE, "Done").with_rank(3)
}

fn pending() -> SectionKey {
    SectionKey::new(SECTION_PENDING, "Not finished").with_rank(i64::MIN)
}

fn undated() -> SectionKey {
    SectionKey::new(SECTION_UNDATED, "Done, year unknown").with_rank(i64::MAX)
}

fn year(y: i32) -> SectionKey {
    SectionKey::new(format!("y{}", y), y.to_string()).with_rank(-i64::from(y))
}

/// `y2023` or `2023`
pub fn parse_year_id(id: &str) -> Option<i32> {
    id.strip_prefix('y').unwrap_or(id).parse().ok()
}
