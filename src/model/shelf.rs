use std::path::PathBuf;

use super::config::ShelfConfig;
use super::item::MediaItem;

/// A fully loaded shelf
#[derive(Debug)]
pub struct Shelf {
    /// Root directory (parent of `shelf/`)
    pub root: PathBuf,
    /// Path to the `shelf/` directory
    pub shelf_dir: PathBuf,
    /// Parsed shelf.toml
    pub config: ShelfConfig,
    /// Items in the order they are stored, not display order
    pub items: Vec<MediaItem>,
}

impl Shelf {
    pub fn find(&self, id: &str) -> Option<&MediaItem> {
        self.items.iter().find(|i| i.id.eq_ignore_ascii_case(id))
    }
}
