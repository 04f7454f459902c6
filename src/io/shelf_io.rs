use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::model::config::ShelfConfig;
use crate::model::item::MediaItem;
use crate::model::shelf::Shelf;

pub const SHELF_DIR: &str = "shelf";
pub const CONFIG_FILE: &str = "shelf.toml";
pub const ITEMS_FILE: &str = "items.json";

/// Error type for shelf I/O operations
#[derive(Debug, thiserror::Error)]
pub enum ShelfError {
    #[error("not a shelf: no shelf/ directory with shelf.toml found")]
    NotAShelf,
    #[error("a shelf already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse shelf.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not edit shelf.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("could not serialize shelf.toml: {0}")]
    ConfigSerializeError(#[from] toml::ser::Error),
    #[error("invalid items.json: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Find the shelf root by walking up from `start`, looking for a
/// `shelf/` subdirectory that holds a `shelf.toml`.
pub fn discover_shelf(start: &Path) -> Result<PathBuf, ShelfError> {
    let mut current = start.to_path_buf();
    loop {
        let shelf_dir = current.join(SHELF_DIR);
        if shelf_dir.is_dir() && shelf_dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ShelfError::NotAShelf);
        }
    }
}

/// Load config and items from the shelf rooted at `root`.
///
/// A missing items.json is an empty shelf.
pub fn load_shelf(root: &Path) -> Result<Shelf, ShelfError> {
    let shelf_dir = root.join(SHELF_DIR);
    if !shelf_dir.is_dir() {
        return Err(ShelfError::NotAShelf);
    }

    let config_path = shelf_dir.join(CONFIG_FILE);
    let config_text = read(&config_path)?;
    let config: ShelfConfig = toml::from_str(&config_text)?;

    let items_path = shelf_dir.join(ITEMS_FILE);
    let items: Vec<MediaItem> = if items_path.exists() {
        serde_json::from_str(&read(&items_path)?)?
    } else {
        Vec::new()
    };
    debug!(root = %root.display(), items = items.len(), "loaded shelf");

    Ok(Shelf {
        root: root.to_path_buf(),
        shelf_dir,
        config,
        items,
    })
}

/// Write the items back to items.json
pub fn save_items(shelf_dir: &Path, items: &[MediaItem]) -> Result<(), ShelfError> {
    let path = shelf_dir.join(ITEMS_FILE);
    let mut content = serde_json::to_string_pretty(items)?;
    content.push('\n');
    atomic_write(&path, content.as_bytes()).map_err(|e| ShelfError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    debug!(path = %path.display(), items = items.len(), "saved items");
    Ok(())
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn read(path: &Path) -> Result<String, ShelfError> {
    fs::read_to_string(path).map_err(|e| ShelfError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}
