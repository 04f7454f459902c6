use std::fs;
use std::path::Path;

use crate::io::shelf_io::{CONFIG_FILE, ShelfError, atomic_write};
use crate::model::config::ShelfConfig;

/// Read the shelf config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(shelf_dir: &Path) -> Result<(ShelfConfig, toml_edit::DocumentMut), ShelfError> {
    let config_path = shelf_dir.join(CONFIG_FILE);
    let config_text = fs::read_to_string(&config_path).map_err(|e| ShelfError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: ShelfConfig = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(shelf_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ShelfError> {
    let config_path = shelf_dir.join(CONFIG_FILE);
    atomic_write(&config_path, doc.to_string().as_bytes()).map_err(|e| {
        ShelfError::WriteError {
            path: config_path,
            source: e,
        }
    })
}

/// Add or remove `section_id` from `[sections] locked`. Returns false if
/// the list already had the requested state.
pub fn set_locked(doc: &mut toml_edit::DocumentMut, section_id: &str, locked: bool) -> bool {
    if !doc.contains_key("sections") {
        doc["sections"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    if doc["sections"].get("locked").is_none() {
        doc["sections"]["locked"] = toml_edit::value(toml_edit::Array::new());
    }
    let Some(array) = doc["sections"]["locked"].as_array_mut() else {
        return false;
    };

    let existing = array
        .iter()
        .position(|v| v.as_str() == Some(section_id));
    match (existing, locked) {
        (None, true) => {
            array.push(section_id);
            true
        }
        (Some(i), false) => {
            array.remove(i);
            true
        }
        _ => false,
    }
}
