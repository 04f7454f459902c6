use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::shelf_io::{self, CONFIG_FILE, ITEMS_FILE, SHELF_DIR, ShelfError};
use crate::model::grouping::Grouping;

const SHELF_TOML_TEMPLATE: &str = r##"[shelf]
name = ""

[order]
# Gap between neighbouring order keys after a rebalance.
step = 1000

[sections]
# "status": high priority / doing now / upcoming / done
# "year":   not finished / one section per year finished / year unknown
grouping = "status"

# Sections a dragged item may not enter, e.g. ["done"].
# Edit with: shelf section lock <id>
locked = []
"##;

/// Infer a shelf name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render shelf.toml from the template, keeping its comments.
fn render_shelf_toml(name: &str, grouping: Grouping) -> Result<String, ShelfError> {
    let mut doc: toml_edit::DocumentMut = SHELF_TOML_TEMPLATE.parse()?;
    doc["shelf"]["name"] = toml_edit::value(name);
    doc["sections"]["grouping"] = toml_edit::value(grouping.as_str());
    Ok(doc.to_string())
}

pub fn cmd_init(args: InitArgs, dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match dir {
        Some(dir) => Path::new(dir).to_path_buf(),
        None => std::env::current_dir()?,
    };
    let shelf_dir = root.join(SHELF_DIR);

    if shelf_dir.join(CONFIG_FILE).exists() && !args.force {
        return Err(ShelfError::AlreadyExists(shelf_dir).into());
    }

    // Check for an enclosing shelf and warn
    if let Some(parent) = root.parent()
        && let Ok(parent_root) = shelf_io::discover_shelf(parent)
    {
        eprintln!(
            "Note: parent shelf found at {}/",
            parent_root.join(SHELF_DIR).display()
        );
        eprintln!("Creating new shelf in {}/", shelf_dir.display());
    }

    let name = args.name.unwrap_or_else(|| {
        root.canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Untitled".to_string())
    });

    fs::create_dir_all(&shelf_dir)?;
    shelf_io::atomic_write(
        &shelf_dir.join(CONFIG_FILE),
        render_shelf_toml(&name, args.grouping)?.as_bytes(),
    )?;
    if args.force || !shelf_dir.join(ITEMS_FILE).exists() {
        shelf_io::save_items(&shelf_dir, &[])?;
    }

    println!("Initialized shelf: {} ({} grouping)", name, args.grouping);
    Ok(())
}
