mod init;
pub use init::cmd_init;

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::info;

/// Override for the shelf directory (set by -C)
static SHELF_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::engine::{Reclassified, SectionedCollection};
use crate::io::config_io;
use crate::io::shelf_io::{self, ShelfError};
use crate::model::item::MediaItem;
use crate::model::shelf::Shelf;
use crate::ops::reorder::{self, MoveOutcome, MoveTarget, ShelfHooks};
use crate::ops::{check, item_ops};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;

    // Store -C override for load_shelf_cwd()
    if let Some(ref dir) = cli.shelf_dir {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        let _ = SHELF_DIR_OVERRIDE.set(abs);
    }

    match cli.command {
        // Init is handled in main.rs before shelf discovery
        Commands::Init(args) => cmd_init(args, cli.shelf_dir.as_deref()),

        // Read commands
        Commands::List(args) => cmd_list(args, json),
        Commands::Check => cmd_check(json),

        // Write commands
        Commands::Add(args) => cmd_add(args, json),
        Commands::Mv(args) => cmd_mv(args, json),
        Commands::Rm(args) => cmd_rm(args, json),
        Commands::Status(args) => cmd_status(args, json),
        Commands::Rebalance(args) => cmd_rebalance(args, json),

        // Section management
        Commands::Section(args) => cmd_section(args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_shelf_cwd() -> Result<Shelf, ShelfError> {
    let start = match SHELF_DIR_OVERRIDE.get() {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let root = shelf_io::discover_shelf(&start)?;
    shelf_io::load_shelf(&root)
}

fn open(shelf: &Shelf) -> SectionedCollection<MediaItem> {
    reorder::open_collection(shelf.items.clone(), &shelf.config)
}

/// Persist the collection's items (in display order)
fn save(shelf: &Shelf, collection: SectionedCollection<MediaItem>) -> Result<(), ShelfError> {
    let items = collection.into_items();
    shelf_io::save_items(&shelf.shelf_dir, &items)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut shelf = load_shelf_cwd()?;
    if let Some(grouping) = args.grouping {
        shelf.config.sections.grouping = grouping;
    }
    let grouping = shelf.config.sections.grouping;
    let collection = open(&shelf);

    if json {
        return print_json(&list_to_json(&collection, grouping.as_str()));
    }
    if collection.is_empty() {
        println!("(empty shelf)");
        return Ok(());
    }
    for line in format_listing(&collection) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_check(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let shelf = load_shelf_cwd()?;
    let result = check::check_shelf(&shelf);

    if json {
        return print_json(&result);
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            match err {
                check::CheckError::DuplicateId { item_id, count } => {
                    println!("  {} is used by {} items", item_id, count);
                }
                check::CheckError::OrderCollision {
                    section,
                    item_ids,
                    key,
                } => {
                    println!(
                        "  [{}] {} out of order at key {} (run `shelf rebalance {}`)",
                        section,
                        item_ids.join(" / "),
                        key,
                        section
                    );
                }
                check::CheckError::Invariant { message } => {
                    println!("  {}", message);
                }
            }
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            println!();
        }
        println!("Warnings:");
        for warn in &result.warnings {
            match warn {
                check::CheckWarning::UnknownLockedSection { section } => {
                    println!("  locked section '{}' does not exist", section);
                }
                check::CheckWarning::UnassignedOrder { item_id } => {
                    println!("  {} has no order key", item_id);
                }
                check::CheckWarning::MissingAddedDate { item_id } => {
                    println!("  {} missing added date", item_id);
                }
            }
        }
    }
    if result.valid {
        println!("✓ shelf is valid");
    } else {
        println!("✗ shelf has errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let shelf = load_shelf_cwd()?;
    let item = item_ops::new_item(
        &shelf.items,
        args.title,
        args.kind,
        args.status,
        args.high,
        args.owned,
    );
    let mut collection = open(&shelf);
    let index = collection.insert_sorted(item);
    let added = collection.get(index);
    info!(
        id = %added.id,
        section = %collection.section_of(index).id,
        order = added.order,
        "added item"
    );

    if json {
        print_json(&item_to_json(added))?;
    } else {
        println!("{}", added.id);
    }
    save(&shelf, collection)?;
    Ok(())
}

fn cmd_mv(args: MvArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let shelf = load_shelf_cwd()?;
    let grouping = shelf.config.sections.grouping;
    let mut collection = open(&shelf);
    let logical = item_ops::find_item(collection.items(), &args.id)?;
    let id = collection.get(logical).id.clone();

    let section = match &args.section {
        Some(id) => item_ops::resolve_section(grouping, id)?,
        None => collection.section_of(logical).clone(),
    };
    let target = if let Some(other) = args.before {
        MoveTarget::Before(other)
    } else if let Some(other) = args.after {
        MoveTarget::After(other)
    } else if args.top {
        MoveTarget::Top(section)
    } else {
        MoveTarget::Bottom(section)
    };

    let mut hooks = ShelfHooks::new(&shelf.config.sections);
    let outcome = reorder::move_item(&mut collection, &mut hooks, &id, &target)?;
    let index = collection.position_of(&id).unwrap_or(logical);
    let item = collection.get(index);

    if json {
        print_json(&move_to_json(item, &outcome))?;
    } else {
        match &outcome {
            MoveOutcome::Unchanged => println!("{}: already in place", item.id),
            MoveOutcome::Moved {
                from_section,
                to_section,
                rebalanced,
                ..
            } => {
                if from_section == to_section {
                    println!("{}: moved within {}", item.id, to_section.display_name);
                } else {
                    println!(
                        "{}: moved from {} to {}",
                        item.id, from_section.display_name, to_section.display_name
                    );
                }
                if *rebalanced {
                    println!("  (re-spaced order keys in {})", to_section.display_name);
                }
            }
        }
    }
    if outcome != MoveOutcome::Unchanged {
        save(&shelf, collection)?;
    }
    Ok(())
}

fn cmd_rm(args: RmArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let shelf = load_shelf_cwd()?;
    let mut collection = open(&shelf);
    let logical = item_ops::find_item(collection.items(), &args.id)?;
    let removed = collection.remove_at(logical);

    if json {
        print_json(&item_to_json(&removed))?;
    } else {
        println!("removed {} ({})", removed.id, removed.title);
    }
    save(&shelf, collection)?;
    Ok(())
}

fn cmd_status(args: StatusArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let high = match (args.high, args.no_high) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    if args.status.is_none() && high.is_none() {
        return Err("nothing to change: give a status, --high or --no-high".into());
    }

    let shelf = load_shelf_cwd()?;
    let mut collection = open(&shelf);
    let logical = item_ops::find_item(collection.items(), &args.id)?;
    let reclassified = collection.update(logical, |item| {
        let status = args.status.unwrap_or(item.status);
        item_ops::set_status(item, status, high);
    });
    let index = match &reclassified {
        Reclassified::Unchanged => logical,
        Reclassified::Moved { index, .. } => *index,
    };
    let item = collection.get(index);

    if json {
        print_json(&item_to_json(item))?;
    } else {
        match &reclassified {
            Reclassified::Unchanged => println!("{}: {}", item.id, item.status),
            Reclassified::Moved { to, .. } => {
                println!("{}: {} (now in {})", item.id, item.status, to.display_name)
            }
        }
    }
    save(&shelf, collection)?;
    Ok(())
}

fn cmd_rebalance(args: RebalanceArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let shelf = load_shelf_cwd()?;
    let grouping = shelf.config.sections.grouping;
    let mut collection = open(&shelf);

    let targets = match &args.section {
        Some(id) => vec![item_ops::resolve_section(grouping, id)?],
        None => collection.sections().into_iter().map(|(k, _)| k).collect(),
    };
    let mut report = Vec::new();
    for section in targets {
        let assignment = collection
            .rebalance(&section.id)
            .ok_or_else(|| format!("section {} has no items", section.id))?;
        report.push(RebalanceJson {
            section: section.id,
            items: assignment.indices.len(),
        });
    }

    if json {
        print_json(&report)?;
    } else {
        for r in &report {
            println!("{}: {} items re-spaced", r.section, r.items);
        }
    }
    save(&shelf, collection)?;
    Ok(())
}

fn cmd_section(cmd: SectionCmd) -> Result<(), Box<dyn std::error::Error>> {
    let shelf = load_shelf_cwd()?;
    let grouping = shelf.config.sections.grouping;
    let (id, lock) = match &cmd.action {
        SectionAction::Lock(arg) => (arg.id.as_str(), true),
        SectionAction::Unlock(arg) => (arg.id.as_str(), false),
    };
    // store the canonical id, so `2023` locks `y2023`
    let section = item_ops::resolve_section(grouping, id)?;

    let (_, mut doc) = config_io::read_config(&shelf.shelf_dir)?;
    let changed = config_io::set_locked(&mut doc, &section.id, lock);
    if changed {
        config_io::write_config(&shelf.shelf_dir, &doc)?;
    }
    let verb = if lock { "locked" } else { "unlocked" };
    if changed {
        println!("{} {}", verb, section.id);
    } else {
        println!("{} already {}", section.id, verb);
    }
    Ok(())
}
