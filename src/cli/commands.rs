use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::model::grouping::Grouping;
use crate::model::item::{ItemStatus, MediaKind};

#[derive(Parser)]
#[command(name = "shelf", about = concat!("shelf v", env!("CARGO_PKG_VERSION"), " - books, movies, shows and games in the order you want them"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different shelf directory
    #[arg(short = 'C', long = "shelf-dir", global = true)]
    pub shelf_dir: Option<String>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new shelf in the current directory
    Init(InitArgs),
    /// List items, grouped into sections
    List(ListArgs),
    /// Add an item at the end of its section
    Add(AddArgs),
    /// Move an item (reorder, or drag it into another section)
    Mv(MvArgs),
    /// Remove an item
    Rm(RmArgs),
    /// Change an item's status or priority
    Status(StatusArgs),
    /// Re-space order keys
    Rebalance(RebalanceArgs),
    /// Validate the shelf
    Check,
    /// Lock or unlock sections against drags
    Section(SectionCmd),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Shelf name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// How to split the list into sections
    #[arg(long, default_value = "status")]
    pub grouping: Grouping,
    /// Reinitialize even if shelf/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Group by something other than the configured grouping
    #[arg(long)]
    pub grouping: Option<Grouping>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Title
    pub title: String,
    /// book, movie, show or game
    #[arg(long)]
    pub kind: MediaKind,
    #[arg(long, default_value = "upcoming")]
    pub status: ItemStatus,
    /// Mark as high priority
    #[arg(long)]
    pub high: bool,
    /// Already owned
    #[arg(long)]
    pub owned: bool,
}

#[derive(Args)]
#[command(group(ArgGroup::new("place").required(true).args(["before", "after", "top", "bottom"])))]
pub struct MvArgs {
    /// Item ID
    pub id: String,
    /// Put directly above this item
    #[arg(long)]
    pub before: Option<String>,
    /// Put directly below this item
    #[arg(long)]
    pub after: Option<String>,
    /// Top of the section
    #[arg(long)]
    pub top: bool,
    /// Bottom of the section
    #[arg(long)]
    pub bottom: bool,
    /// Section for --top/--bottom (default: the item's own section)
    #[arg(long, conflicts_with_all = ["before", "after"])]
    pub section: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Item ID
    pub id: String,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Item ID
    pub id: String,
    /// New status (upcoming, doing, done)
    pub status: Option<ItemStatus>,
    /// Set high priority
    #[arg(long, conflicts_with = "no_high")]
    pub high: bool,
    /// Clear high priority
    #[arg(long)]
    pub no_high: bool,
}

#[derive(Args)]
pub struct RebalanceArgs {
    /// Section to re-space (default: all)
    pub section: Option<String>,
}

// ---------------------------------------------------------------------------
// Section management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SectionCmd {
    #[command(subcommand)]
    pub action: SectionAction,
}

#[derive(Subcommand)]
pub enum SectionAction {
    /// Stop drags from entering a section
    Lock(SectionIdArg),
    /// Allow drags into a section again
    Unlock(SectionIdArg),
}

#[derive(Args)]
pub struct SectionIdArg {
    /// Section ID (e.g. done, y2023)
    pub id: String,
}
