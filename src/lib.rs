//! A media shelf: books, movies, shows and games kept in hand-ordered
//! sections.
//!
//! [`engine`] is the reusable part: a sectioned, manually reorderable list
//! with sparse order keys and a drag-and-drop protocol. The rest of the
//! crate is one owner of that engine, with JSON storage and a CLI.

pub mod cli {
    pub mod commands;
    pub mod handlers;
    pub mod output;
}
pub mod engine;
pub mod io {
    pub mod config_io;
    pub mod shelf_io;
}
pub mod logging;
pub mod model;
pub mod ops {
    pub mod check;
    pub mod item_ops;
    pub mod reorder;
}
