pub mod config;
pub mod grouping;
pub mod item;
pub mod shelf;

pub use config::*;
pub use grouping::Grouping;
pub use item::*;
pub use shelf::*;
