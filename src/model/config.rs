use serde::{Deserialize, Serialize};

use super::grouping::Grouping;
use crate::engine::DEFAULT_STEP;

/// Configuration from shelf.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfConfig {
    pub shelf: ShelfInfo,
    #[serde(default)]
    pub order: OrderConfig,
    #[serde(default)]
    pub sections: SectionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Gap between neighbouring order keys after a rebalance
    #[serde(default = "default_step")]
    pub step: i64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        OrderConfig {
            step: default_step(),
        }
    }
}

fn default_step() -> i64 {
    DEFAULT_STEP
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionsConfig {
    #[serde(default)]
    pub grouping: Grouping,
    /// Section ids a dragged item may not enter
    #[serde(default)]
    pub locked: Vec<String>,
}

impl SectionsConfig {
    pub fn is_locked(&self, section_id: &str) -> bool {
        self.locked.iter().any(|s| s == section_id)
    }
}
