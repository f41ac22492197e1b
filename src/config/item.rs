use serde::{Deserialize, Serialize};

/// A catalog entry in items.toml.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Item {
    pub item_name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub rate: f64,
}
