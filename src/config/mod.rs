mod company;
mod customer;
mod item;
pub mod state;

pub use company::{BillingSettings, Company, Config, NotifySettings};
pub use customer::Customer;
pub use item::Item;
pub use state::{BillingDoc, BillingLine, DocStatus, State};

use crate::error::{BillingError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (XDG config dir, else ~/.billing/)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "billing") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        BillingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".billing"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Relative directories are resolved against the config directory.
pub fn resolve_dir(dir: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(dir);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

fn load_toml<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    if !path.exists() {
        return Err(BillingError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| BillingError::ConfigParse { path, source: e })
}

/// Load the main config.toml
pub fn load_config(cfg_dir: &Path) -> Result<Config> {
    load_toml(cfg_dir.join("config.toml"))
}

/// Load customers.toml as a HashMap
pub fn load_customers(cfg_dir: &Path) -> Result<HashMap<String, Customer>> {
    load_toml(cfg_dir.join("customers.toml"))
}

/// Load items.toml as a HashMap
pub fn load_items(cfg_dir: &Path) -> Result<HashMap<String, Item>> {
    load_toml(cfg_dir.join("items.toml"))
}

/// Load state.toml (default if missing)
pub fn load_state(cfg_dir: &Path) -> Result<State> {
    let path = cfg_dir.join("state.toml");
    if !path.exists() {
        return Ok(State::default());
    }
    load_toml(path)
}

/// Save state.toml
pub fn save_state(cfg_dir: &Path, state: &State) -> Result<()> {
    let path = cfg_dir.join("state.toml");
    let content = toml::to_string_pretty(state).map_err(|e| BillingError::ConfigWrite {
        path: path.clone(),
        source: e,
    })?;
    fs::write(path, content)?;
    Ok(())
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[company]
name = "Your Company Name"
email = "billing@yourcompany.com"
# address = "123 Business Street"   # optional

[billing]
number_format = "BILL-{year}-{seq:04}"  # e.g., BILL-2026-0001
currency_symbol = "$"
due_days = 30

[notify]
outbox_dir = "outbox"   # submission notices are queued here as .eml files
"#;

/// Template content for customers.toml
pub const CUSTOMERS_TEMPLATE: &str = r#"# Define your customers here. The table name (e.g., [acme]) is used
# as the customer identifier in the new command.
#
# Example:
#   billing new --customer acme --item widget:2:10

[example-customer]
customer_name = "Example Customer Inc."
email = "jane@example.com"        # optional, needed for submission notices
# phone = "+1-555-123-4567"       # optional
# address = "456 Customer Avenue" # optional
"#;

/// Template content for items.toml
pub const ITEMS_TEMPLATE: &str = r#"# Define your items here. The table name (e.g., [widget]) is used
# as the item identifier on bill lines.
#
# Example:
#   billing new --customer example-customer --item widget:2:10 --item support:1

[widget]
item_name = "Standard Widget"
category = "Hardware"
rate = 50.00

[support]
item_name = "Support Hour"
category = "Services"
rate = 120.00
"#;
