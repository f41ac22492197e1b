use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub company: Company,
    pub billing: BillingSettings,
    #[serde(default)]
    pub notify: NotifySettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Company {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BillingSettings {
    pub number_format: String,
    pub currency_symbol: String,
    pub due_days: u32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NotifySettings {
    pub outbox_dir: String,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            outbox_dir: "outbox".to_string(),
        }
    }
}
