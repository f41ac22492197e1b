use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Config directory not found at {0}. Run 'billing init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("Customer '{0}' not found in customers.toml")]
    CustomerNotFound(String),

    #[error("Item '{0}' not found in items.toml")]
    ItemNotFound(String),

    #[error("Invalid quantity '{qty}' for item '{item}': {reason}")]
    InvalidQuantity {
        item: String,
        qty: String,
        reason: String,
    },

    #[error("Invalid tax percent '{0}'. Expected a number between 0 and 100")]
    InvalidTaxPercent(String),

    #[error("Invalid item format '{0}'. Expected 'item:quantity[:tax%]' (e.g., 'widget:2:10')")]
    InvalidItemFormat(String),

    #[error("Invalid field edit '{0}'. Expected 'ROW=VALUE' (e.g., '1=2.5')")]
    InvalidFieldEdit(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Row {row} is out of range (bill has {count} line(s))")]
    RowOutOfRange { row: usize, count: usize },

    #[error("Add at least one Item.")]
    NoItems,

    #[error("Due Date is required.")]
    DueDateRequired,

    #[error("Bill '{0}' not found")]
    BillNotFound(String),

    #[error("Invalid bill index '{0}'. Use 'billing list' to see available bills.")]
    InvalidBillIndex(String),

    #[error("Bill '{0}' is already submitted")]
    AlreadySubmitted(String),

    #[error("Counting submitted bills failed: {0}")]
    CountFailed(String),

    #[error("Item lookup failed: {0}")]
    LookupFailed(String),

    #[error("Invalid email address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to render notice: {0}")]
    NoticeRender(#[from] askama::Error),

    #[error("Failed to build notice: {0}")]
    NoticeBuild(#[from] lettre::error::Error),

    #[error("Failed to queue notice: {0}")]
    NoticeQueue(#[from] lettre::transport::file::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),
}

pub type Result<T> = std::result::Result<T, BillingError>;
