pub mod config;
pub mod error;
pub mod form;
pub mod lookup;
pub mod notify;
pub mod report;
pub mod store;
pub mod totals;

pub use config::{BillingDoc, BillingLine, Config, Customer, DocStatus, Item, State};
pub use error::{BillingError, Result};
pub use form::{BillingForm, FormEvent};
pub use lookup::{resolve_prior_finalized, InvoiceCounter, ItemDetails, ItemLookup};
pub use store::Store;
pub use totals::{compute_totals, Invoice, InvoiceLine, LineTotals, Status, Totals};
