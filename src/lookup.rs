//! Seams to the records service: the submitted-bill count and item lookup.

use crate::error::Result;

/// Counts submitted bills, i.e. `get_count(Billing, customer, name != exclude, submitted)`.
pub trait InvoiceCounter {
    fn count_finalized(&self, customer: &str, exclude: Option<&str>) -> Result<usize>;
}

/// Catalog fields copied onto a bill line when its item is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetails {
    pub item_name: String,
    pub category: Option<String>,
    pub rate: f64,
}

pub trait ItemLookup {
    /// `Ok(None)` when the item does not exist.
    fn lookup_item(&self, item: &str) -> Result<Option<ItemDetails>>;
}

/// Whether another submitted bill exists for `customer`.
///
/// No customer means no query. A failed query falls back to `false` so
/// totals still display, just without the discount.
pub fn resolve_prior_finalized(
    counter: &dyn InvoiceCounter,
    customer: Option<&str>,
    exclude: Option<&str>,
) -> bool {
    let Some(customer) = customer else {
        return false;
    };

    match counter.count_finalized(customer, exclude) {
        Ok(count) => count > 0,
        Err(e) => {
            tracing::warn!(customer, error = %e, "prior bill lookup failed; skipping discount");
            false
        }
    }
}
