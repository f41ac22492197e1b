use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::totals::{Invoice, InvoiceLine, Status, Totals};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct State {
    pub counter: Counter,
    #[serde(default)]
    pub bills: Vec<BillingDoc>,
}

/// Year 0 means nothing has been numbered yet.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Counter {
    pub last_number: u32,
    pub last_year: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
}

/// One row of a bill. `amount` and `row_tax` are derived and rewritten on
/// every recompute.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct BillingLine {
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_percent: Option<f64>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub row_tax: f64,
}

impl BillingLine {
    pub fn new(item: impl Into<String>, qty: f64, tax_percent: f64) -> Self {
        Self {
            item: item.into(),
            qty: Some(qty),
            tax_percent: Some(tax_percent),
            ..Default::default()
        }
    }

    /// Zero counts as unset, so a catalog rate may fill it in.
    pub fn rate_is_unset(&self) -> bool {
        self.rate.map_or(true, |r| r == 0.0)
    }

    pub fn display_name(&self) -> &str {
        self.item_name.as_deref().unwrap_or(&self.item)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BillingDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    pub posting_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub docstatus: DocStatus,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub grand_total: f64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub items: Vec<BillingLine>,
}

impl BillingDoc {
    pub fn new(name: impl Into<String>, customer: Option<String>, posting_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            customer,
            posting_date,
            due_date: None,
            is_paid: false,
            docstatus: DocStatus::Draft,
            subtotal: 0.0,
            tax_amount: 0.0,
            discount_amount: 0.0,
            grand_total: 0.0,
            status: Status::Draft,
            items: Vec::new(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.docstatus == DocStatus::Submitted
    }

    /// The calculator's view of this document.
    pub fn to_invoice(&self) -> Invoice {
        Invoice {
            lines: self
                .items
                .iter()
                .map(|it| InvoiceLine {
                    quantity: it.qty,
                    rate: it.rate,
                    tax_percent: it.tax_percent,
                })
                .collect(),
            customer: self.customer.clone(),
            is_paid: self.is_paid,
            due_date: self.due_date,
            is_finalized: self.is_submitted(),
        }
    }

    /// Write computed values back onto the document and its rows.
    pub fn apply_totals(&mut self, totals: &Totals) {
        for (line, computed) in self.items.iter_mut().zip(&totals.lines) {
            line.amount = computed.amount;
            line.row_tax = computed.line_tax;
        }
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_total;
        self.discount_amount = totals.discount;
        self.grand_total = totals.grand_total;
        self.status = totals.status;
    }
}
