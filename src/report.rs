//! Item sales report over submitted bills.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::BillingDoc;

#[derive(Debug, Default, Clone)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub item: Option<String>,
}

impl ReportFilter {
    fn matches(&self, bill: &BillingDoc) -> bool {
        self.from.map_or(true, |d| bill.posting_date >= d)
            && self.to.map_or(true, |d| bill.posting_date <= d)
    }
}

/// A single row of the report, one per (item, name, category)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSalesRow {
    pub item: String,
    pub item_name: Option<String>,
    pub category: Option<String>,
    pub total_qty: f64,
    pub total_amount: f64,
    pub total_tax: f64,
    pub total_line_total: f64,
    pub invoice_count: usize,
}

type GroupKey = (String, Option<String>, Option<String>);

/// Aggregate submitted bills per item, largest total amount first.
pub fn item_sales(bills: &[BillingDoc], filter: &ReportFilter) -> Vec<ItemSalesRow> {
    let mut groups: HashMap<GroupKey, (ItemSalesRow, HashSet<&str>)> = HashMap::new();

    for bill in bills
        .iter()
        .filter(|b| b.is_submitted())
        .filter(|b| filter.matches(b))
    {
        for line in &bill.items {
            if filter.item.as_deref().is_some_and(|item| line.item != item) {
                continue;
            }

            let key = (line.item.clone(), line.item_name.clone(), line.category.clone());
            let (row, invoices) = groups.entry(key).or_insert_with(|| {
                (
                    ItemSalesRow {
                        item: line.item.clone(),
                        item_name: line.item_name.clone(),
                        category: line.category.clone(),
                        total_qty: 0.0,
                        total_amount: 0.0,
                        total_tax: 0.0,
                        total_line_total: 0.0,
                        invoice_count: 0,
                    },
                    HashSet::new(),
                )
            });

            row.total_qty += line.qty.unwrap_or(0.0);
            row.total_amount += line.amount;
            row.total_tax += line.row_tax;
            row.total_line_total += line.amount + line.row_tax;
            invoices.insert(bill.name.as_str());
        }
    }

    let mut rows: Vec<ItemSalesRow> = groups
        .into_values()
        .map(|(mut row, invoices)| {
            row.invoice_count = invoices.len();
            row
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_amount
            .total_cmp(&a.total_amount)
            .then_with(|| a.item.cmp(&b.item))
    });
    rows
}
