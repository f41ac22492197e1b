//! File-backed records: bills, customers and the item catalog.
//!
//! The store answers the collaborator queries used while editing and runs
//! the authoritative recompute on every save and on submit.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{
    load_config, load_customers, load_items, load_state, save_state, BillingDoc, Config, Customer,
    DocStatus, Item, State,
};
use crate::error::{BillingError, Result};
use crate::lookup::{resolve_prior_finalized, InvoiceCounter, ItemDetails, ItemLookup};
use crate::notify;
use crate::totals::{compute_totals, Totals};

pub struct Store {
    cfg_dir: PathBuf,
    config: Config,
    customers: HashMap<String, Customer>,
    items: HashMap<String, Item>,
    state: State,
}

impl Store {
    pub fn open(cfg_dir: &Path) -> Result<Self> {
        if !cfg_dir.exists() {
            return Err(BillingError::ConfigNotFound(cfg_dir.to_path_buf()));
        }

        Ok(Self {
            cfg_dir: cfg_dir.to_path_buf(),
            config: load_config(cfg_dir)?,
            customers: load_customers(cfg_dir)?,
            items: load_items(cfg_dir)?,
            state: load_state(cfg_dir)?,
        })
    }

    pub fn cfg_dir(&self) -> &Path {
        &self.cfg_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn customers(&self) -> &HashMap<String, Customer> {
        &self.customers
    }

    pub fn items(&self) -> &HashMap<String, Item> {
        &self.items
    }

    /// Bills in creation order.
    pub fn bills(&self) -> &[BillingDoc] {
        &self.state.bills
    }

    pub fn customer(&self, id: &str) -> Result<&Customer> {
        self.customers
            .get(id)
            .ok_or_else(|| BillingError::CustomerNotFound(id.to_string()))
    }

    pub fn item(&self, id: &str) -> Result<&Item> {
        self.items
            .get(id)
            .ok_or_else(|| BillingError::ItemNotFound(id.to_string()))
    }

    /// Number the next bill would get on `today`.
    pub fn next_name(&self, today: NaiveDate) -> String {
        let (year, seq) = self.next_sequence(today);
        format_bill_number(&self.config.billing.number_format, year, seq)
    }

    fn next_sequence(&self, today: NaiveDate) -> (u32, u32) {
        let year = today.year() as u32;
        let seq = if self.state.counter.last_year == year {
            self.state.counter.last_number + 1
        } else {
            1 // Reset for new year
        };
        (year, seq)
    }

    /// Allocate a number and start a draft. Nothing is written until
    /// [`Store::save_bill`].
    pub fn new_bill(
        &mut self,
        customer: Option<String>,
        due_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> BillingDoc {
        let (year, seq) = self.next_sequence(today);
        self.state.counter.last_year = year;
        self.state.counter.last_number = seq;

        let name = format_bill_number(&self.config.billing.number_format, year, seq);
        let mut doc = BillingDoc::new(name, customer, today);
        doc.due_date = due_date.or_else(|| {
            today.checked_add_signed(chrono::Duration::days(self.config.billing.due_days as i64))
        });
        doc
    }

    /// Resolve a bill reference: a 1-based index from `list` (newest first)
    /// or a bill name.
    pub fn resolve_name(&self, reference: &str) -> Result<String> {
        if let Ok(idx) = reference.parse::<usize>() {
            let bills: Vec<_> = self.state.bills.iter().rev().collect();
            if idx == 0 || idx > bills.len() {
                return Err(BillingError::InvalidBillIndex(reference.to_string()));
            }
            return Ok(bills[idx - 1].name.clone());
        }

        if self.state.bills.iter().any(|b| b.name == reference) {
            Ok(reference.to_string())
        } else {
            Err(BillingError::BillNotFound(reference.to_string()))
        }
    }

    pub fn find_bill(&self, reference: &str) -> Result<&BillingDoc> {
        let name = self.resolve_name(reference)?;
        self.state
            .bills
            .iter()
            .find(|b| b.name == name)
            .ok_or(BillingError::BillNotFound(name))
    }

    /// Server-side checks plus the authoritative recompute.
    pub fn validate(&self, doc: &mut BillingDoc, today: NaiveDate) -> Result<Totals> {
        if doc.items.is_empty() {
            return Err(BillingError::NoItems);
        }
        if doc.due_date.is_none() && doc.is_submitted() {
            return Err(BillingError::DueDateRequired);
        }

        let has_prior = resolve_prior_finalized(self, doc.customer.as_deref(), Some(doc.name.as_str()));
        let totals = compute_totals(&doc.to_invoice(), has_prior, today);
        doc.apply_totals(&totals);
        Ok(totals)
    }

    /// Validate and persist, inserting or replacing by name.
    pub fn save_bill(&mut self, mut doc: BillingDoc, today: NaiveDate) -> Result<Totals> {
        let totals = self.validate(&mut doc, today)?;

        match self.state.bills.iter_mut().find(|b| b.name == doc.name) {
            Some(existing) => *existing = doc.clone(),
            None => self.state.bills.push(doc.clone()),
        }
        save_state(&self.cfg_dir, &self.state)?;

        tracing::info!(
            bill = %doc.name,
            grand_total = doc.grand_total,
            status = %doc.status,
            "saved bill"
        );
        Ok(totals)
    }

    /// Finalize a draft and queue the customer notice.
    pub fn submit_bill(&mut self, reference: &str, today: NaiveDate) -> Result<BillingDoc> {
        let mut doc = self.find_bill(reference)?.clone();
        if doc.is_submitted() {
            return Err(BillingError::AlreadySubmitted(doc.name));
        }

        doc.docstatus = DocStatus::Submitted;
        self.save_bill(doc.clone(), today)?;
        let doc = self.find_bill(&doc.name)?.clone();

        notify::send_submission_notice(self, &doc);
        Ok(doc)
    }
}

impl InvoiceCounter for Store {
    fn count_finalized(&self, customer: &str, exclude: Option<&str>) -> Result<usize> {
        Ok(self
            .state
            .bills
            .iter()
            .filter(|b| b.is_submitted())
            .filter(|b| b.customer.as_deref() == Some(customer))
            .filter(|b| exclude.map_or(true, |name| b.name != name))
            .count())
    }
}

impl ItemLookup for Store {
    fn lookup_item(&self, item: &str) -> Result<Option<ItemDetails>> {
        Ok(self.items.get(item).map(|it| ItemDetails {
            item_name: it.item_name.clone(),
            category: it.category.clone(),
            rate: it.rate,
        }))
    }
}

/// Format bill number from template
pub fn format_bill_number(format: &str, year: u32, seq: u32) -> String {
    format
        .replace("{year}", &year.to_string())
        .replace("{seq:04}", &format!("{:04}", seq))
        .replace("{seq:05}", &format!("{:05}", seq))
        .replace("{seq:03}", &format!("{:03}", seq))
}
