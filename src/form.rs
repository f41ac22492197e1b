//! Edit-event handling for a bill being edited.
//!
//! Each event mutates the document and reruns the calculator to completion
//! before returning. Rapid edits are just consecutive calls; there is no
//! state besides the document itself.

use chrono::NaiveDate;

use crate::config::{BillingDoc, BillingLine};
use crate::error::{BillingError, Result};
use crate::lookup::{resolve_prior_finalized, InvoiceCounter, ItemLookup};
use crate::totals::{compute_totals, Totals};

/// A field-level change on the bill or one of its rows. Rows are zero-based.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    Refresh,
    Quantity { row: usize, value: Option<f64> },
    Rate { row: usize, value: Option<f64> },
    TaxPercent { row: usize, value: Option<f64> },
    IsPaid(bool),
    DueDate(Option<NaiveDate>),
    Customer(Option<String>),
    ItemSelected { row: usize, item: String },
    AddLine(BillingLine),
    RemoveLine { row: usize },
}

pub struct BillingForm<'a> {
    doc: BillingDoc,
    counter: &'a dyn InvoiceCounter,
    items: &'a dyn ItemLookup,
}

impl<'a> BillingForm<'a> {
    pub fn new(doc: BillingDoc, counter: &'a dyn InvoiceCounter, items: &'a dyn ItemLookup) -> Self {
        Self { doc, counter, items }
    }

    pub fn doc(&self) -> &BillingDoc {
        &self.doc
    }

    pub fn into_doc(self) -> BillingDoc {
        self.doc
    }

    /// Apply one event. Returns the fresh totals, or `None` when the event
    /// did not trigger a recompute (an item lookup that found nothing).
    pub fn handle(&mut self, event: FormEvent, today: NaiveDate) -> Result<Option<Totals>> {
        tracing::debug!(bill = %self.doc.name, ?event, "form event");

        match event {
            FormEvent::Refresh => {}
            FormEvent::Quantity { row, value } => self.row_mut(row)?.qty = value,
            FormEvent::Rate { row, value } => self.row_mut(row)?.rate = value,
            FormEvent::TaxPercent { row, value } => self.row_mut(row)?.tax_percent = value,
            FormEvent::IsPaid(paid) => self.doc.is_paid = paid,
            FormEvent::DueDate(due) => self.doc.due_date = due,
            FormEvent::Customer(customer) => self.doc.customer = customer,
            FormEvent::ItemSelected { row, item } => {
                if !self.select_item(row, item)? {
                    return Ok(None);
                }
            }
            FormEvent::AddLine(line) => self.doc.items.push(line),
            FormEvent::RemoveLine { row } => {
                self.row_mut(row)?;
                self.doc.items.remove(row);
            }
        }

        Ok(Some(self.recompute(today)))
    }

    /// Rerun the calculator and write the results onto the document.
    pub fn recompute(&mut self, today: NaiveDate) -> Totals {
        let has_prior = resolve_prior_finalized(
            self.counter,
            self.doc.customer.as_deref(),
            Some(self.doc.name.as_str()),
        );
        let totals = compute_totals(&self.doc.to_invoice(), has_prior, today);
        self.doc.apply_totals(&totals);

        tracing::debug!(
            bill = %self.doc.name,
            subtotal = totals.subtotal,
            discount = totals.discount,
            grand_total = totals.grand_total,
            status = %totals.status,
            "recomputed totals"
        );
        totals
    }

    /// Returns whether the line was populated from the catalog.
    fn select_item(&mut self, row: usize, item: String) -> Result<bool> {
        let line = self.row_mut(row)?;
        line.item = item;
        if line.item.is_empty() {
            return Ok(false);
        }

        let details = match self.items.lookup_item(&self.doc.items[row].item) {
            Ok(Some(details)) => details,
            Ok(None) => {
                tracing::info!(item = %self.doc.items[row].item, "item not in catalog");
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!(item = %self.doc.items[row].item, error = %e, "item lookup failed");
                return Ok(false);
            }
        };

        let line = &mut self.doc.items[row];
        line.item_name = Some(details.item_name);
        line.category = details.category;
        if line.rate_is_unset() {
            line.rate = Some(details.rate);
        }
        Ok(true)
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut BillingLine> {
        let count = self.doc.items.len();
        self.doc
            .items
            .get_mut(row)
            .ok_or(BillingError::RowOutOfRange { row: row + 1, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::ItemDetails;
    use crate::totals::Status;
    use std::cell::RefCell;

    struct Records {
        submitted: usize,
        fail: bool,
        queries: RefCell<Vec<(String, Option<String>)>>,
    }

    impl Records {
        fn with(submitted: usize) -> Self {
            Self {
                submitted,
                fail: false,
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl InvoiceCounter for Records {
        fn count_finalized(&self, customer: &str, exclude: Option<&str>) -> Result<usize> {
            self.queries
                .borrow_mut()
                .push((customer.to_string(), exclude.map(str::to_string)));
            if self.fail {
                return Err(BillingError::CountFailed("timeout".to_string()));
            }
            Ok(self.submitted)
        }
    }

    impl ItemLookup for Records {
        fn lookup_item(&self, item: &str) -> Result<Option<ItemDetails>> {
            match item {
                "widget" => Ok(Some(ItemDetails {
                    item_name: "Standard Widget".to_string(),
                    category: Some("Hardware".to_string()),
                    rate: 50.0,
                })),
                "flaky" => Err(BillingError::LookupFailed("503".to_string())),
                _ => Ok(None),
            }
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn draft() -> BillingDoc {
        let mut doc = BillingDoc::new("BILL-2026-0002", Some("acme".to_string()), today());
        doc.items.push(BillingLine::new("", 2.0, 10.0));
        doc
    }

    #[test]
    fn item_selection_fills_unset_rate_and_recomputes() {
        let records = Records::with(0);
        let mut form = BillingForm::new(draft(), &records, &records);

        let totals = form
            .handle(FormEvent::ItemSelected { row: 0, item: "widget".into() }, today())
            .unwrap()
            .unwrap();

        let line = &form.doc().items[0];
        assert_eq!(line.item_name.as_deref(), Some("Standard Widget"));
        assert_eq!(line.category.as_deref(), Some("Hardware"));
        assert_eq!(line.rate, Some(50.0));
        assert_eq!(line.amount, 100.0);
        assert_eq!(line.row_tax, 10.0);
        assert_eq!(totals.grand_total, 110.0);
        assert_eq!(form.doc().grand_total, 110.0);
    }

    #[test]
    fn item_selection_keeps_user_rate() {
        let records = Records::with(0);
        let mut doc = draft();
        doc.items[0].rate = Some(42.0);
        let mut form = BillingForm::new(doc, &records, &records);

        form.handle(FormEvent::ItemSelected { row: 0, item: "widget".into() }, today())
            .unwrap();

        assert_eq!(form.doc().items[0].rate, Some(42.0));
        assert_eq!(form.doc().items[0].item_name.as_deref(), Some("Standard Widget"));
    }

    #[test]
    fn unknown_or_failing_item_leaves_line_alone() {
        let records = Records::with(0);
        let mut form = BillingForm::new(draft(), &records, &records);

        for item in ["missing", "flaky"] {
            let result = form
                .handle(FormEvent::ItemSelected { row: 0, item: item.into() }, today())
                .unwrap();
            assert!(result.is_none());
            assert_eq!(form.doc().items[0].item_name, None);
            assert_eq!(form.doc().items[0].rate, None);
        }
    }

    #[test]
    fn prior_bill_discount_excludes_self() {
        let records = Records::with(1);
        let mut doc = draft();
        doc.items[0].rate = Some(50.0);
        let mut form = BillingForm::new(doc, &records, &records);

        let totals = form.handle(FormEvent::Refresh, today()).unwrap().unwrap();

        assert_eq!(totals.discount, 5.0);
        assert_eq!(totals.grand_total, 105.0);
        assert_eq!(
            records.queries.borrow()[0],
            ("acme".to_string(), Some("BILL-2026-0002".to_string()))
        );
    }

    #[test]
    fn clearing_customer_drops_discount_without_query() {
        let records = Records::with(3);
        let mut doc = draft();
        doc.items[0].rate = Some(50.0);
        let mut form = BillingForm::new(doc, &records, &records);

        let totals = form.handle(FormEvent::Customer(None), today()).unwrap().unwrap();

        assert_eq!(totals.discount, 0.0);
        assert!(records.queries.borrow().is_empty());
    }

    #[test]
    fn failed_count_still_shows_totals() {
        let records = Records {
            fail: true,
            ..Records::with(4)
        };
        let mut doc = draft();
        doc.items[0].rate = Some(50.0);
        let mut form = BillingForm::new(doc, &records, &records);

        let totals = form.handle(FormEvent::Refresh, today()).unwrap().unwrap();

        assert_eq!(totals.discount, 0.0);
        assert_eq!(totals.grand_total, 110.0);
    }

    #[test]
    fn field_edits_recompute() {
        let records = Records::with(0);
        let mut doc = draft();
        doc.items[0].rate = Some(50.0);
        let mut form = BillingForm::new(doc, &records, &records);

        form.handle(FormEvent::Quantity { row: 0, value: Some(4.0) }, today()).unwrap();
        form.handle(FormEvent::TaxPercent { row: 0, value: None }, today()).unwrap();
        let totals = form
            .handle(FormEvent::Rate { row: 0, value: Some(25.0) }, today())
            .unwrap()
            .unwrap();

        assert_eq!(totals.subtotal, 100.0);
        assert_eq!(totals.tax_total, 0.0);
        assert_eq!(form.doc().subtotal, 100.0);
    }

    #[test]
    fn status_follows_paid_and_due_edits() {
        let records = Records::with(0);
        let mut doc = draft();
        doc.docstatus = crate::config::DocStatus::Submitted;
        let mut form = BillingForm::new(doc, &records, &records);

        let overdue = form
            .handle(FormEvent::DueDate(today().pred_opt()), today())
            .unwrap()
            .unwrap();
        assert_eq!(overdue.status, Status::Overdue);

        let paid = form.handle(FormEvent::IsPaid(true), today()).unwrap().unwrap();
        assert_eq!(paid.status, Status::Paid);
        assert_eq!(form.doc().status, Status::Paid);
    }

    #[test]
    fn out_of_range_row_is_rejected() {
        let records = Records::with(0);
        let mut form = BillingForm::new(draft(), &records, &records);

        let err = form
            .handle(FormEvent::Rate { row: 3, value: Some(1.0) }, today())
            .unwrap_err();

        assert!(matches!(err, BillingError::RowOutOfRange { row: 4, count: 1 }));
    }

    #[test]
    fn add_and_remove_lines() {
        let records = Records::with(0);
        let mut form = BillingForm::new(draft(), &records, &records);

        form.handle(FormEvent::AddLine(BillingLine::new("widget", 1.0, 0.0)), today())
            .unwrap();
        assert_eq!(form.doc().items.len(), 2);

        form.handle(FormEvent::RemoveLine { row: 0 }, today()).unwrap();
        assert_eq!(form.doc().items.len(), 1);
        assert_eq!(form.doc().items[0].item, "widget");
    }
}
