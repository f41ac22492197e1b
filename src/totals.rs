//! Invoice totals and the provisional status shown while a bill is edited.
//!
//! Everything here is a pure function of its inputs. The prior-invoice flag
//! and "today" are resolved by the caller so the result is deterministic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discount applied when the customer already has a submitted bill.
pub const PRIOR_INVOICE_DISCOUNT_PERCENT: f64 = 5.0;

/// One billable row. Missing operands count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InvoiceLine {
    pub quantity: Option<f64>,
    pub rate: Option<f64>,
    pub tax_percent: Option<f64>,
}

impl InvoiceLine {
    pub fn new(quantity: f64, rate: f64, tax_percent: f64) -> Self {
        Self {
            quantity: Some(quantity),
            rate: Some(rate),
            tax_percent: Some(tax_percent),
        }
    }

    pub fn amount(&self) -> f64 {
        self.quantity.unwrap_or(0.0) * self.rate.unwrap_or(0.0)
    }

    pub fn line_tax(&self) -> f64 {
        self.amount() * self.tax_percent.unwrap_or(0.0) / 100.0
    }
}

/// The calculator's view of a bill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invoice {
    pub lines: Vec<InvoiceLine>,
    pub customer: Option<String>,
    pub is_paid: bool,
    pub due_date: Option<NaiveDate>,
    pub is_finalized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Draft,
    Paid,
    Overdue,
    Unpaid,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Draft => write!(f, "Draft"),
            Status::Paid => write!(f, "Paid"),
            Status::Overdue => write!(f, "Overdue"),
            Status::Unpaid => write!(f, "Unpaid"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineTotals {
    pub amount: f64,
    pub line_tax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub lines: Vec<LineTotals>,
    pub subtotal: f64,
    pub tax_total: f64,
    pub discount: f64,
    pub grand_total: f64,
    pub status: Status,
}

/// Compute line amounts, totals, discount and the display status.
///
/// `has_prior_finalized_invoice` only takes effect when the invoice names a
/// customer. `today` is the reference date for the overdue check.
pub fn compute_totals(
    invoice: &Invoice,
    has_prior_finalized_invoice: bool,
    today: NaiveDate,
) -> Totals {
    let mut subtotal = 0.0;
    let mut tax_total = 0.0;

    let lines: Vec<LineTotals> = invoice
        .lines
        .iter()
        .map(|line| {
            let amount = line.amount();
            let line_tax = line.line_tax();
            subtotal += amount;
            tax_total += line_tax;
            LineTotals { amount, line_tax }
        })
        .collect();

    let discount = if has_prior_finalized_invoice && invoice.customer.is_some() {
        subtotal * PRIOR_INVOICE_DISCOUNT_PERCENT / 100.0
    } else {
        0.0
    };

    let grand_total = (subtotal - discount + tax_total).max(0.0);

    Totals {
        lines,
        subtotal,
        tax_total,
        discount,
        grand_total,
        status: status_for(invoice, today),
    }
}

/// Finalized is checked before paid, paid before the due date.
pub fn status_for(invoice: &Invoice, today: NaiveDate) -> Status {
    if !invoice.is_finalized {
        Status::Draft
    } else if invoice.is_paid {
        Status::Paid
    } else {
        match invoice.due_date {
            Some(due) if due < today => Status::Overdue,
            _ => Status::Unpaid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn finalized(is_paid: bool, due_date: Option<NaiveDate>) -> Invoice {
        Invoice {
            lines: vec![InvoiceLine::new(1.0, 10.0, 0.0)],
            customer: Some("acme".to_string()),
            is_paid,
            due_date,
            is_finalized: true,
        }
    }

    #[test]
    fn single_line_without_prior_invoice() {
        let invoice = Invoice {
            lines: vec![InvoiceLine::new(2.0, 50.0, 10.0)],
            customer: Some("acme".to_string()),
            ..Default::default()
        };

        let totals = compute_totals(&invoice, false, today());

        assert_eq!(totals.lines[0].amount, 100.0);
        assert_eq!(totals.lines[0].line_tax, 10.0);
        assert_eq!(totals.subtotal, 100.0);
        assert_eq!(totals.tax_total, 10.0);
        assert_eq!(totals.discount, 0.0);
        assert_eq!(totals.grand_total, 110.0);
    }

    #[test]
    fn prior_invoice_earns_five_percent_discount() {
        let invoice = Invoice {
            lines: vec![InvoiceLine::new(2.0, 50.0, 10.0)],
            customer: Some("acme".to_string()),
            ..Default::default()
        };

        let totals = compute_totals(&invoice, true, today());

        assert_eq!(totals.discount, 5.0);
        assert_eq!(totals.grand_total, 105.0);
    }

    #[test]
    fn no_discount_without_customer() {
        let invoice = Invoice {
            lines: vec![InvoiceLine::new(2.0, 50.0, 10.0)],
            ..Default::default()
        };

        let totals = compute_totals(&invoice, true, today());

        assert_eq!(totals.discount, 0.0);
        assert_eq!(totals.grand_total, 110.0);
    }

    #[test]
    fn empty_draft() {
        let totals = compute_totals(&Invoice::default(), false, today());

        assert!(totals.lines.is_empty());
        assert_eq!(totals.subtotal, 0.0);
        assert_eq!(totals.grand_total, 0.0);
        assert_eq!(totals.status, Status::Draft);
    }

    #[test]
    fn missing_operands_count_as_zero() {
        let invoice = Invoice {
            lines: vec![
                InvoiceLine {
                    quantity: None,
                    rate: Some(20.0),
                    tax_percent: Some(10.0),
                },
                InvoiceLine {
                    quantity: Some(3.0),
                    rate: Some(20.0),
                    tax_percent: None,
                },
            ],
            ..Default::default()
        };

        let totals = compute_totals(&invoice, false, today());

        assert_eq!(totals.lines[0], LineTotals { amount: 0.0, line_tax: 0.0 });
        assert_eq!(totals.lines[1], LineTotals { amount: 60.0, line_tax: 0.0 });
        assert_eq!(totals.grand_total, 60.0);
    }

    #[test]
    fn grand_total_clamped_at_zero() {
        // Negative rates can only come from bad data, but the total still floors at zero.
        let invoice = Invoice {
            lines: vec![InvoiceLine::new(1.0, -40.0, 0.0)],
            customer: Some("acme".to_string()),
            ..Default::default()
        };

        let totals = compute_totals(&invoice, true, today());

        assert_eq!(totals.grand_total, 0.0);
    }

    #[test]
    fn draft_wins_over_paid() {
        let invoice = Invoice {
            is_paid: true,
            due_date: today().pred_opt(),
            ..Default::default()
        };

        assert_eq!(status_for(&invoice, today()), Status::Draft);
    }

    #[test]
    fn paid_regardless_of_due_date() {
        let overdue = finalized(true, today().pred_opt());
        assert_eq!(status_for(&overdue, today()), Status::Paid);
        assert_eq!(status_for(&finalized(true, None), today()), Status::Paid);
    }

    #[test]
    fn overdue_when_due_date_passed() {
        let invoice = finalized(false, today().pred_opt());
        assert_eq!(status_for(&invoice, today()), Status::Overdue);
    }

    #[test]
    fn unpaid_when_due_today_tomorrow_or_unset() {
        assert_eq!(status_for(&finalized(false, Some(today())), today()), Status::Unpaid);
        assert_eq!(
            status_for(&finalized(false, today().succ_opt()), today()),
            Status::Unpaid
        );
        assert_eq!(status_for(&finalized(false, None), today()), Status::Unpaid);
    }

    #[test]
    fn per_line_values_follow_input_order() {
        let invoice = Invoice {
            lines: vec![
                InvoiceLine::new(1.0, 10.0, 0.0),
                InvoiceLine::new(2.0, 10.0, 0.0),
                InvoiceLine::new(3.0, 10.0, 0.0),
            ],
            ..Default::default()
        };

        let amounts: Vec<f64> = compute_totals(&invoice, false, today())
            .lines
            .iter()
            .map(|l| l.amount)
            .collect();

        assert_eq!(amounts, vec![10.0, 20.0, 30.0]);
    }

    fn line_strategy() -> impl Strategy<Value = InvoiceLine> {
        (
            proptest::option::of(0u32..1000),
            proptest::option::of(0u32..10_000),
            proptest::option::of(0u32..=100),
        )
            .prop_map(|(q, r, t)| InvoiceLine {
                quantity: q.map(f64::from),
                rate: r.map(f64::from),
                tax_percent: t.map(f64::from),
            })
    }

    proptest! {
        #[test]
        fn totals_do_not_depend_on_line_order(
            lines in proptest::collection::vec(line_strategy(), 0..12),
            prior in any::<bool>(),
        ) {
            let forward = Invoice {
                lines: lines.clone(),
                customer: Some("acme".to_string()),
                ..Default::default()
            };
            let mut reversed = forward.clone();
            reversed.lines.reverse();

            let a = compute_totals(&forward, prior, today());
            let b = compute_totals(&reversed, prior, today());

            let close = |x: f64, y: f64| (x - y).abs() <= 1e-9 * x.abs().max(1.0);
            prop_assert!(close(a.subtotal, b.subtotal));
            prop_assert!(close(a.tax_total, b.tax_total));
            prop_assert!(close(a.grand_total, b.grand_total));
        }

        #[test]
        fn grand_total_never_negative(
            lines in proptest::collection::vec(line_strategy(), 0..12),
            prior in any::<bool>(),
        ) {
            let invoice = Invoice {
                lines,
                customer: Some("acme".to_string()),
                ..Default::default()
            };

            let totals = compute_totals(&invoice, prior, today());

            prop_assert!(totals.grand_total >= 0.0);
            if prior {
                let expected = totals.subtotal * 0.05;
                prop_assert!((totals.discount - expected).abs() <= 1e-9 * expected.max(1.0));
            } else {
                prop_assert_eq!(totals.discount, 0.0);
            }
        }
    }
}
