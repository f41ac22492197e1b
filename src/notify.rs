//! Customer notice sent when a bill is submitted.
//!
//! Messages are queued as `.eml` files in the outbox directory; delivery is
//! left to whatever picks them up from there.

use askama::Template;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Address, FileTransport, Message, Transport};
use std::fs;
use std::path::PathBuf;

use crate::config::{resolve_dir, BillingDoc};
use crate::error::{BillingError, Result};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub subject: String,
    pub html: String,
}

struct NoticeRow {
    item: String,
    qty: String,
    rate: String,
    tax: String,
    amount: String,
    row_tax: String,
}

#[derive(Template)]
#[template(path = "submission_notice.html")]
struct NoticeTemplate<'a> {
    name: &'a str,
    customer: &'a str,
    posting_date: String,
    due_date: String,
    status: String,
    rows: Vec<NoticeRow>,
    subtotal: String,
    discount: String,
    tax: String,
    grand_total: String,
}

/// Render subject and HTML body for `doc`.
pub fn render_notice(doc: &BillingDoc, currency_symbol: &str) -> Result<Notice> {
    let money = |v: f64| format!("{}{:.2}", currency_symbol, v);

    let template = NoticeTemplate {
        name: &doc.name,
        customer: doc.customer.as_deref().unwrap_or(""),
        posting_date: doc.posting_date.to_string(),
        due_date: doc.due_date.map(|d| d.to_string()).unwrap_or_default(),
        status: doc.status.to_string(),
        rows: doc
            .items
            .iter()
            .map(|it| NoticeRow {
                item: it.display_name().to_string(),
                qty: format!("{:.2}", it.qty.unwrap_or(0.0)),
                rate: format!("{:.2}", it.rate.unwrap_or(0.0)),
                tax: format!("{:.2}", it.tax_percent.unwrap_or(0.0)),
                amount: format!("{:.2}", it.amount),
                row_tax: format!("{:.2}", it.row_tax),
            })
            .collect(),
        subtotal: money(doc.subtotal),
        discount: money(doc.discount_amount),
        tax: money(doc.tax_amount),
        grand_total: money(doc.grand_total),
    };

    Ok(Notice {
        subject: format!("Invoice {} - {}", doc.name, doc.status),
        html: template.render()?,
    })
}

pub fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|source| BillingError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

pub fn build_message(from: Mailbox, to: Mailbox, notice: Notice) -> Result<Message> {
    Ok(Message::builder()
        .from(from)
        .to(to)
        .subject(notice.subject)
        .header(ContentType::TEXT_HTML)
        .body(notice.html)?)
}

/// Queue the notice for a submitted bill. Never fails the submission:
/// missing or invalid recipients are skipped and queue errors are logged.
pub fn send_submission_notice(store: &Store, doc: &BillingDoc) -> Option<PathBuf> {
    let customer_id = doc.customer.as_deref()?;

    let email = store
        .customers()
        .get(customer_id)
        .and_then(|c| c.email.as_deref())
        .filter(|e| !e.trim().is_empty());
    let Some(email) = email else {
        tracing::info!(customer = customer_id, bill = %doc.name, "no email for customer; skipping notice");
        return None;
    };

    let to = match parse_mailbox(email) {
        Ok(to) => to,
        Err(e) => {
            tracing::error!(customer = customer_id, bill = %doc.name, error = %e, "skipping notice");
            return None;
        }
    };

    match queue(store, doc, to) {
        Ok(path) => {
            tracing::info!(bill = %doc.name, to = email, path = %path.display(), "queued notice");
            Some(path)
        }
        Err(e) => {
            tracing::error!(bill = %doc.name, error = %e, "failed to queue notice");
            None
        }
    }
}

fn queue(store: &Store, doc: &BillingDoc, to: Mailbox) -> Result<PathBuf> {
    let config = store.config();
    let company_email: Address =
        config
            .company
            .email
            .parse()
            .map_err(|source| BillingError::InvalidAddress {
                address: config.company.email.clone(),
                source,
            })?;
    let from = Mailbox::new(Some(config.company.name.clone()), company_email);

    let notice = render_notice(doc, &config.billing.currency_symbol)?;
    let message = build_message(from, to, notice)?;

    let outbox = resolve_dir(&config.notify.outbox_dir, store.cfg_dir());
    fs::create_dir_all(&outbox)?;

    let id = FileTransport::new(&outbox).send(&message)?;
    Ok(outbox.join(format!("{id}.eml")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BillingLine, DocStatus};
    use crate::totals::Status;
    use chrono::NaiveDate;

    fn submitted() -> BillingDoc {
        let mut doc = BillingDoc::new(
            "BILL-2026-0003",
            Some("acme".to_string()),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        );
        doc.docstatus = DocStatus::Submitted;
        doc.status = Status::Unpaid;
        doc.items.push(BillingLine {
            item_name: Some("Bolts & Nuts".to_string()),
            rate: Some(50.0),
            amount: 100.0,
            row_tax: 10.0,
            ..BillingLine::new("bolts", 2.0, 10.0)
        });
        doc.subtotal = 100.0;
        doc.tax_amount = 10.0;
        doc.grand_total = 110.0;
        doc
    }

    #[test]
    fn subject_carries_name_and_status() {
        let notice = render_notice(&submitted(), "$").unwrap();

        assert_eq!(notice.subject, "Invoice BILL-2026-0003 - Unpaid");
    }

    #[test]
    fn body_lists_rows_and_totals() {
        let html = render_notice(&submitted(), "$").unwrap().html;

        assert!(html.contains("Bolts &amp; Nuts"));
        assert!(html.contains("10.00%"));
        assert!(html.contains("<b>Grand Total:</b> $110.00"));
        assert!(html.contains("<b>Due Date:</b> <br/>"));
    }

    #[test]
    fn message_carries_headers() {
        let from = Mailbox::new(
            Some("Your Company".to_string()),
            "billing@yourcompany.com".parse().unwrap(),
        );
        let to = parse_mailbox("ap@acme.test").unwrap();
        let notice = render_notice(&submitted(), "$").unwrap();

        let message = build_message(from, to, notice).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("billing@yourcompany.com"));
        assert!(raw.contains("To: ap@acme.test"));
        assert!(raw.contains("Subject: Invoice BILL-2026-0003 - Unpaid"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn malformed_address_is_rejected() {
        assert!(matches!(
            parse_mailbox("not an address"),
            Err(BillingError::InvalidAddress { .. })
        ));
    }
}
