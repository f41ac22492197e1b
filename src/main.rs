use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use billing::config::{config_dir, CONFIG_TEMPLATE, CUSTOMERS_TEMPLATE, ITEMS_TEMPLATE};
use billing::report::{item_sales, ReportFilter};
use billing::totals::status_for;
use billing::{BillingError, BillingForm, BillingLine, FormEvent, Result, Store, Totals};

#[derive(Parser)]
#[command(name = "billing")]
#[command(version, about = "Minimal CLI billing with live invoice totals", long_about = None)]
struct Cli {
    /// Path to config directory (default: XDG config dir or ~/.billing)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Reference date for numbering and status, YYYY-MM-DD (default: today)
    #[arg(long, global = true)]
    today: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// List configured customers
    Customers,

    /// List catalog items
    Items,

    /// Show config summary and next bill number
    Status,

    /// Create a draft bill
    New {
        /// Customer identifier from customers.toml
        #[arg(short, long)]
        customer: Option<String>,

        /// Due date, YYYY-MM-DD (default: today + due_days)
        #[arg(long)]
        due: Option<String>,

        /// Line items in format "item:quantity[:tax%]" (can be repeated)
        #[arg(short, long, value_name = "ITEM:QTY[:TAX]")]
        item: Vec<String>,
    },

    /// Edit a bill; each change recomputes the totals
    Edit {
        /// Bill name or index from 'list' (e.g., 1 or BILL-2026-0001)
        bill: String,

        /// Set customer ("none" clears it)
        #[arg(long)]
        customer: Option<String>,

        /// Append a line, "item:quantity[:tax%]"
        #[arg(long, value_name = "ITEM:QTY[:TAX]")]
        add: Vec<String>,

        /// Remove a line by 1-based row
        #[arg(long, value_name = "ROW")]
        remove: Vec<usize>,

        /// Set quantity, "ROW=VALUE" (empty value clears)
        #[arg(long, value_name = "ROW=VALUE")]
        qty: Vec<String>,

        /// Set rate, "ROW=VALUE" (empty value clears)
        #[arg(long, value_name = "ROW=VALUE")]
        rate: Vec<String>,

        /// Set tax percent, "ROW=VALUE" (empty value clears)
        #[arg(long, value_name = "ROW=VALUE")]
        tax: Vec<String>,

        /// Mark paid or unpaid
        #[arg(long)]
        paid: Option<bool>,

        /// Set due date, YYYY-MM-DD ("none" clears it)
        #[arg(long)]
        due: Option<String>,
    },

    /// Preview a bill's lines, totals and status
    Show {
        /// Bill name or index from 'list'
        bill: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a draft bill
    Submit {
        /// Bill name or index from 'list'
        bill: String,
    },

    /// List bills, newest first
    List {
        /// Number of bills to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Item sales over submitted bills
    Report {
        /// From posting date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// To posting date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Restrict to one item
        #[arg(long)]
        item: Option<String>,
    },
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let today = match cli.today {
        Some(s) => parse_date(&s)?,
        None => chrono::Local::now().date_naive(),
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Customers => cmd_customers(&cfg_dir),
        Commands::Items => cmd_items(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir, today),
        Commands::New {
            customer,
            due,
            item,
        } => cmd_new(&cfg_dir, customer, due, &item, today),
        Commands::Edit {
            bill,
            customer,
            add,
            remove,
            qty,
            rate,
            tax,
            paid,
            due,
        } => {
            let edits = Edits {
                customer,
                add,
                remove,
                qty,
                rate,
                tax,
                paid,
                due,
            };
            cmd_edit(&cfg_dir, &bill, edits, today)
        }
        Commands::Show { bill, json } => cmd_show(&cfg_dir, &bill, json, today),
        Commands::Submit { bill } => cmd_submit(&cfg_dir, &bill, today),
        Commands::List { limit } => cmd_list(&cfg_dir, limit, today),
        Commands::Report { from, to, item } => cmd_report(&cfg_dir, from, to, item),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BillingError::InvalidDate(s.to_string()))
}

/// Parse item input like "widget:2:10" into (item_id, quantity, tax_percent)
fn parse_item_input(input: &str) -> Result<(&str, f64, f64)> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 || parts[0].is_empty() {
        return Err(BillingError::InvalidItemFormat(input.to_string()));
    }

    let item_id = parts[0];
    let qty_str = parts[1];

    let quantity: f64 = qty_str.parse().map_err(|_| BillingError::InvalidQuantity {
        item: item_id.to_string(),
        qty: qty_str.to_string(),
        reason: "must be a number".to_string(),
    })?;

    if !quantity.is_finite() {
        return Err(BillingError::InvalidQuantity {
            item: item_id.to_string(),
            qty: qty_str.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if quantity < 0.0 {
        return Err(BillingError::InvalidQuantity {
            item: item_id.to_string(),
            qty: qty_str.to_string(),
            reason: "must not be negative".to_string(),
        });
    }

    let tax = match parts.get(2) {
        Some(t) => parse_tax(t)?,
        None => 0.0,
    };

    Ok((item_id, quantity, tax))
}

fn parse_tax(s: &str) -> Result<f64> {
    let tax: f64 = s
        .trim_end_matches('%')
        .parse()
        .map_err(|_| BillingError::InvalidTaxPercent(s.to_string()))?;
    check_tax(tax).map_err(|_| BillingError::InvalidTaxPercent(s.to_string()))
}

/// NaN and infinities fall outside the range too.
fn check_tax(tax: f64) -> Result<f64> {
    if (0.0..=100.0).contains(&tax) {
        Ok(tax)
    } else {
        Err(BillingError::InvalidTaxPercent(tax.to_string()))
    }
}

/// Parse "ROW=VALUE" with a 1-based row; an empty value clears the field.
/// Values must be finite and non-negative.
fn parse_field_edit(input: &str) -> Result<(usize, Option<f64>)> {
    let invalid = || BillingError::InvalidFieldEdit(input.to_string());

    let (row, value) = input.split_once('=').ok_or_else(invalid)?;
    let row: usize = row.trim().parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }

    let value = value.trim();
    let value = if value.is_empty() {
        None
    } else {
        let value: f64 = value.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        Some(value)
    };

    Ok((row - 1, value))
}

fn optional_arg(value: &str) -> Option<&str> {
    if value.eq_ignore_ascii_case("none") || value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn money(value: f64, currency_symbol: &str) -> String {
    format!("{}{:.2}", currency_symbol, value)
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(BillingError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    fs::write(cfg_dir.join("customers.toml"), CUSTOMERS_TEMPLATE)?;
    fs::write(cfg_dir.join("items.toml"), ITEMS_TEMPLATE)?;

    println!("Initialized billing config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your company details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Add your customers:         $EDITOR {}/customers.toml",
        cfg_dir.display()
    );
    println!(
        "  3. Configure catalog items:    $EDITOR {}/items.toml",
        cfg_dir.display()
    );
    println!();
    println!("Then create your first bill:");
    println!("  billing new --customer <customer-id> --item <item>:<quantity>[:<tax%>]");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct CustomerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "EMAIL")]
    email: String,
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "RATE")]
    rate: String,
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ITEM")]
    item: String,
    #[tabled(rename = "QTY")]
    qty: String,
    #[tabled(rename = "RATE")]
    rate: String,
    #[tabled(rename = "TAX %")]
    tax: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "ROW TAX")]
    row_tax: String,
}

#[derive(Tabled)]
struct BillRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CUSTOMER")]
    customer: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct SalesRow {
    #[tabled(rename = "ITEM")]
    item: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "QTY")]
    qty: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "TAX")]
    tax: String,
    #[tabled(rename = "LINE TOTAL")]
    line_total: String,
    #[tabled(rename = "BILLS")]
    count: usize,
}

/// List configured customers
fn cmd_customers(cfg_dir: &Path) -> Result<()> {
    let store = Store::open(cfg_dir)?;

    if store.customers().is_empty() {
        println!("No customers configured.");
        println!("Add customers to: {}/customers.toml", cfg_dir.display());
        return Ok(());
    }

    let mut sorted: Vec<_> = store.customers().iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let rows: Vec<CustomerRow> = sorted
        .iter()
        .map(|(id, customer)| CustomerRow {
            id: id.to_string(),
            name: customer.customer_name.clone(),
            email: customer.email.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// List catalog items
fn cmd_items(cfg_dir: &Path) -> Result<()> {
    let store = Store::open(cfg_dir)?;
    let symbol = &store.config().billing.currency_symbol;

    if store.items().is_empty() {
        println!("No items configured.");
        println!("Add items to: {}/items.toml", cfg_dir.display());
        return Ok(());
    }

    let mut sorted: Vec<_> = store.items().iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let rows: Vec<ItemRow> = sorted
        .iter()
        .map(|(id, item)| ItemRow {
            id: id.to_string(),
            name: item.item_name.clone(),
            category: item.category.clone().unwrap_or_default(),
            rate: money(item.rate, symbol),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Show config summary
fn cmd_status(cfg_dir: &Path, today: NaiveDate) -> Result<()> {
    let store = Store::open(cfg_dir)?;
    let config = store.config();

    println!("Billing Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Company:          {}", config.company.name);
    println!("Customers:        {}", store.customers().len());
    println!("Items:            {}", store.items().len());
    println!("Bills:            {}", store.bills().len());
    println!("Next bill:        {}", store.next_name(today));

    if !store.bills().is_empty() {
        println!();
        println!("Recent bills:");
        for bill in store.bills().iter().rev().take(5) {
            println!(
                "  {} - {} - {} - {}",
                bill.name,
                bill.customer.as_deref().unwrap_or("-"),
                money(bill.grand_total, &config.billing.currency_symbol),
                status_for(&bill.to_invoice(), today)
            );
        }
    }

    Ok(())
}

/// Create a draft bill from item inputs
fn cmd_new(
    cfg_dir: &Path,
    customer: Option<String>,
    due: Option<String>,
    items_input: &[String],
    today: NaiveDate,
) -> Result<()> {
    let mut store = Store::open(cfg_dir)?;

    if let Some(id) = customer.as_deref() {
        store.customer(id)?;
    }
    let due = due.as_deref().map(parse_date).transpose()?;

    let mut lines = Vec::new();
    for input in items_input {
        let (item_id, qty, tax) = parse_item_input(input)?;
        store.item(item_id)?;
        lines.push((item_id.to_string(), qty, tax));
    }
    if lines.is_empty() {
        return Err(BillingError::NoItems);
    }

    let doc = store.new_bill(customer, due, today);
    let doc = {
        let mut form = BillingForm::new(doc, &store, &store);
        for (item, qty, tax) in lines {
            let row = form.doc().items.len();
            form.handle(FormEvent::AddLine(BillingLine::new("", qty, tax)), today)?;
            form.handle(FormEvent::ItemSelected { row, item }, today)?;
        }
        form.into_doc()
    };

    let name = doc.name.clone();
    let totals = store.save_bill(doc, today)?;
    let symbol = &store.config().billing.currency_symbol;

    println!("Created {}", name);
    print_totals(&totals, symbol);

    Ok(())
}

struct Edits {
    customer: Option<String>,
    add: Vec<String>,
    remove: Vec<usize>,
    qty: Vec<String>,
    rate: Vec<String>,
    tax: Vec<String>,
    paid: Option<bool>,
    due: Option<String>,
}

impl Edits {
    fn touches_lines(&self) -> bool {
        self.customer.is_some()
            || !self.add.is_empty()
            || !self.remove.is_empty()
            || !self.qty.is_empty()
            || !self.rate.is_empty()
            || !self.tax.is_empty()
    }

    /// Translate command-line edits into form events, in a fixed order.
    fn into_events(self, store: &Store, current_rows: usize) -> Result<Vec<FormEvent>> {
        let mut events = Vec::new();

        if let Some(customer) = self.customer {
            let customer = optional_arg(&customer).map(str::to_string);
            if let Some(id) = customer.as_deref() {
                store.customer(id)?;
            }
            events.push(FormEvent::Customer(customer));
        }

        let mut rows = current_rows;
        for input in &self.add {
            let (item_id, qty, tax) = parse_item_input(input)?;
            store.item(item_id)?;
            events.push(FormEvent::AddLine(BillingLine::new("", qty, tax)));
            events.push(FormEvent::ItemSelected {
                row: rows,
                item: item_id.to_string(),
            });
            rows += 1;
        }

        // Highest row first so earlier removals don't shift later ones.
        let mut remove = self.remove;
        remove.sort_unstable_by(|a, b| b.cmp(a));
        remove.dedup();
        for row in remove {
            if row == 0 {
                return Err(BillingError::InvalidFieldEdit(row.to_string()));
            }
            events.push(FormEvent::RemoveLine { row: row - 1 });
        }

        for input in &self.qty {
            let (row, value) = parse_field_edit(input)?;
            events.push(FormEvent::Quantity { row, value });
        }
        for input in &self.rate {
            let (row, value) = parse_field_edit(input)?;
            events.push(FormEvent::Rate { row, value });
        }
        for input in &self.tax {
            let (row, value) = parse_field_edit(input)?;
            if let Some(v) = value {
                check_tax(v)?;
            }
            events.push(FormEvent::TaxPercent { row, value });
        }

        if let Some(paid) = self.paid {
            events.push(FormEvent::IsPaid(paid));
        }
        if let Some(due) = self.due {
            let due = optional_arg(&due).map(parse_date).transpose()?;
            events.push(FormEvent::DueDate(due));
        }

        Ok(events)
    }
}

/// Edit a bill
fn cmd_edit(cfg_dir: &Path, bill_ref: &str, edits: Edits, today: NaiveDate) -> Result<()> {
    let mut store = Store::open(cfg_dir)?;
    let doc = store.find_bill(bill_ref)?.clone();

    // Only payment and due date may change after submission.
    if doc.is_submitted() && edits.touches_lines() {
        return Err(BillingError::AlreadySubmitted(doc.name));
    }

    let events = edits.into_events(&store, doc.items.len())?;
    let doc = {
        let mut form = BillingForm::new(doc, &store, &store);
        for event in events {
            form.handle(event, today)?;
        }
        form.into_doc()
    };

    let name = doc.name.clone();
    let totals = store.save_bill(doc, today)?;
    let symbol = &store.config().billing.currency_symbol;

    println!("Updated {}", name);
    print_totals(&totals, symbol);

    Ok(())
}

fn print_totals(totals: &Totals, symbol: &str) {
    println!("  Subtotal:    {}", money(totals.subtotal, symbol));
    println!("  Discount:    {}", money(totals.discount, symbol));
    println!("  Tax:         {}", money(totals.tax_total, symbol));
    println!("  Grand total: {}", money(totals.grand_total, symbol));
    println!("  Status:      {}", totals.status);
}

/// Preview a bill with freshly computed totals
fn cmd_show(cfg_dir: &Path, bill_ref: &str, json: bool, today: NaiveDate) -> Result<()> {
    let store = Store::open(cfg_dir)?;
    let symbol = &store.config().billing.currency_symbol;
    let doc = store.find_bill(bill_ref)?.clone();

    let mut form = BillingForm::new(doc, &store, &store);
    let totals = form.recompute(today);
    let doc = form.doc();

    if json {
        let out = serde_json::json!({
            "bill": doc.name,
            "customer": doc.customer,
            "due_date": doc.due_date,
            "is_paid": doc.is_paid,
            "totals": totals,
        });
        let text = serde_json::to_string_pretty(&out).map_err(|e| {
            BillingError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        println!("{text}");
        return Ok(());
    }

    println!("{}", doc.name);
    println!("  Customer:    {}", doc.customer.as_deref().unwrap_or("-"));
    println!("  Posted:      {}", doc.posting_date);
    println!(
        "  Due:         {}",
        doc.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );

    let rows: Vec<LineRow> = doc
        .items
        .iter()
        .enumerate()
        .map(|(idx, line)| LineRow {
            index: idx + 1,
            item: line.display_name().to_string(),
            qty: format!("{}", line.qty.unwrap_or(0.0)),
            rate: money(line.rate.unwrap_or(0.0), symbol),
            tax: format!("{:.2}", line.tax_percent.unwrap_or(0.0)),
            amount: money(line.amount, symbol),
            row_tax: money(line.row_tax, symbol),
        })
        .collect();

    if !rows.is_empty() {
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
    print_totals(&totals, symbol);

    Ok(())
}

/// Submit a draft bill
fn cmd_submit(cfg_dir: &Path, bill_ref: &str, today: NaiveDate) -> Result<()> {
    let mut store = Store::open(cfg_dir)?;
    let doc = store.submit_bill(bill_ref, today)?;
    let symbol = &store.config().billing.currency_symbol;

    println!("Submitted {}", doc.name);
    println!("  Grand total: {}", money(doc.grand_total, symbol));
    println!("  Status:      {}", doc.status);

    Ok(())
}

/// List bills with their current status
fn cmd_list(cfg_dir: &Path, limit: Option<usize>, today: NaiveDate) -> Result<()> {
    let store = Store::open(cfg_dir)?;
    let symbol = &store.config().billing.currency_symbol;

    if store.bills().is_empty() {
        println!("No bills yet.");
        return Ok(());
    }

    let bills: Vec<_> = store.bills().iter().rev().enumerate().collect();
    let bills = match limit {
        Some(n) => &bills[..n.min(bills.len())],
        None => &bills[..],
    };

    let rows: Vec<BillRow> = bills
        .iter()
        .map(|(idx, bill)| BillRow {
            index: idx + 1,
            name: bill.name.clone(),
            customer: bill.customer.clone().unwrap_or_default(),
            date: bill.posting_date.to_string(),
            due: bill.due_date.map(|d| d.to_string()).unwrap_or_default(),
            total: money(bill.grand_total, symbol),
            status: status_for(&bill.to_invoice(), today).to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} bills", store.bills().len());

    Ok(())
}

/// Item sales report
fn cmd_report(
    cfg_dir: &Path,
    from: Option<String>,
    to: Option<String>,
    item: Option<String>,
) -> Result<()> {
    let store = Store::open(cfg_dir)?;
    let symbol = &store.config().billing.currency_symbol;

    let filter = ReportFilter {
        from: from.as_deref().map(parse_date).transpose()?,
        to: to.as_deref().map(parse_date).transpose()?,
        item,
    };

    let sales = item_sales(store.bills(), &filter);
    if sales.is_empty() {
        println!("No submitted bills match the given filters.");
        return Ok(());
    }

    let rows: Vec<SalesRow> = sales
        .iter()
        .map(|r| SalesRow {
            item: r.item.clone(),
            name: r.item_name.clone().unwrap_or_default(),
            category: r.category.clone().unwrap_or_default(),
            qty: format!("{}", r.total_qty),
            amount: money(r.total_amount, symbol),
            tax: money(r.total_tax, symbol),
            line_total: money(r.total_line_total, symbol),
            count: r.invoice_count,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}
