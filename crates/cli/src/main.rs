//! Officine CLI - Pharmacy back-office from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from OFFICINE_PASSWORD)
//! officine login -u amel
//!
//! # Dashboard for March 2024, paid invoices only
//! officine dashboard --month 03 --year 2024 --status paid
//!
//! # Invoices of the current quarter
//! officine invoices list --period quarter
//!
//! # Monthly report as PDF
//! officine report --month 03 --year 2024 --pdf ./exports
//! ```
//!
//! # Commands
//!
//! - `login`, `logout`, `whoami`, `register`, `passwd` - Session and account
//! - `health` - Backend connection test
//! - `suppliers`, `invoices`, `credit-notes` - Entity management
//! - `dashboard` - KPIs and filtered rows for a period
//! - `report` - Monthly report

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use officine_client::ClientConfig;
use officine_core::{
    CreditNoteStatus, InvoiceStatus, Money, Month, QuickPeriod, StatusBucket, UserRole, Year,
};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod output;

use commands::{Context, parse_amount, parse_date};

#[derive(Parser)]
#[command(name = "officine")]
#[command(author, version, about = "Officine pharmacy back-office")]
struct Cli {
    /// Backend base URL (overrides `OFFICINE_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(long, env = "OFFICINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Role (`ADMIN`, `PHARMACIEN`, `COMPTABLE`)
        #[arg(short, long, default_value = "PHARMACIEN")]
        role: UserRole,

        #[arg(long, env = "OFFICINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Change the password of the signed-in user
    Passwd {
        #[arg(long, env = "OFFICINE_PASSWORD", hide_env_values = true)]
        old_password: String,

        #[arg(long, env = "OFFICINE_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
    /// Test the backend connection
    Health,
    /// Manage suppliers
    Suppliers {
        #[command(subcommand)]
        action: SupplierAction,
    },
    /// Manage invoices
    Invoices {
        #[command(subcommand)]
        action: InvoiceAction,
    },
    /// Manage credit notes
    CreditNotes {
        #[command(subcommand)]
        action: CreditNoteAction,
    },
    /// Show KPIs, charts and rows for a period
    Dashboard {
        /// Month, `01` to `12`
        #[arg(short, long)]
        month: Option<Month>,

        /// Four-digit year
        #[arg(short, long)]
        year: Option<Year>,

        /// Quick period (`current`, `last`, `quarter`, `year`); overrides
        /// month and year
        #[arg(short, long, conflicts_with_all = ["month", "year"])]
        period: Option<QuickPeriod>,

        /// Status bucket (`paid`, `pending`, `overdue`)
        #[arg(short, long)]
        status: Option<StatusBucket>,
    },
    /// Show a monthly report
    Report {
        #[arg(short, long)]
        month: Month,

        #[arg(short, long)]
        year: Year,

        /// Also write the report as PDF into this directory
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SupplierAction {
    /// List one page of suppliers
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Filter the page by name, city, email, SIRET or phone
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show a supplier
    Show { id: String },
    /// Create a supplier
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        code: Option<String>,

        #[arg(long, default_value = "")]
        address: String,

        #[arg(long, default_value = "")]
        postal_code: String,

        #[arg(long, default_value = "")]
        city: String,

        #[arg(long, default_value = "")]
        phone: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long, default_value = "")]
        siret: String,

        /// Create the supplier as inactive
        #[arg(long)]
        inactive: bool,
    },
    /// Delete a supplier
    Delete { id: String },
}

#[derive(Subcommand)]
enum InvoiceAction {
    /// List invoices
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        status: Option<InvoiceStatus>,

        /// Calendar period (`current`, `last`, `quarter`, `year`)
        #[arg(short, long)]
        period: Option<QuickPeriod>,
    },
    /// Show an invoice
    Show { id: String },
    /// Create an invoice
    Create {
        #[arg(short, long)]
        number: String,

        /// Supplier id
        #[arg(short, long)]
        supplier: String,

        /// Invoice date (`DD/MM/YYYY` or `YYYY-MM-DD`); today when omitted
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date)]
        due_date: Option<NaiveDate>,

        /// Net to pay
        #[arg(short, long, value_parser = parse_amount)]
        amount: Money,

        #[arg(long, default_value = "PENDING")]
        status: InvoiceStatus,

        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Mark an invoice as paid today
    Pay { id: String },
    /// Delete an invoice
    Delete { id: String },
    /// Export an invoice as PDF
    Pdf {
        id: String,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum CreditNoteAction {
    /// List credit notes
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        status: Option<CreditNoteStatus>,
    },
    /// Show a credit note
    Show { id: String },
    /// Create a credit note against an invoice
    Create {
        #[arg(short, long)]
        number: String,

        /// Invoice id
        #[arg(short, long)]
        invoice: String,

        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[arg(short, long, value_parser = parse_amount)]
        amount: Money,

        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// Mark a credit note as applied
    Apply { id: String },
    /// Delete a credit note
    Delete { id: String },
    /// Export a credit note as PDF
    Pdf {
        id: String,

        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

/// Initialize Sentry error tracking.
///
/// Returns a guard that must be held for the lifetime of the process.
/// Returns `None` if `SENTRY_DSN` is not set.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "officine_client=info,officine_cli=info".into());

    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let sentry_guard = init_sentry(&config);
    init_tracing(config.json_logs);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::new(config).await?;
    if let Some(url) = &cli.api_url {
        ctx.client.set_base_url(url)?;
    }

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, &SecretString::from(password)).await?;
        }
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx).await?,
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            role,
            password,
        } => {
            let form = commands::auth::Registration {
                username,
                email,
                first_name,
                last_name,
                role,
            };
            commands::auth::register(&ctx, form, SecretString::from(password)).await?;
        }
        Commands::Passwd {
            old_password,
            new_password,
        } => {
            let old_password = SecretString::from(old_password);
            let new_password = SecretString::from(new_password);
            commands::auth::change_password(&ctx, &old_password, &new_password).await?;
        }
        Commands::Health => commands::auth::health(&ctx).await?,
        Commands::Suppliers { action } => match action {
            SupplierAction::List { page, search } => {
                commands::suppliers::list(&ctx, page, search.as_deref()).await?;
            }
            SupplierAction::Show { id } => commands::suppliers::show(&ctx, &id).await?,
            SupplierAction::Create {
                name,
                code,
                address,
                postal_code,
                city,
                phone,
                email,
                siret,
                inactive,
            } => {
                let mut input = officine_core::SupplierInput::new(name);
                input.code = code;
                input.address = address;
                input.set_postal_code(postal_code);
                input.city = city;
                input.phone = phone;
                input.email = email;
                input.siret = siret;
                input.set_active(!inactive);
                commands::suppliers::create(&ctx, &input).await?;
            }
            SupplierAction::Delete { id } => commands::suppliers::delete(&ctx, &id).await?,
        },
        Commands::Invoices { action } => match action {
            InvoiceAction::List {
                search,
                status,
                period,
            } => {
                let filter = officine_client::InvoiceListFilter {
                    search: search.unwrap_or_default(),
                    status,
                    period,
                };
                commands::invoices::list(&ctx, &filter).await?;
            }
            InvoiceAction::Show { id } => commands::invoices::show(&ctx, &id).await?,
            InvoiceAction::Create {
                number,
                supplier,
                date,
                due_date,
                amount,
                status,
                notes,
            } => {
                let mut input = officine_core::InvoiceInput::new(Context::today());
                input.invoice_number = number;
                input.supplier = Some(supplier.into());
                input.invoice_date = date.unwrap_or_else(Context::today);
                input.due_date = due_date;
                input.net_to_pay = amount;
                input.status = status;
                input.notes = notes;
                commands::invoices::create(&ctx, &input).await?;
            }
            InvoiceAction::Pay { id } => commands::invoices::pay(&ctx, &id).await?,
            InvoiceAction::Delete { id } => commands::invoices::delete(&ctx, &id).await?,
            InvoiceAction::Pdf { id, out } => commands::invoices::export(&ctx, &id, &out).await?,
        },
        Commands::CreditNotes { action } => match action {
            CreditNoteAction::List { search, status } => {
                let filter = officine_client::CreditNoteListFilter {
                    search: search.unwrap_or_default(),
                    status,
                };
                commands::credit_notes::list(&ctx, &filter).await?;
            }
            CreditNoteAction::Show { id } => commands::credit_notes::show(&ctx, &id).await?,
            CreditNoteAction::Create {
                number,
                invoice,
                date,
                amount,
                reason,
            } => {
                let mut input = officine_core::CreditNoteInput::new(Context::today());
                input.credit_note_number = number;
                input.invoice = Some(invoice.into());
                input.credit_note_date = date.unwrap_or_else(Context::today);
                input.amount = amount;
                input.reason = reason;
                commands::credit_notes::create(&ctx, &input).await?;
            }
            CreditNoteAction::Apply { id } => commands::credit_notes::apply(&ctx, &id).await?,
            CreditNoteAction::Delete { id } => commands::credit_notes::delete(&ctx, &id).await?,
            CreditNoteAction::Pdf { id, out } => {
                commands::credit_notes::export(&ctx, &id, &out).await?;
            }
        },
        Commands::Dashboard {
            month,
            year,
            period,
            status,
        } => {
            let selection = commands::dashboard::Selection {
                month,
                year,
                period,
                status,
            };
            commands::dashboard::show(&ctx, selection).await?;
        }
        Commands::Report { month, year, pdf } => {
            commands::dashboard::report(&ctx, month, year, pdf.as_deref()).await?;
        }
    }
    Ok(())
}
