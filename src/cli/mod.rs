use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::application::{LedgerService, TracingInstrumentor};
use crate::domain::{
    Account, AccountEntryRequest, AccountType, Cursor, DEFAULT_PAGE_SIZE, Entry, Operation, Page,
};
use crate::storage::SqliteRepository;

/// Partita - Double-Entry Ledger
#[derive(Parser)]
#[command(name = "partita")]
#[command(about = "A double-entry ledger over hierarchical dot-path accounts")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "partita.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger database
    Init,

    /// Post a balanced transaction
    Post {
        /// Debit leg as ACCOUNT:AMOUNT (repeatable)
        #[arg(long = "debit", value_name = "ACCOUNT:AMOUNT")]
        debits: Vec<String>,

        /// Credit leg as ACCOUNT:AMOUNT (repeatable)
        #[arg(long = "credit", value_name = "ACCOUNT:AMOUNT")]
        credits: Vec<String>,

        /// Business event code
        #[arg(short, long, default_value_t = 1)]
        event: i32,

        /// Competence date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show the balance of an account (analytic or synthetic)
    Balance {
        /// Account path, e.g. asset.account.treasury or asset.*.treasury
        account: String,
    },

    /// Break a synthetic account down by path prefix over a date range
    Report {
        /// Synthetic account path, e.g. asset.*
        account: String,

        /// Number of labels to group by
        #[arg(short, long, default_value_t = 2)]
        depth: usize,

        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },

    /// List the entries of an analytic account
    Entries {
        /// Analytic account path
        account: String,

        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Resume from a cursor token returned by a previous call
        #[arg(long)]
        cursor: Option<String>,
    },
}

type Service = LedgerService<SqliteRepository, TracingInstrumentor>;

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                let url = format!("sqlite:{}?mode=rwc", self.database);
                SqliteRepository::init(&url).await?;
                println!("Initialized ledger database at {}", self.database);
                Ok(())
            }
            Commands::Post {
                debits,
                credits,
                event,
                date,
            } => {
                let service = open_service(&self.database).await?;
                let competence_date = match date {
                    Some(raw) => parse_date(&raw)?,
                    None => Utc::now(),
                };

                let mut entries = Vec::new();
                for leg in &debits {
                    entries.push(parse_leg(leg, Operation::Debit, event, competence_date)?);
                }
                for leg in &credits {
                    entries.push(parse_leg(leg, Operation::Credit, event, competence_date)?);
                }

                let transaction = service.create_transaction(entries).await?;
                println!(
                    "Posted transaction {} ({} entries)",
                    transaction.id(),
                    transaction.entries().len()
                );
                Ok(())
            }
            Commands::Balance { account } => {
                let service = open_service(&self.database).await?;
                let account = Account::new(&account)?;

                let balance = match account.account_type() {
                    AccountType::Analytic => service.analytic_balance(&account).await?,
                    AccountType::Synthetic => service.synthetic_balance(&account).await?,
                };

                match balance.version() {
                    Some(version) => println!(
                        "{}  {} (version {})",
                        balance.account(),
                        format_amount(balance.balance()),
                        version
                    ),
                    None => println!(
                        "{}  {}",
                        balance.account(),
                        format_amount(balance.balance())
                    ),
                }
                Ok(())
            }
            Commands::Report {
                account,
                depth,
                from,
                to,
            } => {
                let service = open_service(&self.database).await?;
                let account = Account::new(&account)?;
                let start = parse_date(&from)?;
                let end = end_of_day(&to)?;

                let report = service.synthetic_report(&account, depth, start, end).await?;

                for group in &report.groups {
                    println!(
                        "{:<40} credit {:>12}  debit {:>12}  balance {:>12}",
                        group.account,
                        format_amount(group.credit),
                        format_amount(group.debit),
                        format_amount(group.balance())
                    );
                }
                println!(
                    "{:<40} credit {:>12}  debit {:>12}  balance {:>12}",
                    "total",
                    format_amount(report.total_credit()),
                    format_amount(report.total_debit()),
                    format_amount(report.balance())
                );
                Ok(())
            }
            Commands::Entries {
                account,
                from,
                to,
                limit,
                cursor,
            } => {
                let service = open_service(&self.database).await?;
                let account = Account::new_analytic(&account)?;
                let start = parse_date(&from)?;
                let end = end_of_day(&to)?;

                let cursor = cursor.as_deref().map(Cursor::decode).transpose()?;
                let page = Page::new(limit.unwrap_or(DEFAULT_PAGE_SIZE), cursor)?;

                let list = service
                    .list_entries(AccountEntryRequest {
                        account,
                        start_date: start,
                        end_date: end,
                        page,
                    })
                    .await?;

                for entry in &list.entries {
                    println!(
                        "v{:<6} {} {:>12}  event {:<4} {}  {}",
                        entry.version,
                        entry.operation,
                        format_amount(entry.amount),
                        entry.event,
                        entry.competence_date.format("%Y-%m-%d"),
                        entry.id
                    );
                }
                match list.next_page {
                    Some(cursor) => println!("next cursor: {}", cursor.encode()),
                    None => println!("({} entries, no more pages)", list.entries.len()),
                }
                Ok(())
            }
        }
    }
}

async fn open_service(database: &str) -> Result<Service> {
    let url = format!("sqlite:{database}");
    let repository = SqliteRepository::connect(&url)
        .await
        .context("failed to open ledger database (run `partita init` first?)")?;
    Ok(LedgerService::new(repository, TracingInstrumentor))
}

/// Parse one posting leg of the form `ACCOUNT:AMOUNT`.
fn parse_leg(
    leg: &str,
    operation: Operation,
    event: i32,
    competence_date: DateTime<Utc>,
) -> Result<Entry> {
    let Some((account, amount)) = leg.rsplit_once(':') else {
        bail!("invalid leg {leg:?}, expected ACCOUNT:AMOUNT");
    };

    let account = Account::new_analytic(account)?;
    let amount = parse_amount(amount)?;

    Ok(Entry::new(account, operation, amount, event, competence_date))
}

/// Parse a decimal amount string into minor currency units.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
fn parse_amount(input: &str) -> Result<i64> {
    let input = input.trim();
    if input.starts_with('-') {
        bail!("amounts must not be negative");
    }

    let (units, decimals) = match input.split_once('.') {
        None => (input, ""),
        Some(parts) => parts,
    };
    if !decimals.chars().all(|c| c.is_ascii_digit()) {
        bail!("invalid amount {input:?}");
    }

    let units: i64 = if units.is_empty() {
        0
    } else {
        units
            .parse()
            .with_context(|| format!("invalid amount {input:?}"))?
    };

    // Pad or truncate the decimal part to 2 digits.
    let minor: i64 = match decimals.len() {
        0 => 0,
        1 => {
            decimals
                .parse::<i64>()
                .with_context(|| format!("invalid amount {input:?}"))?
                * 10
        }
        _ => decimals[..2]
            .parse()
            .with_context(|| format!("invalid amount {input:?}"))?,
    };

    Ok(units * 100 + minor)
}

/// Format minor currency units as a decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
fn format_amount(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let amount = amount.abs();
    format!("{}{}.{:02}", sign, amount / 100, amount % 100)
}

fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("invalid date {input:?}, expected YYYY-MM-DD"))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

/// Closing bound for an inclusive date range.
fn end_of_day(input: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("invalid date {input:?}, expected YYYY-MM-DD"))?;
    Ok(date.and_hms_opt(23, 59, 59).unwrap().and_utc())
}
