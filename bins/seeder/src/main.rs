//! Database seeder for Tradebook.
//!
//! Creates the default chart of accounts, whose leaf codes match the
//! default posting configuration, plus a cash drawer and one bank account.
//! Rows that already exist are left alone, so the seeder can be re-run.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradebook_core::ledger::AccountType;
use tradebook_db::entities::{banks, sea_orm_active_enums::BankType};
use tradebook_db::repositories::{
    AccountRepository, CashRepository, CreateAccountInput, CreateBankInput,
};
use tradebook_shared::AppConfig;

/// `(code, name, type, parent code)`, parents before children.
const CHART: &[(&str, &str, AccountType, Option<&str>)] = &[
    ("1000", "Assets", AccountType::Asset, None),
    ("1100", "Current Assets", AccountType::Asset, Some("1000")),
    ("1110", "Cash on Hand", AccountType::Asset, Some("1100")),
    ("1120", "Bank", AccountType::Asset, Some("1100")),
    ("1130", "Accounts Receivable", AccountType::Asset, Some("1100")),
    ("1140", "Inventory", AccountType::Asset, Some("1100")),
    ("1150", "Tax Receivable", AccountType::Asset, Some("1100")),
    ("2000", "Liabilities", AccountType::Liability, None),
    ("2100", "Current Liabilities", AccountType::Liability, Some("2000")),
    ("2110", "Accounts Payable", AccountType::Liability, Some("2100")),
    ("2130", "Tax Payable", AccountType::Liability, Some("2100")),
    ("2140", "Customer Deposits", AccountType::Liability, Some("2100")),
    ("3000", "Equity", AccountType::Equity, None),
    ("3100", "Owner's Capital", AccountType::Equity, Some("3000")),
    ("3200", "Opening Balance Equity", AccountType::Equity, Some("3000")),
    ("4000", "Income", AccountType::Income, None),
    ("4100", "Sales Revenue", AccountType::Income, Some("4000")),
    ("4200", "Sales Returns", AccountType::Income, Some("4000")),
    ("4900", "Other Income", AccountType::Income, Some("4000")),
    ("5000", "Cost of Sales", AccountType::Expense, None),
    ("5100", "Cost of Goods Sold", AccountType::Expense, Some("5000")),
    ("5200", "Inventory Variance", AccountType::Expense, Some("5000")),
    ("5300", "Stock Adjustments", AccountType::Expense, Some("5000")),
    ("6000", "Operating Expenses", AccountType::Expense, None),
    ("6100", "General Expenses", AccountType::Expense, Some("6000")),
];

/// `(name, type, GL code)`.
const BANKS: &[(&str, BankType, &str)] = &[
    ("Cash Drawer", BankType::Cash, "1110"),
    ("Main Bank Account", BankType::Bank, "1120"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradebook=info,seeder=info,sea_orm=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = tradebook_db::connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;

    seed_chart(&db).await?;
    seed_banks(&db).await?;

    // Every posting code the ledger is configured with must now resolve.
    AccountRepository::new(db.clone())
        .posting_accounts(&config.ledger.posting_accounts)
        .await
        .context("Posting accounts do not match the seeded chart")?;

    info!("Seeding complete");
    Ok(())
}

async fn seed_chart(db: &DatabaseConnection) -> anyhow::Result<()> {
    let repo = AccountRepository::new(db.clone());

    for &(code, name, account_type, parent) in CHART {
        if repo.find_by_code(code).await?.is_some() {
            info!(code, "Account already exists, skipping");
            continue;
        }

        let parent_id = match parent {
            Some(parent_code) => Some(
                repo.find_by_code(parent_code)
                    .await?
                    .with_context(|| format!("Parent account {parent_code} missing"))?
                    .id,
            ),
            None => None,
        };

        repo.create_account(CreateAccountInput {
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            parent_id,
            is_active: true,
        })
        .await
        .with_context(|| format!("Failed to create account {code}"))?;
        info!(code, name, "Created account");
    }
    Ok(())
}

async fn seed_banks(db: &DatabaseConnection) -> anyhow::Result<()> {
    let accounts = AccountRepository::new(db.clone());
    let cash = CashRepository::new(db.clone());

    for &(name, bank_type, gl_code) in BANKS {
        let existing = banks::Entity::find()
            .filter(banks::Column::Name.eq(name))
            .one(db)
            .await?;
        if existing.is_some() {
            info!(name, "Bank already exists, skipping");
            continue;
        }

        let account = accounts
            .find_by_code(gl_code)
            .await?
            .with_context(|| format!("Bank GL account {gl_code} missing"))?;

        cash.create_bank(CreateBankInput {
            name: name.to_string(),
            bank_type,
            account_id: account.id,
            opening_balance: Decimal::ZERO,
        })
        .await
        .with_context(|| format!("Failed to create bank {name}"))?;
        info!(name, gl_code, "Created bank");
    }
    Ok(())
}
