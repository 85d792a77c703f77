//! Application configuration management.

use serde::Deserialize;

use crate::types::ShortfallCostPolicy;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger posting configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration: which accounts the posting rules hit, how
/// shortfalls are costed, and how document numbers are allocated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Account codes used by the posting rules.
    #[serde(default)]
    pub posting_accounts: PostingAccountCodes,
    /// Cost estimate used when layers cannot cover a consumption.
    #[serde(default)]
    pub shortfall_cost: ShortfallCostPolicy,
    /// Document number allocation settings.
    #[serde(default)]
    pub numbering: NumberingConfig,
}

/// Chart-of-accounts codes for the fixed side of every posting rule.
///
/// Defaults match the chart created by the seeder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostingAccountCodes {
    /// Accounts receivable (credit sales, customer receipts).
    pub receivable: String,
    /// Accounts payable (credit purchases, supplier payments).
    pub payable: String,
    /// Sales revenue, net of tax.
    pub sales_revenue: String,
    /// Contra-revenue for goods returned by customers.
    pub sales_returns: String,
    /// Output tax collected on sales.
    pub tax_payable: String,
    /// Input tax paid on purchases.
    pub tax_receivable: String,
    /// Inventory asset.
    pub inventory: String,
    /// Cost of goods sold.
    pub cogs: String,
    /// Difference between a purchase return's value and its FIFO cost.
    pub inventory_variance: String,
    /// Liability for customer overpayments.
    pub customer_deposits: String,
    /// Other income, used when an overpayment is written off.
    pub other_income: String,
}

impl Default for PostingAccountCodes {
    fn default() -> Self {
        Self {
            receivable: "1130".to_string(),
            payable: "2110".to_string(),
            sales_revenue: "4100".to_string(),
            sales_returns: "4200".to_string(),
            tax_payable: "2130".to_string(),
            tax_receivable: "1150".to_string(),
            inventory: "1140".to_string(),
            cogs: "5100".to_string(),
            inventory_variance: "5200".to_string(),
            customer_deposits: "2140".to_string(),
            other_income: "4900".to_string(),
        }
    }
}

/// Document number allocation settings.
///
/// Numbers are allocated optimistically; a collision on the unique
/// number column is retried after a short randomized sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NumberingConfig {
    /// Attempts before giving up with a transient error.
    pub max_attempts: u32,
    /// Lower bound of the randomized backoff, in milliseconds.
    pub min_backoff_ms: u64,
    /// Upper bound of the randomized backoff, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_backoff_ms: 5,
            max_backoff_ms: 50,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TRADEBOOK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("TRADEBOOK__DATABASE__URL", Some("postgres://localhost/tradebook_test")),
                ("TRADEBOOK__LEDGER__SHORTFALL_COST", Some("last_known_cost")),
                ("TRADEBOOK__LEDGER__NUMBERING__MAX_ATTEMPTS", Some("3")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tradebook_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.shortfall_cost, ShortfallCostPolicy::LastKnownCost);
                assert_eq!(config.ledger.numbering.max_attempts, 3);
                assert_eq!(config.ledger.numbering.max_backoff_ms, 50);
                assert_eq!(config.ledger.posting_accounts.inventory, "1140");
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars([("TRADEBOOK__DATABASE__URL", None::<&str>)], || {
            assert!(AppConfig::load().is_err());
        });
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.shortfall_cost, ShortfallCostPolicy::AverageOfAvailable);
        assert_eq!(ledger.numbering, NumberingConfig::default());
        assert_eq!(ledger.posting_accounts.receivable, "1130");
        assert_eq!(ledger.posting_accounts.other_income, "4900");
    }
}
