//! Account repository for chart of accounts database operations.
//!
//! Besides plain maintenance, this is where posting targets are checked
//! (active leaves only) and where the configured posting codes are
//! resolved to account ids.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QuerySelect, RelationTrait, Set,
};
use tradebook_core::ledger::{
    AccountBalance, AccountInfo, AccountNode, AccountType, LedgerError, descendants_of,
    validate_account,
};
use tradebook_core::lifecycle::PostingAccounts;
use tradebook_shared::PostingAccountCodes;
use uuid::Uuid;

use crate::entities::{
    chart_of_accounts, journal_entries, journal_entry_details, sea_orm_active_enums::JournalStatus,
};

use super::error::StoreError;

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Account code (unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Parent account for the tree.
    pub parent_id: Option<Uuid>,
    /// Whether the account accepts postings.
    pub is_active: bool,
}

/// Account repository for chart of accounts operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is taken or the parent does not exist.
    pub async fn create_account(
        &self,
        input: CreateAccountInput,
    ) -> Result<chart_of_accounts::Model, StoreError> {
        let existing = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Code.eq(&input.code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateAccountCode(input.code).into());
        }

        if let Some(parent_id) = input.parent_id {
            chart_of_accounts::Entity::find_by_id(parent_id)
                .one(&self.db)
                .await?
                .ok_or(LedgerError::ParentNotFound(parent_id))?;
        }

        let account = chart_of_accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code),
            name: Set(input.name),
            account_type: Set(input.account_type.into()),
            parent_id: Set(input.parent_id),
            is_active: Set(input.is_active),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(account)
    }

    /// Finds an account by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<chart_of_accounts::Model>, StoreError> {
        Ok(chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::Code.eq(code))
            .one(&self.db)
            .await?)
    }

    /// Activates or deactivates an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account does not exist.
    pub async fn set_active(
        &self,
        account_id: Uuid,
        is_active: bool,
    ) -> Result<chart_of_accounts::Model, StoreError> {
        let account = chart_of_accounts::Entity::find_by_id(account_id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let mut active: chart_of_accounts::ActiveModel = account.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Resolves the configured posting codes to account ids.
    ///
    /// # Errors
    ///
    /// Returns `AccountCodeNotFound` for the first missing code.
    pub async fn posting_accounts(
        &self,
        codes: &PostingAccountCodes,
    ) -> Result<PostingAccounts, StoreError> {
        resolve_posting_accounts(&self.db, codes).await
    }

    /// Balance of an account as of `as_of`, in its natural sign.
    ///
    /// Counts entries in status posted or reversed dated on or before
    /// `as_of`; a reversed entry and its reversal cancel out. A parent
    /// account reports the sum over its subtree.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn account_balance_as_of(
        &self,
        account_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<AccountBalance, StoreError> {
        balance_as_of(&self.db, account_id, as_of).await
    }
}

/// Checks that every account in `account_ids` is an active leaf.
pub(crate) async fn ensure_postable<C: ConnectionTrait>(
    conn: &C,
    account_ids: &[Uuid],
) -> Result<(), StoreError> {
    let unique: Vec<Uuid> = account_ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let accounts: HashMap<Uuid, chart_of_accounts::Model> = chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::Id.is_in(unique.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let parents: HashSet<Uuid> = chart_of_accounts::Entity::find()
        .select_only()
        .column(chart_of_accounts::Column::ParentId)
        .filter(chart_of_accounts::Column::ParentId.is_in(unique.clone()))
        .into_tuple::<Option<Uuid>>()
        .all(conn)
        .await?
        .into_iter()
        .flatten()
        .collect();

    for id in unique {
        let account = accounts.get(&id).ok_or(LedgerError::AccountNotFound(id))?;
        validate_account(&AccountInfo {
            id,
            is_active: account.is_active,
            has_children: parents.contains(&id),
        })?;
    }

    Ok(())
}

/// Resolves posting codes to ids in one query.
pub(crate) async fn resolve_posting_accounts<C: ConnectionTrait>(
    conn: &C,
    codes: &PostingAccountCodes,
) -> Result<PostingAccounts, StoreError> {
    let wanted = [
        &codes.receivable,
        &codes.payable,
        &codes.sales_revenue,
        &codes.sales_returns,
        &codes.tax_payable,
        &codes.tax_receivable,
        &codes.inventory,
        &codes.cogs,
        &codes.inventory_variance,
        &codes.customer_deposits,
        &codes.other_income,
    ];

    let by_code: HashMap<String, Uuid> = chart_of_accounts::Entity::find()
        .filter(chart_of_accounts::Column::Code.is_in(wanted.iter().map(|c| c.as_str())))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.code, a.id))
        .collect();

    let id = |code: &String| {
        by_code
            .get(code)
            .copied()
            .ok_or_else(|| LedgerError::AccountCodeNotFound(code.clone()))
    };

    Ok(PostingAccounts {
        receivable: id(&codes.receivable)?,
        payable: id(&codes.payable)?,
        sales_revenue: id(&codes.sales_revenue)?,
        sales_returns: id(&codes.sales_returns)?,
        tax_payable: id(&codes.tax_payable)?,
        tax_receivable: id(&codes.tax_receivable)?,
        inventory: id(&codes.inventory)?,
        cogs: id(&codes.cogs)?,
        inventory_variance: id(&codes.inventory_variance)?,
        customer_deposits: id(&codes.customer_deposits)?,
        other_income: id(&codes.other_income)?,
    })
}

pub(crate) async fn balance_as_of<C: ConnectionTrait>(
    conn: &C,
    account_id: Uuid,
    as_of: NaiveDate,
) -> Result<AccountBalance, StoreError> {
    let account = chart_of_accounts::Entity::find_by_id(account_id)
        .one(conn)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

    let nodes: Vec<AccountNode> = chart_of_accounts::Entity::find()
        .select_only()
        .column(chart_of_accounts::Column::Id)
        .column(chart_of_accounts::Column::ParentId)
        .into_tuple::<(Uuid, Option<Uuid>)>()
        .all(conn)
        .await?
        .into_iter()
        .map(|(id, parent_id)| AccountNode { id, parent_id })
        .collect();
    let subtree = descendants_of(&nodes, account_id);

    // Sums over no rows come back NULL.
    let totals: Option<(Option<Decimal>, Option<Decimal>)> = journal_entry_details::Entity::find()
        .select_only()
        .column_as(journal_entry_details::Column::Debit.sum(), "debit")
        .column_as(journal_entry_details::Column::Credit.sum(), "credit")
        .join(
            JoinType::InnerJoin,
            journal_entry_details::Relation::JournalEntries.def(),
        )
        .filter(journal_entry_details::Column::AccountId.is_in(subtree))
        .filter(
            journal_entries::Column::Status.is_in([JournalStatus::Posted, JournalStatus::Reversed]),
        )
        .filter(journal_entries::Column::EntryDate.lte(as_of))
        .into_tuple()
        .one(conn)
        .await?;
    let (debit, credit) = totals.unwrap_or_default();

    Ok(AccountBalance::from_totals(
        account_id,
        account.account_type.into(),
        debit.unwrap_or_default(),
        credit.unwrap_or_default(),
    ))
}
