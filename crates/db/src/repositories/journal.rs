//! Journal repository: posting and reversing balanced entries.
//!
//! Entries are only ever inserted. A correction is a new entry with every
//! line's sides swapped; the original is flagged `reversed` and points at
//! its reversal, while its lines stay untouched.
//!
//! Entry and line ids are UUIDv7, so ordering by id is insertion order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use tracing::info;
use tradebook_core::ledger::{
    AccountBalance, JournalLine, LedgerError, ensure_reversible, reverse_lines, validate_lines,
};
use tradebook_core::lifecycle::JOURNAL_PREFIX;
use tradebook_core::origin::Origin;
use tradebook_shared::NumberingConfig;
use uuid::Uuid;

use crate::entities::{journal_entries, journal_entry_details, sea_orm_active_enums::JournalStatus};

use super::account::{balance_as_of, ensure_postable};
use super::error::StoreError;
use super::numbering::insert_numbered;

/// Input for posting a journal entry.
#[derive(Debug, Clone)]
pub struct PostJournalInput {
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Document or line the entry belongs to, if any.
    pub origin: Option<Origin>,
    /// Description.
    pub description: String,
    /// Lines; must balance.
    pub lines: Vec<JournalLine>,
}

/// A journal entry with its lines.
#[derive(Debug, Clone)]
pub struct JournalEntryWithDetails {
    /// The entry header.
    pub entry: journal_entries::Model,
    /// The entry's lines.
    pub details: Vec<journal_entry_details::Model>,
}

impl JournalEntryWithDetails {
    /// Total debit over the lines.
    #[must_use]
    pub fn total_debit(&self) -> Decimal {
        self.details.iter().map(|d| d.debit).sum()
    }

    /// Total credit over the lines.
    #[must_use]
    pub fn total_credit(&self) -> Decimal {
        self.details.iter().map(|d| d.credit).sum()
    }
}

/// Journal repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    numbering: NumberingConfig,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, numbering: NumberingConfig) -> Self {
        Self { db, numbering }
    }

    /// Posts a balanced entry against active leaf accounts.
    ///
    /// # Errors
    ///
    /// Returns a `LedgerError` for unbalanced lines or unusable accounts.
    pub async fn post(&self, input: PostJournalInput) -> Result<JournalEntryWithDetails, StoreError> {
        let txn = self.db.begin().await?;
        let posted = post(&txn, &self.numbering, input).await?;
        txn.commit().await?;
        Ok(posted)
    }

    /// Reverses a posted entry with a counter-entry.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReversed` or `NotPosted` for an entry that cannot be
    /// reversed, and `EntryNotFound` for an unknown id.
    pub async fn reverse(&self, entry_id: Uuid) -> Result<JournalEntryWithDetails, StoreError> {
        let txn = self.db.begin().await?;
        let reversal = reverse(&txn, &self.numbering, entry_id).await?;
        txn.commit().await?;
        Ok(reversal)
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` for an unknown id.
    pub async fn get(&self, entry_id: Uuid) -> Result<JournalEntryWithDetails, StoreError> {
        let entry = journal_entries::Entity::find_by_id(entry_id)
            .one(&self.db)
            .await?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;
        let details = journal_entry_details::Entity::find()
            .filter(journal_entry_details::Column::JournalEntryId.eq(entry_id))
            .order_by_asc(journal_entry_details::Column::Id)
            .all(&self.db)
            .await?;
        Ok(JournalEntryWithDetails { entry, details })
    }

    /// Entries recorded for an origin, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn entries_for(&self, origin: Origin) -> Result<Vec<journal_entries::Model>, StoreError> {
        Ok(journal_entries::Entity::find()
            .filter(journal_entries::Column::OriginType.eq(origin.kind.as_str()))
            .filter(journal_entries::Column::OriginId.eq(origin.id))
            .order_by_asc(journal_entries::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Balance of an account as of a date; see
    /// [`AccountRepository::account_balance_as_of`](super::AccountRepository::account_balance_as_of).
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

    /// Ids of posted or reversed entries whose lines do not balance.
    ///
    /// Always empty on a healthy ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn unbalanced_entries(&self) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<(Uuid, Decimal, Decimal)> = journal_entry_details::Entity::find()
            .select_only()
            .column(journal_entry_details::Column::JournalEntryId)
            .column_as(journal_entry_details::Column::Debit.sum(), "debit")
            .column_as(journal_entry_details::Column::Credit.sum(), "credit")
            .join(
                JoinType::InnerJoin,
                journal_entry_details::Relation::JournalEntries.def(),
            )
            .filter(
                journal_entries::Column::Status
                    .is_in([JournalStatus::Posted, JournalStatus::Reversed]),
            )
            .group_by(journal_entry_details::Column::JournalEntryId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, debit, credit)| debit != credit)
            .map(|(id, _, _)| id)
            .collect())
    }
}

pub(crate) async fn post(
    txn: &DatabaseTransaction,
    numbering: &NumberingConfig,
    input: PostJournalInput,
) -> Result<JournalEntryWithDetails, StoreError> {
    let totals = validate_lines(&input.lines)?;
    let account_ids: Vec<Uuid> = input.lines.iter().map(|l| l.account_id).collect();
    ensure_postable(txn, &account_ids).await?;

    let entry = insert_entry(txn, numbering, &input, None).await?;
    let details = insert_details(txn, entry.id, &input.lines).await?;

    info!(
        journal_number = %entry.journal_number,
        origin = ?input.origin.map(|o| o.to_string()),
        amount = %totals.debit,
        "Journal entry posted"
    );
    Ok(JournalEntryWithDetails { entry, details })
}

pub(crate) async fn reverse(
    txn: &DatabaseTransaction,
    numbering: &NumberingConfig,
    entry_id: Uuid,
) -> Result<JournalEntryWithDetails, StoreError> {
    let original = journal_entries::Entity::find_by_id(entry_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(LedgerError::EntryNotFound(entry_id))?;
    ensure_reversible(entry_id, original.status.into())?;

    let original_lines: Vec<JournalLine> = journal_entry_details::Entity::find()
        .filter(journal_entry_details::Column::JournalEntryId.eq(entry_id))
        .order_by_asc(journal_entry_details::Column::Id)
        .all(txn)
        .await?
        .iter()
        .map(Into::into)
        .collect();

    let lines = reverse_lines(&original_lines);
    validate_lines(&lines)?;

    let origin = match (&original.origin_type, original.origin_id) {
        (Some(kind), Some(id)) => kind
            .parse()
            .ok()
            .map(|kind| Origin::new(kind, id)),
        _ => None,
    };
    let input = PostJournalInput {
        entry_date: original.entry_date,
        origin,
        description: format!("Reversal of {}", original.journal_number),
        lines,
    };

    let reversal = insert_entry(txn, numbering, &input, Some(original.id)).await?;
    let details = insert_details(txn, reversal.id, &input.lines).await?;

    let original_number = original.journal_number.clone();
    let mut active: journal_entries::ActiveModel = original.into();
    active.status = Set(JournalStatus::Reversed);
    active.reversed_by_id = Set(Some(reversal.id));
    active.update(txn).await?;

    info!(
        journal_number = %original_number,
        reversal_number = %reversal.journal_number,
        "Journal entry reversed"
    );
    Ok(JournalEntryWithDetails {
        entry: reversal,
        details,
    })
}

/// Reverses every original entry still posted for `origin`.
pub(crate) async fn reverse_for_origin(
    txn: &DatabaseTransaction,
    numbering: &NumberingConfig,
    origin: Origin,
) -> Result<Vec<JournalEntryWithDetails>, StoreError> {
    let open: Vec<Uuid> = journal_entries::Entity::find()
        .select_only()
        .column(journal_entries::Column::Id)
        .filter(journal_entries::Column::OriginType.eq(origin.kind.as_str()))
        .filter(journal_entries::Column::OriginId.eq(origin.id))
        .filter(journal_entries::Column::Status.eq(JournalStatus::Posted))
        .filter(journal_entries::Column::ReversesId.is_null())
        .order_by_asc(journal_entries::Column::Id)
        .into_tuple()
        .all(txn)
        .await?;

    let mut reversals = Vec::with_capacity(open.len());
    for entry_id in open {
        reversals.push(reverse(txn, numbering, entry_id).await?);
    }
    Ok(reversals)
}

async fn insert_entry(
    txn: &DatabaseTransaction,
    numbering: &NumberingConfig,
    input: &PostJournalInput,
    reverses_id: Option<Uuid>,
) -> Result<journal_entries::Model, StoreError> {
    let id = Uuid::now_v7();
    insert_numbered(
        txn,
        numbering,
        JOURNAL_PREFIX,
        input.entry_date,
        journal_entries::Column::JournalNumber,
        |number| journal_entries::ActiveModel {
            id: Set(id),
            journal_number: Set(number),
            entry_date: Set(input.entry_date),
            origin_type: Set(input.origin.map(|o| o.kind.as_str().to_string())),
            origin_id: Set(input.origin.map(|o| o.id)),
            description: Set(input.description.clone()),
            status: Set(JournalStatus::Posted),
            reversed_by_id: Set(None),
            reverses_id: Set(reverses_id),
            ..Default::default()
        },
    )
    .await
}

async fn insert_details(
    txn: &DatabaseTransaction,
    entry_id: Uuid,
    lines: &[JournalLine],
) -> Result<Vec<journal_entry_details::Model>, StoreError> {
    let mut details = Vec::with_capacity(lines.len());
    for line in lines {
        let detail = journal_entry_details::ActiveModel {
            id: Set(Uuid::now_v7()),
            journal_entry_id: Set(entry_id),
            account_id: Set(line.account_id),
            debit: Set(line.debit),
            credit: Set(line.credit),
            memo: Set(line.memo.clone()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        details.push(detail);
    }
    Ok(details)
}
