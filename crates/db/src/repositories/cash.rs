//! Cash movement repository.
//!
//! Each bank carries an append-only log of movements. Every movement
//! stores the balance right after it in `(movement_date, id)` order, and
//! the bank row stores the balance after the last one. Both are caches of
//! the log: the bank row is locked before either is touched, a back-dated
//! movement shifts the snapshots after it, and `reconcile` checks them
//! against a replay.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, info, warn};
use tradebook_core::cash::{
    CashEntry, CashError, ReconcileReport, ensure_reversible, net_change, reconcile,
};
use tradebook_core::origin::Origin;
use uuid::Uuid;

use crate::entities::{banks, cash_movements, sea_orm_active_enums::BankType};

use super::error::StoreError;

/// Input for creating a bank.
#[derive(Debug, Clone)]
pub struct CreateBankInput {
    /// Display name.
    pub name: String,
    /// Cash box or bank account.
    pub bank_type: BankType,
    /// GL leaf the bank posts to.
    pub account_id: Uuid,
    /// Balance before the first movement.
    pub opening_balance: Decimal,
}

/// Input for recording a cash movement.
#[derive(Debug, Clone)]
pub struct RecordCashInput {
    /// Bank the money moves through.
    pub bank_id: Uuid,
    /// Document the movement belongs to.
    pub origin: Origin,
    /// Movement date.
    pub movement_date: NaiveDate,
    /// Money in.
    pub debit: Decimal,
    /// Money out.
    pub credit: Decimal,
    /// Description.
    pub description: String,
}

/// Cash movement repository.
#[derive(Debug, Clone)]
pub struct CashRepository {
    db: DatabaseConnection,
}

impl CashRepository {
    /// Creates a new cash movement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a bank whose current balance starts at its opening balance.
    ///
    /// # Errors
    ///
    /// Returns a database error, e.g. for an unknown GL account.
    pub async fn create_bank(&self, input: CreateBankInput) -> Result<banks::Model, StoreError> {
        let bank = banks::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            bank_type: Set(input.bank_type),
            account_id: Set(input.account_id),
            opening_balance: Set(input.opening_balance),
            current_balance: Set(input.opening_balance),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(bank)
    }

    /// Gets a bank.
    ///
    /// # Errors
    ///
    /// Returns `BankNotFound` for an unknown id.
    pub async fn bank(&self, bank_id: Uuid) -> Result<banks::Model, StoreError> {
        Ok(banks::Entity::find_by_id(bank_id)
            .one(&self.db)
            .await?
            .ok_or(CashError::BankNotFound(bank_id))?)
    }

    /// Records a movement and updates the running balances.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` unless exactly one side is positive.
    pub async fn record(&self, input: RecordCashInput) -> Result<cash_movements::Model, StoreError> {
        let txn = self.db.begin().await?;
        let movement = record(&txn, input).await?;
        txn.commit().await?;
        Ok(movement)
    }

    /// Reverses a movement with a counter-movement.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReversed` or `ReversalOfReversal`.
    pub async fn reverse_movement(
        &self,
        movement_id: i64,
    ) -> Result<cash_movements::Model, StoreError> {
        let txn = self.db.begin().await?;
        let reversal = reverse_movement(&txn, movement_id).await?;
        txn.commit().await?;
        Ok(reversal)
    }

    /// Balance of a bank at the end of `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `BankNotFound` for an unknown id.
    pub async fn balance_as_of(&self, bank_id: Uuid, as_of: NaiveDate) -> Result<Decimal, StoreError> {
        let bank = self.bank(bank_id).await?;
        let last = cash_movements::Entity::find()
            .select_only()
            .column(cash_movements::Column::Balance)
            .filter(cash_movements::Column::BankId.eq(bank_id))
            .filter(cash_movements::Column::MovementDate.lte(as_of))
            .order_by_desc(cash_movements::Column::MovementDate)
            .order_by_desc(cash_movements::Column::Id)
            .into_tuple::<Decimal>()
            .one(&self.db)
            .await?;
        Ok(last.unwrap_or(bank.opening_balance))
    }

    /// Movements of a bank in log order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn movements(&self, bank_id: Uuid) -> Result<Vec<cash_movements::Model>, StoreError> {
        Ok(ordered_movements(&self.db, bank_id).await?)
    }

    /// Movements recorded for a document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn movements_for(
        &self,
        origin: Origin,
    ) -> Result<Vec<cash_movements::Model>, StoreError> {
        Ok(cash_movements::Entity::find()
            .filter(cash_movements::Column::OriginType.eq(origin.kind.as_str()))
            .filter(cash_movements::Column::OriginId.eq(origin.id))
            .order_by_asc(cash_movements::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Replays a bank's log and reports every cache that disagrees.
    ///
    /// # Errors
    ///
    /// Returns `BankNotFound` for an unknown id.
    pub async fn reconcile(&self, bank_id: Uuid) -> Result<ReconcileReport, StoreError> {
        let bank = self.bank(bank_id).await?;
        let entries: Vec<CashEntry> = ordered_movements(&self.db, bank_id)
            .await?
            .iter()
            .map(Into::into)
            .collect();
        let report = reconcile(bank.opening_balance, &entries, bank.current_balance);
        if !report.is_consistent() {
            warn!(
                bank_id = %bank_id,
                mismatches = report.mismatches.len(),
                drift = %report.drift(),
                "Cash ledger out of sync with its log"
            );
        }
        Ok(report)
    }

    /// Rewrites a bank's snapshots and current balance from the replay.
    ///
    /// Returns the report as it was before the rebuild.
    ///
    /// # Errors
    ///
    /// Returns `BankNotFound` for an unknown id.
    pub async fn rebuild(&self, bank_id: Uuid) -> Result<ReconcileReport, StoreError> {
        let txn = self.db.begin().await?;
        let bank = lock_bank(&txn, bank_id).await?;
        let entries: Vec<CashEntry> = ordered_movements(&txn, bank_id)
            .await?
            .iter()
            .map(Into::into)
            .collect();
        let report = reconcile(bank.opening_balance, &entries, bank.current_balance);

        for snapshot in &report.mismatches {
            cash_movements::Entity::update_many()
                .col_expr(cash_movements::Column::Balance, Expr::value(snapshot.expected))
                .filter(cash_movements::Column::Id.eq(snapshot.movement_id))
                .exec(&txn)
                .await?;
        }
        if report.stored_current != report.expected_current {
            let mut active: banks::ActiveModel = bank.into();
            active.current_balance = Set(report.expected_current);
            active.updated_at = Set(chrono::Utc::now().into());
            active.update(&txn).await?;
        }
        txn.commit().await?;

        info!(
            bank_id = %bank_id,
            rewritten = report.mismatches.len(),
            drift = %report.drift(),
            "Cash ledger rebuilt"
        );
        Ok(report)
    }
}

/// Locks a bank row `FOR UPDATE`.
pub(crate) async fn lock_bank(
    txn: &DatabaseTransaction,
    bank_id: Uuid,
) -> Result<banks::Model, StoreError> {
    Ok(banks::Entity::find_by_id(bank_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(CashError::BankNotFound(bank_id))?)
}

/// Locks several banks in id order.
pub(crate) async fn lock_banks(
    txn: &DatabaseTransaction,
    bank_ids: &[Uuid],
) -> Result<Vec<banks::Model>, StoreError> {
    let mut ids = bank_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut locked = Vec::with_capacity(ids.len());
    for id in ids {
        locked.push(lock_bank(txn, id).await?);
    }
    Ok(locked)
}

pub(crate) async fn record(
    txn: &DatabaseTransaction,
    input: RecordCashInput,
) -> Result<cash_movements::Model, StoreError> {
    insert_movement(txn, input, None).await
}

pub(crate) async fn reverse_movement(
    txn: &DatabaseTransaction,
    movement_id: i64,
) -> Result<cash_movements::Model, StoreError> {
    let movement = cash_movements::Entity::find_by_id(movement_id)
        .one(txn)
        .await?
        .ok_or(CashError::MovementNotFound(movement_id))?;
    lock_bank(txn, movement.bank_id).await?;

    let already_reversed = cash_movements::Entity::find()
        .filter(cash_movements::Column::ReversesId.eq(movement_id))
        .count(txn)
        .await?
        > 0;
    ensure_reversible(movement_id, movement.reverses_id, already_reversed)?;

    let origin = movement
        .origin_type
        .parse()
        .map(|kind| Origin::new(kind, movement.origin_id))
        .map_err(|_| CashError::MovementNotFound(movement_id))?;

    insert_movement(
        txn,
        RecordCashInput {
            bank_id: movement.bank_id,
            origin,
            movement_date: movement.movement_date,
            debit: movement.credit,
            credit: movement.debit,
            description: format!("Reversal of movement {movement_id}"),
        },
        Some(movement_id),
    )
    .await
}

/// Reverses every movement of `origin` that is neither a reversal nor reversed.
pub(crate) async fn reverse_for_origin(
    txn: &DatabaseTransaction,
    origin: Origin,
) -> Result<Vec<cash_movements::Model>, StoreError> {
    let movements = cash_movements::Entity::find()
        .filter(cash_movements::Column::OriginType.eq(origin.kind.as_str()))
        .filter(cash_movements::Column::OriginId.eq(origin.id))
        .order_by_asc(cash_movements::Column::Id)
        .all(txn)
        .await?;

    let reversed: Vec<i64> = movements.iter().filter_map(|m| m.reverses_id).collect();
    let mut reversals = Vec::new();
    for movement in movements
        .iter()
        .filter(|m| m.reverses_id.is_none() && !reversed.contains(&m.id))
    {
        reversals.push(reverse_movement(txn, movement.id).await?);
    }
    Ok(reversals)
}

async fn insert_movement(
    txn: &DatabaseTransaction,
    input: RecordCashInput,
    reverses_id: Option<i64>,
) -> Result<cash_movements::Model, StoreError> {
    let net = net_change(input.debit, input.credit)?;
    let bank = lock_bank(txn, input.bank_id).await?;

    let prior = cash_movements::Entity::find()
        .select_only()
        .column(cash_movements::Column::Balance)
        .filter(cash_movements::Column::BankId.eq(input.bank_id))
        .filter(cash_movements::Column::MovementDate.lte(input.movement_date))
        .order_by_desc(cash_movements::Column::MovementDate)
        .order_by_desc(cash_movements::Column::Id)
        .into_tuple::<Decimal>()
        .one(txn)
        .await?
        .unwrap_or(bank.opening_balance);

    let movement = cash_movements::ActiveModel {
        bank_id: Set(input.bank_id),
        origin_type: Set(input.origin.kind.as_str().to_string()),
        origin_id: Set(input.origin.id),
        movement_date: Set(input.movement_date),
        debit: Set(input.debit),
        credit: Set(input.credit),
        balance: Set(prior + net),
        description: Set(input.description),
        reverses_id: Set(reverses_id),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let shifted = cash_movements::Entity::update_many()
        .col_expr(
            cash_movements::Column::Balance,
            Expr::col(cash_movements::Column::Balance).add(net),
        )
        .filter(cash_movements::Column::BankId.eq(input.bank_id))
        .filter(cash_movements::Column::MovementDate.gt(input.movement_date))
        .exec(txn)
        .await?
        .rows_affected;
    if shifted > 0 {
        debug!(
            bank_id = %input.bank_id,
            movement_id = movement.id,
            shifted,
            "Back-dated movement shifted later snapshots"
        );
    }

    let new_balance = bank.current_balance + net;
    let mut active: banks::ActiveModel = bank.into();
    active.current_balance = Set(new_balance);
    active.updated_at = Set(chrono::Utc::now().into());
    active.update(txn).await?;

    debug!(
        bank_id = %input.bank_id,
        movement_id = movement.id,
        origin = %input.origin,
        net = %net,
        balance = %movement.balance,
        "Cash movement recorded"
    );
    Ok(movement)
}

async fn ordered_movements<C: sea_orm::ConnectionTrait>(
    conn: &C,
    bank_id: Uuid,
) -> Result<Vec<cash_movements::Model>, sea_orm::DbErr> {
    cash_movements::Entity::find()
        .filter(cash_movements::Column::BankId.eq(bank_id))
        .order_by_asc(cash_movements::Column::MovementDate)
        .order_by_asc(cash_movements::Column::Id)
        .all(conn)
        .await
}
