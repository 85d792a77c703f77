//! Document number allocation.
//!
//! The next number is read from the highest one already used for the
//! prefix and date, then inserted inside a savepoint. A concurrent writer
//! that took the same number first surfaces as a unique violation; the
//! savepoint is rolled back and the allocation retried after a short
//! random sleep.

use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{debug, warn};
use tradebook_core::lifecycle::{backoff_range, format_number, next_sequence, number_stem};
use tradebook_shared::NumberingConfig;

use super::error::{StoreError, is_unique_violation};

/// Inserts the model produced by `build` under the next free number.
///
/// `number_column` is the entity's unique number column; `build` receives
/// the allocated number and returns the row to insert.
///
/// # Errors
///
/// Returns `StoreError::NumberingExhausted` once `config.max_attempts`
/// collisions have occurred, or a database error from the insert.
pub async fn insert_numbered<A, F>(
    txn: &DatabaseTransaction,
    config: &NumberingConfig,
    prefix: &str,
    date: NaiveDate,
    number_column: <A::Entity as EntityTrait>::Column,
    build: F,
) -> Result<<A::Entity as EntityTrait>::Model, StoreError>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    F: Fn(String) -> A + Send + Sync,
{
    let stem = number_stem(prefix, date);
    let window = backoff_range(config);
    let attempts = config.max_attempts.max(1);

    for attempt in 1..=attempts {
        let existing: Vec<String> = A::Entity::find()
            .select_only()
            .column(number_column)
            .filter(number_column.starts_with(stem.as_str()))
            .into_tuple()
            .all(txn)
            .await?;

        let sequence = next_sequence(existing.iter().map(String::as_str), &stem);
        let number = format_number(prefix, date, sequence);

        let savepoint = txn.begin().await?;
        match build(number.clone()).insert(&savepoint).await {
            Ok(model) => {
                savepoint.commit().await?;
                debug!(number = %number, attempt, "Allocated document number");
                return Ok(model);
            }
            Err(err) if is_unique_violation(&err) => {
                savepoint.rollback().await?;
                let delay_ms = rand::rng().random_range(window.clone());
                warn!(
                    number = %number,
                    attempt,
                    delay_ms,
                    "Document number collision, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(StoreError::NumberingExhausted {
        prefix: prefix.to_string(),
        attempts,
    })
}
