//! Item repository: just enough master data to carry nominal stock.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::items;

use super::error::StoreError;

/// Item repository.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    db: DatabaseConnection,
}

impl ItemRepository {
    /// Creates a new item repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an item with no stock.
    ///
    /// # Errors
    ///
    /// Returns a database error, e.g. for a duplicate code.
    pub async fn create_item(&self, code: &str, name: &str) -> Result<items::Model, StoreError> {
        let item = items::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            stock: Set(Decimal::ZERO),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(item)
    }

    /// Gets an item by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the item does not exist.
    pub async fn get(&self, item_id: Uuid) -> Result<items::Model, StoreError> {
        items::Entity::find_by_id(item_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found("item", item_id))
    }
}

/// Locks the given items `FOR UPDATE`, keyed by id.
pub(crate) async fn lock_items(
    txn: &DatabaseTransaction,
    item_ids: &[Uuid],
) -> Result<HashMap<Uuid, items::Model>, StoreError> {
    let items: HashMap<Uuid, items::Model> = items::Entity::find()
        .filter(items::Column::Id.is_in(item_ids.iter().copied()))
        .lock_exclusive()
        .all(txn)
        .await?
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    if let Some(missing) = item_ids.iter().find(|id| !items.contains_key(id)) {
        return Err(StoreError::not_found("item", *missing));
    }
    Ok(items)
}

/// Moves an item's nominal stock by `delta`.
pub(crate) async fn shift_stock(
    txn: &DatabaseTransaction,
    item: &items::Model,
    delta: Decimal,
) -> Result<items::Model, StoreError> {
    let mut active: items::ActiveModel = item.clone().into();
    active.stock = Set(item.stock + delta);
    active.updated_at = Set(chrono::Utc::now().into());
    Ok(active.update(txn).await?)
}
