//! Cost layer repository.
//!
//! Persists the FIFO engine's decisions: layers are stored as
//! `stock_movements` rows, draws as `fifo_mappings`. Layers are locked
//! `FOR UPDATE` before they are drawn from or restored, so two
//! transactions consuming the same item serialize on its layers.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info, warn};
use tradebook_core::fifo::{
    CostLayer, FifoAllocation, FifoError, LayerValuation, allocate, ensure_untouched,
    restored_remaining, valuate,
};
use tradebook_core::origin::{Origin, OriginKind};
use tradebook_shared::{ShortfallCostPolicy, round_quantity};
use uuid::Uuid;

use crate::entities::{fifo_mappings, stock_movements};

use super::error::StoreError;
use super::item::{lock_items, shift_stock};

/// Cost layer repository.
#[derive(Debug, Clone)]
pub struct FifoRepository {
    db: DatabaseConnection,
    policy: ShortfallCostPolicy,
}

impl FifoRepository {
    /// Creates a new cost layer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, policy: ShortfallCostPolicy) -> Self {
        Self { db, policy }
    }

    /// Inserts a new layer for `origin`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` or `InvalidUnitCost` for bad input.
    pub async fn receive(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        movement_date: NaiveDate,
        origin: Origin,
    ) -> Result<stock_movements::Model, StoreError> {
        let txn = self.db.begin().await?;
        let layer = receive(&txn, item_id, quantity, unit_cost, movement_date, origin).await?;
        txn.commit().await?;
        Ok(layer)
    }

    /// Draws `quantity` of an item oldest-first as of `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` for a non-positive quantity.
    pub async fn consume(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        as_of: NaiveDate,
        origin: Origin,
    ) -> Result<FifoAllocation, StoreError> {
        let txn = self.db.begin().await?;
        let allocation = consume(&txn, item_id, quantity, as_of, origin, self.policy).await?;
        txn.commit().await?;
        Ok(allocation)
    }

    /// Puts back everything `origin` drew and deletes its mappings.
    ///
    /// # Errors
    ///
    /// Returns `RestoreExceedsReceipt` if a layer would overflow.
    pub async fn restore(&self, origin: Origin) -> Result<Vec<fifo_mappings::Model>, StoreError> {
        let txn = self.db.begin().await?;
        let restored = restore(&txn, origin).await?;
        txn.commit().await?;
        Ok(restored)
    }

    /// Deletes the layers `origin` created.
    ///
    /// # Errors
    ///
    /// Returns `LayerAlreadyConsumed` if any of them was drawn from.
    pub async fn revoke_receipt(
        &self,
        origin: Origin,
    ) -> Result<Vec<stock_movements::Model>, StoreError> {
        let txn = self.db.begin().await?;
        let revoked = revoke_receipt(&txn, origin).await?;
        txn.commit().await?;
        Ok(revoked)
    }

    /// Records an opening balance: a layer plus the matching nominal stock.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item, or the layer validation errors.
    pub async fn opening_balance(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        movement_date: NaiveDate,
    ) -> Result<stock_movements::Model, StoreError> {
        let txn = self.db.begin().await?;
        let items = lock_items(&txn, &[item_id]).await?;
        let origin = Origin::new(OriginKind::OpeningBalance, Uuid::new_v4());
        let layer = receive(&txn, item_id, quantity, unit_cost, movement_date, origin).await?;
        if let Some(item) = items.get(&item_id) {
            shift_stock(&txn, item, quantity).await?;
        }
        txn.commit().await?;

        info!(
            item_id = %item_id,
            quantity = %quantity,
            unit_cost = %unit_cost,
            "Opening balance recorded"
        );
        Ok(layer)
    }

    /// Open layers of an item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn layers(&self, item_id: Uuid) -> Result<Vec<stock_movements::Model>, StoreError> {
        Ok(stock_movements::Entity::find()
            .filter(stock_movements::Column::ItemId.eq(item_id))
            .filter(stock_movements::Column::RemainingQuantity.gt(Decimal::ZERO))
            .order_by_asc(stock_movements::Column::MovementDate)
            .order_by_asc(stock_movements::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Quantity, value and average cost of an item's open layers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn valuation(&self, item_id: Uuid) -> Result<LayerValuation, StoreError> {
        let layers: Vec<CostLayer> = self.layers(item_id).await?.iter().map(Into::into).collect();
        Ok(valuate(&layers))
    }

    /// Draws recorded for a consuming line.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mappings_for(
        &self,
        origin: Origin,
    ) -> Result<Vec<fifo_mappings::Model>, StoreError> {
        Ok(fifo_mappings::Entity::find()
            .filter(fifo_mappings::Column::OriginType.eq(origin.kind.as_str()))
            .filter(fifo_mappings::Column::OriginId.eq(origin.id))
            .order_by_asc(fifo_mappings::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}

pub(crate) async fn receive(
    txn: &DatabaseTransaction,
    item_id: Uuid,
    quantity: Decimal,
    unit_cost: Decimal,
    movement_date: NaiveDate,
    origin: Origin,
) -> Result<stock_movements::Model, StoreError> {
    if quantity <= Decimal::ZERO || round_quantity(quantity) != quantity {
        return Err(FifoError::InvalidQuantity(quantity).into());
    }
    if unit_cost < Decimal::ZERO {
        return Err(FifoError::InvalidUnitCost(unit_cost).into());
    }

    let layer = stock_movements::ActiveModel {
        item_id: Set(item_id),
        quantity: Set(quantity),
        unit_cost: Set(unit_cost),
        remaining_quantity: Set(quantity),
        movement_date: Set(movement_date),
        origin_type: Set(origin.kind.as_str().to_string()),
        origin_id: Set(origin.id),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    debug!(layer_id = layer.id, item_id = %item_id, %origin, "Layer received");
    Ok(layer)
}

pub(crate) async fn consume(
    txn: &DatabaseTransaction,
    item_id: Uuid,
    quantity: Decimal,
    as_of: NaiveDate,
    origin: Origin,
    policy: ShortfallCostPolicy,
) -> Result<FifoAllocation, StoreError> {
    let rows = stock_movements::Entity::find()
        .filter(stock_movements::Column::ItemId.eq(item_id))
        .filter(stock_movements::Column::RemainingQuantity.gt(Decimal::ZERO))
        .filter(stock_movements::Column::MovementDate.lte(as_of))
        .order_by_asc(stock_movements::Column::MovementDate)
        .order_by_asc(stock_movements::Column::Id)
        .lock_exclusive()
        .all(txn)
        .await?;

    let last_known_cost = stock_movements::Entity::find()
        .select_only()
        .column(stock_movements::Column::UnitCost)
        .filter(stock_movements::Column::ItemId.eq(item_id))
        .filter(stock_movements::Column::MovementDate.lte(as_of))
        .order_by_desc(stock_movements::Column::MovementDate)
        .order_by_desc(stock_movements::Column::Id)
        .into_tuple::<Decimal>()
        .one(txn)
        .await?;

    let layers: Vec<CostLayer> = rows.iter().map(Into::into).collect();
    let allocation = allocate(&layers, quantity, policy, last_known_cost)?;
    let by_id: HashMap<i64, &stock_movements::Model> = rows.iter().map(|r| (r.id, r)).collect();

    for line in &allocation.lines {
        if let Some(layer) = line.layer_id.and_then(|id| by_id.get(&id)) {
            let mut active: stock_movements::ActiveModel = (*layer).clone().into();
            active.remaining_quantity = Set(layer.remaining_quantity - line.quantity);
            active.update(txn).await?;
        }

        fifo_mappings::ActiveModel {
            id: Set(Uuid::new_v4()),
            origin_type: Set(origin.kind.as_str().to_string()),
            origin_id: Set(origin.id),
            item_id: Set(item_id),
            stock_movement_id: Set(line.layer_id),
            quantity_consumed: Set(line.quantity),
            unit_cost: Set(line.unit_cost),
            total_cost: Set(line.total_cost),
            is_estimated: Set(line.is_estimated),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }

    if allocation.is_estimated() {
        warn!(
            item_id = %item_id,
            %origin,
            shortfall = %allocation.shortfall_quantity(),
            policy = policy.as_str(),
            "Consumption exceeds available layers, cost estimated"
        );
    }
    debug!(
        item_id = %item_id,
        %origin,
        quantity = %quantity,
        total_cost = %allocation.total_cost,
        "Layers consumed"
    );
    Ok(allocation)
}

pub(crate) async fn restore(
    txn: &DatabaseTransaction,
    origin: Origin,
) -> Result<Vec<fifo_mappings::Model>, StoreError> {
    let mappings = fifo_mappings::Entity::find()
        .filter(fifo_mappings::Column::OriginType.eq(origin.kind.as_str()))
        .filter(fifo_mappings::Column::OriginId.eq(origin.id))
        .all(txn)
        .await?;

    let mut put_back: HashMap<i64, Decimal> = HashMap::new();
    for mapping in &mappings {
        if let Some(layer_id) = mapping.stock_movement_id {
            *put_back.entry(layer_id).or_default() += mapping.quantity_consumed;
        }
    }

    if !put_back.is_empty() {
        let layers = stock_movements::Entity::find()
            .filter(stock_movements::Column::Id.is_in(put_back.keys().copied()))
            .order_by_asc(stock_movements::Column::Id)
            .lock_exclusive()
            .all(txn)
            .await?;

        for layer in layers {
            let restore = put_back.get(&layer.id).copied().unwrap_or_default();
            let remaining = restored_remaining(&CostLayer::from(&layer), restore)?;
            let mut active: stock_movements::ActiveModel = layer.into();
            active.remaining_quantity = Set(remaining);
            active.update(txn).await?;
        }
    }

    fifo_mappings::Entity::delete_many()
        .filter(fifo_mappings::Column::OriginType.eq(origin.kind.as_str()))
        .filter(fifo_mappings::Column::OriginId.eq(origin.id))
        .exec(txn)
        .await?;

    debug!(%origin, mappings = mappings.len(), "Layers restored");
    Ok(mappings)
}

pub(crate) async fn revoke_receipt(
    txn: &DatabaseTransaction,
    origin: Origin,
) -> Result<Vec<stock_movements::Model>, StoreError> {
    let layers = stock_movements::Entity::find()
        .filter(stock_movements::Column::OriginType.eq(origin.kind.as_str()))
        .filter(stock_movements::Column::OriginId.eq(origin.id))
        .lock_exclusive()
        .all(txn)
        .await?;

    let views: Vec<CostLayer> = layers.iter().map(Into::into).collect();
    ensure_untouched(&views)?;

    stock_movements::Entity::delete_many()
        .filter(stock_movements::Column::Id.is_in(layers.iter().map(|l| l.id)))
        .exec(txn)
        .await?;

    debug!(%origin, layers = layers.len(), "Receipt revoked");
    Ok(layers)
}
