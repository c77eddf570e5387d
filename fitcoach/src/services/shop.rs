//! Shop service
//!
//! Sells items for points. A purchase debits the points ledger and
//! either creates one unused consumable row per item or, for points
//! packs, credits the bonus straight away.

use crate::config::MAX_PURCHASE_QUANTITY;
use crate::database::{Consumable, PointReason, StoreTx};
use crate::error::{AppError, Result};
use serde::Serialize;

/// Cancels one missed day during decay reconciliation
pub const STREAK_FREEZE: &str = "streak_freeze";
/// Multiplies the experience of the next new record
pub const EXP_BOOST: &str = "double_exp";
/// Credits bonus points on purchase
pub const BONUS_POINTS: &str = "bonus_points";

/// What happens when an item is bought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ItemEffect {
    /// Stored as an unused consumable. At most `max_own` unused at a time.
    Consumable { max_own: i64 },
    /// Credits `points` per unit immediately
    BonusPoints { points: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShopItem {
    pub id: &'static str,
    pub name: &'static str,
    pub price: i64,
    pub effect: ItemEffect,
}

pub const CATALOG: &[ShopItem] = &[
    ShopItem {
        id: STREAK_FREEZE,
        name: "Streak Freeze",
        price: 500,
        effect: ItemEffect::Consumable { max_own: 5 },
    },
    ShopItem {
        id: EXP_BOOST,
        name: "EXP Boost",
        price: 800,
        effect: ItemEffect::Consumable { max_own: 3 },
    },
    ShopItem {
        id: BONUS_POINTS,
        name: "Points Pack",
        price: 300,
        effect: ItemEffect::BonusPoints { points: 500 },
    },
];

pub fn find_item(item_id: &str) -> Option<&'static ShopItem> {
    CATALOG.iter().find(|item| item.id == item_id)
}

/// Completed purchase
#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub item: ShopItem,
    pub quantity: i64,
    pub total_cost: i64,
    /// Points credited by a points pack, 0 otherwise
    pub bonus_points: i64,
    pub remaining_points: i64,
    pub consumables: Vec<Consumable>,
}

#[derive(Clone, Default)]
pub struct ShopService;

impl ShopService {
    pub fn new() -> Self {
        Self
    }

    pub async fn purchase(
        &self,
        tx: &mut StoreTx,
        user_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> Result<Purchase> {
        let item = *find_item(item_id).ok_or_else(|| AppError::UnknownItem(item_id.to_string()))?;

        if !(1..=MAX_PURCHASE_QUANTITY).contains(&quantity) {
            return Err(AppError::Validation(format!(
                "Quantity must be between 1 and {}",
                MAX_PURCHASE_QUANTITY
            )));
        }

        let total_cost = item.price * quantity;
        let available = tx.sum_points(user_id).await?;
        if available < total_cost {
            return Err(AppError::InsufficientPoints {
                required: total_cost,
                available,
            });
        }

        if let ItemEffect::Consumable { max_own } = item.effect {
            let owned = tx.count_available_consumables(user_id, item.id).await?;
            if owned + quantity > max_own {
                return Err(AppError::OwnershipLimit {
                    item_id: item.id.to_string(),
                    max_own,
                });
            }
        }

        tx.append_point_transaction(
            user_id,
            -total_cost,
            PointReason::ShopPurchase,
            &format!("{} x{}", item.id, quantity),
        )
        .await?;

        let mut consumables = Vec::new();
        let mut bonus_points = 0;
        match item.effect {
            ItemEffect::Consumable { .. } => {
                for _ in 0..quantity {
                    consumables.push(tx.insert_consumable(user_id, item.id).await?);
                }
            }
            ItemEffect::BonusPoints { points } => {
                bonus_points = points * quantity;
                tx.append_point_transaction(
                    user_id,
                    bonus_points,
                    PointReason::BonusPack,
                    &format!("{} x{}", item.id, quantity),
                )
                .await?;
            }
        }

        tracing::info!(
            "User {} bought {} x{} for {} points",
            user_id,
            item.id,
            quantity,
            total_cost
        );

        Ok(Purchase {
            item,
            quantity,
            total_cost,
            bonus_points,
            remaining_points: available - total_cost + bonus_points,
            consumables,
        })
    }
}
