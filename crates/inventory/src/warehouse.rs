//! Warehouse total: stock on hand derived from a product's movements.
//!
//! Nothing here is stored. The total is recomputed from the movement set on
//! every read and is allowed to go negative (withdrawals exceeding deposits).

use serde::{Deserialize, Serialize};

use crate::movement::{Movement, MovementAction};

/// Sum of deposit quantities minus sum of withdrawal quantities.
///
/// Callers pass the movements of a single product.
pub fn warehouse_total<'a, I>(movements: I) -> i64
where
    I: IntoIterator<Item = &'a Movement>,
{
    let (deposits, withdrawals) =
        movements
            .into_iter()
            .fold((0i64, 0i64), |(dep, wd), m| match m.action() {
                MovementAction::Deposit => (dep + i64::from(m.quantity()), wd),
                MovementAction::Withdrawal => (dep, wd + i64::from(m.quantity())),
            });
    deposits - withdrawals
}

/// How a total should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStyle {
    /// Zero or more units on hand.
    InStock,
    /// More withdrawn than deposited.
    Shortfall,
}

/// A computed warehouse total plus the presentation choice keyed off its sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub total: i64,
}

impl StockLevel {
    pub fn new(total: i64) -> Self {
        Self { total }
    }

    pub fn from_movements<'a, I>(movements: I) -> Self
    where
        I: IntoIterator<Item = &'a Movement>,
    {
        Self::new(warehouse_total(movements))
    }

    pub fn is_shortfall(&self) -> bool {
        self.total < 0
    }

    pub fn style(&self) -> StockStyle {
        if self.is_shortfall() {
            StockStyle::Shortfall
        } else {
            StockStyle::InStock
        }
    }

    /// Magnitude shown to the user; negative totals are shown with the sign mirrored.
    pub fn displayed_quantity(&self) -> u64 {
        self.total.unsigned_abs()
    }
}
