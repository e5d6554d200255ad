//! Inventory domain module.
//!
//! Stock movements recorded against catalog products and the warehouse total
//! derived from them. Pure domain logic (no IO, no HTTP, no storage).

pub mod movement;
pub mod warehouse;

pub use movement::{
    Movement, MovementAction, Quantity, RecordMovement, UpdateMovement, QUANTITY_MAX,
};
pub use stockroom_core::MovementId;
pub use warehouse::{warehouse_total, StockLevel, StockStyle};
