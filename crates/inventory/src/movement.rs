use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, MovementId, ProductId, Timestamped};

/// Largest quantity a single movement may carry (range of a positive integer column).
pub const QUANTITY_MAX: u32 = i32::MAX as u32;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementAction {
    /// Stock out.
    Withdrawal,
    /// Stock in.
    #[default]
    Deposit,
}

impl MovementAction {
    pub const ALL: [MovementAction; 2] = [MovementAction::Withdrawal, MovementAction::Deposit];

    /// Stored tag (`"withdrawal"` / `"deposit"`).
    pub fn as_str(self) -> &'static str {
        match self {
            MovementAction::Withdrawal => "withdrawal",
            MovementAction::Deposit => "deposit",
        }
    }

    /// Human-readable label for admin listings.
    pub fn label(self) -> &'static str {
        match self {
            MovementAction::Withdrawal => "Withdrawal",
            MovementAction::Deposit => "Deposit",
        }
    }
}

impl core::fmt::Display for MovementAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "withdrawal" => Ok(MovementAction::Withdrawal),
            "deposit" => Ok(MovementAction::Deposit),
            other => Err(DomainError::field(
                "action",
                format!("'{other}' is not one of: withdrawal, deposit"),
            )),
        }
    }
}

/// Non-negative movement quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Validate a raw quantity (rejects negatives and values above [`QUANTITY_MAX`]).
    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 0 {
            return Err(DomainError::field("quantity", format!("must be >= 0 (got {value})")));
        }
        if value > i64::from(QUANTITY_MAX) {
            return Err(DomainError::field(
                "quantity",
                format!("must be <= {QUANTITY_MAX} (got {value})"),
            ));
        }
        Ok(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        i64::from(value.0)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A single ledger entry: stock moved in or out for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    id: MovementId,
    product_id: ProductId,
    action: MovementAction,
    quantity: Quantity,
    note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: RecordMovement.
///
/// `action` and `quantity` are raw inputs; `None` selects the defaults
/// (`deposit`, `0`). Standalone and inline writes share this validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub action: Option<String>,
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl RecordMovement {
    pub fn new(
        product_id: ProductId,
        action: MovementAction,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            movement_id: MovementId::new(),
            product_id,
            action: Some(action.as_str().to_string()),
            quantity: Some(quantity),
            note: None,
            occurred_at,
        }
    }
}

/// Command: UpdateMovement. `None` leaves a field unchanged; `note: Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMovement {
    pub product_id: Option<ProductId>,
    pub action: Option<String>,
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateMovement {
    pub fn touch(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            ..Self::default()
        }
    }
}

impl Movement {
    pub const VERBOSE_NAME: &'static str = "Product movement";
    pub const VERBOSE_NAME_PLURAL: &'static str = "Product movements";

    /// Validate a record command and build the movement.
    ///
    /// Whether `cmd.product_id` exists is checked by the store.
    pub fn record(cmd: RecordMovement) -> DomainResult<Self> {
        let action = parse_action(cmd.action.as_deref())?.unwrap_or_default();
        let quantity = parse_quantity(cmd.quantity)?.unwrap_or_default();

        Ok(Self {
            id: cmd.movement_id,
            product_id: cmd.product_id,
            action,
            quantity,
            note: normalize_note(cmd.note),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    /// Apply an edit and return the saved version; `self` is never modified.
    pub fn edit(&self, cmd: &UpdateMovement) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(product_id) = cmd.product_id {
            next.product_id = product_id;
        }
        if let Some(action) = parse_action(cmd.action.as_deref())? {
            next.action = action;
        }
        if let Some(quantity) = parse_quantity(cmd.quantity)? {
            next.quantity = quantity;
        }
        if let Some(note) = &cmd.note {
            next.note = normalize_note(Some(note.clone()));
        }

        next.updated_at = cmd.occurred_at;
        Ok(next)
    }

    /// Rebuild a movement from storage. Values are trusted as already validated.
    pub fn restore(
        id: MovementId,
        product_id: ProductId,
        action: MovementAction,
        quantity: Quantity,
        note: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            product_id,
            action,
            quantity,
            note,
            created_at,
            updated_at,
        }
    }

    pub fn id_typed(&self) -> MovementId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn action(&self) -> MovementAction {
        self.action
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Signed effect on the warehouse total (`+q` for deposits, `-q` for withdrawals).
    pub fn signed_quantity(&self) -> i64 {
        let q = i64::from(self.quantity);
        match self.action {
            MovementAction::Deposit => q,
            MovementAction::Withdrawal => -q,
        }
    }

    /// One-line summary given the owning product's name.
    pub fn describe(&self, product_name: &str) -> String {
        format!(
            "Movement of {} | {} of {}",
            product_name,
            self.action.label(),
            self.quantity
        )
    }
}

impl Timestamped for Movement {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn parse_action(raw: Option<&str>) -> DomainResult<Option<MovementAction>> {
    raw.map(MovementAction::from_str).transpose()
}

fn parse_quantity(raw: Option<i64>) -> DomainResult<Option<Quantity>> {
    raw.map(Quantity::new).transpose()
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.filter(|n| !n.trim().is_empty())
}
