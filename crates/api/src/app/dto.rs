use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Deserializer};

use stockroom_core::{MovementId, ProductId, Timestamped};
use stockroom_infra::service::{InlineMovementEdit, ProductDetail, ProductSummary};
use stockroom_infra::store::MovementFilter;
use stockroom_inventory::{Movement, MovementAction, RecordMovement, StockLevel, StockStyle, UpdateMovement};
use stockroom_products::{CreateProduct, Product, UpdateProduct};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

fn default_true() -> bool {
    true
}

/// Keeps an explicit `null` apart from an absent field: absent is `None`,
/// `null` is `Some(None)`. Edits use it so `null` clears a text field.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Edit semantics for a nullable text field: absent leaves it unchanged,
/// `null` or `""` clears it.
fn text_edit(field: Option<Option<String>>) -> Option<String> {
    field.map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub description: Option<String>,
}

impl CreateProductRequest {
    pub fn into_command(self) -> CreateProduct {
        let mut cmd = CreateProduct::new(self.code, self.name, Utc::now());
        cmd.is_active = self.is_active;
        cmd.description = self.description;
        cmd
    }
}

/// Product edit form. When `movements` is present the product and its inline
/// rows are saved together. `"description": null` clears the description.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub movements: Option<Vec<InlineMovementRequest>>,
}

impl UpdateProductRequest {
    pub fn into_parts(
        self,
    ) -> Result<(UpdateProduct, Option<Vec<InlineMovementEdit>>), axum::response::Response> {
        let cmd = UpdateProduct {
            code: self.code,
            name: self.name,
            is_active: self.is_active,
            description: text_edit(self.description),
            occurred_at: Utc::now(),
        };
        let edits = self
            .movements
            .map(|rows| {
                rows.into_iter()
                    .map(InlineMovementRequest::into_edit)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok((cmd, edits))
    }
}

/// One inline movement row: no `id` adds, `id` changes, `id` + `delete` removes.
#[derive(Debug, Deserialize)]
pub struct InlineMovementRequest {
    pub id: Option<String>,
    pub action: Option<String>,
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
    #[serde(default)]
    pub delete: bool,
}

impl InlineMovementRequest {
    pub fn into_edit(self) -> Result<InlineMovementEdit, axum::response::Response> {
        let id = match self.id.as_deref() {
            Some(raw) => Some(errors::parse_id::<MovementId>(raw, "movement")?),
            None => None,
        };
        match (id, self.delete) {
            (Some(id), true) => Ok(InlineMovementEdit::Remove { id }),
            (Some(id), false) => Ok(InlineMovementEdit::Change {
                id,
                action: self.action,
                quantity: self.quantity,
                note: text_edit(self.note),
            }),
            (None, false) => Ok(InlineMovementEdit::Add {
                action: self.action,
                quantity: self.quantity,
                note: self.note.flatten(),
            }),
            (None, true) => Err(errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "movements: delete requires an id",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordMovementRequest {
    pub product_id: String,
    pub action: Option<String>,
    pub quantity: Option<i64>,
    pub note: Option<String>,
}

impl RecordMovementRequest {
    pub fn into_command(self) -> Result<RecordMovement, axum::response::Response> {
        Ok(RecordMovement {
            movement_id: MovementId::new(),
            product_id: errors::parse_id(&self.product_id, "product")?,
            action: self.action,
            quantity: self.quantity,
            note: self.note,
            occurred_at: Utc::now(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMovementRequest {
    pub product_id: Option<String>,
    pub action: Option<String>,
    pub quantity: Option<i64>,
    /// Absent leaves the note unchanged; `null` or `""` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub note: Option<Option<String>>,
}

impl UpdateMovementRequest {
    pub fn into_command(self) -> Result<UpdateMovement, axum::response::Response> {
        let product_id = match self.product_id.as_deref() {
            Some(raw) => Some(errors::parse_id::<ProductId>(raw, "product")?),
            None => None,
        };
        Ok(UpdateMovement {
            product_id,
            action: self.action,
            quantity: self.quantity,
            note: text_edit(self.note),
            occurred_at: Utc::now(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementListQuery {
    pub product_id: Option<String>,
    pub action: Option<String>,
}

impl MovementListQuery {
    pub fn into_filter(self) -> Result<MovementFilter, axum::response::Response> {
        let mut filter = MovementFilter::default();
        if let Some(raw) = self.product_id.as_deref() {
            filter.product_id = Some(errors::parse_id(raw, "product")?);
        }
        if let Some(raw) = self.action.as_deref() {
            let action = raw.parse::<MovementAction>().map_err(errors::domain_error_to_response)?;
            filter = filter.with_action(action);
        }
        Ok(filter)
    }
}

// -------------------------
// Response mapping
// -------------------------

/// Admin badge for a total: green when stock is on hand, red (sign mirrored)
/// for a shortfall.
pub fn stock_badge_html(stock: StockLevel) -> String {
    format!(
        r#"<strong><span style="color: {}">{}</span></strong>"#,
        stock_color(stock),
        stock.displayed_quantity()
    )
}

fn stock_color(stock: StockLevel) -> &'static str {
    match stock.style() {
        StockStyle::InStock => "green",
        StockStyle::Shortfall => "red",
    }
}

pub fn stock_to_json(stock: StockLevel) -> serde_json::Value {
    serde_json::json!({
        "value": stock.total,
        "display": stock.displayed_quantity(),
        "style": stock.style(),
        "color": stock_color(stock),
        "html": stock_badge_html(stock),
    })
}

pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id_typed().to_string(),
        "code": product.code(),
        "name": product.name(),
        "is_active": product.is_active(),
        "description": product.description(),
        "display": product.to_string(),
        "created_at": product.created_at().to_rfc3339(),
        "updated_at": product.updated_at().to_rfc3339(),
    })
}

/// `product_name` adds the human-readable `display` line when the owner is known.
pub fn movement_to_json(movement: &Movement, product_name: Option<&str>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": movement.id_typed().to_string(),
        "product_id": movement.product_id().to_string(),
        "action": movement.action().as_str(),
        "action_label": movement.action().label(),
        "quantity": i64::from(movement.quantity()),
        "note": movement.note(),
        "created_at": movement.created_at().to_rfc3339(),
        "updated_at": movement.updated_at().to_rfc3339(),
    });
    if let Some(name) = product_name {
        value["display"] = serde_json::Value::String(movement.describe(name));
    }
    value
}

pub fn summary_to_json(summary: &ProductSummary) -> serde_json::Value {
    let mut value = product_to_json(&summary.product);
    value["warehouse_total"] = stock_to_json(summary.stock);
    value
}

pub fn detail_to_json(detail: &ProductDetail) -> serde_json::Value {
    let name = detail.product.name();
    serde_json::json!({
        "product": product_to_json(&detail.product),
        "movements": detail
            .movements
            .iter()
            .map(|m| movement_to_json(m, Some(name)))
            .collect::<Vec<_>>(),
        "warehouse_total": stock_to_json(detail.stock),
        "meta": movement_meta(),
    })
}

pub fn product_meta() -> serde_json::Value {
    serde_json::json!({
        "verbose_name": Product::VERBOSE_NAME,
        "verbose_name_plural": Product::VERBOSE_NAME_PLURAL,
    })
}

pub fn movement_meta() -> serde_json::Value {
    serde_json::json!({
        "verbose_name": Movement::VERBOSE_NAME,
        "verbose_name_plural": Movement::VERBOSE_NAME_PLURAL,
        "actions": MovementAction::ALL
            .iter()
            .map(|a| serde_json::json!({ "value": a.as_str(), "label": a.label() }))
            .collect::<Vec<_>>(),
    })
}
