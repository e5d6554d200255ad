use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ProductId, Timestamped};

/// Maximum length of a product code, in characters.
pub const CODE_MAX_LEN: usize = 128;

/// Maximum length of a product name, in characters.
pub const NAME_MAX_LEN: usize = 1024;

/// Catalog product.
///
/// Instances are only built through [`Product::create`], [`Product::edit`] or
/// [`Product::restore`], so a `Product` in memory always carries an uppercased
/// name and a non-blank code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    code: String,
    name: String,
    is_active: bool,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub is_active: bool,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CreateProduct {
    /// Command with the catalog defaults (active, no description).
    pub fn new(code: impl Into<String>, name: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            product_id: ProductId::new(),
            code: code.into(),
            name: name.into(),
            is_active: true,
            description: None,
            occurred_at,
        }
    }
}

/// Command: UpdateProduct.
///
/// `None` leaves a field unchanged. `description: Some("")` clears the
/// description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateProduct {
    /// An edit that changes nothing but still counts as a save.
    pub fn touch(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            ..Self::default()
        }
    }
}

/// Uppercase a product name for storage. Empty names are returned as-is.
pub fn normalize_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    name.to_uppercase()
}

impl Product {
    pub const VERBOSE_NAME: &'static str = "Catalog product";
    pub const VERBOSE_NAME_PLURAL: &'static str = "Catalog products";

    /// Build a new product from a create command.
    ///
    /// Both timestamps are set to `cmd.occurred_at`. Code uniqueness cannot be
    /// checked here; the store enforces it on insert.
    pub fn create(cmd: CreateProduct) -> DomainResult<Self> {
        validate_code(&cmd.code)?;
        let name = normalize_name(&cmd.name);
        validate_name(&name)?;

        Ok(Self {
            id: cmd.product_id,
            code: cmd.code,
            name,
            is_active: cmd.is_active,
            description: normalize_description(cmd.description),
            created_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        })
    }

    /// Apply an edit and return the saved version of the product.
    ///
    /// `self` is left untouched so a rejected edit never leaks partial state.
    /// Every successful edit refreshes `updated_at` and re-normalizes the name.
    pub fn edit(&self, cmd: &UpdateProduct) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(code) = &cmd.code {
            validate_code(code)?;
            next.code = code.clone();
        }
        if let Some(name) = &cmd.name {
            next.name = name.clone();
        }
        if let Some(is_active) = cmd.is_active {
            next.is_active = is_active;
        }
        if let Some(description) = &cmd.description {
            next.description = normalize_description(Some(description.clone()));
        }

        next.name = normalize_name(&next.name);
        validate_name(&next.name)?;
        next.updated_at = cmd.occurred_at;
        Ok(next)
    }

    /// Rebuild a product from storage. Values are trusted as already validated.
    pub fn restore(
        id: ProductId,
        code: String,
        name: String,
        is_active: bool,
        description: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code,
            name,
            is_active,
            description,
            created_at,
            updated_at,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Case-insensitive substring match against name or code (admin search).
    ///
    /// The name is already stored normalized, so the term is normalized the same
    /// way; the code keeps its original case and is compared lowercased.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return true;
        }
        self.name.contains(&normalize_name(term))
            || self.code.to_lowercase().contains(&term.to_lowercase())
    }
}

impl Timestamped for Product {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", Self::VERBOSE_NAME, self.name)
    }
}

fn validate_code(code: &str) -> DomainResult<()> {
    if code.trim().is_empty() {
        return Err(DomainError::field("code", "cannot be empty"));
    }
    if code.chars().count() > CODE_MAX_LEN {
        return Err(DomainError::field(
            "code",
            format!("must be at most {CODE_MAX_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::field("name", "cannot be empty"));
    }
    if name.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::field(
            "name",
            format!("must be at most {NAME_MAX_LEN} characters"),
        ));
    }
    Ok(())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}
