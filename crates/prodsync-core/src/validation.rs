//! Input validation for product records
//!
//! Each rule is a plain check that appends a [`FieldError`] when it fails.
//! All rules run, so callers see every problem at once.

use serde::Serialize;
use std::fmt;

use crate::model::{NewProduct, Price};

/// Maximum product name length (characters)
pub const NAME_MAX_LENGTH: usize = 200;

/// Maximum product description length (characters)
pub const DESCRIPTION_MAX_LENGTH: usize = 1000;

/// Smallest price accepted on creation
pub const MIN_PRICE: Price = Price::from_cents(1);

/// Largest price accepted on creation
pub const MAX_PRICE: Price = Price::new(999_999, 99);

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field the rule applies to
    pub field: &'static str,
    /// Stable machine-readable code (e.g. `name_required`)
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

/// All failed rules for one input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, code: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            code,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Codes of all failed rules, in rule order
    pub fn codes(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.code).collect()
    }

    /// `Ok(())` when no rule failed
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {} ({})", e.field, e.message, e.code))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Validate the fields of a product about to be created
pub fn validate_new_product(input: &NewProduct) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    validate_name(&input.name, &mut errors);
    if let Some(description) = &input.description {
        validate_description(description, &mut errors);
    }
    validate_price(input.price, &mut errors);

    errors.into_result()
}

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    if name.trim().is_empty() {
        errors.push("name", "name_required", "Name is required");
    } else if name.chars().count() > NAME_MAX_LENGTH {
        errors.push(
            "name",
            "name_max_length",
            format!("Name must not exceed {NAME_MAX_LENGTH} characters"),
        );
    }
}

fn validate_description(description: &str, errors: &mut ValidationErrors) {
    if description.chars().count() > DESCRIPTION_MAX_LENGTH {
        errors.push(
            "description",
            "description_max_length",
            format!("Description must not exceed {DESCRIPTION_MAX_LENGTH} characters"),
        );
    }
}

fn validate_price(price: Price, errors: &mut ValidationErrors) {
    if price < MIN_PRICE {
        errors.push("price", "price_must_be_positive", "Price must be greater than zero");
    } else if price > MAX_PRICE {
        errors.push(
            "price",
            "price_out_of_range",
            format!("Price must not exceed {MAX_PRICE}"),
        );
    }
}
