// # Product Record
//
// The entity subject to periodic synchronization.
//
// Products are created through `Product::create`, which validates the
// caller's input. After that the sync workflow only ever mutates price,
// description and `updated_at`; it never deletes a product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Price;
use crate::error::Result;
use crate::validation::validate_new_product;

/// Opaque unique product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Generate a new random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProductId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Caller-supplied fields for a new product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Price) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A product record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub created_at: DateTime<Utc>,
    /// `None` until the first sync pass or edit touches the record
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Validate `new` and build a product with a fresh id
    pub fn create(new: NewProduct) -> Result<Self> {
        validate_new_product(&new)?;

        Ok(Self {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            price: new.price,
            created_at: Utc::now(),
            updated_at: None,
        })
    }

    /// Whether this record is eligible for a sync pass
    ///
    /// A record is stale when it was never updated or when its last update
    /// is strictly older than `cutoff`.
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        match self.updated_at {
            None => true,
            Some(updated_at) => updated_at < cutoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn product(updated_at: Option<DateTime<Utc>>) -> Product {
        let mut p = Product::create(NewProduct::new("Widget", Price::new(12, 0))).unwrap();
        p.updated_at = updated_at;
        p
    }

    #[test]
    fn create_rejects_invalid_input() {
        let err = Product::create(NewProduct::new("", Price::ZERO)).unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }

    #[test]
    fn never_updated_is_stale() {
        assert!(product(None).is_stale(Utc::now()));
    }

    #[test]
    fn staleness_is_strict() {
        let cutoff = Utc::now() - Duration::hours(1);
        assert!(product(Some(cutoff - Duration::seconds(1))).is_stale(cutoff));
        assert!(!product(Some(cutoff)).is_stale(cutoff));
        assert!(!product(Some(cutoff + Duration::minutes(5))).is_stale(cutoff));
    }

    #[test]
    fn id_round_trips_through_string() {
        let id: ProductId = "11111111-1111-1111-1111-111111111111".parse().unwrap();
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
    }
}
