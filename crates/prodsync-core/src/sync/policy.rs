//! Business rules applied to each record during a sync pass

use chrono::{DateTime, Utc};

use crate::model::{Price, Product};

/// Prices strictly below this are adjusted
pub const PRICE_ADJUSTMENT_THRESHOLD: Price = Price::new(10, 0);

/// Percentage added to prices below the threshold
pub const PRICE_ADJUSTMENT_PERCENT: u32 = 5;

/// What a policy application changed, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolicyOutcome {
    /// `(old, new)` when the price was adjusted
    pub price_change: Option<(Price, Price)>,
    /// Whether the description lost leading/trailing whitespace
    pub description_trimmed: bool,
}

/// Deterministic per-record transformation
///
/// Rules, in order:
/// 1. price below [`PRICE_ADJUSTMENT_THRESHOLD`] grows by
///    [`PRICE_ADJUSTMENT_PERCENT`], rounded half away from zero to cents
/// 2. a non-empty description is trimmed
/// 3. `updated_at` is set to `now`
///
/// Applying the policy cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncPolicy;

impl SyncPolicy {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) -> PolicyOutcome {
        let mut outcome = PolicyOutcome::default();

        if product.price < PRICE_ADJUSTMENT_THRESHOLD {
            let old = product.price;
            let new = old.increase_by_percent(PRICE_ADJUSTMENT_PERCENT);
            // Negative prices are clamped; a sync pass never leaves one behind
            let new = new.max(Price::ZERO);
            product.price = new;
            outcome.price_change = Some((old, new));
        }

        if let Some(description) = product.description.as_mut()
            && !description.is_empty()
        {
            let trimmed = description.trim();
            if trimmed.len() != description.len() {
                *description = trimmed.to_string();
                outcome.description_trimmed = true;
            }
        }

        product.updated_at = Some(now);

        outcome
    }
}
