//! Business listing model.
//!
//! # Responsibility
//! - Define the canonical listing record exchanged with callers.
//! - Provide field validation used by the service layer before writes.
//! - Evaluate the date-independent open/close window.
//!
//! # Invariants
//! - `id` (public) and `alias` are unique across all listings.
//! - `price` tier is the character count of `price`, at most 4.
//! - Open window is `open_time < t < close_time` on clock time only.

use crate::model::category::Category;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Maximum character count of `Business::price`.
pub const PRICE_TIER_MAX: usize = 4;
/// Maximum accepted `Business::rating`.
pub const RATING_MAX: i64 = 5;

/// Validation errors for business write input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusinessValidationError {
    #[error("alias must not be empty")]
    EmptyAlias,
    #[error("price `{0}` exceeds {PRICE_TIER_MAX} characters")]
    PriceTooLong(String),
    #[error("rating {0} is outside 0..={RATING_MAX}")]
    RatingOutOfRange(i64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Postal location. `display_address` is persisted as a JSON text blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub address1: String,
    pub address2: String,
    pub address3: String,
    pub city: String,
    pub country: String,
    pub display_address: Vec<String>,
    pub state: String,
    pub zip_code: String,
}

/// Directory listing record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Business {
    /// Internal storage key. Never serialized.
    #[serde(skip)]
    pub key: Option<i64>,
    pub alias: String,
    pub categories: Vec<Category>,
    pub coordinates: Coordinates,
    pub display_phone: String,
    /// Reserved for geo search; always zero.
    pub distance: f64,
    /// Public identifier assigned at creation.
    pub id: String,
    pub image_url: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    /// Computed on read against the local clock. Ignored on write.
    pub is_open: bool,
    pub location: Location,
    pub name: String,
    pub phone: String,
    pub price: String,
    pub rating: i64,
    pub review_count: i64,
    pub transactions: Vec<String>,
    pub attributes: Vec<String>,
    pub url: String,
    /// Epoch milliseconds, maintained by storage.
    #[serde(skip)]
    pub created_at: Option<i64>,
    /// Epoch milliseconds, maintained by storage.
    #[serde(skip)]
    pub updated_at: Option<i64>,
}

impl Business {
    /// Creates a listing with the given alias and all other fields empty.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Self::default()
        }
    }

    /// Validates create input.
    pub fn validate(&self) -> Result<(), BusinessValidationError> {
        if self.alias.trim().is_empty() {
            return Err(BusinessValidationError::EmptyAlias);
        }
        self.validate_scalars()
    }

    /// Validates update input. An empty alias means "keep the stored alias";
    /// a whitespace-only alias is still rejected.
    pub fn validate_update(&self) -> Result<(), BusinessValidationError> {
        if !self.alias.is_empty() && self.alias.trim().is_empty() {
            return Err(BusinessValidationError::EmptyAlias);
        }
        self.validate_scalars()
    }

    fn validate_scalars(&self) -> Result<(), BusinessValidationError> {
        if self.price_tier() > PRICE_TIER_MAX {
            return Err(BusinessValidationError::PriceTooLong(self.price.clone()));
        }
        if !(0..=RATING_MAX).contains(&self.rating) {
            return Err(BusinessValidationError::RatingOutOfRange(self.rating));
        }
        Ok(())
    }

    /// Price tier, i.e. the character count of `price`.
    pub fn price_tier(&self) -> usize {
        self.price.chars().count()
    }

    /// Aliases of the requested categories, in request order.
    pub fn category_aliases(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|category| category.alias.clone())
            .collect()
    }

    /// Returns whether `time_of_day` falls strictly inside the open window.
    ///
    /// Windows where `close_time <= open_time` never match.
    pub fn is_open_at(&self, time_of_day: NaiveTime) -> bool {
        self.open_time < time_of_day && time_of_day < self.close_time
    }
}
