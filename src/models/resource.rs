//! Resource (library item) model and stock counter arithmetic

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::enums::{ResourceCondition, ResourceType, ReturnCondition};
use crate::error::{AppError, AppResult};

/// ISBN-10 or ISBN-13, dashes and spaces allowed
static ISBN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d[\d -]{8,15}[\dXx])$").expect("valid regex"));

/// Per-resource unit counters.
///
/// `current_loans + lost + damaged` units are committed; the rest are
/// available for new loans. Every mutation checks its precondition first
/// and leaves the counters untouched on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockCounters {
    pub total: i32,
    pub current_loans: i32,
    pub lost: i32,
    pub damaged: i32,
}

impl StockCounters {
    pub fn new(total: i32) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn committed(&self) -> i32 {
        self.current_loans + self.lost + self.damaged
    }

    pub fn available(&self) -> i32 {
        (self.total - self.committed()).max(0)
    }

    pub fn is_consistent(&self) -> bool {
        self.total >= 0
            && self.current_loans >= 0
            && self.lost >= 0
            && self.damaged >= 0
            && self.committed() <= self.total
    }

    fn require_positive(quantity: i32) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::Validation("Quantity must be at least 1".to_string()));
        }
        Ok(())
    }

    fn require_available(&self, quantity: i32) -> AppResult<()> {
        Self::require_positive(quantity)?;
        if self.available() < quantity {
            return Err(AppError::BusinessRule(format!(
                "Not enough units available ({} requested, {} available)",
                quantity,
                self.available()
            )));
        }
        Ok(())
    }

    fn require_loaned(&self, quantity: i32) -> AppResult<()> {
        Self::require_positive(quantity)?;
        if self.current_loans < quantity {
            return Err(AppError::BusinessRule(format!(
                "Loan counter would go negative ({} loaned, {} requested)",
                self.current_loans, quantity
            )));
        }
        Ok(())
    }

    /// Units leave the shelf on a new loan
    pub fn checkout(&mut self, quantity: i32) -> AppResult<()> {
        self.require_available(quantity)?;
        self.current_loans += quantity;
        Ok(())
    }

    /// Units come back; damaged ones are set aside
    pub fn checkin(&mut self, quantity: i32, condition: ReturnCondition) -> AppResult<()> {
        self.require_loaned(quantity)?;
        self.current_loans -= quantity;
        if condition == ReturnCondition::Damaged {
            self.damaged += quantity;
        }
        Ok(())
    }

    /// Loaned units are declared lost
    pub fn mark_lost(&mut self, quantity: i32) -> AppResult<()> {
        self.require_loaned(quantity)?;
        self.current_loans -= quantity;
        self.lost += quantity;
        Ok(())
    }

    pub fn apply(&mut self, adjustment: StockAdjustment) -> AppResult<()> {
        let quantity = adjustment.quantity;
        match adjustment.kind {
            StockAdjustmentKind::AddUnits => {
                Self::require_positive(quantity)?;
                self.total += quantity;
            }
            StockAdjustmentKind::RemoveUnits => {
                self.require_available(quantity)?;
                self.total -= quantity;
            }
            StockAdjustmentKind::MarkDamaged => {
                self.require_available(quantity)?;
                self.damaged += quantity;
            }
            StockAdjustmentKind::RepairDamaged => {
                Self::require_positive(quantity)?;
                if self.damaged < quantity {
                    return Err(AppError::BusinessRule(format!(
                        "Only {} damaged units to repair",
                        self.damaged
                    )));
                }
                self.damaged -= quantity;
            }
            StockAdjustmentKind::WriteOffDamaged => {
                Self::require_positive(quantity)?;
                if self.damaged < quantity {
                    return Err(AppError::BusinessRule(format!(
                        "Only {} damaged units to write off",
                        self.damaged
                    )));
                }
                self.damaged -= quantity;
                self.total -= quantity;
            }
            StockAdjustmentKind::RecoverLost => {
                Self::require_positive(quantity)?;
                if self.lost < quantity {
                    return Err(AppError::BusinessRule(format!(
                        "Only {} lost units to recover",
                        self.lost
                    )));
                }
                self.lost -= quantity;
            }
        }
        Ok(())
    }

    /// Replace the total, keeping every committed unit accounted for
    pub fn set_total(&mut self, total: i32) -> AppResult<()> {
        if total < 0 {
            return Err(AppError::Validation("Total quantity cannot be negative".to_string()));
        }
        if total < self.committed() {
            return Err(AppError::BusinessRule(format!(
                "Total quantity {} is below the {} units loaned, lost or damaged",
                total,
                self.committed()
            )));
        }
        self.total = total;
        Ok(())
    }

    /// Loan counter recomputed from open loans, clamped into the invariant
    pub fn synced_loans(&self, open_loan_units: i64) -> i32 {
        let ceiling = (self.total - self.lost - self.damaged).max(0);
        open_loan_units.clamp(0, ceiling as i64) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustmentKind {
    AddUnits,
    RemoveUnits,
    MarkDamaged,
    RepairDamaged,
    WriteOffDamaged,
    RecoverLost,
}

/// Manual stock change request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct StockAdjustment {
    pub kind: StockAdjustmentKind,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

/// Resource row, with available units derived in SQL
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub resource_type: ResourceType,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub condition: ResourceCondition,
    pub active: bool,
    pub total_quantity: i32,
    pub current_loans_count: i32,
    pub lost_quantity: i32,
    pub damaged_quantity: i32,
    pub available_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn counters(&self) -> StockCounters {
        StockCounters {
            total: self.total_quantity,
            current_loans: self.current_loans_count,
            lost: self.lost_quantity,
            damaged: self.damaged_quantity,
        }
    }
}

/// Resource list query
#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub resource_type: Option<ResourceType>,
    pub category: Option<String>,
    pub condition: Option<ResourceCondition>,
    pub active: Option<bool>,
    /// Only resources with at least one unit on the shelf
    pub available_only: Option<bool>,
    /// Free text over title, author and ISBN
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

fn validate_publication_year(year: i32) -> Result<(), ValidationError> {
    let max = chrono::Datelike::year(&Utc::now()) + 1;
    if (1400..=max).contains(&year) {
        Ok(())
    } else {
        Err(ValidationError::new("publication_year"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResource {
    pub resource_type: ResourceType,
    #[validate(length(min = 1, max = 300, message = "Title is required"))]
    pub title: String,
    pub author: Option<String>,
    #[validate(regex(path = *ISBN_RE, message = "Invalid ISBN"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[validate(custom(function = "validate_publication_year", message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub condition: ResourceCondition,
    #[validate(range(min = 0, max = 10000, message = "Total quantity must be between 0 and 10000"))]
    #[serde(default = "default_quantity")]
    pub total_quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateResource {
    pub resource_type: Option<ResourceType>,
    #[validate(length(min = 1, max = 300, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    #[validate(regex(path = *ISBN_RE, message = "Invalid ISBN"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    #[validate(custom(function = "validate_publication_year", message = "Invalid publication year"))]
    pub publication_year: Option<i32>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub condition: Option<ResourceCondition>,
    pub active: Option<bool>,
    #[validate(range(min = 0, max = 10000, message = "Total quantity must be between 0 and 10000"))]
    pub total_quantity: Option<i32>,
}

impl UpdateResource {
    pub fn touches_search_key(&self) -> bool {
        self.title.is_some() || self.author.is_some() || self.isbn.is_some()
    }
}

/// Normalize an ISBN for storage: digits and a trailing X only
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Availability answer for a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    pub resource_id: Uuid,
    pub title: String,
    pub active: bool,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub is_available: bool,
}

impl From<&Resource> for Availability {
    fn from(resource: &Resource) -> Self {
        Self {
            resource_id: resource.id,
            title: resource.title.clone(),
            active: resource.active,
            total_quantity: resource.total_quantity,
            available_quantity: resource.available_quantity,
            is_available: resource.active && resource.available_quantity > 0,
        }
    }
}

/// One resource whose loan counter was repaired by the stock sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRepair {
    pub resource_id: Uuid,
    pub title: String,
    pub previous_loans_count: i32,
    pub synced_loans_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSyncReport {
    pub checked: usize,
    pub repaired: Vec<StockRepair>,
}
