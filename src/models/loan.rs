//! Loan model, due date computation and related types

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::{LoanStatus, PersonType, ResourceType, ReturnCondition};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub person_id: Uuid,
    pub resource_id: Uuid,
    pub quantity: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub renewals_count: i32,
    pub return_condition: Option<ReturnCondition>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date < now
    }
}

/// Loan joined with borrower and resource for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoanDetails {
    pub id: Uuid,
    pub person_id: Uuid,
    pub person_name: String,
    pub person_type: PersonType,
    pub resource_id: Uuid,
    pub resource_title: String,
    pub resource_type: ResourceType,
    pub quantity: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub renewals_count: i32,
    pub return_condition: Option<ReturnCondition>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    #[sqlx(default)]
    pub is_overdue: bool,
}

/// Create loan request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoan {
    pub person_id: Uuid,
    pub resource_id: Uuid,
    #[validate(range(min = 1, max = 20, message = "Quantity must be between 1 and 20"))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

/// Return loan request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReturnLoan {
    #[serde(default)]
    pub condition: ReturnCondition,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Loan list query
#[derive(Debug, Default, Deserialize)]
pub struct LoanQuery {
    pub person_id: Option<Uuid>,
    pub resource_id: Option<Uuid>,
    pub status: Option<LoanStatus>,
    /// Only open loans past their due date
    pub overdue: Option<bool>,
    /// Loan date lower bound (inclusive)
    pub from: Option<DateTime<Utc>>,
    /// Loan date upper bound (exclusive)
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Move a date landing on Saturday or Sunday to the following Monday
pub fn skip_weekend(date: DateTime<Utc>) -> DateTime<Utc> {
    match date.weekday() {
        Weekday::Sat => date + Duration::days(2),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Due date `days` after `from`, optionally moved off weekends
pub fn due_date_after(from: DateTime<Utc>, days: i32, skip_weekends: bool) -> DateTime<Utc> {
    let due = from + Duration::days(days as i64);
    if skip_weekends {
        skip_weekend(due)
    } else {
        due
    }
}

/// Whole days elapsed since `due_date`, zero when not yet due
pub fn days_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_date).num_days().max(0)
}

/// Result of the overdue refresh command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueRefresh {
    pub flagged: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_due_date_skips_weekend() {
        // 2024-03-01 is a Friday; 15 days later is Saturday 16th
        let due = due_date_after(at(2024, 3, 1), 15, true);
        assert_eq!(due, at(2024, 3, 18));
        assert_eq!(due.weekday(), Weekday::Mon);

        // 16 days later is Sunday 17th
        assert_eq!(due_date_after(at(2024, 3, 1), 16, true), at(2024, 3, 18));
    }

    #[test]
    fn test_due_date_without_skipping() {
        assert_eq!(due_date_after(at(2024, 3, 1), 15, false), at(2024, 3, 16));
        // Weekdays are left alone
        assert_eq!(due_date_after(at(2024, 3, 1), 14, true), at(2024, 3, 15));
    }

    #[test]
    fn test_days_overdue() {
        assert_eq!(days_overdue(at(2024, 3, 1), at(2024, 3, 11)), 10);
        assert_eq!(days_overdue(at(2024, 3, 11), at(2024, 3, 1)), 0);
    }

    #[test]
    fn test_overdue_only_when_open() {
        let mut loan = Loan {
            id: Uuid::new_v4(),
            person_id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            quantity: 1,
            loan_date: at(2024, 3, 1),
            due_date: at(2024, 3, 15),
            returned_date: None,
            status: LoanStatus::Active,
            renewals_count: 0,
            return_condition: None,
            notes: None,
            created_by: None,
            created_at: at(2024, 3, 1),
            updated_at: at(2024, 3, 1),
        };
        assert!(loan.is_overdue_at(at(2024, 3, 20)));
        assert!(!loan.is_overdue_at(at(2024, 3, 10)));

        loan.status = LoanStatus::Returned;
        assert!(!loan.is_overdue_at(at(2024, 3, 20)));
    }

    #[test]
    fn test_create_loan_defaults_quantity() {
        let request: CreateLoan = serde_json::from_value(serde_json::json!({
            "person_id": Uuid::new_v4(),
            "resource_id": Uuid::new_v4(),
        }))
        .unwrap();
        assert_eq!(request.quantity, 1);
        assert!(request.validate().is_ok());
    }
}
