//! Library-wide loan policy stored as a single row

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::PersonType;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SystemConfig {
    pub institution_name: String,
    pub loan_duration_days: i32,
    pub max_loans_student: i32,
    pub max_loans_teacher: i32,
    pub max_renewals: i32,
    pub renewal_duration_days: i32,
    pub allow_loans_with_overdue: bool,
    pub skip_weekends: bool,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            institution_name: "School Library".to_string(),
            loan_duration_days: 15,
            max_loans_student: 3,
            max_loans_teacher: 5,
            max_renewals: 2,
            renewal_duration_days: 7,
            allow_loans_with_overdue: false,
            skip_weekends: true,
            updated_at: Utc::now(),
            updated_by: None,
        }
    }
}

impl SystemConfig {
    /// Open-loan limit for a borrower type
    pub fn max_loans_for(&self, person_type: PersonType) -> i32 {
        match person_type {
            PersonType::Student => self.max_loans_student,
            PersonType::Teacher => self.max_loans_teacher,
        }
    }

    /// Whether a borrower in this state may take one more loan
    pub fn check_borrower(
        &self,
        person_type: PersonType,
        person_active: bool,
        open_loans: i64,
        overdue_loans: i64,
    ) -> AppResult<()> {
        if !person_active {
            return Err(AppError::BusinessRule("Person is inactive and cannot borrow".to_string()));
        }

        let limit = self.max_loans_for(person_type);
        if open_loans >= i64::from(limit) {
            return Err(AppError::BusinessRule(format!(
                "Loan limit reached ({} open loans, maximum {} for a {})",
                open_loans, limit, person_type
            )));
        }
        if overdue_loans > 0 && !self.allow_loans_with_overdue {
            return Err(AppError::BusinessRule(format!(
                "Person has {} overdue loan(s)",
                overdue_loans
            )));
        }
        Ok(())
    }

    /// Overlay a partial update
    pub fn merged(&self, update: &UpdateSystemConfig) -> Self {
        Self {
            institution_name: update
                .institution_name
                .clone()
                .unwrap_or_else(|| self.institution_name.clone()),
            loan_duration_days: update.loan_duration_days.unwrap_or(self.loan_duration_days),
            max_loans_student: update.max_loans_student.unwrap_or(self.max_loans_student),
            max_loans_teacher: update.max_loans_teacher.unwrap_or(self.max_loans_teacher),
            max_renewals: update.max_renewals.unwrap_or(self.max_renewals),
            renewal_duration_days: update
                .renewal_duration_days
                .unwrap_or(self.renewal_duration_days),
            allow_loans_with_overdue: update
                .allow_loans_with_overdue
                .unwrap_or(self.allow_loans_with_overdue),
            skip_weekends: update.skip_weekends.unwrap_or(self.skip_weekends),
            updated_at: self.updated_at,
            updated_by: self.updated_by,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSystemConfig {
    #[validate(length(min = 1, max = 200, message = "Institution name cannot be empty"))]
    pub institution_name: Option<String>,
    #[validate(range(min = 1, max = 365, message = "Loan duration must be between 1 and 365 days"))]
    pub loan_duration_days: Option<i32>,
    #[validate(range(min = 1, max = 50, message = "Student loan limit must be between 1 and 50"))]
    pub max_loans_student: Option<i32>,
    #[validate(range(min = 1, max = 50, message = "Teacher loan limit must be between 1 and 50"))]
    pub max_loans_teacher: Option<i32>,
    #[validate(range(min = 0, max = 50, message = "Renewal limit must be between 0 and 50"))]
    pub max_renewals: Option<i32>,
    #[validate(range(min = 1, max = 365, message = "Renewal duration must be between 1 and 365 days"))]
    pub renewal_duration_days: Option<i32>,
    pub allow_loans_with_overdue: Option<bool>,
    pub skip_weekends: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_keeps_unset_fields() {
        let current = SystemConfig::default();
        let update = UpdateSystemConfig {
            max_loans_student: Some(4),
            skip_weekends: Some(false),
            ..Default::default()
        };
        let merged = current.merged(&update);
        assert_eq!(merged.max_loans_student, 4);
        assert!(!merged.skip_weekends);
        assert_eq!(merged.max_loans_teacher, current.max_loans_teacher);
        assert_eq!(merged.institution_name, current.institution_name);
    }

    #[test]
    fn test_limits_per_person_type() {
        let config = SystemConfig::default();
        assert_eq!(config.max_loans_for(PersonType::Student), 3);
        assert_eq!(config.max_loans_for(PersonType::Teacher), 5);
    }

    fn is_rule_violation(result: AppResult<()>) -> bool {
        matches!(result, Err(AppError::BusinessRule(_)))
    }

    #[test]
    fn test_borrower_under_limit_may_borrow() {
        let config = SystemConfig::default();
        assert!(config.check_borrower(PersonType::Student, true, 2, 0).is_ok());
        assert!(config.check_borrower(PersonType::Teacher, true, 4, 0).is_ok());
    }

    #[test]
    fn test_loan_limit_depends_on_person_type() {
        let config = SystemConfig::default();
        assert!(is_rule_violation(config.check_borrower(PersonType::Student, true, 3, 0)));
        assert!(config.check_borrower(PersonType::Teacher, true, 3, 0).is_ok());
        assert!(is_rule_violation(config.check_borrower(PersonType::Teacher, true, 5, 0)));
    }

    #[test]
    fn test_inactive_person_cannot_borrow() {
        let config = SystemConfig::default();
        assert!(is_rule_violation(config.check_borrower(PersonType::Teacher, false, 0, 0)));
    }

    #[test]
    fn test_overdue_blocks_unless_allowed() {
        let mut config = SystemConfig::default();
        assert!(is_rule_violation(config.check_borrower(PersonType::Student, true, 1, 1)));

        config.allow_loans_with_overdue = true;
        assert!(config.check_borrower(PersonType::Student, true, 1, 1).is_ok());
        // the limit still applies
        assert!(is_rule_violation(config.check_borrower(PersonType::Student, true, 3, 1)));
    }

    #[test]
    fn test_update_validation() {
        let update = UpdateSystemConfig {
            loan_duration_days: Some(0),
            max_loans_teacher: Some(51),
            ..Default::default()
        };
        let errors = update.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }
}
