//! Person (borrower) model: students and teachers

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::PersonType;

/// Identity document: letters, digits and dashes
static DOCUMENT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{2,29}$").expect("valid regex"));

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Person {
    pub id: Uuid,
    pub person_type: PersonType,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Person list query
#[derive(Debug, Default, Deserialize)]
pub struct PersonQuery {
    pub person_type: Option<PersonType>,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub active: Option<bool>,
    /// Free text over names and document number
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePerson {
    pub person_type: PersonType,
    #[validate(length(min = 1, max = 80, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80, message = "Last name is required"))]
    pub last_name: String,
    #[validate(regex(path = *DOCUMENT_NUMBER_RE, message = "Invalid document number"))]
    pub document_number: String,
    #[validate(length(max = 20))]
    pub grade: Option<String>,
    #[validate(length(max = 20))]
    pub group_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePerson {
    pub person_type: Option<PersonType>,
    #[validate(length(min = 1, max = 80, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 80, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[validate(regex(path = *DOCUMENT_NUMBER_RE, message = "Invalid document number"))]
    pub document_number: Option<String>,
    #[validate(length(max = 20))]
    pub grade: Option<String>,
    #[validate(length(max = 20))]
    pub group_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
}

impl UpdatePerson {
    /// Trim the document number so validation, the duplicate check and the stored value agree
    pub fn normalized(mut self) -> Self {
        if let Some(document_number) = self.document_number.as_mut() {
            *document_number = document_number.trim().to_string();
        }
        self
    }

    /// Whether any of the fields feeding the search key changed
    pub fn touches_search_key(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.document_number.is_some()
    }
}

/// Count of people for one label
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PeopleCount {
    pub label: String,
    pub value: i64,
}

/// Headcount by type and grade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeopleStats {
    pub total: i64,
    pub active: i64,
    pub by_type: Vec<PeopleCount>,
    pub by_grade: Vec<PeopleCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(document_number: &str) -> CreatePerson {
        CreatePerson {
            person_type: PersonType::Student,
            first_name: "Lucía".into(),
            last_name: "Gómez".into(),
            document_number: document_number.into(),
            grade: Some("5".into()),
            group_name: Some("B".into()),
            email: None,
            phone: None,
            notes: None,
        }
    }

    #[test]
    fn test_document_number_format() {
        assert!(create("1023-456").validate().is_ok());
        assert!(create("ab").validate().is_err());
        assert!(create("12 34").validate().is_err());
    }

    #[test]
    fn test_update_document_number_is_trimmed() {
        let update = UpdatePerson {
            document_number: Some("  1023-456 ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(update.document_number.as_deref(), Some("1023-456"));
        assert!(update.validate().is_ok());

        let untouched = UpdatePerson::default().normalized();
        assert!(untouched.document_number.is_none());
    }

    #[test]
    fn test_touches_search_key() {
        assert!(!UpdatePerson { grade: Some("6".into()), ..Default::default() }.touches_search_key());
        assert!(UpdatePerson { last_name: Some("Ruiz".into()), ..Default::default() }.touches_search_key());
    }
}
