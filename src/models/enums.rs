//! Shared domain enums stored as lowercase text columns

use serde::{Deserialize, Serialize};

/// Implements string conversions and sqlx TEXT encoding for a fieldless enum.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $slug:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $slug),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($slug => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

/// Staff role, checked by the route guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Librarian,
}

text_enum!(UserRole { Admin => "admin", Librarian => "librarian" });

/// Kind of borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Student,
    Teacher,
}

text_enum!(PersonType { Student => "student", Teacher => "teacher" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Book,
    Game,
    Map,
    Other,
}

text_enum!(ResourceType {
    Book => "book",
    Game => "game",
    Map => "map",
    Other => "other",
});

/// Physical condition of a resource as catalogued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCondition {
    #[default]
    Good,
    Fair,
    Poor,
}

text_enum!(ResourceCondition { Good => "good", Fair => "fair", Poor => "poor" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
    Lost,
}

text_enum!(LoanStatus {
    Active => "active",
    Overdue => "overdue",
    Returned => "returned",
    Lost => "lost",
});

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Active,
        LoanStatus::Overdue,
        LoanStatus::Returned,
        LoanStatus::Lost,
    ];

    /// Open loans still hold stock units
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }
}

/// Condition of the units handed back on return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnCondition {
    #[default]
    Good,
    Damaged,
}

text_enum!(ReturnCondition { Good => "good", Damaged => "damaged" });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Teacher".parse::<PersonType>(), Ok(PersonType::Teacher));
        assert_eq!("MAP".parse::<ResourceType>(), Ok(ResourceType::Map));
        assert!("dragon".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_open_statuses() {
        let open: Vec<_> = LoanStatus::ALL.iter().filter(|s| s.is_open()).collect();
        assert_eq!(open, vec![&LoanStatus::Active, &LoanStatus::Overdue]);
    }

    #[test]
    fn test_serde_matches_column_text() {
        for status in LoanStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
