//! Report rows and the folding/formatting applied on top of the SQL aggregates

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{LoanStatus, PersonType, ResourceType};

/// Display format used in printable reports
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Common report filters
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReportQuery {
    /// Loan date lower bound (inclusive)
    pub from: Option<DateTime<Utc>>,
    /// Loan date upper bound (exclusive)
    pub to: Option<DateTime<Utc>>,
    pub person_type: Option<PersonType>,
    pub grade: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatEntry {
    pub label: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryTotals {
    pub titles: i64,
    pub total_units: i64,
    pub available_units: i64,
    pub loaned_units: i64,
    pub lost_units: i64,
    pub damaged_units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub institution_name: String,
    pub generated_at: DateTime<Utc>,
    pub resources: InventoryTotals,
    pub people_by_type: Vec<StatEntry>,
    pub open_loans: i64,
    pub overdue_loans: i64,
    pub loans_this_month: i64,
    pub returns_this_month: i64,
}

/// Loan counts of one person for one status, as returned by SQL
#[derive(Debug, Clone, FromRow)]
pub struct PersonStatusCount {
    pub person_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub person_type: PersonType,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub status: LoanStatus,
    pub loans: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonLoanSummary {
    pub person_id: Uuid,
    pub full_name: String,
    pub person_type: PersonType,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub total: i64,
    pub active: i64,
    pub overdue: i64,
    pub returned: i64,
    pub lost: i64,
}

/// Fold per-status rows into one summary per person, keeping the row order
pub fn group_by_person(rows: Vec<PersonStatusCount>) -> Vec<PersonLoanSummary> {
    let mut grouped: IndexMap<Uuid, PersonLoanSummary> = IndexMap::new();

    for row in rows {
        let entry = grouped.entry(row.person_id).or_insert_with(|| PersonLoanSummary {
            person_id: row.person_id,
            full_name: format!("{} {}", row.first_name, row.last_name),
            person_type: row.person_type,
            grade: row.grade.clone(),
            group_name: row.group_name.clone(),
            total: 0,
            active: 0,
            overdue: 0,
            returned: 0,
            lost: 0,
        });

        entry.total += row.loans;
        match row.status {
            LoanStatus::Active => entry.active += row.loans,
            LoanStatus::Overdue => entry.overdue += row.loans,
            LoanStatus::Returned => entry.returned += row.loans,
            LoanStatus::Lost => entry.lost += row.loans,
        }
    }

    grouped.into_values().collect()
}

/// Every status with its count, zero when absent
pub fn status_counts(rows: &[(LoanStatus, i64)]) -> Vec<StatEntry> {
    LoanStatus::ALL
        .iter()
        .map(|status| StatEntry {
            label: status.as_str().to_string(),
            value: rows
                .iter()
                .filter(|(s, _)| s == status)
                .map(|(_, n)| *n)
                .sum(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: u32,
    pub loans: i64,
    pub returns: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearReport {
    pub year: i32,
    pub total_loans: i64,
    pub total_returns: i64,
    pub months: Vec<MonthCount>,
}

/// Twelve month buckets from sparse `(month, count)` rows
pub fn fill_months(loans: &[(i32, i64)], returns: &[(i32, i64)]) -> Vec<MonthCount> {
    let lookup = |rows: &[(i32, i64)], month: u32| {
        rows.iter()
            .find(|(m, _)| *m == month as i32)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    (1..=12)
        .map(|month| MonthCount {
            month,
            loans: lookup(loans, month),
            returns: lookup(returns, month),
        })
        .collect()
}

/// Open overdue loan as fetched for the report
#[derive(Debug, Clone, FromRow)]
pub struct OverdueRow {
    pub loan_id: Uuid,
    pub person_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub person_type: PersonType,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub resource_id: Uuid,
    pub resource_title: String,
    pub quantity: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueEntry {
    pub loan_id: Uuid,
    pub person_id: Uuid,
    pub person_name: String,
    pub person_type: PersonType,
    pub grade: Option<String>,
    pub group_name: Option<String>,
    pub resource_id: Uuid,
    pub resource_title: String,
    pub quantity: i32,
    pub loan_date: String,
    pub due_date: String,
    pub days_overdue: i64,
}

impl OverdueEntry {
    pub fn from_row(row: OverdueRow, now: DateTime<Utc>) -> Self {
        Self {
            loan_id: row.loan_id,
            person_id: row.person_id,
            person_name: format!("{} {}", row.first_name, row.last_name),
            person_type: row.person_type,
            grade: row.grade,
            group_name: row.group_name,
            resource_id: row.resource_id,
            resource_title: row.resource_title,
            quantity: row.quantity,
            loan_date: format_date(row.loan_date),
            due_date: format_date(row.due_date),
            days_overdue: super::loan::days_overdue(row.due_date, now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TopResource {
    pub resource_id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub resource_type: ResourceType,
    pub loans: i64,
    pub units: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryByType {
    pub resource_type: ResourceType,
    pub titles: i64,
    pub total_units: i64,
    pub available_units: i64,
    pub loaned_units: i64,
    pub lost_units: i64,
    pub damaged_units: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(person_id: Uuid, last_name: &str, status: LoanStatus, loans: i64) -> PersonStatusCount {
        PersonStatusCount {
            person_id,
            first_name: "Ana".into(),
            last_name: last_name.into(),
            person_type: PersonType::Student,
            grade: Some("3".into()),
            group_name: None,
            status,
            loans,
        }
    }

    #[test]
    fn test_group_by_person_sums_statuses_in_order() {
        let alvarez = Uuid::new_v4();
        let blanco = Uuid::new_v4();
        let rows = vec![
            row(alvarez, "Álvarez", LoanStatus::Active, 1),
            row(alvarez, "Álvarez", LoanStatus::Returned, 4),
            row(blanco, "Blanco", LoanStatus::Overdue, 2),
            row(alvarez, "Álvarez", LoanStatus::Lost, 1),
        ];

        let grouped = group_by_person(rows);
        assert_eq!(grouped.len(), 2);

        assert_eq!(grouped[0].full_name, "Ana Álvarez");
        assert_eq!(
            (grouped[0].total, grouped[0].active, grouped[0].returned, grouped[0].lost),
            (6, 1, 4, 1)
        );
        assert_eq!(grouped[1].person_id, blanco);
        assert_eq!((grouped[1].total, grouped[1].overdue), (2, 2));
    }

    #[test]
    fn test_status_counts_are_zero_filled() {
        let counts = status_counts(&[(LoanStatus::Returned, 7), (LoanStatus::Active, 2)]);
        let values: Vec<_> = counts.iter().map(|e| (e.label.as_str(), e.value)).collect();
        assert_eq!(
            values,
            vec![("active", 2), ("overdue", 0), ("returned", 7), ("lost", 0)]
        );
    }

    #[test]
    fn test_fill_months() {
        let months = fill_months(&[(1, 5), (12, 2)], &[(2, 3)]);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].loans, 5);
        assert_eq!(months[1].returns, 3);
        assert_eq!(months[11].loans, 2);
        assert_eq!(months[5].loans + months[5].returns, 0);
    }

    #[test]
    fn test_overdue_entry_formats_dates() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap();
        let entry = OverdueEntry::from_row(
            OverdueRow {
                loan_id: Uuid::new_v4(),
                person_id: Uuid::new_v4(),
                first_name: "Pablo".into(),
                last_name: "Ruiz".into(),
                person_type: PersonType::Teacher,
                grade: None,
                group_name: None,
                resource_id: Uuid::new_v4(),
                resource_title: "Atlas escolar".into(),
                quantity: 1,
                loan_date: Utc.with_ymd_and_hms(2024, 4, 22, 9, 0, 0).unwrap(),
                due_date: Utc.with_ymd_and_hms(2024, 5, 7, 9, 0, 0).unwrap(),
            },
            now,
        );
        assert_eq!(entry.person_name, "Pablo Ruiz");
        assert_eq!(entry.loan_date, "22/04/2024");
        assert_eq!(entry.due_date, "07/05/2024");
        assert_eq!(entry.days_overdue, 13);
    }
}
