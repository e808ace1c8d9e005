//! Aggregate queries behind the reports

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        enums::LoanStatus,
        report::{
            InventoryByType, InventoryTotals, OverdueRow, PersonStatusCount, ReportQuery, StatEntry,
            TopResource,
        },
    },
};

pub const DEFAULT_TOP_LIMIT: i64 = 10;
pub const MAX_TOP_LIMIT: i64 = 100;

/// WHERE conditions for the shared report filters over `loans l` joined with `people p`
fn filter_conditions(query: &ReportQuery) -> Vec<String> {
    let mut conditions = Vec::new();
    let mut idx = 0;

    macro_rules! add_condition {
        ($field:expr, $sql:expr) => {
            if $field.is_some() {
                idx += 1;
                conditions.push(format!($sql, idx));
            }
        };
    }

    add_condition!(query.from, "l.loan_date >= ${}");
    add_condition!(query.to, "l.loan_date < ${}");
    add_condition!(query.person_type, "p.person_type = ${}");
    add_condition!(query.grade, "p.grade = ${}");

    conditions
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

macro_rules! bind_report_filters {
    ($builder:expr, $query:expr) => {{
        let mut builder = $builder;
        if let Some(from) = $query.from {
            builder = builder.bind(from);
        }
        if let Some(to) = $query.to {
            builder = builder.bind(to);
        }
        if let Some(person_type) = $query.person_type {
            builder = builder.bind(person_type);
        }
        if let Some(ref grade) = $query.grade {
            builder = builder.bind(grade);
        }
        builder
    }};
}

#[derive(Clone)]
pub struct ReportsRepository {
    pool: Pool<Postgres>,
}

impl ReportsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn inventory_totals(&self) -> AppResult<InventoryTotals> {
        let (titles, total_units, available_units, loaned_units, lost_units, damaged_units): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(total_quantity), 0)::BIGINT,
                   COALESCE(SUM(GREATEST(total_quantity - current_loans_count - lost_quantity - damaged_quantity, 0)), 0)::BIGINT,
                   COALESCE(SUM(current_loans_count), 0)::BIGINT,
                   COALESCE(SUM(lost_quantity), 0)::BIGINT,
                   COALESCE(SUM(damaged_quantity), 0)::BIGINT
            FROM resources
            WHERE active
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InventoryTotals {
            titles,
            total_units,
            available_units,
            loaned_units,
            lost_units,
            damaged_units,
        })
    }

    /// Active people per type
    pub async fn people_by_type(&self) -> AppResult<Vec<StatEntry>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT person_type, COUNT(*) FROM people WHERE active GROUP BY person_type ORDER BY person_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(label, value)| StatEntry { label, value })
            .collect())
    }

    /// Open, overdue, created-since and returned-since loan counts
    pub async fn loan_counts(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<(i64, i64, i64, i64)> {
        let counts = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status IN ('active', 'overdue')),
                   COUNT(*) FILTER (WHERE status IN ('active', 'overdue') AND due_date < $2),
                   COUNT(*) FILTER (WHERE loan_date >= $1),
                   COUNT(*) FILTER (WHERE returned_date >= $1)
            FROM loans
            "#,
        )
        .bind(since)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Loan counts per person and status, ordered by person name
    pub async fn loans_by_person(&self, query: &ReportQuery) -> AppResult<Vec<PersonStatusCount>> {
        let conditions = filter_conditions(query);
        let sql = format!(
            r#"
            SELECT p.id AS person_id, p.first_name, p.last_name, p.person_type, p.grade,
                   p.group_name, l.status, COUNT(*) AS loans
            FROM loans l
            JOIN people p ON p.id = l.person_id
            {}
            GROUP BY p.id, l.status
            ORDER BY p.last_name, p.first_name, p.id
            "#,
            where_clause(&conditions)
        );

        let rows = bind_report_filters!(sqlx::query_as::<_, PersonStatusCount>(&sql), query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn loans_by_status(&self, query: &ReportQuery) -> AppResult<Vec<(LoanStatus, i64)>> {
        let conditions = filter_conditions(query);
        let sql = format!(
            r#"
            SELECT l.status, COUNT(*)
            FROM loans l
            JOIN people p ON p.id = l.person_id
            {}
            GROUP BY l.status
            "#,
            where_clause(&conditions)
        );

        let rows = bind_report_filters!(sqlx::query_as::<_, (LoanStatus, i64)>(&sql), query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Sparse `(month, count)` rows for loans made and loans returned in a year
    pub async fn loans_by_month(&self, year: i32) -> AppResult<(Vec<(i32, i64)>, Vec<(i32, i64)>)> {
        let loans: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT EXTRACT(MONTH FROM loan_date)::INT AS month, COUNT(*)
            FROM loans
            WHERE EXTRACT(YEAR FROM loan_date)::INT = $1
            GROUP BY month
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        let returns: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT EXTRACT(MONTH FROM returned_date)::INT AS month, COUNT(*)
            FROM loans
            WHERE returned_date IS NOT NULL AND EXTRACT(YEAR FROM returned_date)::INT = $1
            GROUP BY month
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok((loans, returns))
    }

    /// Open loans past due, oldest due date first
    pub async fn overdue(&self, query: &ReportQuery, now: DateTime<Utc>) -> AppResult<Vec<OverdueRow>> {
        let mut conditions = filter_conditions(query);
        conditions.push(format!(
            "l.status IN ('active', 'overdue') AND l.due_date < ${}",
            conditions.len() + 1
        ));

        let sql = format!(
            r#"
            SELECT l.id AS loan_id, p.id AS person_id, p.first_name, p.last_name, p.person_type,
                   p.grade, p.group_name, r.id AS resource_id, r.title AS resource_title,
                   l.quantity, l.loan_date, l.due_date
            FROM loans l
            JOIN people p ON p.id = l.person_id
            JOIN resources r ON r.id = l.resource_id
            {}
            ORDER BY l.due_date, p.last_name
            "#,
            where_clause(&conditions)
        );

        let rows = bind_report_filters!(sqlx::query_as::<_, OverdueRow>(&sql), query)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Most borrowed resources by number of loans
    pub async fn top_resources(&self, query: &ReportQuery) -> AppResult<Vec<TopResource>> {
        let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT);
        let conditions = filter_conditions(query);
        let sql = format!(
            r#"
            SELECT r.id AS resource_id, r.title, r.author, r.resource_type,
                   COUNT(*) AS loans, COALESCE(SUM(l.quantity), 0)::BIGINT AS units
            FROM loans l
            JOIN people p ON p.id = l.person_id
            JOIN resources r ON r.id = l.resource_id
            {}
            GROUP BY r.id
            ORDER BY loans DESC, r.title
            LIMIT {}
            "#,
            where_clause(&conditions),
            limit
        );

        let rows = bind_report_filters!(sqlx::query_as::<_, TopResource>(&sql), query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn inventory_by_type(&self) -> AppResult<Vec<InventoryByType>> {
        let rows = sqlx::query_as::<_, InventoryByType>(
            r#"
            SELECT resource_type,
                   COUNT(*) AS titles,
                   COALESCE(SUM(total_quantity), 0)::BIGINT AS total_units,
                   COALESCE(SUM(GREATEST(total_quantity - current_loans_count - lost_quantity - damaged_quantity, 0)), 0)::BIGINT AS available_units,
                   COALESCE(SUM(current_loans_count), 0)::BIGINT AS loaned_units,
                   COALESCE(SUM(lost_quantity), 0)::BIGINT AS lost_units,
                   COALESCE(SUM(damaged_quantity), 0)::BIGINT AS damaged_units
            FROM resources
            WHERE active
            GROUP BY resource_type
            ORDER BY resource_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::PersonType;

    #[test]
    fn test_filter_conditions_are_numbered_in_bind_order() {
        let query = ReportQuery {
            from: Some(Utc::now()),
            person_type: Some(PersonType::Student),
            grade: Some("4".into()),
            ..Default::default()
        };
        assert_eq!(
            filter_conditions(&query),
            vec!["l.loan_date >= $1", "p.person_type = $2", "p.grade = $3"]
        );
        assert_eq!(where_clause(&[]), "");
    }
}
