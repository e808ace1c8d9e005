//! Loans repository for database operations
//!
//! Every operation that moves units between shelf and borrower locks the
//! resource row and updates its counters in the same transaction as the
//! loan row.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::resources::{lock_counters, store_counters};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{LoanStatus, PersonType},
        loan::{due_date_after, CreateLoan, Loan, LoanDetails, LoanQuery, ReturnLoan},
        resource::{StockCounters, StockRepair, StockSyncReport},
        system_config::SystemConfig,
        Pagination,
    },
};

const LOAN_COLUMNS: &str = "id, person_id, resource_id, quantity, loan_date, due_date, returned_date, \
     status, renewals_count, return_condition, notes, created_by, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.person_id, p.first_name || ' ' || p.last_name AS person_name, p.person_type,
           l.resource_id, r.title AS resource_title, r.resource_type,
           l.quantity, l.loan_date, l.due_date, l.returned_date, l.status,
           l.renewals_count, l.return_condition, l.notes, l.created_by,
           (l.status IN ('active', 'overdue') AND l.due_date < NOW()) AS is_overdue
    FROM loans l
    JOIN people p ON p.id = l.person_id
    JOIN resources r ON r.id = l.resource_id
"#;

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Loan with id {} not found", id))
}

#[derive(FromRow)]
struct SyncRow {
    id: Uuid,
    title: String,
    total_quantity: i32,
    current_loans_count: i32,
    lost_quantity: i32,
    damaged_quantity: i32,
    open_units: i64,
}

/// Lock a loan row and make sure it is still open
async fn lock_open_loan(conn: &mut PgConnection, id: Uuid) -> AppResult<Loan> {
    let loan = sqlx::query_as::<_, Loan>(&format!(
        "SELECT {} FROM loans WHERE id = $1 FOR UPDATE",
        LOAN_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| not_found(id))?;

    if !loan.is_open() {
        return Err(AppError::BusinessRule(format!(
            "Loan is already closed (status: {})",
            loan.status
        )));
    }
    Ok(loan)
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Get loan with borrower and resource names
    pub async fn get_details(&self, id: Uuid) -> AppResult<LoanDetails> {
        sqlx::query_as::<_, LoanDetails>(&format!("{} WHERE l.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Search loans with filters and pagination, newest first
    pub async fn search(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let pagination = Pagination::new(query.page, query.per_page);

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

        add_condition!(query.person_id, "l.person_id = ${}");
        add_condition!(query.resource_id, "l.resource_id = ${}");
        add_condition!(query.status, "l.status = ${}");
        add_condition!(query.from, "l.loan_date >= ${}");
        add_condition!(query.to, "l.loan_date < ${}");

        if query.overdue == Some(true) {
            conditions.push("l.status IN ('active', 'overdue') AND l.due_date < NOW()".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(person_id) = query.person_id {
                    builder = builder.bind(person_id);
                }
                if let Some(resource_id) = query.resource_id {
                    builder = builder.bind(resource_id);
                }
                if let Some(status) = query.status {
                    builder = builder.bind(status);
                }
                if let Some(from) = query.from {
                    builder = builder.bind(from);
                }
                if let Some(to) = query.to {
                    builder = builder.bind(to);
                }
                builder
            }};
        }

        let count_query = format!(
            "SELECT COUNT(*) FROM loans l {}",
            where_clause
        );
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "{} {} ORDER BY l.loan_date DESC LIMIT {} OFFSET {}",
            DETAILS_SELECT,
            where_clause,
            pagination.per_page,
            pagination.offset()
        );
        let loans = bind_filters!(sqlx::query_as::<_, LoanDetails>(&select_query))
            .fetch_all(&self.pool)
            .await?;

        Ok((loans, total))
    }

    /// Create a loan, checking borrower limits and taking units off the shelf
    pub async fn create(
        &self,
        request: &CreateLoan,
        config: &SystemConfig,
        created_by: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent loans of the same borrower
        let person: Option<(PersonType, bool)> =
            sqlx::query_as("SELECT person_type, active FROM people WHERE id = $1 FOR UPDATE")
                .bind(request.person_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (person_type, person_active) = person.ok_or_else(|| {
            AppError::NotFound(format!("Person with id {} not found", request.person_id))
        })?;

        let (open_loans, overdue_loans): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'overdue' OR due_date < $2)
            FROM loans
            WHERE person_id = $1 AND status IN ('active', 'overdue')
            "#,
        )
        .bind(request.person_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        config.check_borrower(person_type, person_active, open_loans, overdue_loans)?;

        let (mut counters, resource_active) = lock_counters(&mut *tx, request.resource_id).await?;
        if !resource_active {
            return Err(AppError::BusinessRule("Resource is inactive and cannot be loaned".to_string()));
        }
        counters.checkout(request.quantity)?;
        store_counters(&mut *tx, request.resource_id, counters).await?;

        let due_date = due_date_after(now, config.loan_duration_days, config.skip_weekends);

        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (
                id, person_id, resource_id, quantity, loan_date, due_date, status,
                renewals_count, notes, created_by, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $5, $5)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(request.person_id)
        .bind(request.resource_id)
        .bind(request.quantity)
        .bind(now)
        .bind(due_date)
        .bind(LoanStatus::Active)
        .bind(&request.notes)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Close a loan as returned and put its units back
    pub async fn return_loan(&self, id: Uuid, request: &ReturnLoan, now: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_open_loan(&mut *tx, id).await?;

        let (mut counters, _) = lock_counters(&mut *tx, loan.resource_id).await?;
        counters.checkin(loan.quantity, request.condition)?;
        store_counters(&mut *tx, loan.resource_id, counters).await?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET status = $1, returned_date = $2, return_condition = $3,
                notes = COALESCE($4, notes), updated_at = $2
            WHERE id = $5
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(LoanStatus::Returned)
        .bind(now)
        .bind(request.condition)
        .bind(&request.notes)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Extend the due date of an open loan that is not yet late
    pub async fn renew(&self, id: Uuid, config: &SystemConfig, now: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_open_loan(&mut *tx, id).await?;

        if loan.status == LoanStatus::Overdue || loan.is_overdue_at(now) {
            return Err(AppError::BusinessRule("Overdue loans cannot be renewed".to_string()));
        }
        if loan.renewals_count >= config.max_renewals {
            return Err(AppError::BusinessRule(format!(
                "Maximum renewals reached ({})",
                config.max_renewals
            )));
        }

        let due_date = due_date_after(loan.due_date, config.renewal_duration_days, config.skip_weekends);

        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET due_date = $1, renewals_count = renewals_count + 1, updated_at = $2
            WHERE id = $3
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(due_date)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Close a loan as lost; its units move to the lost counter
    pub async fn mark_lost(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = lock_open_loan(&mut *tx, id).await?;

        let (mut counters, _) = lock_counters(&mut *tx, loan.resource_id).await?;
        counters.mark_lost(loan.quantity)?;
        store_counters(&mut *tx, loan.resource_id, counters).await?;

        let loan = sqlx::query_as::<_, Loan>(&format!(
            "UPDATE loans SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            LOAN_COLUMNS
        ))
        .bind(LoanStatus::Lost)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Delete a closed loan. Open loans are refused since they hold units.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let status: Option<LoanStatus> = sqlx::query_scalar("SELECT status FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match status {
            None => Err(not_found(id)),
            Some(status) if status.is_open() => Err(AppError::BusinessRule(
                "Open loans cannot be deleted; return or mark them lost first".to_string(),
            )),
            Some(_) => {
                // The status guard keeps a loan reopened in between from being removed
                sqlx::query("DELETE FROM loans WHERE id = $1 AND status IN ('returned', 'lost')")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
        }
    }

    /// Flag active loans whose due date has passed
    pub async fn refresh_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE loans SET status = 'overdue', updated_at = $1 WHERE status = 'active' AND due_date < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Recompute every loan counter from the open loans
    pub async fn sync_stock(&self) -> AppResult<StockSyncReport> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, SyncRow>(
            r#"
            SELECT r.id, r.title, r.total_quantity, r.current_loans_count,
                   r.lost_quantity, r.damaged_quantity,
                   COALESCE((
                       SELECT SUM(l.quantity) FROM loans l
                       WHERE l.resource_id = r.id AND l.status IN ('active', 'overdue')
                   ), 0)::BIGINT AS open_units
            FROM resources r
            ORDER BY r.title
            FOR UPDATE OF r
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let checked = rows.len();
        let mut repaired = Vec::new();

        for row in rows {
            let mut counters = StockCounters {
                total: row.total_quantity,
                current_loans: row.current_loans_count,
                lost: row.lost_quantity,
                damaged: row.damaged_quantity,
            };
            let synced = counters.synced_loans(row.open_units);
            if synced == counters.current_loans {
                continue;
            }

            counters.current_loans = synced;
            store_counters(&mut *tx, row.id, counters).await?;

            repaired.push(StockRepair {
                resource_id: row.id,
                title: row.title,
                previous_loans_count: row.current_loans_count,
                synced_loans_count: synced,
            });
        }

        tx.commit().await?;
        Ok(StockSyncReport { checked, repaired })
    }
}
