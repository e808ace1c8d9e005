//! Resources repository: catalogue rows and their stock counters

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        resource::{CreateResource, Resource, ResourceQuery, StockAdjustment, StockCounters, UpdateResource},
        search::like_pattern,
        Pagination,
    },
};

pub(crate) const RESOURCE_COLUMNS: &str = "id, resource_type, title, author, isbn, publisher, \
     publication_year, category, location, description, condition, active, total_quantity, \
     current_loans_count, lost_quantity, damaged_quantity, \
     GREATEST(total_quantity - current_loans_count - lost_quantity - damaged_quantity, 0) AS available_quantity, \
     created_at, updated_at";

const DUPLICATE_ISBN: &str = "A resource with this ISBN already exists";

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Resource with id {} not found", id))
}

/// Lock a resource row for the rest of the transaction and read its counters
pub(crate) async fn lock_counters(conn: &mut PgConnection, id: Uuid) -> AppResult<(StockCounters, bool)> {
    let row: Option<(i32, i32, i32, i32, bool)> = sqlx::query_as(
        r#"
        SELECT total_quantity, current_loans_count, lost_quantity, damaged_quantity, active
        FROM resources WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let (total, current_loans, lost, damaged, active) = row.ok_or_else(|| not_found(id))?;
    Ok((
        StockCounters {
            total,
            current_loans,
            lost,
            damaged,
        },
        active,
    ))
}

/// Write counters computed from a locked row
pub(crate) async fn store_counters(conn: &mut PgConnection, id: Uuid, counters: StockCounters) -> AppResult<()> {
    if !counters.is_consistent() {
        return Err(AppError::Internal(format!(
            "Refusing to store inconsistent stock counters for resource {}",
            id
        )));
    }

    sqlx::query(
        r#"
        UPDATE resources
        SET total_quantity = $1, current_loans_count = $2, lost_quantity = $3,
            damaged_quantity = $4, updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(counters.total)
    .bind(counters.current_loans)
    .bind(counters.lost)
    .bind(counters.damaged)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct ResourcesRepository {
    pool: Pool<Postgres>,
}

impl ResourcesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get resource by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Resource> {
        sqlx::query_as::<_, Resource>(&format!("SELECT {} FROM resources WHERE id = $1", RESOURCE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE isbn = $1 AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search resources with filters and pagination
    pub async fn search(&self, query: &ResourceQuery) -> AppResult<(Vec<Resource>, i64)> {
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

        add_condition!(query.resource_type, "resource_type = ${}");
        add_condition!(query.category, "category = ${}");
        add_condition!(query.condition, "condition = ${}");
        add_condition!(query.active, "active = ${}");
        add_condition!(query.search, "search_key LIKE ${}");

        if query.available_only == Some(true) {
            conditions.push(
                "active AND total_quantity - current_loans_count - lost_quantity - damaged_quantity > 0"
                    .to_string(),
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let pattern = query.search.as_deref().map(like_pattern);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(resource_type) = query.resource_type {
                    builder = builder.bind(resource_type);
                }
                if let Some(ref category) = query.category {
                    builder = builder.bind(category);
                }
                if let Some(condition) = query.condition {
                    builder = builder.bind(condition);
                }
                if let Some(active) = query.active {
                    builder = builder.bind(active);
                }
                if let Some(ref p) = pattern {
                    builder = builder.bind(p);
                }
                builder
            }};
        }

        let count_query = format!("SELECT COUNT(*) FROM resources {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "SELECT {} FROM resources {} ORDER BY title LIMIT {} OFFSET {}",
            RESOURCE_COLUMNS,
            where_clause,
            pagination.per_page,
            pagination.offset()
        );
        let resources = bind_filters!(sqlx::query_as::<_, Resource>(&select_query))
            .fetch_all(&self.pool)
            .await?;

        Ok((resources, total))
    }

    /// Create a new resource with every unit available
    pub async fn create(&self, resource: &CreateResource, isbn: Option<String>, search_key: &str) -> AppResult<Resource> {
        let now = Utc::now();

        sqlx::query_as::<_, Resource>(&format!(
            r#"
            INSERT INTO resources (
                id, resource_type, title, author, isbn, publisher, publication_year,
                category, location, description, condition, search_key, active,
                total_quantity, current_loans_count, lost_quantity, damaged_quantity,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, $13, 0, 0, 0, $14, $14)
            RETURNING {}
            "#,
            RESOURCE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(resource.resource_type)
        .bind(resource.title.trim())
        .bind(&resource.author)
        .bind(isbn)
        .bind(&resource.publisher)
        .bind(resource.publication_year)
        .bind(&resource.category)
        .bind(&resource.location)
        .bind(&resource.description)
        .bind(resource.condition)
        .bind(search_key)
        .bind(resource.total_quantity)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_ISBN))
    }

    /// Update descriptive fields, and the total when it still covers committed units
    pub async fn update(
        &self,
        id: Uuid,
        resource: &UpdateResource,
        isbn: Option<String>,
        search_key: Option<String>,
    ) -> AppResult<Resource> {
        let mut tx = self.pool.begin().await?;

        let (mut counters, _) = lock_counters(&mut *tx, id).await?;
        if let Some(total) = resource.total_quantity {
            counters.set_total(total)?;
        }

        let mut sets = vec!["updated_at = $1".to_string()];
        let mut param_idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(resource.resource_type, "resource_type");
        add_field!(resource.title, "title");
        add_field!(resource.author, "author");
        add_field!(isbn, "isbn");
        add_field!(resource.publisher, "publisher");
        add_field!(resource.publication_year, "publication_year");
        add_field!(resource.category, "category");
        add_field!(resource.location, "location");
        add_field!(resource.description, "description");
        add_field!(resource.condition, "condition");
        add_field!(resource.active, "active");
        add_field!(resource.total_quantity, "total_quantity");
        add_field!(search_key, "search_key");

        let query = format!(
            "UPDATE resources SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            param_idx,
            RESOURCE_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, Resource>(&query).bind(Utc::now());

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(resource.resource_type);
        bind_field!(resource.title);
        bind_field!(resource.author);
        bind_field!(isbn);
        bind_field!(resource.publisher);
        bind_field!(resource.publication_year);
        bind_field!(resource.category);
        bind_field!(resource.location);
        bind_field!(resource.description);
        bind_field!(resource.condition);
        bind_field!(resource.active);
        bind_field!(resource.total_quantity);
        bind_field!(search_key);

        let updated = builder
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_ISBN))?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Apply a manual stock adjustment under a row lock
    pub async fn adjust_stock(&self, id: Uuid, adjustment: StockAdjustment) -> AppResult<Resource> {
        let mut tx = self.pool.begin().await?;

        let (mut counters, _) = lock_counters(&mut *tx, id).await?;
        counters.apply(adjustment)?;
        store_counters(&mut *tx, id, counters).await?;

        let resource = sqlx::query_as::<_, Resource>(&format!(
            "SELECT {} FROM resources WHERE id = $1",
            RESOURCE_COLUMNS
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(resource)
    }

    /// Delete a resource and its closed loan history
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Loan creation locks the same row, so no loan can appear after the count
        lock_counters(&mut *tx, id).await?;

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE resource_id = $1 AND status IN ('active', 'overdue')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open > 0 {
            return Err(AppError::BusinessRule(format!(
                "Resource has {} open loan(s) and cannot be deleted",
                open
            )));
        }

        sqlx::query("DELETE FROM loans WHERE resource_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Distinct non-empty categories, sorted
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category FROM resources
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}
