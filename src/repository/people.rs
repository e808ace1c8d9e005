//! People (borrowers) repository

use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        person::{CreatePerson, PeopleCount, PeopleStats, Person, PersonQuery, UpdatePerson},
        search::like_pattern,
        Pagination,
    },
};

const PERSON_COLUMNS: &str = "id, person_type, first_name, last_name, document_number, grade, \
     group_name, email, phone, notes, active, created_at, updated_at";

const DUPLICATE_DOCUMENT: &str = "A person with this document number already exists";

#[derive(Clone)]
pub struct PeopleRepository {
    pool: Pool<Postgres>,
}

impl PeopleRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get person by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Person> {
        sqlx::query_as::<_, Person>(&format!("SELECT {} FROM people WHERE id = $1", PERSON_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Person with id {} not found", id)))
    }

    pub async fn document_exists(&self, document_number: &str, exclude_id: Option<Uuid>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM people WHERE document_number = $1 AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(document_number)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search people with filters and pagination
    pub async fn search(&self, query: &PersonQuery) -> AppResult<(Vec<Person>, i64)> {
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

        add_condition!(query.person_type, "person_type = ${}");
        add_condition!(query.grade, "grade = ${}");
        add_condition!(query.group_name, "group_name = ${}");
        add_condition!(query.active, "active = ${}");
        add_condition!(query.search, "search_key LIKE ${}");

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let pattern = query.search.as_deref().map(like_pattern);

        macro_rules! bind_filters {
            ($builder:expr) => {{
                let mut builder = $builder;
                if let Some(person_type) = query.person_type {
                    builder = builder.bind(person_type);
                }
                if let Some(ref grade) = query.grade {
                    builder = builder.bind(grade);
                }
                if let Some(ref group_name) = query.group_name {
                    builder = builder.bind(group_name);
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

        let count_query = format!("SELECT COUNT(*) FROM people {}", where_clause);
        let total = bind_filters!(sqlx::query_scalar::<_, i64>(&count_query))
            .fetch_one(&self.pool)
            .await?;

        let select_query = format!(
            "SELECT {} FROM people {} ORDER BY last_name, first_name LIMIT {} OFFSET {}",
            PERSON_COLUMNS,
            where_clause,
            pagination.per_page,
            pagination.offset()
        );
        let people = bind_filters!(sqlx::query_as::<_, Person>(&select_query))
            .fetch_all(&self.pool)
            .await?;

        Ok((people, total))
    }

    /// Create a new person
    pub async fn create(&self, person: &CreatePerson, search_key: &str) -> AppResult<Person> {
        let now = Utc::now();

        sqlx::query_as::<_, Person>(&format!(
            r#"
            INSERT INTO people (
                id, person_type, first_name, last_name, document_number, grade,
                group_name, email, phone, notes, search_key, active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12, $12)
            RETURNING {}
            "#,
            PERSON_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(person.person_type)
        .bind(person.first_name.trim())
        .bind(person.last_name.trim())
        .bind(person.document_number.trim())
        .bind(&person.grade)
        .bind(&person.group_name)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(&person.notes)
        .bind(search_key)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_DOCUMENT))
    }

    /// Update an existing person
    pub async fn update(&self, id: Uuid, person: &UpdatePerson, search_key: Option<String>) -> AppResult<Person> {
        let now = Utc::now();

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

        add_field!(person.person_type, "person_type");
        add_field!(person.first_name, "first_name");
        add_field!(person.last_name, "last_name");
        add_field!(person.document_number, "document_number");
        add_field!(person.grade, "grade");
        add_field!(person.group_name, "group_name");
        add_field!(person.email, "email");
        add_field!(person.phone, "phone");
        add_field!(person.notes, "notes");
        add_field!(person.active, "active");
        add_field!(search_key, "search_key");

        let query = format!(
            "UPDATE people SET {} WHERE id = ${} RETURNING {}",
            sets.join(", "),
            param_idx,
            PERSON_COLUMNS
        );

        let mut builder = sqlx::query_as::<_, Person>(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(person.person_type);
        bind_field!(person.first_name);
        bind_field!(person.last_name);
        bind_field!(person.document_number);
        bind_field!(person.grade);
        bind_field!(person.group_name);
        bind_field!(person.email);
        bind_field!(person.phone);
        bind_field!(person.notes);
        bind_field!(person.active);
        bind_field!(search_key);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_DOCUMENT))?
            .ok_or_else(|| AppError::NotFound(format!("Person with id {} not found", id)))
    }

    /// Activate or deactivate a person
    pub async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Person> {
        sqlx::query_as::<_, Person>(&format!(
            "UPDATE people SET active = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            PERSON_COLUMNS
        ))
        .bind(active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Person with id {} not found", id)))
    }

    /// Delete a person and their closed loan history
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Held until commit; loan creation takes the same row lock
        let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM people WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Person with id {} not found", id)));
        }

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE person_id = $1 AND status IN ('active', 'overdue')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open > 0 {
            return Err(AppError::BusinessRule(format!(
                "Person has {} open loan(s) and cannot be deleted",
                open
            )));
        }

        sqlx::query("DELETE FROM loans WHERE person_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM people WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Person with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Headcount by type and grade
    pub async fn stats(&self) -> AppResult<PeopleStats> {
        let (total, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE active) FROM people",
        )
        .fetch_one(&self.pool)
        .await?;

        let by_type = sqlx::query_as::<_, PeopleCount>(
            r#"
            SELECT person_type AS label, COUNT(*) AS value
            FROM people WHERE active
            GROUP BY person_type ORDER BY person_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let by_grade = sqlx::query_as::<_, PeopleCount>(
            r#"
            SELECT COALESCE(grade, 'none') AS label, COUNT(*) AS value
            FROM people WHERE active AND person_type = 'student'
            GROUP BY grade ORDER BY grade NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(PeopleStats {
            total,
            active,
            by_type,
            by_grade,
        })
    }
}
