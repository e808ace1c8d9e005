//! System configuration repository (single row, id = 1)

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{error::AppResult, models::system_config::SystemConfig};

const CONFIG_COLUMNS: &str = "institution_name, loan_duration_days, max_loans_student, \
     max_loans_teacher, max_renewals, renewal_duration_days, allow_loans_with_overdue, \
     skip_weekends, updated_at, updated_by";

#[derive(Clone)]
pub struct SystemConfigRepository {
    pool: Pool<Postgres>,
}

impl SystemConfigRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Read the configuration, inserting defaults on first access
    pub async fn get(&self) -> AppResult<SystemConfig> {
        let existing = sqlx::query_as::<_, SystemConfig>(&format!(
            "SELECT {} FROM system_config WHERE id = 1",
            CONFIG_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(config) => Ok(config),
            None => self.save(&SystemConfig::default(), None).await,
        }
    }

    /// Write the whole row
    pub async fn save(&self, config: &SystemConfig, updated_by: Option<Uuid>) -> AppResult<SystemConfig> {
        let saved = sqlx::query_as::<_, SystemConfig>(&format!(
            r#"
            INSERT INTO system_config (
                id, institution_name, loan_duration_days, max_loans_student, max_loans_teacher,
                max_renewals, renewal_duration_days, allow_loans_with_overdue, skip_weekends,
                updated_at, updated_by
            ) VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, NOW(), $9)
            ON CONFLICT (id) DO UPDATE SET
                institution_name = EXCLUDED.institution_name,
                loan_duration_days = EXCLUDED.loan_duration_days,
                max_loans_student = EXCLUDED.max_loans_student,
                max_loans_teacher = EXCLUDED.max_loans_teacher,
                max_renewals = EXCLUDED.max_renewals,
                renewal_duration_days = EXCLUDED.renewal_duration_days,
                allow_loans_with_overdue = EXCLUDED.allow_loans_with_overdue,
                skip_weekends = EXCLUDED.skip_weekends,
                updated_at = EXCLUDED.updated_at,
                updated_by = EXCLUDED.updated_by
            RETURNING {}
            "#,
            CONFIG_COLUMNS
        ))
        .bind(&config.institution_name)
        .bind(config.loan_duration_days)
        .bind(config.max_loans_student)
        .bind(config.max_loans_teacher)
        .bind(config.max_renewals)
        .bind(config.renewal_duration_days)
        .bind(config.allow_loans_with_overdue)
        .bind(config.skip_weekends)
        .bind(updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}
