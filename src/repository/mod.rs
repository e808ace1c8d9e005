//! Repository layer for database operations

pub mod loans;
pub mod people;
pub mod reports;
pub mod resources;
pub mod system_config;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub people: people::PeopleRepository,
    pub resources: resources::ResourcesRepository,
    pub loans: loans::LoansRepository,
    pub system_config: system_config::SystemConfigRepository,
    pub reports: reports::ReportsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            people: people::PeopleRepository::new(pool.clone()),
            resources: resources::ResourcesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            system_config: system_config::SystemConfigRepository::new(pool.clone()),
            reports: reports::ReportsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
