//! Business logic services

pub mod loans;
pub mod people;
pub mod reports;
pub mod resources;
pub mod system_config;
pub mod users;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub people: people::PeopleService,
    pub resources: resources::ResourcesService,
    pub loans: loans::LoansService,
    pub system_config: system_config::SystemConfigService,
    pub reports: reports::ReportsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            users: users::UsersService::new(repository.clone()),
            people: people::PeopleService::new(repository.clone()),
            resources: resources::ResourcesService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone()),
            system_config: system_config::SystemConfigService::new(repository.clone()),
            reports: reports::ReportsService::new(repository.clone()),
            repository,
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
