//! Library-wide loan policy

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::system_config::{SystemConfig, UpdateSystemConfig},
    repository::Repository,
};

#[derive(Clone)]
pub struct SystemConfigService {
    repository: Repository,
}

impl SystemConfigService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self) -> AppResult<SystemConfig> {
        self.repository.system_config.get().await
    }

    /// Apply a partial update
    pub async fn update(&self, update: UpdateSystemConfig, updated_by: Uuid) -> AppResult<SystemConfig> {
        update.validate()?;

        let current = self.repository.system_config.get().await?;
        let merged = current.merged(&update);
        let saved = self.repository.system_config.save(&merged, Some(updated_by)).await?;

        tracing::info!(updated_by = %updated_by, "System configuration updated");
        Ok(saved)
    }

    /// Restore default values
    pub async fn reset(&self, updated_by: Uuid) -> AppResult<SystemConfig> {
        let saved = self
            .repository
            .system_config
            .save(&SystemConfig::default(), Some(updated_by))
            .await?;

        tracing::warn!(updated_by = %updated_by, "System configuration reset to defaults");
        Ok(saved)
    }
}
