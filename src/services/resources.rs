//! Catalogue of resources and manual stock changes

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{LoanDetails, LoanQuery},
        resource::{
            normalize_isbn, Availability, CreateResource, Resource, ResourceQuery, StockAdjustment,
            UpdateResource,
        },
        search::search_key,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ResourcesService {
    repository: Repository,
}

impl ResourcesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Resource> {
        self.repository.resources.get_by_id(id).await
    }

    pub async fn search(&self, query: &ResourceQuery) -> AppResult<(Vec<Resource>, i64)> {
        self.repository.resources.search(query).await
    }

    async fn check_isbn(&self, isbn: Option<&str>, exclude_id: Option<Uuid>) -> AppResult<Option<String>> {
        let Some(isbn) = isbn.map(normalize_isbn).filter(|i| !i.is_empty()) else {
            return Ok(None);
        };
        if self.repository.resources.isbn_exists(&isbn, exclude_id).await? {
            return Err(AppError::Conflict("A resource with this ISBN already exists".to_string()));
        }
        Ok(Some(isbn))
    }

    pub async fn create(&self, resource: CreateResource) -> AppResult<Resource> {
        resource.validate()?;

        let isbn = self.check_isbn(resource.isbn.as_deref(), None).await?;
        let key = search_key([
            Some(resource.title.as_str()),
            resource.author.as_deref(),
            isbn.as_deref(),
        ]);

        let created = self.repository.resources.create(&resource, isbn, &key).await?;
        tracing::info!(
            resource_id = %created.id,
            resource_type = %created.resource_type,
            units = created.total_quantity,
            "Resource created"
        );
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, update: UpdateResource) -> AppResult<Resource> {
        update.validate()?;

        let current = self.repository.resources.get_by_id(id).await?;
        let isbn = self.check_isbn(update.isbn.as_deref(), Some(id)).await?;

        let key = update.touches_search_key().then(|| {
            search_key([
                Some(update.title.as_deref().unwrap_or(&current.title)),
                update.author.as_deref().or(current.author.as_deref()),
                isbn.as_deref().or(current.isbn.as_deref()),
            ])
        });

        let updated = self.repository.resources.update(id, &update, isbn, key).await?;
        tracing::info!(resource_id = %id, "Resource updated");
        Ok(updated)
    }

    pub async fn adjust_stock(&self, id: Uuid, adjustment: StockAdjustment) -> AppResult<Resource> {
        adjustment.validate()?;

        let resource = self.repository.resources.adjust_stock(id, adjustment).await?;
        tracing::info!(
            resource_id = %id,
            kind = ?adjustment.kind,
            quantity = adjustment.quantity,
            available = resource.available_quantity,
            "Stock adjusted"
        );
        Ok(resource)
    }

    pub async fn availability(&self, id: Uuid) -> AppResult<Availability> {
        let resource = self.repository.resources.get_by_id(id).await?;
        Ok(Availability::from(&resource))
    }

    /// Delete a resource without open loans
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.resources.delete(id).await?;
        tracing::info!(resource_id = %id, "Resource deleted");
        Ok(())
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.resources.categories().await
    }

    /// Loan history of one resource
    pub async fn loans(&self, id: Uuid, mut query: LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.resources.get_by_id(id).await?;
        query.resource_id = Some(id);
        self.repository.loans.search(&query).await
    }
}
