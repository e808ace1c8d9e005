//! Borrower management

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{LoanDetails, LoanQuery},
        person::{CreatePerson, PeopleStats, Person, PersonQuery, UpdatePerson},
        search::search_key,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct PeopleService {
    repository: Repository,
}

impl PeopleService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Person> {
        self.repository.people.get_by_id(id).await
    }

    pub async fn search(&self, query: &PersonQuery) -> AppResult<(Vec<Person>, i64)> {
        self.repository.people.search(query).await
    }

    pub async fn create(&self, person: CreatePerson) -> AppResult<Person> {
        person.validate()?;

        if self
            .repository
            .people
            .document_exists(person.document_number.trim(), None)
            .await?
        {
            return Err(AppError::Conflict(
                "A person with this document number already exists".to_string(),
            ));
        }

        let key = search_key([
            Some(person.first_name.as_str()),
            Some(person.last_name.as_str()),
            Some(person.document_number.as_str()),
        ]);

        let created = self.repository.people.create(&person, &key).await?;
        tracing::info!(person_id = %created.id, person_type = %created.person_type, "Person created");
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, update: UpdatePerson) -> AppResult<Person> {
        let update = update.normalized();
        update.validate()?;

        let current = self.repository.people.get_by_id(id).await?;

        if let Some(ref document_number) = update.document_number {
            if self
                .repository
                .people
                .document_exists(document_number, Some(id))
                .await?
            {
                return Err(AppError::Conflict(
                    "A person with this document number already exists".to_string(),
                ));
            }
        }

        let key = update.touches_search_key().then(|| {
            search_key([
                Some(update.first_name.as_deref().unwrap_or(&current.first_name)),
                Some(update.last_name.as_deref().unwrap_or(&current.last_name)),
                Some(
                    update
                        .document_number
                        .as_deref()
                        .unwrap_or(&current.document_number),
                ),
            ])
        });

        let updated = self.repository.people.update(id, &update, key).await?;
        tracing::info!(person_id = %id, "Person updated");
        Ok(updated)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Person> {
        let person = self.repository.people.set_active(id, active).await?;
        tracing::info!(person_id = %id, active, "Person activation changed");
        Ok(person)
    }

    /// Delete a person without open loans
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.people.delete(id).await?;
        tracing::info!(person_id = %id, "Person deleted");
        Ok(())
    }

    /// Loan history of one person
    pub async fn loans(&self, id: Uuid, mut query: LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.people.get_by_id(id).await?;
        query.person_id = Some(id);
        self.repository.loans.search(&query).await
    }

    pub async fn stats(&self) -> AppResult<PeopleStats> {
        self.repository.people.stats().await
    }
}
