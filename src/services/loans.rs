//! Loan lifecycle and stock maintenance commands

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLoan, LoanDetails, LoanQuery, OverdueRefresh, ReturnLoan},
        resource::StockSyncReport,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(id).await
    }

    pub async fn search(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        self.repository.loans.search(query).await
    }

    /// Lend units of a resource to a person
    pub async fn create(&self, request: CreateLoan, created_by: Uuid) -> AppResult<LoanDetails> {
        request.validate()?;

        let config = self.repository.system_config.get().await?;
        let loan = self
            .repository
            .loans
            .create(&request, &config, Some(created_by), Utc::now())
            .await?;

        tracing::info!(
            loan_id = %loan.id,
            person_id = %loan.person_id,
            resource_id = %loan.resource_id,
            quantity = loan.quantity,
            due_date = %loan.due_date,
            "Loan created"
        );
        self.repository.loans.get_details(loan.id).await
    }

    pub async fn return_loan(&self, id: Uuid, request: ReturnLoan) -> AppResult<LoanDetails> {
        request.validate()?;

        let loan = self.repository.loans.return_loan(id, &request, Utc::now()).await?;
        tracing::info!(
            loan_id = %id,
            resource_id = %loan.resource_id,
            condition = %request.condition,
            "Loan returned"
        );
        self.repository.loans.get_details(id).await
    }

    pub async fn renew(&self, id: Uuid) -> AppResult<LoanDetails> {
        let config = self.repository.system_config.get().await?;
        let loan = self.repository.loans.renew(id, &config, Utc::now()).await?;
        tracing::info!(
            loan_id = %id,
            renewals = loan.renewals_count,
            due_date = %loan.due_date,
            "Loan renewed"
        );
        self.repository.loans.get_details(id).await
    }

    pub async fn mark_lost(&self, id: Uuid) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.mark_lost(id, Utc::now()).await?;
        tracing::warn!(
            loan_id = %id,
            resource_id = %loan.resource_id,
            quantity = loan.quantity,
            "Loan marked as lost"
        );
        self.repository.loans.get_details(id).await
    }

    /// Delete a returned or lost loan
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.repository.loans.delete(id).await?;
        tracing::info!(loan_id = %id, "Loan deleted");
        Ok(())
    }

    /// Flag active loans past their due date
    pub async fn refresh_overdue(&self) -> AppResult<OverdueRefresh> {
        let flagged = self.repository.loans.refresh_overdue(Utc::now()).await?;
        if flagged > 0 {
            tracing::info!(flagged, "Loans flagged as overdue");
        }
        Ok(OverdueRefresh { flagged })
    }

    /// Rebuild loan counters from open loans
    pub async fn sync_stock(&self) -> AppResult<StockSyncReport> {
        let report = self.repository.loans.sync_stock().await?;
        for repair in &report.repaired {
            tracing::warn!(
                resource_id = %repair.resource_id,
                previous = repair.previous_loans_count,
                synced = repair.synced_loans_count,
                "Loan counter repaired"
            );
        }
        tracing::info!(checked = report.checked, repaired = report.repaired.len(), "Stock sync completed");
        Ok(report)
    }
}
