//! Reports built from the aggregate queries

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::{
    error::{AppError, AppResult},
    models::report::{
        fill_months, group_by_person, status_counts, InventoryByType, OverdueEntry, PersonLoanSummary,
        ReportQuery, StatEntry, Summary, TopResource, YearReport,
    },
    repository::Repository,
};

/// Midnight UTC on the first day of the month containing `now`
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn check_range(query: &ReportQuery) -> AppResult<()> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from >= to {
            return Err(AppError::Validation("'from' must be before 'to'".to_string()));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn summary(&self) -> AppResult<Summary> {
        let now = Utc::now();
        let config = self.repository.system_config.get().await?;
        let resources = self.repository.reports.inventory_totals().await?;
        let people_by_type = self.repository.reports.people_by_type().await?;
        let (open_loans, overdue_loans, loans_this_month, returns_this_month) =
            self.repository.reports.loan_counts(month_start(now), now).await?;

        Ok(Summary {
            institution_name: config.institution_name,
            generated_at: now,
            resources,
            people_by_type,
            open_loans,
            overdue_loans,
            loans_this_month,
            returns_this_month,
        })
    }

    pub async fn loans_by_person(&self, query: &ReportQuery) -> AppResult<Vec<PersonLoanSummary>> {
        check_range(query)?;
        let rows = self.repository.reports.loans_by_person(query).await?;
        Ok(group_by_person(rows))
    }

    pub async fn loans_by_status(&self, query: &ReportQuery) -> AppResult<Vec<StatEntry>> {
        check_range(query)?;
        let rows = self.repository.reports.loans_by_status(query).await?;
        Ok(status_counts(&rows))
    }

    /// Month by month activity, current year by default
    pub async fn loans_by_year(&self, year: Option<i32>) -> AppResult<YearReport> {
        let year = year.unwrap_or_else(|| Utc::now().year());
        if !(1900..=9999).contains(&year) {
            return Err(AppError::Validation(format!("Invalid year {}", year)));
        }

        let (loans, returns) = self.repository.reports.loans_by_month(year).await?;
        let months = fill_months(&loans, &returns);

        Ok(YearReport {
            year,
            total_loans: months.iter().map(|m| m.loans).sum(),
            total_returns: months.iter().map(|m| m.returns).sum(),
            months,
        })
    }

    pub async fn overdue(&self, query: &ReportQuery) -> AppResult<Vec<OverdueEntry>> {
        check_range(query)?;
        let now = Utc::now();
        let rows = self.repository.reports.overdue(query, now).await?;
        Ok(rows
            .into_iter()
            .map(|row| OverdueEntry::from_row(row, now))
            .collect())
    }

    pub async fn top_resources(&self, query: &ReportQuery) -> AppResult<Vec<TopResource>> {
        check_range(query)?;
        self.repository.reports.top_resources(query).await
    }

    pub async fn inventory(&self) -> AppResult<Vec<InventoryByType>> {
        self.repository.reports.inventory_by_type().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 17, 45, 0).unwrap();
        assert_eq!(month_start(now), Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_check_range() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut query = ReportQuery {
            from: Some(early),
            to: Some(late),
            ..Default::default()
        };
        assert!(check_range(&query).is_ok());

        query.from = Some(late);
        query.to = Some(early);
        assert!(matches!(check_range(&query), Err(AppError::Validation(_))));
    }
}
