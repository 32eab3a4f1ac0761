//! Company resolver
//!
//! Finds or creates the company that owns a submission. Every resolution is
//! a fresh lookup inside the request's unit of work.

use finsheet_common::config::CompanyPolicy;
use finsheet_common::db::models::Company;
use finsheet_common::db::{NewCompany, UnitOfWork};
use finsheet_common::errors::{AppError, Result};
use tracing::info;

/// Canonical company key: trimmed and lowercased
pub fn normalize_company_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Outcome of a resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub company: Company,
    /// True when the company was inserted by this resolution
    pub created: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CompanyResolver {
    policy: CompanyPolicy,
}

impl CompanyResolver {
    pub fn new(policy: CompanyPolicy) -> Self {
        Self { policy }
    }

    /// Resolve `company` by its normalized name.
    ///
    /// Upsert reuses an existing company and ignores the supplied attributes;
    /// strict fails with `DuplicateCompany`. A missing company is created with
    /// the supplied attributes under either policy.
    pub async fn resolve(&self, uow: &UnitOfWork, mut company: NewCompany) -> Result<Resolution> {
        company.name = normalize_company_name(&company.name);

        if let Some(existing) = uow.find_company_by_name(&company.name).await? {
            return match self.policy {
                CompanyPolicy::Upsert => Ok(Resolution {
                    company: existing,
                    created: false,
                }),
                CompanyPolicy::Strict => Err(AppError::DuplicateCompany { name: company.name }),
            };
        }

        let created = uow.insert_company(company).await?;
        info!(company_id = created.id, name = %created.name, "Company created");

        Ok(Resolution {
            company: created,
            created: true,
        })
    }
}
