//! Ingestion processor
//!
//! Sequences one extract request through
//! `Received -> Validated -> DedupChecked -> CompanyResolved -> Parsed -> Normalized -> Persisted`.
//! Any failing transition aborts the request; the unit of work opened for the
//! request is dropped uncommitted, so none of its writes become visible.

use crate::guard;
use crate::normalizer::normalize_rows;
use crate::request::ExtractRequest;
use crate::resolver::CompanyResolver;
use crate::schema::StatementSchema;
use finsheet_common::config::IngestionConfig;
use finsheet_common::db::Repository;
use finsheet_common::errors::AppError;
use finsheet_common::metrics;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Pipeline stages in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStage {
    Received,
    Validated,
    DedupChecked,
    CompanyResolved,
    Parsed,
    Normalized,
    Persisted,
}

impl IngestionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStage::Received => "received",
            IngestionStage::Validated => "validated",
            IngestionStage::DedupChecked => "dedup_checked",
            IngestionStage::CompanyResolved => "company_resolved",
            IngestionStage::Parsed => "parsed",
            IngestionStage::Normalized => "normalized",
            IngestionStage::Persisted => "persisted",
        }
    }
}

impl fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failed state of an ingestion: the stage that could not be
/// reached and the error that stopped it.
#[derive(Debug, Error)]
#[error("ingestion failed before reaching {stage}: {error}")]
pub struct IngestionFailure {
    pub stage: IngestionStage,
    #[source]
    pub error: AppError,
}

impl From<IngestionFailure> for AppError {
    fn from(failure: IngestionFailure) -> Self {
        failure.error
    }
}

trait StageResultExt<T> {
    fn at_stage(self, stage: IngestionStage) -> Result<T, IngestionFailure>;
}

impl<T, E: Into<AppError>> StageResultExt<T> for Result<T, E> {
    fn at_stage(self, stage: IngestionStage) -> Result<T, IngestionFailure> {
        self.map_err(|e| IngestionFailure {
            stage,
            error: e.into(),
        })
    }
}

/// Confirmation of a persisted ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReceipt {
    pub company_id: i32,
    pub company_created: bool,
    pub uploaded_file_id: i32,
    pub statement_ids: Vec<i32>,
    /// Non-empty sheet rows persisted
    pub rows: usize,
}

/// Ingestion processor
pub struct IngestionProcessor {
    repository: Repository,
    schema: StatementSchema,
    resolver: CompanyResolver,
}

impl IngestionProcessor {
    pub fn new(repository: Repository, config: &IngestionConfig) -> Self {
        Self {
            repository,
            schema: StatementSchema::from_config(config),
            resolver: CompanyResolver::new(config.company_policy()),
        }
    }

    /// Run one extract request to completion.
    #[instrument(skip(self, request), fields(schema = self.schema.name()))]
    pub async fn ingest(&self, request: ExtractRequest) -> Result<IngestionReceipt, IngestionFailure> {
        let start = Instant::now();

        match self.run(request).await {
            Ok(receipt) => {
                metrics::record_ingestion(start.elapsed().as_secs_f64(), receipt.rows, self.schema.name());
                info!(
                    company_id = receipt.company_id,
                    statements = receipt.statement_ids.len(),
                    rows = receipt.rows,
                    total_ms = start.elapsed().as_millis() as u64,
                    "Workbook ingested successfully"
                );
                Ok(receipt)
            }
            Err(failure) => {
                metrics::record_ingestion_failure(failure.stage.as_str(), &format!("{:?}", failure.error.code()));
                warn!(
                    stage = %failure.stage,
                    error = %failure.error,
                    "Workbook ingestion failed"
                );
                Err(failure)
            }
        }
    }

    async fn run(&self, request: ExtractRequest) -> Result<IngestionReceipt, IngestionFailure> {
        use IngestionStage::*;
        debug!(stage = %Received, "Extract request received");

        let validated = request.validate(self.schema.kind()).at_stage(Validated)?;
        debug!(filename = %validated.filename, company = %validated.company.name, "Request validated");

        let uow = self.repository.begin().await.at_stage(DedupChecked)?;
        let reservation = guard::check_and_reserve(&uow, &validated.filename)
            .await
            .at_stage(DedupChecked)?;

        let resolution = self
            .resolver
            .resolve(&uow, validated.company)
            .await
            .at_stage(CompanyResolved)?;
        let company_id = resolution.company.id;

        let table = self.schema.parse(&validated.bytes).at_stage(Parsed)?;
        debug!(sheet = %table.sheet, rows = table.rows.len(), "Workbook parsed");

        let rows = normalize_rows(table.rows);
        let payloads = self.schema.payloads(&rows);
        debug!(rows = rows.len(), statements = payloads.len(), "Rows normalized");

        let uploaded_file = reservation.bind(&uow, company_id).await.at_stage(Persisted)?;
        let mut statement_ids = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let statement = uow
                .insert_statement(company_id, payload)
                .await
                .at_stage(Persisted)?;
            statement_ids.push(statement.id);
        }
        uow.commit().await.at_stage(Persisted)?;

        Ok(IngestionReceipt {
            company_id,
            company_created: resolution.created,
            uploaded_file_id: uploaded_file.id,
            statement_ids,
            rows: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{CompanyFields, UploadedWorkbook};
    use finsheet_common::db::test_support::memory_repository;
    use crate::workbook::test_support::{xlsx, Cell, Cell::*};
    use finsheet_common::config::{CompanyPolicy, StatementSchemaKind};

    fn rich_config() -> IngestionConfig {
        IngestionConfig::default()
    }

    fn flat_config() -> IngestionConfig {
        IngestionConfig {
            schema: StatementSchemaKind::Flat,
            ..IngestionConfig::default()
        }
    }

    fn snapshot_workbook() -> Vec<u8> {
        xlsx(&[(
            "Snapshot",
            vec![
                vec![S("Metric"), S("Q1"), S("Note")],
                vec![S("Revenue"), N(12.5), S("audited")],
                vec![],
                vec![S("Costs"), N(4.25), Blank],
                vec![S("Margin"), S("N/A"), S("estimate")],
            ],
        )])
    }

    fn task_workbook(rows: Vec<Vec<Cell>>) -> Vec<u8> {
        let mut sheet: Vec<Vec<Cell>> = vec![vec![S("Task report")], vec![], vec![], vec![], vec![]];
        sheet.push(vec![S("Project Name"), S("Task Name"), S("Assigned to"), S("Progress")]);
        sheet.extend(rows);
        xlsx(&[("Sheet1", sheet)])
    }

    fn rich_request(filename: &str, company: &str, bytes: Vec<u8>) -> ExtractRequest {
        ExtractRequest {
            file: Some(UploadedWorkbook {
                filename: Some(filename.to_string()),
                bytes,
            }),
            fields: CompanyFields {
                company_name: Some(company.to_string()),
                country: Some("USA".into()),
                stock_symbol: Some("acme".into()),
                sector: Some("Tech".into()),
                stock_price: Some("12.5".into()),
                gdp_change: Some("1.1".into()),
            },
        }
    }

    fn flat_request(filename: &str, company: &str, bytes: Vec<u8>) -> ExtractRequest {
        ExtractRequest {
            file: Some(UploadedWorkbook {
                filename: Some(filename.to_string()),
                bytes,
            }),
            fields: CompanyFields {
                company_name: Some(company.to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_rich_ingestion_persists_one_statement_with_all_rows() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &rich_config());

        let receipt = processor
            .ingest(rich_request("acme-q1.xlsx", "Acme Corp", snapshot_workbook()))
            .await
            .unwrap();

        assert!(receipt.company_created);
        assert_eq!(receipt.rows, 3);
        assert_eq!(receipt.statement_ids.len(), 1);

        let company = repo.find_company_by_id(receipt.company_id).await.unwrap().unwrap();
        assert_eq!(company.name, "acme corp");
        assert_eq!(company.stock_symbol.as_deref(), Some("ACME"));
        assert_eq!(company.stock_price, Some(12.5));

        let statements = repo.list_statements_for_company(company.id).await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].data,
            Some(serde_json::json!([
                {"Metric": "Revenue", "Q1": "12.5", "Note": "audited"},
                {"Metric": "Costs", "Q1": "4.25", "Note": null},
                {"Metric": "Margin", "Q1": null, "Note": "estimate"},
            ]))
        );
    }

    #[tokio::test]
    async fn test_resubmitted_filename_is_rejected_without_writes() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &rich_config());

        processor
            .ingest(rich_request("report.xlsx", "Acme Corp", snapshot_workbook()))
            .await
            .unwrap();

        let failure = processor
            .ingest(rich_request("report.xlsx", "Globex", snapshot_workbook()))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, IngestionStage::DedupChecked);
        assert!(matches!(failure.error, AppError::AlreadyUploaded { .. }));

        let companies = repo.list_companies().await.unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(repo.list_statements_for_company(companies[0].id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_filenames_compare_case_sensitively() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &flat_config());
        let bytes = task_workbook(vec![vec![S("Apollo"), S("Design"), S("Kim"), N(0.5)]]);

        processor.ingest(flat_request("tasks.xlsx", "acme", bytes.clone())).await.unwrap();
        processor.ingest(flat_request("Tasks.xlsx", "acme", bytes)).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_number_writes_nothing() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &rich_config());

        let mut request = rich_request("acme.xlsx", "Acme Corp", snapshot_workbook());
        request.fields.gdp_change = Some("not-a-number".into());

        let failure = processor.ingest(request).await.unwrap_err();
        assert_eq!(failure.stage, IngestionStage::Validated);
        assert!(matches!(failure.error, AppError::Validation { .. }));
        assert!(repo.list_companies().await.unwrap().is_empty());
        assert!(repo.find_uploaded_file("acme.xlsx").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_existing_company() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &rich_config());

        processor
            .ingest(rich_request("one.xlsx", "Acme Corp", snapshot_workbook()))
            .await
            .unwrap();

        let failure = processor
            .ingest(rich_request("two.xlsx", " ACME corp", snapshot_workbook()))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, IngestionStage::CompanyResolved);
        assert!(matches!(failure.error, AppError::DuplicateCompany { ref name } if name == "acme corp"));
        assert!(repo.find_uploaded_file("two.xlsx").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_no_orphan_company() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &rich_config());

        let failure = processor
            .ingest(rich_request("broken.xlsx", "Acme Corp", b"not a workbook".to_vec()))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, IngestionStage::Parsed);
        assert!(matches!(failure.error, AppError::InvalidFormat { .. }));
        assert!(repo.list_companies().await.unwrap().is_empty());
        assert!(repo.find_uploaded_file("broken.xlsx").await.unwrap().is_none());

        // The filename stays available for a corrected upload
        processor
            .ingest(rich_request("broken.xlsx", "Acme Corp", snapshot_workbook()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_sheet_is_reported() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &rich_config());
        let bytes = xlsx(&[("Summary", vec![vec![S("Metric")]])]);

        let failure = processor
            .ingest(rich_request("summary.xlsx", "Acme Corp", bytes))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, IngestionStage::Parsed);
        assert!(matches!(failure.error, AppError::MissingSheet { ref sheet } if sheet == "Snapshot"));
        assert!(repo.list_companies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flat_ingestion_one_statement_per_row_and_upsert() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &flat_config());

        let first = processor
            .ingest(flat_request(
                "jan.xlsx",
                "Acme ",
                task_workbook(vec![
                    vec![S("Apollo"), S("Design"), S("Kim"), N(0.5)],
                    vec![],
                    vec![S("Apollo"), S("Build"), Blank, S("started")],
                ]),
            ))
            .await
            .unwrap();
        assert_eq!(first.rows, 2);
        assert_eq!(first.statement_ids.len(), 2);
        assert!(first.company_created);

        let second = processor
            .ingest(flat_request(
                "feb.xlsx",
                "acme",
                task_workbook(vec![vec![S("Gemini"), S("Test"), S("Lee"), N(1.0)]]),
            ))
            .await
            .unwrap();
        assert_eq!(second.company_id, first.company_id);
        assert!(!second.company_created);

        let statements = repo.list_statements_for_company(first.company_id).await.unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].progress.as_deref(), Some("0.5"));
        assert_eq!(statements[1].assigned_to, None);
        assert_eq!(statements[2].progress.as_deref(), Some("1.0"));
    }

    #[tokio::test]
    async fn test_flat_schema_mismatch_rolls_back() {
        let repo = memory_repository().await;
        let processor = IngestionProcessor::new(repo.clone(), &flat_config());
        let bytes = xlsx(&[(
            "Sheet1",
            vec![vec![], vec![], vec![], vec![], vec![], vec![S("Project Name"), S("Owner")]],
        )]);

        let failure = processor
            .ingest(flat_request("tasks.xlsx", "acme", bytes))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, AppError::SchemaMismatch { .. }));
        assert!(repo.list_companies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flat_schema_with_strict_policy() {
        let repo = memory_repository().await;
        let config = IngestionConfig {
            company_policy: Some(CompanyPolicy::Strict),
            ..flat_config()
        };
        let processor = IngestionProcessor::new(repo.clone(), &config);
        let bytes = task_workbook(vec![vec![S("Apollo"), S("Design"), S("Kim"), N(0.5)]]);

        processor.ingest(flat_request("a.xlsx", "acme", bytes.clone())).await.unwrap();
        let failure = processor
            .ingest(flat_request("b.xlsx", "Acme", bytes))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, AppError::DuplicateCompany { .. }));
    }

    #[test]
    fn test_failure_converts_to_originating_error() {
        let failure = IngestionFailure {
            stage: IngestionStage::Parsed,
            error: AppError::MissingSheet { sheet: "Snapshot".into() },
        };
        assert_eq!(
            failure.to_string(),
            "ingestion failed before reaching parsed: Sheet 'Snapshot' not found in workbook"
        );
        let error: AppError = failure.into();
        assert!(matches!(error, AppError::MissingSheet { .. }));
    }
}
