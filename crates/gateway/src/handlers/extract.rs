//! Workbook upload handler

use crate::AppState;
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use finsheet_common::errors::{ApiResponse, AppError, Result};
use finsheet_ingestion::{ExtractRequest, IngestionReceipt, UploadedWorkbook};
use tracing::{debug, instrument};

/// Ingest an uploaded workbook for a company.
///
/// Form fields: `file` plus `company_name`, `country`, `stock_symbol`,
/// `sector`, `stock_price` and `gdp_change`.
#[instrument(skip(state, multipart))]
pub async fn extract(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<IngestionReceipt>>> {
    let mut multipart = multipart.map_err(|rejection| AppError::Validation {
        message: rejection.body_text(),
        field: None,
    })?;

    let limit = state.config.server.max_upload_bytes;
    let request = read_request(&mut multipart, limit).await?;

    let receipt = state.processor.ingest(request).await?;
    Ok(Json(ApiResponse::ok(
        "Financial statements added successfully",
        receipt,
    )))
}

async fn read_request(multipart: &mut Multipart, limit: usize) -> Result<ExtractRequest> {
    let mut request = ExtractRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let fields = &mut request.fields;

        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
                request.file = Some(UploadedWorkbook {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            "company_name" => fields.company_name = Some(text(field, limit).await?),
            "country" => fields.country = Some(text(field, limit).await?),
            "stock_symbol" => fields.stock_symbol = Some(text(field, limit).await?),
            "sector" => fields.sector = Some(text(field, limit).await?),
            "stock_price" => fields.stock_price = Some(text(field, limit).await?),
            "gdp_change" => fields.gdp_change = Some(text(field, limit).await?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(request)
}

async fn text(field: Field<'_>, limit: usize) -> Result<String> {
    field.text().await.map_err(|e| multipart_error(e, limit))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation {
            message: err.body_text(),
            field: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{get, send, test_app, test_app_with};
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use finsheet_common::config::{AppConfig, StatementSchemaKind};
    use rust_xlsxwriter::Workbook;

    const BOUNDARY: &str = "finsheet-test-boundary";

    fn upload(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/extract")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn company_fields(name: &str) -> Vec<(&str, &str)> {
        vec![
            ("company_name", name),
            ("country", "USA"),
            ("stock_symbol", "acme"),
            ("sector", "Tech"),
            ("stock_price", "12.5"),
            ("gdp_change", "-0.3"),
        ]
    }

    fn snapshot_workbook(sheet_name: &str) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name).unwrap();
        sheet.write_string(0, 0, "Metric").unwrap();
        sheet.write_string(0, 1, "Value").unwrap();
        sheet.write_string(1, 0, "Revenue").unwrap();
        sheet.write_number(1, 1, 1200.0).unwrap();
        sheet.write_string(3, 0, "Margin").unwrap();
        sheet.write_string(3, 1, "N/A").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn task_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for row in 0..5 {
            sheet.write_string(row, 0, "Weekly status").unwrap();
        }
        for (col, header) in ["Project Name", "Task Name", "Assigned to", "Progress"]
            .iter()
            .enumerate()
        {
            sheet.write_string(5, col as u16, *header).unwrap();
        }
        sheet.write_string(6, 0, "Apollo").unwrap();
        sheet.write_string(6, 1, "Design").unwrap();
        sheet.write_string(6, 2, "Kim").unwrap();
        sheet.write_number(6, 3, 0.5).unwrap();
        sheet.write_string(7, 0, "Apollo").unwrap();
        sheet.write_string(7, 1, "Build").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[tokio::test]
    async fn test_unparseable_number_writes_nothing() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Snapshot");

        let mut fields = company_fields("Acme Corp");
        fields[5] = ("gdp_change", "not-a-number");
        let (status, body) = send(&app, upload(&fields, Some(("acme.xlsx", &workbook)))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Invalid data type provided for stock price or GDP change"
        );
        assert_eq!(body["data"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(&app, get("/api/v1/companies")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_whitespace_only_number_writes_nothing() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Snapshot");

        let mut fields = company_fields("Acme Corp");
        fields[4] = ("stock_price", "   ");
        let (status, body) = send(&app, upload(&fields, Some(("acme.xlsx", &workbook)))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Invalid data type provided for stock price or GDP change"
        );
        assert_eq!(body["data"]["field"], "stock_price");

        let (status, _) = send(&app, get("/api/v1/companies")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let mut config = AppConfig::default();
        config.server.max_upload_bytes = 512;
        let app = test_app_with(config).await;
        let workbook = snapshot_workbook("Snapshot");
        assert!(workbook.len() > 512);

        let (status, body) = send(
            &app,
            upload(&company_fields("Acme Corp"), Some(("acme.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(body["message"], "Upload exceeds the limit of 512 bytes");

        let (status, _) = send(&app, get("/api/v1/companies")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rich_upload_then_read_back() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Snapshot");

        let (status, body) = send(
            &app,
            upload(&company_fields("  Acme Corp "), Some(("acme.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Financial statements added successfully");
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["rows"], 2);
        let company_id = body["data"]["company_id"].as_i64().unwrap();

        let (status, body) = send(&app, get("/api/v1/companies")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "acme corp");
        assert_eq!(body["data"][0]["stock_symbol"], "ACME");
        assert_eq!(body["data"][0]["stock_price"], 12.5);

        let (status, body) = send(&app, get(&format!("/api/v1/financials/{company_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Financial statements retrieved successfully");
        assert_eq!(
            body["data"][0]["data"],
            serde_json::json!([
                {"Metric": "Revenue", "Value": "1200.0"},
                {"Metric": "Margin", "Value": null},
            ])
        );
    }

    #[tokio::test]
    async fn test_same_filename_twice_is_rejected() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Snapshot");

        let (status, _) = send(
            &app,
            upload(&company_fields("Acme Corp"), Some(("q1.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            upload(&company_fields("Globex"), Some(("q1.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "File has already been uploaded for another company"
        );
        assert_eq!(body["data"]["code"], "ALREADY_UPLOADED");

        let (_, body) = send(&app, get("/api/v1/companies")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rich_upload_rejects_existing_company() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Snapshot");

        let (status, _) = send(
            &app,
            upload(&company_fields("Acme Corp"), Some(("q1.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            upload(&company_fields("ACME CORP"), Some(("q2.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Company already exists");
        assert_eq!(body["data"]["code"], "DUPLICATE_COMPANY");
    }

    #[tokio::test]
    async fn test_rich_upload_requires_every_field() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Snapshot");

        let mut fields = company_fields("Acme Corp");
        fields.remove(3);
        let (status, body) = send(&app, upload(&fields, Some(("acme.xlsx", &workbook)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "All fields are required");
        assert_eq!(body["data"]["field"], "sector");

        let (status, body) = send(&app, upload(&company_fields("Acme Corp"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["field"], "file");
    }

    #[tokio::test]
    async fn test_missing_sheet_rolls_back_company() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let workbook = snapshot_workbook("Summary");

        let (status, body) = send(
            &app,
            upload(&company_fields("Acme Corp"), Some(("acme.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["data"]["code"], "MISSING_SHEET");

        let (status, _) = send(&app, get("/api/v1/companies")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The filename was not consumed by the failed attempt
        let workbook = snapshot_workbook("Snapshot");
        let (status, _) = send(
            &app,
            upload(&company_fields("Acme Corp"), Some(("acme.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_flat_upload_stores_one_statement_per_row() {
        let app = test_app(StatementSchemaKind::Flat).await;
        let workbook = task_workbook();

        let (status, body) = send(
            &app,
            upload(&[("company_name", "Acme")], Some(("tasks-1.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["company_created"], true);
        assert_eq!(body["data"]["statement_ids"].as_array().unwrap().len(), 2);
        let company_id = body["data"]["company_id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            upload(&[("company_name", "acme ")], Some(("tasks-2.xlsx", &workbook))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["company_created"], false);
        assert_eq!(body["data"]["company_id"].as_i64().unwrap(), company_id);

        let (_, body) = send(&app, get(&format!("/api/v1/financials/{company_id}"))).await;
        let statements = body["data"].as_array().unwrap();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0]["task_name"], "Design");
        assert_eq!(statements[0]["progress"], "0.5");
        assert_eq!(statements[1]["assigned_to"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_flat_upload_without_company_name() {
        let app = test_app(StatementSchemaKind::Flat).await;
        let workbook = task_workbook();

        let (status, body) = send(&app, upload(&[], Some(("tasks.xlsx", &workbook)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file or company name provided");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_rejected() {
        let app = test_app(StatementSchemaKind::Rich).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/extract")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }
}
