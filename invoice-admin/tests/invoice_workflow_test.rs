//! End-to-end invoice workflow against a real database.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Datelike, Utc};
use common::{database_app, send};
use serde_json::{json, Value};

async fn create_party(app: &axum::Router) -> (String, String) {
    let (status, company) = send(
        app,
        Method::POST,
        "/companies",
        Some(json!({"name": "Alpa Trading", "address": "1 Main St"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let company_id = company["company_id"].as_str().unwrap().to_string();

    let (status, client) = send(
        app,
        Method::POST,
        "/clients",
        Some(json!({"name": "Client A", "email": "a@example.com", "company_ids": [company_id]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["companies"][0]["company_id"], company_id.as_str());
    let client_id = client["client_id"].as_str().unwrap().to_string();

    (company_id, client_id)
}

fn invoice_body(company_id: &str, client_id: &str, status: &str) -> Value {
    json!({
        "company_id": company_id,
        "client_id": client_id,
        "date": "2025-03-01",
        "payment_terms": "bank transfer",
        "status": status,
        "attachments": ["receipts/march.pdf"],
        "items": [
            {"description": "Design", "quantity": "2", "unit_price": "50", "cost_price": "30"},
            {"description": "Hosting", "quantity": "1", "unit_price": "20", "cost_price": "5"}
        ]
    })
}

fn sequence(number: &str) -> u64 {
    number.rsplit('-').next().unwrap().parse().unwrap()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn create_update_delete_invoice() {
    // Arrange
    let app = database_app().await;
    let (company_id, client_id) = create_party(&app).await;

    // Act: create
    let (status, created) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(invoice_body(&company_id, &client_id, "unpaid")),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    let number = created["invoice_number"].as_str().unwrap().to_string();
    assert!(number.starts_with(&format!("#ALPA-{}-", Utc::now().year())));
    assert_eq!(created["subtotal"], "120.00");
    assert_eq!(created["tax_amount"], "0.00");
    assert_eq!(created["total"], "120.00");
    assert_eq!(created["payment_terms"], "bank_transfer");
    assert_eq!(created["items"][0]["line_total"], "100.00");
    assert_eq!(created["items"][1]["line_total"], "20.00");

    // Act: replace items
    let invoice_id = created["invoice_id"].as_str().unwrap().to_string();
    let mut update = invoice_body(&company_id, &client_id, "partially_paid");
    update["balance_due"] = json!("40");
    update["attachments"] = json!(["receipts/april.pdf"]);
    update["items"] = json!([{"description": "Support", "quantity": "3", "unit_price": "10"}]);
    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/invoices/{}", invoice_id),
        Some(update),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["invoice_number"], number.as_str());
    assert_eq!(updated["total"], "30.00");
    assert_eq!(updated["items"].as_array().unwrap().len(), 1);
    assert_eq!(
        updated["attachments"],
        json!(["receipts/march.pdf", "receipts/april.pdf"])
    );

    // Printable view hides cost prices
    let (status, document) = send(
        &app,
        Method::GET,
        &format!("/invoices/{}/document", invoice_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(document["items"][0].get("cost_price").is_none());
    assert!(document["settings"]["name"].is_string());

    // Act: delete
    let (status, _) = send(&app, Method::DELETE, &format!("/invoices/{}", invoice_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/invoices/{}", invoice_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The deleted number stays reserved
    let (_, next) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(invoice_body(&company_id, &client_id, "draft")),
    )
    .await;
    let next_number = next["invoice_number"].as_str().unwrap();
    assert!(sequence(next_number) > sequence(&number));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn concurrent_creates_get_distinct_numbers() {
    let app = database_app().await;
    let (company_id, client_id) = create_party(&app).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            let body = invoice_body(&company_id, &client_id, "draft");
            tokio::spawn(async move { send(&app, Method::POST, "/invoices", Some(body)).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        // Exhausted retries are allowed under contention but must be a 409.
        if status == StatusCode::CONFLICT {
            continue;
        }
        assert_eq!(status, StatusCode::CREATED);
        numbers.push(body["invoice_number"].as_str().unwrap().to_string());
    }

    let count = numbers.len();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), count);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn unknown_references_are_field_errors() {
    let app = database_app().await;
    let missing = uuid::Uuid::new_v4().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/invoices",
        Some(invoice_body(&missing, &missing, "draft")),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["company_id"].is_array());
    assert!(body["errors"]["client_id"].is_array());

    let (status, body) = send(
        &app,
        Method::POST,
        "/clients",
        Some(json!({"name": "Ghost", "company_ids": [missing]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["company_ids"][0]["code"], "unknown_company");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn dashboard_and_settings_respond() {
    let app = database_app().await;

    let (status, stats) = send(&app, Method::GET, "/dashboard/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats["yearly_financial"].is_array());
    assert!(stats["invoice_status"]["total"].is_u64());

    let (status, settings) = send(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({"name": "Alpa Ltd", "phone": "555-0100"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["name"], "Alpa Ltd");
    assert!(settings["logo_tagline"].is_string());
}
