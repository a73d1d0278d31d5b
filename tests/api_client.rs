//! API client against a local test server
#![cfg(feature = "api")]

use quotepress::api::{ApiClient, MemoryTokenStore, TokenStore};
use quotepress::invoice::InvoiceStatus;
use quotepress::Error;
use std::sync::{Arc, Once};
use tiny_http::{Header, Response, Server};

static INIT: Once = Once::new();
const ADDR: &str = "127.0.0.1:18093";

const INVOICE: &str = r#"{
    "_id": "665f1c",
    "invoiceNumber": "QT-2024-1042",
    "date": "2024-06-01",
    "clientName": "Acme Builders",
    "items": [{"id": "a", "width": 914.4, "height": 1524, "pricePerSqft": 450, "quantity": 2}],
    "status": "accepted"
}"#;

/// Start a simple API server; only `Bearer good` is accepted
fn start_test_server() -> String {
    INIT.call_once(|| {
        let server = Server::http(ADDR).unwrap();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let authorized = request
                    .headers()
                    .iter()
                    .any(|h| h.field.equiv("Authorization") && h.value.as_str() == "Bearer good");
                let url = request.url().to_string();
                let (status, body) = if !authorized {
                    (401, r#"{"message": "Token expired"}"#.to_string())
                } else {
                    match url.as_str() {
                        "/api/invoices/665f1c" | "/api/invoices/number/QT-2024-1042" => {
                            (200, format!(r#"{{"success": true, "data": {}}}"#, INVOICE))
                        }
                        "/api/invoices/search/query?q=Acme+Builders" => {
                            (200, format!(r#"{{"success": true, "data": [{}]}}"#, INVOICE))
                        }
                        "/api/clients" => (
                            200,
                            r#"{"success": true, "data": [{"_id": "c1", "name": "Acme Builders", "address": "12 MG Road", "phone": "080"}],
                                "pagination": {"total": 1, "page": 1, "limit": 10}}"#
                                .to_string(),
                        ),
                        "/api/invoices/broken" => (200, "not json".to_string()),
                        _ => (404, r#"{"success": false, "error": "Invoice not found"}"#.to_string()),
                    }
                };
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header("Content-Type: application/json".parse::<Header>().unwrap());
                let _ = request.respond(response);
            }
        });
    });
    format!("http://{}/api", ADDR)
}

fn client(token: Option<&str>) -> (ApiClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    let client = ApiClient::new(&start_test_server(), store.clone()).unwrap();
    (client, store)
}

#[test]
fn fetches_invoice_by_id_and_number() {
    let (api, _) = client(Some("good"));
    let by_id = api.get_invoice("665f1c").unwrap();
    let by_number = api.get_invoice_by_number("QT-2024-1042").unwrap();

    assert_eq!(by_id, by_number);
    assert_eq!(by_id.id.as_deref(), Some("665f1c"));
    assert_eq!(by_id.status, InvoiceStatus::Accepted);
    assert!((by_id.totals().subtotal - 13500.0).abs() < 1e-6);
}

#[test]
fn lists_clients_and_searches() {
    let (api, _) = client(Some("good"));
    let clients = api.list_clients().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, "c1");

    let found = api.search_invoices("Acme Builders").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].client_name, "Acme Builders");
}

#[test]
fn unauthorized_clears_the_token() {
    let (api, store) = client(Some("stale"));
    let err = api.get_invoice("665f1c").unwrap_err();
    assert!(matches!(err, Error::ApiError(ref m) if m == "unauthorized"));
    assert_eq!(store.get(), None);

    let (anonymous, _) = client(None);
    assert!(matches!(anonymous.list_clients(), Err(Error::ApiError(_))));
}

#[test]
fn server_errors_carry_the_server_message() {
    let (api, store) = client(Some("good"));
    let err = api.get_invoice("nope").unwrap_err();
    assert!(matches!(err, Error::ApiError(ref m) if m == "Invoice not found"));
    assert_eq!(store.get().as_deref(), Some("good"));

    assert!(matches!(api.get_invoice("broken"), Err(Error::ApiError(_))));
}
