//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use std::time::Duration;

use async_trait::async_trait;
use caixa_core::ai::{InvokeRequest, MockBackend};
use caixa_core::import::{ImportStatus, SUCCESS_RESET_DELAY};
use caixa_core::models::{NewTransaction, PaymentMethod, TransactionSource, TransactionType};
use caixa_core::models::Category;
use chrono::{Datelike, Local};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "caixa-test-boundary";

struct TestApp {
    app: Router,
    db: Database,
    mock: MockBackend,
    _uploads: TempDir,
}

fn build_app(config: ServerConfig, with_ai: bool) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::new();
    let settings = CaixaConfig {
        upload_dir: uploads.path().to_path_buf(),
        ..CaixaConfig::default()
    };
    let ai = with_ai.then(|| AIClient::Mock(mock.clone()));
    let state = AppState::new(
        db.clone(),
        config,
        ai,
        &settings,
        PromptLibrary::embedded_only(),
    );

    TestApp {
        app: create_router_with_state(Arc::new(state), None),
        db,
        mock,
        _uploads: uploads,
    }
}

fn setup_test_app() -> TestApp {
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    build_app(config, true)
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_upload(file_name: &str, content: &str, bank_account: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    if let Some(account) = bank_account {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"bank_account\"\r\n\r\n{account}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method("POST")
        .uri("/api/import")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-caixa-user", "financeiro@padaria.com.br")
        .body(Body::from(body))
        .unwrap()
}

fn statement_csv() -> &'static str {
    "Data,Descrição,Valor\n05/03/2024,PIX RECEBIDO,\"900,00\"\n06/03/2024,ALUGUEL,\"-1.800,00\"\n"
}

fn script_successful_import(mock: &MockBackend) {
    mock.push_json(json!({"transactions": [
        {"date": "2024-03-05", "description": "PIX RECEBIDO", "amount": 900.0, "type": "income"},
        {"date": "2024-03-06", "description": "ALUGUEL", "amount": -1800.0, "type": "expense"}
    ]}));
    mock.push_json(json!({"categories": [
        {"index": 0, "category": "vendas"},
        {"index": 1, "category": "aluguel"}
    ]}));
}

fn seed(db: &Database, date: &str, amount: f64, kind: TransactionType, category: Category) -> i64 {
    db.create_transaction(&NewTransaction {
        date: date.to_string(),
        description: "Lançamento".to_string(),
        amount: kind.signed(amount),
        transaction_type: kind,
        category,
        payment_method: PaymentMethod::Pix,
        bank_account: "Nubank".to_string(),
        notes: None,
        source: TransactionSource::Manual,
        created_by: None,
    })
    .unwrap()
}

// ========== Auth & Meta ==========

#[tokio::test]
async fn test_health_is_public() {
    let t = build_app(ServerConfig::default(), false);

    let response = t.app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["llm_configured"], false);
}

#[tokio::test]
async fn test_api_key_required() {
    let config = ServerConfig {
        require_auth: true,
        api_keys: vec!["s3cret-key".to_string()],
        ..Default::default()
    };
    let t = build_app(config, false);

    let response = t.app.clone().oneshot(get("/api/transactions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/transactions")
        .header("authorization", "Bearer wrong-key")
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .uri("/api/transactions")
        .header("authorization", "Bearer s3cret-key")
        .body(Body::empty())
        .unwrap();
    let response = t.app.oneshot(authorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc123".to_string(), "other".to_string()];
    assert!(validate_api_key("abc123", &keys));
    assert!(validate_api_key("other", &keys));
    assert!(!validate_api_key("abc12", &keys));
    assert!(!validate_api_key("", &[]));
}

#[tokio::test]
async fn test_security_headers() {
    let t = setup_test_app();
    let response = t.app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_list_categories() {
    let t = setup_test_app();
    let response = t.app.oneshot(get("/api/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["income"].as_array().unwrap().len(), 5);
    assert_eq!(json["expense"].as_array().unwrap().len(), 11);
    assert_eq!(json["income"][0]["id"], "vendas");
}

// ========== Transactions ==========

#[tokio::test]
async fn test_create_manual_transaction() {
    let t = setup_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/transactions")
        .header("content-type", "application/json")
        .header("x-caixa-user", "dona@padaria.com.br")
        .body(Body::from(
            json!({
                "date": "2024-04-05",
                "description": "Aluguel abril",
                "amount": 2500,
                "type": "expense",
                "category": "aluguel",
                "payment_method": "boleto",
                "bank_account": "Itaú"
            })
            .to_string(),
        ))
        .unwrap();
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_body_json(response).await;
    assert_eq!(json["amount"], -2500.0);
    assert_eq!(json["source"], "manual");
    assert_eq!(json["category"], "aluguel");
    assert_eq!(json["created_by"], "dona@padaria.com.br");
}

#[tokio::test]
async fn test_create_transaction_validation() {
    let t = setup_test_app();

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/transactions",
            json!({"date": "2024-04-05", "description": "Nada", "amount": 0, "type": "income"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/transactions",
            json!({"date": "2024-04-05", "description": "Venda", "amount": 10, "type": "income", "category": "aluguel"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_transactions_filters_and_paging() {
    let t = setup_test_app();
    seed(&t.db, "2024-01-10", 100.0, TransactionType::Income, Category::Vendas);
    seed(&t.db, "2024-01-11", 40.0, TransactionType::Expense, Category::Transporte);
    seed(&t.db, "2024-01-12", 60.0, TransactionType::Expense, Category::Alimentacao);

    let response = t
        .app
        .clone()
        .oneshot(get("/api/transactions?type=expense&limit=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["limit"], 1);
    let txs = json["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["date"], "2024-01-12");

    let response = t
        .app
        .oneshot(get("/api/transactions?from=10/01/2024"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_transaction() {
    let t = setup_test_app();
    let id = seed(&t.db, "2024-01-10", 100.0, TransactionType::Income, Category::Vendas);

    let delete = |id: i64| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/transactions/{}", id))
            .body(Body::empty())
            .unwrap()
    };

    let response = t.app.clone().oneshot(delete(id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.db.get_transaction(id).unwrap().is_none());

    let response = t.app.oneshot(delete(id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Import ==========

#[tokio::test]
async fn test_import_statement() {
    let t = setup_test_app();
    script_successful_import(&t.mock);

    let response = t
        .app
        .clone()
        .oneshot(multipart_upload("extrato.csv", statement_csv(), Some("Nubank")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 2);
    assert_eq!(json["skipped"], 0);

    let stored = t.db.list_transactions(&Default::default()).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|tx| tx.bank_account == "Nubank"));
    assert!(stored
        .iter()
        .all(|tx| tx.created_by.as_deref() == Some("financeiro@padaria.com.br")));

    let response = t.app.oneshot(get("/api/import/status")).await.unwrap();
    let status = get_body_json(response).await;
    assert_eq!(status["status"], "success");
    assert_eq!(status["progress"], 100);
    assert_eq!(status["imported"], 2);
}

#[tokio::test]
async fn test_import_requires_bank_account() {
    let t = setup_test_app();

    let response = t
        .app
        .clone()
        .oneshot(multipart_upload("extrato.csv", statement_csv(), Some("  ")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Conta bancária obrigatória");
    assert_eq!(t.mock.call_count(), 0);

    let response = t
        .app
        .oneshot(multipart_upload("extrato.csv", statement_csv(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_import_without_llm_unavailable() {
    let config = ServerConfig {
        require_auth: false,
        ..Default::default()
    };
    let t = build_app(config, false);

    let response = t
        .app
        .clone()
        .oneshot(multipart_upload("extrato.csv", statement_csv(), Some("Nubank")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = t.app.oneshot(get("/api/import/status")).await.unwrap();
    let status = get_body_json(response).await;
    assert_eq!(status["status"], "idle");
}

#[tokio::test]
async fn test_import_failure_then_retry() {
    let t = setup_test_app();
    t.mock.push_json(json!({"transactions": []}));

    let response = t
        .app
        .clone()
        .oneshot(multipart_upload("extrato.csv", statement_csv(), Some("Nubank")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Nenhuma transação encontrada");
    assert!(json["detail"].as_str().unwrap().contains("Verifique"));

    let response = t.app.clone().oneshot(get("/api/import/status")).await.unwrap();
    let status = get_body_json(response).await;
    assert_eq!(status["status"], "error");
    assert_eq!(status["error"]["title"], "Nenhuma transação encontrada");

    script_successful_import(&t.mock);
    let retry = Request::builder()
        .method("POST")
        .uri("/api/import/retry")
        .body(Body::empty())
        .unwrap();
    let response = t.app.oneshot(retry).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 2);
    // One extraction for the failed run, then extraction + categorization
    assert_eq!(t.mock.call_count(), 3);
}

/// Mock backend that answers each call after a fixed delay
struct SlowBackend {
    inner: MockBackend,
    delay: Duration,
}

#[async_trait]
impl LlmBackend for SlowBackend {
    async fn invoke(&self, request: &InvokeRequest) -> caixa_core::Result<Value> {
        tokio::time::sleep(self.delay).await;
        self.inner.invoke(request).await
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn host(&self) -> &str {
        self.inner.host()
    }
}

#[tokio::test]
async fn test_import_resets_after_client_disconnects() {
    let uploads = TempDir::new().unwrap();
    let db = Database::in_memory().unwrap();
    let mock = MockBackend::new();
    script_successful_import(&mock);

    let backend = SlowBackend {
        inner: mock,
        delay: Duration::from_millis(300),
    };
    let pipeline = ImportPipeline::new(
        Arc::new(backend),
        Arc::new(db.clone()),
        Arc::new(LocalFileStorage::new(uploads.path())),
    )
    .with_prompts(PromptLibrary::embedded_only());
    let progress = pipeline.progress().clone();

    let state = AppState {
        db: db.clone(),
        config: ServerConfig {
            require_auth: false,
            ..Default::default()
        },
        ai: None,
        import: Some(pipeline),
        prompts: PromptLibrary::embedded_only(),
    };
    let app = create_router_with_state(Arc::new(state), None);

    // Hang up long before the two delayed LLM calls complete
    let upload = multipart_upload("extrato.csv", statement_csv(), Some("Nubank"));
    let dropped =
        tokio::time::timeout(Duration::from_millis(100), app.clone().oneshot(upload)).await;
    assert!(dropped.is_err());

    let mut finished = false;
    for _ in 0..60 {
        if progress.snapshot().status == ImportStatus::Success {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(finished);
    assert_eq!(db.list_transactions(&Default::default()).unwrap().len(), 2);

    tokio::time::sleep(SUCCESS_RESET_DELAY + Duration::from_millis(500)).await;
    let response = app.oneshot(get("/api/import/status")).await.unwrap();
    let status = get_body_json(response).await;
    assert_eq!(status["status"], "idle");
    assert_eq!(status["progress"], 0);
}

#[tokio::test]
async fn test_retry_with_nothing_failed() {
    let t = setup_test_app();
    let retry = Request::builder()
        .method("POST")
        .uri("/api/import/retry")
        .body(Body::empty())
        .unwrap();
    let response = t.app.oneshot(retry).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ========== Dashboard & Reports ==========

#[tokio::test]
async fn test_dashboard() {
    let t = setup_test_app();
    seed(&t.db, "2024-02-01", 1000.0, TransactionType::Income, Category::Vendas);
    seed(&t.db, "2024-02-03", 300.0, TransactionType::Expense, Category::Fornecedores);
    seed(&t.db, "2024-03-03", 50.0, TransactionType::Expense, Category::Marketing);

    let response = t
        .app
        .clone()
        .oneshot(get("/api/dashboard?from=2024-02-01&to=2024-02-29"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["total_income"], 1000.0);
    assert_eq!(json["total_expenses"], 300.0);
    assert_eq!(json["balance"], 700.0);
    assert_eq!(json["expenses_by_category"][0]["category"], "fornecedores");

    let response = t
        .app
        .oneshot(get("/api/dashboard?to=fevereiro"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_monthly_report_download() {
    let t = setup_test_app();
    seed(&t.db, "2024-01-15", 500.0, TransactionType::Income, Category::Servicos);
    seed(&t.db, "2024-02-15", 120.5, TransactionType::Expense, Category::Impostos);

    let response = t
        .app
        .oneshot(get("/api/reports/monthly.csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("relatorio_mensal.csv"));

    let body = get_body_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "Mês,Receitas,Despesas,Saldo");
    assert_eq!(lines[1], "01/2024,500.00,0.00,500.00");
    assert_eq!(lines[2], "02/2024,0.00,120.50,-120.50");
}

// ========== Recurring ==========

#[tokio::test]
async fn test_recurring_lifecycle() {
    let t = setup_test_app();
    let today = Local::now().date_naive();

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/recurring",
            json!({
                "description": "Internet da loja",
                "amount": 149.9,
                "category": "servicos_publicos",
                "due_day": today.day()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["active"], true);

    let response = t
        .app
        .clone()
        .oneshot(get("/api/recurring/upcoming"))
        .await
        .unwrap();
    let upcoming = get_body_json(response).await;
    assert_eq!(upcoming.as_array().unwrap().len(), 1);
    assert_eq!(upcoming[0]["days_until"], 0);
    assert_eq!(upcoming[0]["description"], "Internet da loja");

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "PATCH",
            &format!("/api/recurring/{}", id),
            json!({"active": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["active"], false);

    let response = t
        .app
        .clone()
        .oneshot(get("/api/recurring/upcoming?days=30"))
        .await
        .unwrap();
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/recurring/{}", id))
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.app.oneshot(get("/api/recurring")).await.unwrap();
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recurring_validation() {
    let t = setup_test_app();

    let response = t
        .app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/recurring",
            json!({"description": "Aluguel", "amount": 2000, "category": "aluguel", "due_day": 40}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = t
        .app
        .oneshot(send_json(
            "PATCH",
            "/api/recurring/999",
            json!({"active": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Chat ==========

#[tokio::test]
async fn test_chat() {
    let t = setup_test_app();
    seed(&t.db, "2024-02-01", 1000.0, TransactionType::Income, Category::Vendas);
    t.mock.push_text("Seu saldo está positivo.");

    let response = t
        .app
        .oneshot(send_json(
            "POST",
            "/api/chat",
            json!({
                "question": "Como está meu caixa?",
                "history": [{"role": "user", "content": "Olá"}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_body_json(response).await["answer"],
        "Seu saldo está positivo."
    );

    let calls = t.mock.calls();
    assert!(calls[0].prompt.contains("Receitas: R$ 1000.00"));
}

#[tokio::test]
async fn test_chat_rejects_empty_question() {
    let t = setup_test_app();
    let response = t
        .app
        .oneshot(send_json("POST", "/api/chat", json!({"question": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
