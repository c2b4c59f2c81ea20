//! Integration tests for caixa-core
//!
//! These tests drive the full statement import: read → extract → validate →
//! categorize → persist, against a scripted LLM and a real database.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use caixa_core::{
    ai::{InvokeRequest, MockBackend, OpenAICompatibleBackend},
    db::Database,
    error::{Error, Result},
    import::{ImportError, ImportPipeline, ImportRequest, ImportStatus, StatementFile},
    models::{Category, NewTransaction, PaymentMethod, TransactionSource, TransactionType},
    prompts::PromptLibrary,
    storage::LocalFileStorage,
    store::TransactionStore,
    test_utils::MockLlmServer,
    TransactionFilter,
};
use serde_json::{json, Value};

/// Store wrapper that counts bulk writes and can fail on demand
struct CountingStore {
    db: Database,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingStore {
    fn new(db: Database) -> Self {
        Self {
            db,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionStore for CountingStore {
    async fn bulk_create(&self, records: &[NewTransaction]) -> Result<Vec<i64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk full".into()));
        }
        self.db.bulk_create_transactions(records)
    }
}

struct Harness {
    mock: MockBackend,
    store: Arc<CountingStore>,
    db: Database,
    pipeline: ImportPipeline,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mock = MockBackend::new();
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let store = Arc::new(CountingStore::new(db.clone()));
    let pipeline = ImportPipeline::new(
        Arc::new(mock.clone()),
        store.clone(),
        Arc::new(LocalFileStorage::new(dir.path())),
    )
    .with_prompts(PromptLibrary::embedded_only());

    Harness {
        mock,
        store,
        db,
        pipeline,
        _dir: dir,
    }
}

fn nubank_csv() -> &'static str {
    "Data,Descrição,Valor\n\
     05/03/2024,PIX RECEBIDO CLIENTE ACME,\"2.500,00\"\n\
     06/03/2024,PAGAMENTO ALUGUEL SALA,\"-1.800,00\"\n\
     08/03/2024,POSTO SHELL,\"-210,35\"\n"
}

fn csv_request(csv: &str, bank_account: &str) -> ImportRequest {
    ImportRequest {
        file: StatementFile::new("extrato_marco.csv", csv.as_bytes().to_vec()),
        bank_account: bank_account.to_string(),
        created_by: Some("dona@padaria.com.br".to_string()),
    }
}

fn extracted(items: &[(&str, &str, Value, &str)]) -> Value {
    let transactions: Vec<Value> = items
        .iter()
        .map(|(date, description, amount, kind)| {
            json!({"date": date, "description": description, "amount": amount, "type": kind})
        })
        .collect();
    json!({ "transactions": transactions })
}

fn assignments(labels: &[&str]) -> Value {
    let categories: Vec<Value> = labels
        .iter()
        .enumerate()
        .map(|(index, category)| json!({"index": index, "category": category}))
        .collect();
    json!({ "categories": categories })
}

fn is_categorization(call: &InvokeRequest) -> bool {
    call.response_json_schema
        .as_ref()
        .is_some_and(|schema| schema.to_string().contains("categories"))
}

fn categorization_calls(mock: &MockBackend) -> usize {
    mock.calls().iter().filter(|c| is_categorization(c)).count()
}

fn extraction_calls(mock: &MockBackend) -> usize {
    mock.calls().iter().filter(|c| !is_categorization(c)).count()
}

// =============================================================================
// Extraction outcomes
// =============================================================================

#[tokio::test]
async fn test_empty_extraction_stops_before_categorization() {
    let h = harness();
    h.mock.push_json(json!({"transactions": []}));

    let err = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::NoTransactionsFound));
    assert_eq!(h.mock.call_count(), 1);
    assert_eq!(categorization_calls(&h.mock), 0);
    assert_eq!(h.store.calls(), 0);

    let snap = h.pipeline.progress().snapshot();
    assert_eq!(snap.status, ImportStatus::Error);
    assert_eq!(
        snap.error.as_ref().map(|e| e.title.as_str()),
        Some("Nenhuma transação encontrada")
    );
}

#[tokio::test]
async fn test_invalid_items_are_dropped() {
    let h = harness();
    h.mock.push_json(json!({"transactions": [
        {"date": "2024-03-05", "description": "Venda balcão", "amount": 0, "type": "income"},
        {"description": "Sem data", "amount": 10, "type": "expense"},
        {"date": "2024-03-06", "amount": 10, "type": "expense"},
        {"date": "2024-03-07", "description": "Sem valor", "type": "expense"},
        {"date": "2024-03-08", "description": "Sem tipo", "amount": 10},
        {"date": "2024-03-09", "description": "Energia elétrica", "amount": -320.4, "type": "expense"}
    ]}));
    h.mock.push_json(assignments(&["servicos_publicos"]));

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();

    assert_eq!(summary.extracted, 6);
    assert_eq!(summary.skipped, 5);
    assert_eq!(summary.imported, 1);

    let stored = h.db.get_transaction(summary.ids[0]).unwrap().unwrap();
    assert_eq!(stored.description, "Energia elétrica");
    assert_eq!(stored.category, Category::ServicosPublicos);
}

// =============================================================================
// Batch categorization
// =============================================================================

#[tokio::test]
async fn test_batches_of_fifty() {
    let h = harness();
    let items: Vec<(String, f64)> = (0..120)
        .map(|i| (format!("Compra fornecedor {}", i), -(i as f64 + 1.0)))
        .collect();
    h.mock.push_json(json!({
        "transactions": items
            .iter()
            .map(|(d, a)| {
                json!({
                    "date": "2024-03-10",
                    "description": d,
                    "amount": a,
                    "type": "expense"
                })
            })
            .collect::<Vec<_>>()
    }));
    h.mock.push_json(assignments(&["fornecedores"; 50]));
    h.mock.push_json(assignments(&["fornecedores"; 50]));
    h.mock.push_json(assignments(&["fornecedores"; 20]));

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();

    assert_eq!(categorization_calls(&h.mock), 3);
    assert_eq!(summary.categorization.batches, 3);
    assert_eq!(summary.categorization.failed_batches, 0);
    assert_eq!(summary.imported, 120);

    let stored = h
        .db
        .list_transactions(&TransactionFilter::default())
        .unwrap();
    assert_eq!(stored.len(), 120);
    assert!(stored.iter().all(|t| t.category == Category::Fornecedores));
}

#[tokio::test]
async fn test_failed_batch_falls_back_to_defaults() {
    let h = harness();
    h.mock.push_json(extracted(&[
        ("2024-03-05", "PIX RECEBIDO", json!(900.0), "income"),
        ("2024-03-06", "BOLETO FORNECEDOR", json!(-450.0), "expense"),
    ]));
    h.mock.push_failure("model overloaded");

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();

    assert_eq!(summary.categorization.failed_batches, 1);
    assert_eq!(h.store.calls(), 1);

    let income = h.db.get_transaction(summary.ids[0]).unwrap().unwrap();
    let expense = h.db.get_transaction(summary.ids[1]).unwrap().unwrap();
    assert_eq!(income.category, Category::OutrasReceitas);
    assert_eq!(expense.category, Category::OutrasDespesas);
    assert_eq!(
        h.pipeline.progress().snapshot().status,
        ImportStatus::Success
    );
}

#[tokio::test]
async fn test_misaligned_reply_falls_back_for_whole_batch() {
    let h = harness();
    h.mock.push_json(extracted(&[
        ("2024-03-05", "VENDA CARTAO", json!(300.0), "income"),
        ("2024-03-06", "MERCADO", json!(-80.0), "expense"),
    ]));
    // One label for two items
    h.mock.push_json(assignments(&["vendas"]));

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();

    assert_eq!(summary.categorization.failed_batches, 1);
    let first = h.db.get_transaction(summary.ids[0]).unwrap().unwrap();
    assert_eq!(first.category, Category::OutrasReceitas);
}

// =============================================================================
// Persistence mapping
// =============================================================================

#[tokio::test]
async fn test_stored_sign_follows_type() {
    let h = harness();
    h.mock.push_json(extracted(&[
        ("2024-03-01", "Receita positiva", json!(150.0), "income"),
        ("2024-03-01", "Receita negativa", json!(-150.0), "income"),
        ("2024-03-01", "Despesa positiva", json!(42.5), "expense"),
        ("2024-03-01", "Despesa negativa", json!(-42.5), "expense"),
        ("2024-03-01", "Centavo receita", json!(-0.01), "income"),
        ("2024-03-01", "Centavo despesa", json!(0.01), "expense"),
    ]));

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();

    let amounts: Vec<f64> = summary
        .ids
        .iter()
        .map(|id| h.db.get_transaction(*id).unwrap().unwrap().amount)
        .collect();
    assert_eq!(amounts, vec![150.0, 150.0, -42.5, -42.5, 0.01, -0.01]);
}

#[tokio::test]
async fn test_csv_statement_end_to_end() {
    let h = harness();
    h.mock.push_json(extracted(&[
        ("2024-03-05", "PIX RECEBIDO CLIENTE ACME", json!("2.500,00"), "income"),
        ("2024-03-06", "PAGAMENTO ALUGUEL SALA", json!(-1800.0), "expense"),
        ("2024-03-08", "POSTO SHELL", json!(-210.35), "expense"),
    ]));
    h.mock
        .push_json(assignments(&["vendas", "aluguel", "transporte"]));

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(h.store.calls(), 1);

    // The CSV text itself went to the extraction prompt
    let calls = h.mock.calls();
    assert!(calls[0].prompt.contains("POSTO SHELL"));
    assert!(calls[0].file_urls.is_empty());

    let stored = h
        .db
        .list_transactions(&TransactionFilter::default())
        .unwrap();
    assert_eq!(stored.len(), 3);
    for tx in &stored {
        assert_eq!(tx.bank_account, "Nubank");
        assert_eq!(tx.payment_method, PaymentMethod::Transferencia);
        assert_eq!(tx.source, TransactionSource::Import);
        assert!(!tx.category.as_str().is_empty());
        assert!(tx
            .notes
            .as_deref()
            .is_some_and(|n| n.starts_with("Importado automaticamente em")));
        assert_eq!(tx.created_by.as_deref(), Some("dona@padaria.com.br"));
    }

    let income: Vec<_> = stored
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Income)
        .collect();
    assert_eq!(income.len(), 1);
    assert_eq!(income[0].amount, 2500.0);
    assert_eq!(income[0].category, Category::Vendas);
}

#[tokio::test]
async fn test_zero_amount_rows_excluded() {
    let h = harness();
    h.mock.push_json(extracted(&[
        ("2024-03-05", "TARIFA", json!(-12.9), "expense"),
        ("2024-03-05", "TARIFA ESTORNADA", json!(0), "expense"),
    ]));
    h.mock.push_json(assignments(&["outras_despesas"]));

    let summary = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(h.db.count_transactions(&TransactionFilter::default()).unwrap(), 1);
}

#[tokio::test]
async fn test_all_zero_rows_fail_without_bulk_create() {
    let h = harness();
    h.mock.push_json(extracted(&[
        ("2024-03-05", "TARIFA", json!(0), "expense"),
        ("2024-03-05", "ESTORNO", json!("0,00"), "income"),
    ]));

    let err = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::NoValidTransactions));
    assert_eq!(h.store.calls(), 0);
    assert_eq!(categorization_calls(&h.mock), 0);
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn test_retry_after_persistence_failure_reruns_every_stage() {
    let h = harness();
    let statement = extracted(&[
        ("2024-03-05", "PIX RECEBIDO", json!(900.0), "income"),
        ("2024-03-06", "ALUGUEL", json!(-1800.0), "expense"),
    ]);
    h.mock.push_json(statement.clone());
    h.mock.push_json(assignments(&["vendas", "aluguel"]));
    h.store.fail.store(true, Ordering::SeqCst);

    let err = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Persistence(_)));
    assert!(h.pipeline.has_failed_request());
    assert_eq!(extraction_calls(&h.mock), 1);
    assert_eq!(categorization_calls(&h.mock), 1);

    // Second attempt sees a different extraction, proving nothing was cached
    h.store.fail.store(false, Ordering::SeqCst);
    h.mock.push_json(extracted(&[(
        "2024-03-07",
        "PIX RECEBIDO REENVIADO",
        json!(950.0),
        "income",
    )]));
    h.mock.push_json(assignments(&["servicos"]));

    let summary = h.pipeline.retry().await.unwrap();

    assert_eq!(extraction_calls(&h.mock), 2);
    assert_eq!(categorization_calls(&h.mock), 2);
    assert_eq!(h.store.calls(), 2);
    assert_eq!(summary.imported, 1);
    assert!(!h.pipeline.has_failed_request());

    let stored = h.db.get_transaction(summary.ids[0]).unwrap().unwrap();
    assert_eq!(stored.description, "PIX RECEBIDO REENVIADO");
    assert_eq!(stored.bank_account, "Nubank");
}

#[tokio::test]
async fn test_second_run_rejected_while_running() {
    let h = harness();
    assert!(h.pipeline.progress().start());

    let err = h
        .pipeline
        .run(csv_request(nubank_csv(), "Nubank"))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::AlreadyRunning));
    assert_eq!(h.mock.call_count(), 0);
}

// =============================================================================
// Over HTTP
// =============================================================================

#[tokio::test]
async fn test_import_through_openai_compatible_backend() {
    let server = MockLlmServer::start(vec![
        r#"{"transactions": [{"date": "2024-03-05", "description": "VENDA", "amount": 120.0, "type": "income"}]}"#
            .to_string(),
        r#"```json
{"categories": [{"index": 0, "category": "vendas"}]}
```"#
            .to_string(),
    ])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory().unwrap();
    let pipeline = ImportPipeline::new(
        Arc::new(OpenAICompatibleBackend::new(&server.url(), "gpt-4o-mini")),
        Arc::new(db.clone()),
        Arc::new(LocalFileStorage::new(dir.path())),
    )
    .with_prompts(PromptLibrary::embedded_only());

    let summary = pipeline
        .run(csv_request(nubank_csv(), "Inter PJ"))
        .await
        .unwrap();

    assert_eq!(server.request_count(), 2);
    let stored = db.get_transaction(summary.ids[0]).unwrap().unwrap();
    assert_eq!(stored.category, Category::Vendas);
    assert_eq!(stored.bank_account, "Inter PJ");

    let requests = server.requests();
    assert_eq!(
        requests[0]["response_format"]["type"],
        json!("json_schema")
    );
}
