//! MCP server integration tests.
//!
//! Verifies tool registration, parameter validation (garde), error paths and
//! full import/reset round-trips over the MCP protocol.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use rmcp::model::{CallToolRequestParams, CallToolResult};
use rmcp::service::{RoleClient, RunningService};
use rmcp::ServiceExt;
use serde_json::{json, Value};
use tempfile::TempDir;

use finboard_mcp::server::FinboardServer;

mod common;
use common::{csv_with_rows, seeded_store, temp_store, META_Q1_2020};

// ─── Test Helpers ────────────────────────────────────────────────────────────

type Client = RunningService<RoleClient, ()>;

/// Upper bound on any single round-trip; a stuck tool fails the test instead of hanging it.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A server over a temp store seeded with the bundled sample.
fn make_test_server() -> (FinboardServer, TempDir) {
    let (store, tmp) = seeded_store();
    (FinboardServer::new(Arc::new(store)), tmp)
}

/// Wire `server` to an in-memory client over duplex pipes.
async fn connect(server: FinboardServer) -> Client {
    let (server_tx, server_rx) = tokio::io::duplex(1 << 16);
    let (client_tx, client_rx) = tokio::io::duplex(1 << 16);

    tokio::spawn(async move {
        if let Ok(running) = server.serve((client_rx, server_tx)).await {
            let _ = running.waiting().await;
        }
    });

    tokio::time::timeout(CALL_TIMEOUT, ().serve((server_rx, client_tx)))
        .await
        .expect("client handshake timed out")
        .unwrap()
}

async fn call(client: &Client, name: &str, arguments: Option<Value>) -> CallToolResult {
    let request = client.call_tool(CallToolRequestParams {
        meta: None,
        name: name.to_string().into(),
        arguments: arguments.map(|a| serde_json::from_value(a).unwrap()),
        task: None,
    });
    tokio::time::timeout(CALL_TIMEOUT, request)
        .await
        .unwrap_or_else(|_| panic!("{name} timed out"))
        .unwrap()
}

fn text_of(result: &CallToolResult) -> String {
    result
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.clone())
        .unwrap()
}

fn json_of(result: &CallToolResult) -> Value {
    assert!(!result.is_error.unwrap_or(false), "{}", text_of(result));
    serde_json::from_str(&text_of(result)).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Category 1: Server Initialization
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn server_info_has_correct_metadata() {
    use rmcp::ServerHandler;

    let (server, _tmp) = make_test_server();
    let info = server.get_info();

    assert_eq!(info.server_info.name, "finboard-mcp");
    assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
    assert!(info.capabilities.tools.is_some());
    let instructions = info.instructions.unwrap();
    assert!(instructions.contains("import_data"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tool_router_lists_all_ten_tools() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let tools = client.list_all_tools().await.unwrap();
    let tool_names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();

    assert_eq!(tools.len(), 10, "Expected 10 tools, got: {tool_names:?}");
    for expected in [
        "load_dataset",
        "dataset_status",
        "validate_upload",
        "import_data",
        "reset_to_original",
        "download_template",
        "export_data",
        "dashboard_summary",
        "metric_series",
        "yoy_growth",
    ] {
        assert!(
            tool_names.contains(&expected.to_string()),
            "Missing tool: {expected}"
        );
    }

    client.cancel().await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Category 2: Parameter Validation
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_dataset_rejects_malformed_date() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let result = call(&client, "load_dataset", Some(json!({"start_date": "2024/01/01"}))).await;
    assert!(result.is_error.unwrap_or(false));
    assert!(text_of(&result).contains("Validation error"));

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_dataset_rejects_inverted_range() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let result = call(
        &client,
        "load_dataset",
        Some(json!({"start_date": "2024-01-01", "end_date": "2023-01-01"})),
    )
    .await;
    assert!(result.is_error.unwrap_or(false));
    assert!(text_of(&result).contains("Invalid filter"));

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn import_rejects_path_in_file_name() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let result = call(
        &client,
        "import_data",
        Some(json!({"file_name": "../x.csv", "content": "a", "mode": "append"})),
    )
    .await;
    assert!(result.is_error.unwrap_or(false));
    assert!(text_of(&result).contains("Validation error"));

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn metric_series_rejects_unknown_metric() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let result = client
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "metric_series".into(),
            arguments: Some(serde_json::from_value(json!({"metric": "Ebitda"})).unwrap()),
            task: None,
        })
        .await;
    // Deserialization failures surface either as a protocol error or a tool error.
    if let Ok(r) = result {
        assert!(r.is_error.unwrap_or(false));
    }

    client.cancel().await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Category 3: Read Tools
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_tools_over_sample() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let status = json_of(&call(&client, "dataset_status", None).await);
    assert_eq!(status["status"]["rows"], 100);

    let loaded = json_of(
        &call(
            &client,
            "load_dataset",
            Some(json!({"companies": ["Apple"], "limit": 3})),
        )
        .await,
    );
    assert_eq!(loaded["total_rows"], 20);
    assert_eq!(loaded["rows"].as_array().unwrap().len(), 3);
    assert_eq!(loaded["truncated"], true);

    let summary = json_of(&call(&client, "dashboard_summary", Some(json!({}))).await);
    assert_eq!(summary["kpis"]["companies"], 5);

    let series = json_of(
        &call(
            &client,
            "metric_series",
            Some(json!({"metric": "PERatio", "companies": ["Meta"]})),
        )
        .await,
    );
    assert_eq!(series["label"], "P/E Ratio");
    assert_eq!(series["series"][0]["points"].as_array().unwrap().len(), 20);

    let growth = json_of(&call(&client, "yoy_growth", Some(json!({}))).await);
    assert_eq!(growth["points"].as_array().unwrap().len(), 20);
    assert_eq!(growth["points"][0]["company"], "Alphabet");

    let template = json_of(&call(&client, "download_template", None).await);
    assert!(template["csv"].as_str().unwrap().starts_with("Date,Company,"));

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn yoy_growth_filtered_to_one_company() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let growth = json_of(
        &call(&client, "yoy_growth", Some(json!({"companies": ["Meta"]}))).await,
    );
    let points = growth["points"].as_array().unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(points[0]["year"], 2021);

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_tools_fail_without_dataset() {
    let (store, _tmp) = temp_store();
    let client = connect(FinboardServer::new(Arc::new(store))).await;

    let result = call(&client, "dashboard_summary", Some(json!({}))).await;
    assert!(result.is_error.unwrap_or(false));
    assert!(text_of(&result).contains("not found"));

    client.cancel().await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Category 4: Import, Export and Reset
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn validate_upload_reports_missing_columns() {
    let (server, _tmp) = make_test_server();
    let client = connect(server).await;

    let resp = json_of(
        &call(
            &client,
            "validate_upload",
            Some(json!({"file_name": "bad.csv", "content": "Date,Company,Revenue\n2024-03-31,Acme,1\n"})),
        )
        .await,
    );
    assert_eq!(resp["valid"], false);
    let defects = resp["defects"].as_array().unwrap();
    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0]["kind"], "missing_columns");
    assert_eq!(defects[0]["columns"].as_array().unwrap().len(), 5);

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn import_append_then_reset() {
    let (server, _tmp) = make_test_server();
    let store = Arc::clone(&server.store);
    let client = connect(server).await;

    let csv = csv_with_rows(&[META_Q1_2020, "2025-03-31,Acme,100,10,90,1000,12.50,"]);
    let imported = json_of(
        &call(
            &client,
            "import_data",
            Some(json!({"file_name": "q1.csv", "content": csv, "mode": "append"})),
        )
        .await,
    );
    assert_eq!(imported["imported"], true);
    assert_eq!(imported["merge"]["duplicates_removed"], 1);
    assert_eq!(imported["merge"]["result_rows"], 101);
    assert!(imported["backup_file"].is_string());

    let exported = json_of(
        &call(&client, "export_data", Some(json!({"companies": ["Acme"]}))).await,
    );
    assert_eq!(exported["rows"], 1);
    assert!(exported["csv"]
        .as_str()
        .unwrap()
        .contains("2025-03-31,Acme,100,10,90,1000,12.50,"));

    let reset = json_of(&call(&client, "reset_to_original", None).await);
    assert_eq!(reset["rows"], 100);
    assert_eq!(store.load().unwrap().len(), 100);
    assert_eq!(store.list_backups().unwrap().len(), 2);

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn import_rejected_upload_changes_nothing() {
    let (server, _tmp) = make_test_server();
    let store = Arc::clone(&server.store);
    let client = connect(server).await;

    let csv = csv_with_rows(&["31/31/2024,Acme,100,10,90,1000,12.5,"]);
    let resp = json_of(
        &call(
            &client,
            "import_data",
            Some(json!({"file_name": "bad.csv", "content": csv, "mode": "replace"})),
        )
        .await,
    );
    assert_eq!(resp["imported"], false);
    assert_eq!(resp["defects"][0]["kind"], "invalid_dates");
    assert_eq!(store.load().unwrap().len(), 100);
    assert!(store.list_backups().unwrap().is_empty());

    client.cancel().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn import_base64_csv_replace() {
    let (server, _tmp) = make_test_server();
    let store = Arc::clone(&server.store);
    let client = connect(server).await;

    let csv = csv_with_rows(&[META_Q1_2020]);
    let encoded = base64::engine::general_purpose::STANDARD.encode(csv);
    let resp = json_of(
        &call(
            &client,
            "import_data",
            Some(json!({
                "file_name": "meta.csv",
                "content": encoded,
                "content_encoding": "base64",
                "mode": "replace",
            })),
        )
        .await,
    );
    assert_eq!(resp["imported"], true);
    assert_eq!(store.load().unwrap().len(), 1);

    client.cancel().await.unwrap();
}
