use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use usageql_ai::{FixedQueryGenerator, TemplateSummarizer};
use usageql_api::app::{AppServices, build_router};
use usageql_core::{ExecutionResult, RowMap};
use usageql_infra::{
    ExecutorConfig, InMemoryQueryStore, QueryExecutor, QueryPipeline, QueryStore, ServerConfig,
};

const COUNT_TEMPLATE: &str = "SELECT COUNT(*) FROM users WHERE tenant_id = '{tenant_id}'";
const COUNT_QUERY: &str = "SELECT COUNT(*) FROM users WHERE tenant_id = 'tenant_123'";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryQueryStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let mut row = RowMap::new();
        row.insert("count".to_string(), json!(1250));
        let store = Arc::new(InMemoryQueryStore::new().with_result(
            COUNT_QUERY,
            ExecutionResult::new(vec!["count".to_string()], vec![row]),
        ));

        let generator = FixedQueryGenerator::new()
            .with_answer("How many users do we have?", COUNT_TEMPLATE)
            .with_answer("Drop the users table", "DROP TABLE users")
            .with_answer("Everyone's users", "SELECT COUNT(*) FROM users");

        let dyn_store: Arc<dyn QueryStore> = store.clone();
        let pipeline = QueryPipeline::new(
            Arc::new(generator),
            QueryExecutor::new(dyn_store, ExecutorConfig::default()),
            Arc::new(TemplateSummarizer),
        );
        let server = ServerConfig {
            app_name: "usage-test".to_string(),
            version: "9.9.9".to_string(),
            ..ServerConfig::default()
        };

        // Same router as prod, bound to an ephemeral port.
        let app = build_router(Arc::new(AppServices::new(pipeline, &server)));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    async fn query(&self, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/v1/query", self.base_url))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_reports_service_and_sets_headers() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(request_id.starts_with("req_"));
    let elapsed: f64 = res.headers()["x-process-time"].to_str().unwrap().parse().unwrap();
    assert!(elapsed >= 0.0);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "usage-test");
    assert_eq!(body["version"], "9.9.9");
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn readiness_follows_database_reachability() {
    let srv = TestServer::spawn().await;
    let url = format!("{}/health/ready", srv.base_url);

    assert_eq!(reqwest::get(&url).await.unwrap().status(), StatusCode::OK);

    srv.store.set_reachable(false);
    let res = reqwest::get(&url).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_ready");
}

#[tokio::test]
async fn count_question_returns_answer() {
    let srv = TestServer::spawn().await;

    let res = srv
        .query(json!({ "question": "How many users do we have?", "tenant_id": "tenant_123" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["tenant_id"], "tenant_123");
    assert_eq!(body["sql_query"], COUNT_QUERY);
    assert_eq!(body["row_count"], 1);
    assert_eq!(body["columns"], json!(["count"]));
    assert_eq!(body["data"], json!([{ "count": 1250 }]));
    assert!(body["natural_language_response"].as_str().unwrap().contains("1250"));
    assert!(body["error"].is_null());
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn destructive_candidate_is_refused_without_touching_store() {
    let srv = TestServer::spawn().await;

    let res = srv
        .query(json!({ "question": "Drop the users table", "tenant_id": "tenant_123" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["stage"], "validation");
    assert_eq!(body["sql_query"], "DROP TABLE users");
    assert!(body["error"].as_str().unwrap().contains("DROP"));
    assert!(body["data"].is_null());
    assert!(srv.store.executed().is_empty());
}

#[tokio::test]
async fn unscoped_candidate_is_refused() {
    let srv = TestServer::spawn().await;

    let res = srv
        .query(json!({ "question": "Everyone's users", "tenant_id": "tenant_123" }))
        .await;
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["stage"], "validation");
    assert!(body["error"].as_str().unwrap().contains("tenant isolation"));
    assert!(srv.store.executed().is_empty());
}

#[tokio::test]
async fn generator_failure_is_reported_as_generation_stage() {
    let srv = TestServer::spawn().await;

    let res = srv
        .query(json!({ "question": "Something unscripted", "tenant_id": "tenant_123" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["stage"], "generation");
    assert_eq!(body["sql_query"], "");
}

#[tokio::test]
async fn invalid_requests_are_unprocessable() {
    let srv = TestServer::spawn().await;

    let cases = [
        json!({ "question": "", "tenant_id": "tenant_123" }),
        json!({ "question": "x".repeat(1001), "tenant_id": "tenant_123" }),
        json!({ "question": "How many users do we have?", "tenant_id": "" }),
        json!({ "question": "How many users do we have?", "tenant_id": "t1' OR '1'='1" }),
        json!({ "question": "How many users do we have?" }),
    ];

    for body in cases {
        let res = srv.query(body.clone()).await;
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY, "body: {body}");
        let err: serde_json::Value = res.json().await.unwrap();
        assert!(err["error"].is_string());
    }
    assert!(srv.store.executed().is_empty());
}

#[tokio::test]
async fn malformed_json_is_unprocessable() {
    let srv = TestServer::spawn().await;

    let res = reqwest::Client::new()
        .post(format!("{}/api/v1/query", srv.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["error"], "invalid_request");
}
