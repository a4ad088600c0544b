mod support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use retrovault::insights::InsightGenerator;
use retrovault::models::DataSource;
use retrovault::seed::SeedingOrchestrator;
use retrovault::server::{self, AppState};
use retrovault::sources::SeedSource;
use retrovault::store::DocumentStore;
use support::StubSource;

async fn spawn_api() -> Result<SocketAddr> {
    let store = support::memory_store();
    let sources: Vec<Arc<dyn SeedSource>> = vec![Arc::new(StubSource::new(DataSource::Sample))];
    let orchestrator = SeedingOrchestrator::new(store.clone(), sources);
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        store: store as Arc<dyn DocumentStore>,
        insights: Arc::new(InsightGenerator::new(None, "gpt-4o-mini")),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(server::serve(state, listener));
    Ok(addr)
}

#[tokio::test]
async fn seed_returns_camel_case_result() -> Result<()> {
    let addr = spawn_api().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/api/seed"))
        .json(&json!({
            "userId": "u1",
            "userInfo": { "displayName": "Ada" },
            "forceRefresh": false
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["dataSource"], json!("sample"));
    assert_eq!(body["accountsCount"], json!(2));
    assert_eq!(body["transactionsCount"], json!(3));
    assert_eq!(body["isExistingData"], json!(false));

    Ok(())
}

#[tokio::test]
async fn missing_user_id_is_a_bad_request() -> Result<()> {
    let addr = spawn_api().await?;
    let client = reqwest::Client::new();

    for payload in [json!({}), json!({ "userId": "   " })] {
        let response = client
            .post(format!("http://{addr}/api/seed"))
            .json(&payload)
            .send()
            .await?;
        assert_eq!(response.status(), 400);

        let body: Value = response.json().await?;
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].is_string());
    }

    Ok(())
}

#[tokio::test]
async fn wrong_method_is_rejected() -> Result<()> {
    let addr = spawn_api().await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{addr}/api/seed")).send().await?;
    assert_eq!(response.status(), 405);

    Ok(())
}

#[tokio::test]
async fn profile_endpoint_reflects_seeded_state() -> Result<()> {
    let addr = spawn_api().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{addr}/api/profile/u1"))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    client
        .post(format!("http://{addr}/api/seed"))
        .json(&json!({ "userId": "u1" }))
        .send()
        .await?
        .error_for_status()?;

    let response = client
        .get(format!("http://{addr}/api/profile/u1"))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["id"], json!("u1"));
    assert_eq!(body["data_source"], json!("sample"));

    Ok(())
}

#[tokio::test]
async fn insights_fall_back_to_template_without_a_key() -> Result<()> {
    let addr = spawn_api().await?;
    let client = reqwest::Client::new();

    client
        .post(format!("http://{addr}/api/seed"))
        .json(&json!({ "userId": "u1" }))
        .send()
        .await?
        .error_for_status()?;

    let response = client
        .get(format!("http://{addr}/api/insights/u1"))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["success"], json!(true));
    assert!(body["insight"].as_str().is_some_and(|s| !s.is_empty()));

    Ok(())
}

#[tokio::test]
async fn cors_allows_any_origin() -> Result<()> {
    let addr = spawn_api().await?;
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/api/seed"))
        .header("Origin", "https://demo.example")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await?;

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    Ok(())
}
