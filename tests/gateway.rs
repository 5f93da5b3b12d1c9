//! End-to-end tests through the public `Gateway` with a mock HTTP upstream.

use mockito::{Matcher, Server};
use modelgate::api::{QUOTA_REMAINING_HEADER, ROUTED_MODEL_HEADER, UPSTREAM_HEADER};
use modelgate::{
    ConfigLoader, Gateway, GatewayConfig, GatewayRequest, InMemoryKeyStore, KeyEntry, KeyStore,
    Tier,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

/// Built-in config with every upstream pointed at the mock server
fn config_for(server: &Server) -> GatewayConfig {
    let mut config = ConfigLoader::builtin().unwrap().into_config();
    for upstream in config.upstreams.values_mut() {
        upstream.base_url = server.url();
        upstream.api_base_env = None;
        upstream.api_key_env = None;
    }
    config
}

fn key_store() -> Arc<InMemoryKeyStore> {
    Arc::new(
        InMemoryKeyStore::new()
            .with_key("sk-premium-u1-abc123", KeyEntry::valid().for_user("u1"))
            .with_key("sk-standard-u2-abc123", KeyEntry::valid().for_user("u2"))
            .with_key("sk-standard-u4-abc123", KeyEntry::valid().with_tier("premium"))
            .with_quota("u1", 100)
            .with_quota("u2", 1),
    )
}

fn gateway(server: &Server, store: Arc<InMemoryKeyStore>) -> Gateway {
    let store: Arc<dyn KeyStore> = store;
    Gateway::from_config(config_for(server), store).unwrap()
}

fn chat(token: &str, text: &str) -> GatewayRequest {
    let body = json!({ "messages": [{ "role": "user", "content": text }] });
    GatewayRequest::new(body.to_string()).with_bearer(token)
}

#[tokio::test]
async fn premium_request_is_relayed_to_flagship() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4",
            "messages": [{ "role": "user", "content": "hello" }],
            "max_tokens": 1024,
            "temperature": 0.7,
            "stream": false
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices":[{"message":{"content":"hi"}}]}"#)
        .create_async()
        .await;

    let store = key_store();
    let gateway = gateway(&server, store.clone());
    let response = gateway.handle(chat("sk-premium-u1-abc123", "hello")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"choices":[{"message":{"content":"hi"}}]}"#);
    assert_eq!(response.header(ROUTED_MODEL_HEADER), Some("gpt-4"));
    assert_eq!(response.header(UPSTREAM_HEADER), Some("openai"));
    assert_eq!(response.header(QUOTA_REMAINING_HEADER), Some("99"));
    assert_eq!(store.usage("u1").unwrap().requests, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn long_standard_prompt_goes_to_large_context_model() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({ "model": "claude-3-sonnet" })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let gateway = gateway(&server, key_store());
    let prompt = "x".repeat(2001);
    let response = gateway.handle(chat("sk-standard-u2-abc123", &prompt)).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header(ROUTED_MODEL_HEADER), Some("claude-3-sonnet"));
    assert_eq!(response.header(UPSTREAM_HEADER), Some("anthropic"));
    mock.assert_async().await;
}

#[tokio::test]
async fn stored_tier_overrides_key_marker() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let gateway = gateway(&server, key_store());
    let request = GatewayRequest::new(r#"{"model":"gpt-4","prompt":"hi"}"#)
        .with_bearer("sk-standard-u4-abc123");
    let response = gateway.handle(request).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header(ROUTED_MODEL_HEADER), Some("gpt-4"));
}

#[tokio::test]
async fn quota_is_consumed_even_when_upstream_fails() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal")
        .expect(1)
        .create_async()
        .await;

    let gateway = gateway(&server, key_store());

    let first = gateway.handle(chat("sk-standard-u2-abc123", "hello")).await;
    assert_eq!(first.status, 500);
    assert_eq!(first.json_body().unwrap()["error"], "Upstream request failed");

    let second = gateway.handle(chat("sk-standard-u2-abc123", "hello")).await;
    assert_eq!(second.status, 429);

    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_requests_never_reach_upstream() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let gateway = gateway(&server, key_store());

    let unauthenticated = gateway
        .handle(GatewayRequest::new(r#"{"prompt":"hi"}"#))
        .await;
    assert_eq!(unauthenticated.status, 401);
    assert_eq!(
        unauthenticated.json_body().unwrap(),
        json!({ "error": "Unauthorized", "message": "Invalid or missing API key" })
    );

    let unauthenticated_garbage = gateway.handle(GatewayRequest::new("{not json")).await;
    assert_eq!(unauthenticated_garbage.status, 401);

    let unknown = gateway.handle(chat("sk-premium-nobody-1234", "hi")).await;
    assert_eq!(unknown.status, 401);

    let malformed = gateway
        .handle(GatewayRequest::new("[]").with_bearer("sk-premium-u1-abc123"))
        .await;
    assert_eq!(malformed.status, 400);

    mock.assert_async().await;
}

#[tokio::test]
async fn config_file_layers_over_builtin() {
    let server = Server::new_async().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "admission": {{ "mode": "permissive" }},
            "upstream_timeout_secs": 5,
            "upstreams": {{
                "ollama": {{ "base_url": "{}" }}
            }}
        }}"#,
        server.url()
    )
    .unwrap();

    let store: Arc<dyn KeyStore> = key_store();
    let gateway = Gateway::with_config_path(file.path(), store).unwrap();

    assert_eq!(gateway.config().upstream_timeout_secs, 5);
    assert_eq!(
        gateway.models(),
        vec!["claude-3-sonnet", "gpt-3.5-turbo", "gpt-4", "llama2"]
    );

    let info = gateway.model_info("llama2").unwrap();
    assert_eq!(info.upstream, "ollama");
    assert_eq!(info.base_url, server.url());
    assert_eq!(info.required_tier, Tier::Free);
    assert!(gateway.model_info("gpt-5").is_none());
}

#[test]
fn invalid_config_is_rejected_at_startup() {
    let server = mockito::Server::new();
    let mut config = config_for(&server);
    config.routing.flagship = "missing-model".to_string();

    let store: Arc<dyn KeyStore> = key_store();
    assert!(Gateway::from_config(config, store).is_err());
}
