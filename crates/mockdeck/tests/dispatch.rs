//! End-to-end mock dispatch: rule selection, templating and logging.

mod common;

use common::{eventually, start};
use mockdeck::store::MockRepository;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::{Duration, Instant};

fn workspace() -> Value {
    json!({
        "projects": [{"id": "p1", "shortId": "shop", "ownerId": "u1"}],
        "apis": [
            {
                "id": "a-users", "projectId": "p1", "path": "/api/users",
                "responseBody": {"msg": "default"}
            },
            {
                "id": "a-items", "projectId": "p1", "path": "/items", "useFakerJs": true,
                "responseBody": {"_repeat_3": {"id": "{{string.uuid}}"}}
            },
            {
                "id": "a-echo", "projectId": "p1", "path": "/users/:id", "useFakerJs": true,
                "responseHeaders": {"X-User": "{{request.params.id}}"},
                "responseBody": {"id": "{{request.params.id}}", "lang": "{{request.query.lang}}"}
            },
            {
                "id": "a-literal", "projectId": "p1", "path": "/literal",
                "responseBody": {"name": "{{person.firstName}}"}
            },
            {
                "id": "a-slow", "projectId": "p1", "path": "/slow", "responseDelay": 200,
                "responseStatus": 202, "responseBody": "accepted"
            },
            {
                "id": "a-orders", "projectId": "p1", "path": "/orders", "method": "POST",
                "responseStatus": 201, "responseBody": {"status": "created"}
            }
        ],
        "rules": [
            {
                "id": "r-vip", "apiId": "a-users", "priority": 0,
                "conditions": {"type": "AND", "conditions": [
                    {"field": "query.vip", "operator": "equals", "value": "true"}
                ]},
                "body": {"msg": "VIP"}
            },
            {
                "id": "r-big", "apiId": "a-orders", "priority": 1,
                "conditions": {"type": "OR", "conditions": [
                    {"field": "body.amount", "operator": "gt", "value": 1000},
                    {"field": "header.X-Tier", "operator": "in", "value": ["gold", "platinum"]}
                ]},
                "statusCode": 402, "body": {"status": "review"}
            },
            {
                "id": "r-off", "apiId": "a-orders", "priority": 0, "enabled": false,
                "body": {"status": "never"}
            }
        ]
    })
}

#[tokio::test]
async fn test_vip_rule_overrides_default_body() {
    let server = start(workspace()).await;

    let vip = server
        .client
        .get(format!("{}/shop/api/users?vip=true", server.mock_url))
        .send()
        .await
        .unwrap();
    assert_eq!(vip.status(), 200);
    assert_eq!(
        vip.headers()
            .get("x-mockdeck-rule-id")
            .and_then(|v| v.to_str().ok()),
        Some("r-vip")
    );
    assert_eq!(vip.json::<Value>().await.unwrap(), json!({"msg": "VIP"}));

    let plain = server
        .client
        .get(format!("{}/shop/api/users", server.mock_url))
        .send()
        .await
        .unwrap();
    assert!(plain.headers().get("x-mockdeck-rule-id").is_none());
    assert_eq!(plain.json::<Value>().await.unwrap(), json!({"msg": "default"}));
}

#[tokio::test]
async fn test_or_conditions_and_disabled_rules() {
    let server = start(workspace()).await;
    let url = format!("{}/shop/orders", server.mock_url);

    let small = server
        .client
        .post(&url)
        .json(&json!({"amount": 10}))
        .send()
        .await
        .unwrap();
    assert_eq!(small.status(), 201);
    assert_eq!(small.json::<Value>().await.unwrap(), json!({"status": "created"}));

    let big = server
        .client
        .post(&url)
        .json(&json!({"amount": 5000}))
        .send()
        .await
        .unwrap();
    assert_eq!(big.status(), 402);

    let gold = server
        .client
        .post(&url)
        .header("x-tier", "gold")
        .json(&json!({"amount": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(gold.json::<Value>().await.unwrap(), json!({"status": "review"}));
}

#[tokio::test]
async fn test_repeat_produces_distinct_uuids() {
    let server = start(workspace()).await;
    let body: Value = server
        .client
        .get(format!("{}/shop/items", server.mock_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    let ids: HashSet<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
    assert_eq!(ids.len(), 3);
    for id in ids {
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}

#[tokio::test]
async fn test_request_variables_in_body_and_headers() {
    let server = start(workspace()).await;
    let response = server
        .client
        .get(format!("{}/shop/users/42?lang=de", server.mock_url))
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-user").and_then(|v| v.to_str().ok()),
        Some("42")
    );
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"id": "42", "lang": "de"})
    );
}

#[tokio::test]
async fn test_faker_disabled_keeps_placeholders() {
    let server = start(workspace()).await;
    let body: Value = server
        .client
        .get(format!("{}/shop/literal", server.mock_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"name": "{{person.firstName}}"}));
}

#[tokio::test]
async fn test_delay_and_text_body() {
    let server = start(workspace()).await;
    let start = Instant::now();
    let response = server
        .client
        .get(format!("{}/shop/slow", server.mock_url))
        .send()
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(response.status(), 202);
    assert_eq!(response.text().await.unwrap(), "accepted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delays_overlap_across_requests() {
    let server = start(workspace()).await;
    let url = format!("{}/shop/slow", server.mock_url);
    let start = Instant::now();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let client = server.client.clone();
            let url = url.clone();
            tokio::spawn(async move { client.get(url).send().await.unwrap().status() })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 202);
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
}

#[tokio::test]
async fn test_unmatched_path_is_404() {
    let server = start(workspace()).await;

    for path in ["/shop/nothing", "/unknown/api/users"] {
        let response = server
            .client
            .get(format!("{}{}", server.mock_url, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], format!("No mock API matches GET {path}"));
    }

    let wrong_method = server
        .client
        .delete(format!("{}/shop/orders", server.mock_url))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), 404);
}

#[tokio::test]
async fn test_every_request_is_logged() {
    let server = start(workspace()).await;
    server
        .client
        .get(format!("{}/shop/api/users?vip=true", server.mock_url))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();

    let repository = server.engine.repository().clone();
    let log = eventually(|| {
        let repository = repository.clone();
        async move { repository.recent_api_logs("p1", 10).unwrap().into_iter().next() }
    })
    .await;

    assert_eq!(log.api_id, "a-users");
    assert_eq!(log.rule_id.as_deref(), Some("r-vip"));
    assert_eq!(log.method, "GET");
    assert_eq!(log.path, "/api/users");
    assert_eq!(log.status_code, 200);
    assert_eq!(log.ip.as_deref(), Some("203.0.113.7"));
    assert!(!log.is_proxied);
    assert_eq!(log.request.query.get("vip").map(String::as_str), Some("true"));
    assert_eq!(log.response.body.as_deref(), Some(r#"{"msg":"VIP"}"#));
}
