//! E2E tests for the blanket per-IP rate limit

mod common;

use common::TestServer;

#[tokio::test]
async fn excess_requests_from_one_address_get_429() {
    let server = TestServer::with_rate_limit(3).await;

    for _ in 0..3 {
        let response = server
            .client
            .get(server.url("/health"))
            .send()
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), 200);
    }

    let response = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 429);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "Rate limit exceeded");
    assert!(
        body["message"]
            .as_str()
            .expect("message field")
            .contains("Too many requests")
    );
}

#[tokio::test]
async fn separate_addresses_are_limited_independently() {
    let server = TestServer::with_rate_limit(2).await;

    // Exhaust the limit for a forwarded address; the local peer keeps going.
    for _ in 0..2 {
        let response = server
            .client
            .get(server.url("/health"))
            .header("X-Forwarded-For", "203.0.113.7")
            .send()
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), 200);
    }

    let limited = server
        .client
        .get(server.url("/health"))
        .header("X-Forwarded-For", "203.0.113.7")
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(limited.status(), 429);

    let unaffected = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(unaffected.status(), 200);
}
