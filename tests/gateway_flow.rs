//! Login flow, upstream forwarding and rate limiting against a running
//! gateway.

use axum::http::StatusCode;
use url::Url;

mod common;

use common::{
    http_client, spawn_gateway, start_mock_backend, start_mock_token_endpoint, test_config,
};

use edge_gateway::config::BackendRouteConfig;

fn route(name: &str, prefix: &str, upstream: String, fallback: bool) -> BackendRouteConfig {
    BackendRouteConfig {
        name: name.into(),
        path_prefix: prefix.into(),
        upstream,
        fallback,
        priority: 0,
    }
}

#[tokio::test]
async fn test_forwards_public_reads_to_live_upstream() {
    let upstream = start_mock_backend("catalog-body").await;

    let mut config = test_config();
    config.routes = vec![route("catalog", "/books", upstream.to_string(), true)];
    let gateway = spawn_gateway(config).await;
    let client = http_client();

    let response = client.get(gateway.url("/books/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "catalog-body");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_dead_upstream_degrades_through_fallback() {
    let mut config = test_config();
    // Nothing listens on port 9 on loopback.
    config.routes = vec![route("catalog", "/books", "127.0.0.1:9".into(), true)];
    let gateway = spawn_gateway(config).await;
    let client = http_client();

    let response = client.get(gateway.url("/books/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_dead_upstream_without_fallback_is_502() {
    let mut config = test_config();
    config.routes = vec![route("catalog", "/books", "127.0.0.1:9".into(), false)];
    let gateway = spawn_gateway(config).await;
    let client = http_client();

    let response = client.get(gateway.url("/books/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_browser_navigation_redirects_into_login() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();

    let response = client
        .get(gateway.url("/orders"))
        .header("Accept", "text/html,application/xhtml+xml")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("authorization redirect");
    let url = Url::parse(location).unwrap();
    assert!(location.starts_with("http://localhost:8080/realms/bookshop/protocol/openid-connect/auth"));

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("response_type".into(), "code".into())));
    assert!(pairs.contains(&("client_id".into(), "edge-gateway".into())));
    assert!(pairs.iter().any(|(k, _)| k == "redirect_uri"));
    assert!(pairs.iter().any(|(k, v)| k == "state" && !v.is_empty()));

    // The login-in-progress session was handed to the browser.
    assert!(common::set_cookie_value(&response, "SESSION").is_some());

    gateway.shutdown.trigger();
}

/// Start a browser login and return the session cookie plus the state
/// parameter the provider would echo back.
async fn begin_login(gateway: &common::TestGateway, client: &reqwest::Client) -> (String, String) {
    let response = client
        .get(gateway.url("/orders"))
        .header("Accept", "text/html")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let session = common::set_cookie_value(&response, "SESSION").unwrap();
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let url = Url::parse(&location).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    (session, state)
}

#[tokio::test]
async fn test_callback_with_mismatched_state_is_rejected() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();
    let (session, _state) = begin_login(&gateway, &client).await;

    let response = client
        .get(gateway.url("/login/oauth2/code/keycloak?code=abc&state=wrong"))
        .header("Cookie", format!("SESSION={session}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_callback_with_unverifiable_token_leaves_session_anonymous() {
    let token_endpoint = start_mock_token_endpoint(
        r#"{"access_token":"opaque","id_token":"not-a-real-jwt","token_type":"Bearer","expires_in":300}"#,
    )
    .await;

    let mut config = test_config();
    config.oidc.token_uri = format!("http://{token_endpoint}/token");
    let gateway = spawn_gateway(config).await;
    let client = http_client();
    let (session, state) = begin_login(&gateway, &client).await;

    let response = client
        .get(gateway.url(&format!(
            "/login/oauth2/code/keycloak?code=abc&state={state}"
        )))
        .header("Cookie", format!("SESSION={session}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A rejected token never half-authenticates the session.
    let response = client
        .get(gateway.url("/user"))
        .header("Cookie", format!("SESSION={session}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_502_with_no_session() {
    let mut config = test_config();
    config.oidc.token_uri = "http://127.0.0.1:9/token".into();
    let gateway = spawn_gateway(config).await;
    let client = http_client();
    let (session, state) = begin_login(&gateway, &client).await;

    let response = client
        .get(gateway.url(&format!(
            "/login/oauth2/code/keycloak?code=abc&state={state}"
        )))
        .header("Cookie", format!("SESSION={session}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let stored = gateway.state.sessions.get(&session).unwrap();
    assert!(!stored.is_authenticated());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_anonymous_requests_share_one_bucket() {
    let upstream = start_mock_backend("ok").await;

    let mut config = test_config();
    config.routes = vec![route("ui", "/", upstream.to_string(), false)];
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 1;
    config.rate_limit.burst_size = 2;
    let gateway = spawn_gateway(config).await;
    let client = http_client();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = client.get(gateway.url("/")).send().await.unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[0], StatusCode::OK);
    assert_eq!(statuses[1], StatusCode::OK);
    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);

    gateway.shutdown.trigger();
}
