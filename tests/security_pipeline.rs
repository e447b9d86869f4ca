//! End-to-end checks of the security decision pipeline.

use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{
    http_client, jon_snow_claims, seed_authenticated_session, set_cookie_value, spawn_gateway,
    start_mock_backend, test_config,
};

#[tokio::test]
async fn test_public_paths_need_no_session() {
    let upstream = start_mock_backend("ok").await;

    let mut config = test_config();
    config.routes = vec![edge_gateway::config::BackendRouteConfig {
        name: "ui".into(),
        path_prefix: "/".into(),
        upstream: upstream.to_string(),
        fallback: false,
        priority: 0,
    }];
    let gateway = spawn_gateway(config).await;
    let client = http_client();

    for path in ["/", "/main.css", "/app.js", "/favicon.ico", "/books/1"] {
        let response = client.get(gateway.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path} should be public");
    }

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_user_endpoint_unauthenticated_is_401() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();

    let response = client.get(gateway.url("/user")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_user_endpoint_projects_identity_claims() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();
    let session_id = seed_authenticated_session(&gateway.state, jon_snow_claims());

    let response = client
        .get(gateway.url("/user"))
        .header("Cookie", format!("SESSION={session_id}"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "username": "jon.snow",
            "firstName": "Jon",
            "lastName": "Snow",
            "roles": ["employee", "customer"]
        })
    );

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_logout_without_session_or_token_is_403() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();

    let response = client.post(gateway.url("/logout")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_logout_authenticated_without_token_is_403() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();
    let session_id = seed_authenticated_session(&gateway.state, jon_snow_claims());

    let response = client
        .post(gateway.url("/logout"))
        .header("Cookie", format!("SESSION={session_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The session survives a rejected logout.
    assert!(gateway.state.sessions.get(&session_id).is_some());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_logout_with_valid_token_redirects_and_invalidates() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();
    let session_id = seed_authenticated_session(&gateway.state, jon_snow_claims());

    // A safe request issues the CSRF token at response-commit time.
    let response = client
        .get(gateway.url("/user"))
        .header("Cookie", format!("SESSION={session_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csrf_token = set_cookie_value(&response, "XSRF-TOKEN").expect("token cookie issued");

    let response = client
        .post(gateway.url("/logout"))
        .header(
            "Cookie",
            format!("SESSION={session_id}; XSRF-TOKEN={csrf_token}"),
        )
        .header("X-XSRF-TOKEN", &csrf_token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("end-session redirect");
    assert!(location.starts_with("http://localhost:8080/realms/bookshop/protocol/openid-connect/logout"));
    assert!(location.contains("id_token_hint=test-id-token"));
    assert!(location.contains("post_logout_redirect_uri="));

    // Local invalidation happened before the redirect was issued.
    assert!(gateway.state.sessions.get(&session_id).is_none());

    let response = client
        .get(gateway.url("/user"))
        .header("Cookie", format!("SESSION={session_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_tampered_csrf_pair_is_rejected() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();
    let session_id = seed_authenticated_session(&gateway.state, jon_snow_claims());

    let response = client
        .get(gateway.url("/user"))
        .header("Cookie", format!("SESSION={session_id}"))
        .send()
        .await
        .unwrap();
    let csrf_token = set_cookie_value(&response, "XSRF-TOKEN").unwrap();

    // Altered header, intact cookie.
    let response = client
        .post(gateway.url("/logout"))
        .header(
            "Cookie",
            format!("SESSION={session_id}; XSRF-TOKEN={csrf_token}"),
        )
        .header("X-XSRF-TOKEN", format!("{csrf_token}x"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Altered cookie, intact header.
    let response = client
        .post(gateway.url("/logout"))
        .header(
            "Cookie",
            format!("SESSION={session_id}; XSRF-TOKEN={csrf_token}x"),
        )
        .header("X-XSRF-TOKEN", &csrf_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The untampered pair still passes.
    let response = client
        .post(gateway.url("/logout"))
        .header(
            "Cookie",
            format!("SESSION={session_id}; XSRF-TOKEN={csrf_token}"),
        )
        .header("X-XSRF-TOKEN", &csrf_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_fallback_endpoints_ignore_authentication_state() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();

    let response = client
        .get(gateway.url("/catalog-fallback"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "");

    // A write cannot be faked, and neither a session nor a CSRF token is
    // required to hear that.
    let response = client
        .post(gateway.url("/catalog-fallback"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_protected_write_without_session_is_401() {
    let gateway = spawn_gateway(test_config()).await;
    let client = http_client();

    let response = client.post(gateway.url("/books")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    gateway.shutdown.trigger();
}
