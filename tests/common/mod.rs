//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use edge_gateway::http::server::GatewayState;
use edge_gateway::oidc::token::IdTokenClaims;
use edge_gateway::session::Authentication;
use edge_gateway::{GatewayConfig, HttpServer, Shutdown};

/// A gateway instance running on an ephemeral port, with direct access to
/// its shared state so tests can seed sessions the way the provider would.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub state: GatewayState,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spawn the gateway with the given configuration.
pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).expect("gateway construction failed");
    let state = server.state().clone();

    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestGateway {
        addr,
        state,
        shutdown,
    }
}

/// Baseline test configuration: no upstream routes, metrics off, rate
/// limiting off. Tests override what they exercise.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.routes = Vec::new();
    config.observability.metrics_enabled = false;
    config.rate_limit.enabled = false;
    config
}

/// HTTP client that does not follow the gateway's redirects.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Claims mirroring a provider-issued ID token for a known user.
pub fn jon_snow_claims() -> IdTokenClaims {
    serde_json::from_value(json!({
        "iss": "http://localhost:8080/realms/bookshop",
        "aud": "edge-gateway",
        "sub": "subject-jon",
        "exp": 4102444800u64,
        "preferred_username": "jon.snow",
        "given_name": "Jon",
        "family_name": "Snow",
        "roles": ["employee", "customer"]
    }))
    .unwrap()
}

/// Establish an authenticated session directly in the store, standing in
/// for a completed code exchange.
pub fn seed_authenticated_session(state: &GatewayState, claims: IdTokenClaims) -> String {
    let session = state.sessions.create();
    state.sessions.update(&session.id, |s| {
        s.auth = Some(Authentication {
            id_token: "test-id-token".into(),
            claims,
        });
    });
    session.id
}

/// First Set-Cookie value with the given name, if any.
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            let rest = cookie.strip_prefix(&prefix)?;
            Some(rest.split(';').next().unwrap_or(rest).to_string())
        })
}

/// Start a minimal mock upstream that answers every request with a fixed
/// body. Returns the address it listens on.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock identity-provider token endpoint answering every request
/// with the given JSON document. Reads the whole request (headers plus
/// Content-Length body) before responding so the client never sees the
/// connection drop mid-write.
pub async fn start_mock_token_endpoint(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        read_full_request(&mut socket).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_full_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) => return,
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(_) => return,
        }
        let Some(head_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..head_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if data.len() >= head_end + 4 + content_length {
            return;
        }
    }
}
