//! The proxied surface (spec.md §6): non-activating status, the full
//! HTTP admission+forward path, and the WebSocket upgrade variant.

use axum::body::Body;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};

use zncproxy_admission::AdmissionRequest;
use zncproxy_core::error::ZncProxyError;
use zncproxy_tokens::TokenLifecycle;

use crate::error::ApiError;
use crate::state::SharedState;

/// Upstream HTTP request bodies this proxy will buffer before forwarding;
/// larger bodies are rejected rather than streamed (spec.md §4.7 carries
/// no streaming requirement).
const MAX_PROXY_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/proxy/status", axum::routing::get(status))
        .route("/proxy/*path", axum::routing::any(proxy_any))
}

async fn status(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let secret = header_str(&headers, "x-access-token").ok_or(ZncProxyError::Unauthorized)?;
    let claims = state.tokens.check_status(&secret).await?;
    let now = state.clock.now();
    let time_remaining_seconds = claims.expires_at.map(|e| (e - now).num_seconds().max(0));

    Ok(Json(serde_json::json!({
        "is_activated": claims.is_activated,
        "expires_at": claims.expires_at,
        "time_remaining_seconds": time_remaining_seconds,
    })))
}

async fn proxy_any(
    State(state): State<SharedState>,
    Path(path): Path<String>,
    req: Request,
) -> Result<Response, ApiError> {
    let is_upgrade = req
        .headers()
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if is_upgrade {
        handle_ws(state, path, req).await
    } else {
        handle_http(state, path, req).await
    }
}

async fn handle_http(state: SharedState, path: String, req: Request) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();

    let device_id = header_str(&parts.headers, "x-device-id");
    let secret = header_str(&parts.headers, "x-access-token");
    let client_ip =
        header_str(&parts.headers, "x-forwarded-for").unwrap_or_else(|| "unknown".to_string());
    let user_agent = header_str(&parts.headers, axum::http::header::USER_AGENT.as_str())
        .unwrap_or_default();
    let forwarded_host =
        header_str(&parts.headers, axum::http::header::HOST.as_str()).unwrap_or_else(|| "unknown".to_string());

    let admitted = state
        .admission
        .admit(AdmissionRequest {
            device_id,
            secret,
            path: path.clone(),
            client_ip: client_ip.clone(),
            user_agent: user_agent.clone(),
        })
        .await?;

    let headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.as_str().to_string(), s.to_string())))
        .collect();
    let query = parts.uri.query().map(|s| s.to_string());

    let body_bytes = axum::body::to_bytes(body, MAX_PROXY_BODY_BYTES)
        .await
        .map_err(|e| ZncProxyError::Internal(e.to_string()))?;

    let proxy_req = zncproxy_forwarder::ProxyRequest {
        method: parts.method,
        path,
        query,
        headers,
        body: body_bytes.to_vec(),
        client_ip,
        forwarded_host,
        user_id: admitted.user_id.to_string(),
        token_id: admitted.token_id.to_string(),
    };

    let resp = state.forwarder.forward(proxy_req).await?;

    let mut builder = Response::builder().status(resp.status);
    for (name, value) in resp.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(resp.body))
        .map_err(|e| ZncProxyError::Internal(e.to_string()).into())
}

/// The websocket leg authenticates *after* the upgrade handshake
/// completes, closing with code 1008 on failure, per spec.md §6 (a
/// browser cannot see a 401 once the handshake has already happened).
async fn handle_ws(state: SharedState, path: String, req: Request) -> Result<Response, ApiError> {
    let (mut parts, _body) = req.into_parts();

    let secret = parts
        .uri
        .query()
        .unwrap_or("")
        .split('&')
        .find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == "token").then(|| v.to_string())
        })
        .or_else(|| extract_cookie(&parts.headers, "access_token"));

    let upgrade = WebSocketUpgrade::from_request_parts(&mut parts, &state)
        .await
        .map_err(|e| ZncProxyError::Internal(e.to_string()))?;

    let tokens = state.tokens.clone();
    let ws_base = state.ws_upstream_base.clone();
    let ws_auth = state.ws_basic_auth.clone();

    Ok(upgrade.on_upgrade(move |socket| async move {
        run_ws_session(socket, tokens, secret, path, ws_base, ws_auth).await;
    }))
}

async fn run_ws_session(
    mut socket: WebSocket,
    tokens: TokenLifecycle,
    secret: Option<String>,
    path: String,
    ws_base: String,
    ws_auth: Option<(String, String)>,
) {
    let claims = match secret {
        Some(s) => tokens.validate(&s).await.ok(),
        None => None,
    };

    let claims = match claims {
        Some(c) if zncproxy_scope::authorize(&path, c.scope) => c,
        _ => {
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 1008,
                    reason: "unauthorized".into(),
                })))
                .await;
            return;
        }
    };

    let upstream_url = format!(
        "{}/{}",
        ws_base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let basic_auth = ws_auth.as_ref().map(|(u, p)| (u.as_str(), p.as_str()));

    match zncproxy_forwarder::connect_upstream(
        &upstream_url,
        basic_auth,
        &claims.user_id.to_string(),
        &claims.token_id.to_string(),
    )
    .await
    {
        Ok(upstream) => zncproxy_forwarder::pump(upstream, socket).await,
        Err(e) => {
            tracing::warn!(error = %e, "websocket upstream dial failed");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: 1011,
                    reason: "upstream unavailable".into(),
                })))
                .await;
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|kv| {
        let kv = kv.trim();
        let (k, v) = kv.split_once('=')?;
        k.eq_ignore_ascii_case(name).then(|| v.to_string())
    })
}
