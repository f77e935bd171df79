//! WebSocket half of the Proxy Forwarder (spec.md §4.7).
//!
//! Grounded on `original_source/app/services/proxy_service.py`'s
//! `proxy_websocket` — dial upstream with Basic auth and user/token
//! headers, then run two independent copy tasks until either side closes.
//! The client-facing leg is `axum::extract::ws::WebSocket` directly: the
//! HTTP surface and this forwarder both sit on axum already, so there is
//! no separate wire type to maintain in between.

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as TMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use zncproxy_core::error::ZncProxyError;

pub type UpstreamWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial the upstream WebSocket, attaching Basic auth (if configured) and
/// the `X-User-Id`/`X-Token-Id` logging headers (spec.md §4.7).
pub async fn connect_upstream(
    url: &str,
    basic_auth: Option<(&str, &str)>,
    user_id: &str,
    token_id: &str,
) -> Result<UpstreamWs, ZncProxyError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ZncProxyError::UpstreamTransportError(e.to_string()))?;

    let headers = request.headers_mut();
    if let Some((user, pass)) = basic_auth {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        if let Ok(v) = format!("Basic {encoded}").parse() {
            headers.insert("Authorization", v);
        }
    }
    if let Ok(v) = user_id.parse() {
        headers.insert("X-User-Id", v);
    }
    if let Ok(v) = token_id.parse() {
        headers.insert("X-Token-Id", v);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| ZncProxyError::UpstreamTransportError(e.to_string()))?;
    Ok(stream)
}

/// Runs the bidirectional copy loop until either side closes or errors,
/// then tears down both directions (spec.md §4.7; a client disconnect
/// aborting the upstream-read loop is spec.md §5's cancel-on-either-side-
/// closes rule) — the two independent tasks mirror the original's
/// `asyncio.gather(forward_to_upstream(), forward_to_client())`, raced
/// with `tokio::select!` instead of awaited to completion so a lone
/// chatty/silent peer on one leg can't keep the other leg's task (and its
/// socket) alive after its sibling has already exited.
pub async fn pump(upstream: UpstreamWs, client: WebSocket) {
    let (mut up_sink, mut up_stream) = upstream.split();
    let (mut client_sink, mut client_stream) = client.split();

    let to_upstream = tokio::spawn(async move {
        while let Some(Ok(msg)) = client_stream.next().await {
            match to_tungstenite(msg) {
                Some(frame) => {
                    if up_sink.send(frame).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
        let _ = up_sink.close().await;
    });

    let to_client = tokio::spawn(async move {
        while let Some(Ok(msg)) = up_stream.next().await {
            match from_tungstenite(msg) {
                Some(frame) => {
                    if client_sink.send(frame).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
        let _ = client_sink.close().await;
    });

    tokio::select! {
        _ = to_upstream => to_client.abort(),
        _ = to_client => to_upstream.abort(),
    }
}

fn to_tungstenite(msg: AxumMessage) -> Option<TMessage> {
    match msg {
        AxumMessage::Text(s) => Some(TMessage::Text(s)),
        AxumMessage::Binary(b) => Some(TMessage::Binary(b)),
        AxumMessage::Ping(_) | AxumMessage::Pong(_) | AxumMessage::Close(_) => None,
    }
}

fn from_tungstenite(msg: TMessage) -> Option<AxumMessage> {
    match msg {
        TMessage::Text(s) => Some(AxumMessage::Text(s)),
        TMessage::Binary(b) => Some(AxumMessage::Binary(b)),
        TMessage::Close(_) | TMessage::Ping(_) | TMessage::Pong(_) | TMessage::Frame(_) => None,
    }
}
