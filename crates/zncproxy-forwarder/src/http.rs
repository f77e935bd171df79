//! HTTP pass-through half of the Proxy Forwarder (spec.md §4.7).
//!
//! Grounded on `original_source/app/services/proxy_service.py`'s
//! `proxy_request` header-hygiene lists and status mapping, minus its
//! content-rewriting logic (Non-goal), and on
//! `chronx-wallet/src/rpc_client.rs`'s client-wrapped-in-a-struct shape.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};

use zncproxy_core::error::ZncProxyError;

/// Headers never forwarded to upstream (spec.md §4.7): the client's auth
/// header must never leak upstream, and hop-by-hop / framing headers are
/// re-derived by the HTTP client itself.
const REQUEST_HOP_HEADERS: &[&str] = &[
    "host",
    "x-access-token",
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "te",
    "upgrade",
];

/// Headers never copied back from upstream; `content-encoding` is dropped
/// because `reqwest` already decompresses the body before we see it.
const RESPONSE_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "content-encoding",
];

pub struct UpstreamConfig {
    pub base_url: String,
    pub basic_auth: Option<(String, String)>,
    pub verify_tls: bool,
    pub request_timeout: Duration,
}

pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub client_ip: String,
    pub forwarded_host: String,
    pub user_id: String,
    pub token_id: String,
}

pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

pub struct HttpForwarder {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpForwarder {
    pub fn new(config: UpstreamConfig) -> Result<Self, ZncProxyError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ZncProxyError::Internal(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// `forward_http` (spec.md §4.7). Joins the upstream base with `path`
    /// (empty path → base root), copies headers with hop-by-hop and auth
    /// headers stripped, adds forwarding/logging headers, and maps
    /// transport failures to the 502/504/500 split the spec requires.
    pub async fn forward(&self, req: ProxyRequest) -> Result<ProxyResponse, ZncProxyError> {
        let target = build_target_url(&self.config.base_url, &req.path, req.query.as_deref());
        let authority = upstream_authority(&self.config.base_url);

        let mut headers = HeaderMap::new();
        for (name, value) in &req.headers {
            if is_hop(name, REQUEST_HOP_HEADERS) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        headers.insert(
            reqwest::header::HOST,
            HeaderValue::from_str(&authority).unwrap_or(HeaderValue::from_static("")),
        );
        insert(&mut headers, "x-forwarded-for", &req.client_ip);
        insert(&mut headers, "x-forwarded-proto", "https");
        insert(&mut headers, "x-forwarded-host", &req.forwarded_host);
        insert(&mut headers, "x-user-id", &req.user_id);
        insert(&mut headers, "x-token-id", &req.token_id);

        let mut builder = self.client.request(req.method, &target).headers(headers);
        if let Some((user, pass)) = &self.config.basic_auth {
            builder = builder.basic_auth(user, Some(pass));
        }
        let resp = builder
            .body(req.body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = resp.status();
        let mut out_headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop(name.as_str(), RESPONSE_HOP_HEADERS))
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        out_headers.push(("access-control-allow-origin".into(), "*".into()));
        out_headers.push((
            "access-control-allow-methods".into(),
            "GET, POST, PUT, DELETE, PATCH, OPTIONS, HEAD".into(),
        ));
        out_headers.push(("access-control-allow-headers".into(), "*".into()));
        out_headers.push(("access-control-allow-credentials".into(), "true".into()));

        let body = resp.bytes().await.map_err(map_reqwest_err)?.to_vec();
        out_headers.push(("content-length".into(), body.len().to_string()));

        Ok(ProxyResponse {
            status,
            headers: out_headers,
            body,
        })
    }
}

fn build_target_url(base: &str, path: &str, query: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let mut url = if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{}", path.trim_start_matches('/'))
    };
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(q);
    }
    url
}

fn upstream_authority(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| match u.port() {
            Some(p) => format!("{h}:{p}"),
            None => h.to_string(),
        }))
        .unwrap_or_default()
}

fn is_hop(name: &str, list: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    list.contains(&lower.as_str())
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(v) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), v);
    }
}

fn map_reqwest_err(e: reqwest::Error) -> ZncProxyError {
    if e.is_timeout() {
        ZncProxyError::UpstreamTimeout
    } else if e.is_connect() || e.is_request() {
        ZncProxyError::UpstreamTransportError(e.to_string())
    } else {
        ZncProxyError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_targets_base_root() {
        assert_eq!(
            build_target_url("https://upstream.internal", "", None),
            "https://upstream.internal"
        );
    }

    #[test]
    fn path_is_joined_with_a_single_slash() {
        assert_eq!(
            build_target_url("https://upstream.internal/", "/certificates/filter", None),
            "https://upstream.internal/certificates/filter"
        );
    }

    #[test]
    fn query_string_is_appended() {
        assert_eq!(
            build_target_url("https://upstream.internal", "a", Some("x=1")),
            "https://upstream.internal/a?x=1"
        );
    }

    #[test]
    fn access_token_header_is_never_forwarded() {
        assert!(is_hop("X-Access-Token", REQUEST_HOP_HEADERS));
        assert!(is_hop("x-access-token", REQUEST_HOP_HEADERS));
    }

    #[test]
    fn content_encoding_is_dropped_from_the_response() {
        assert!(is_hop("Content-Encoding", RESPONSE_HOP_HEADERS));
    }
}
