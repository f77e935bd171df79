//! Proxy Forwarder (C7): HTTP pass-through and WebSocket bidirectional
//! copy to the upstream Zenzefi-style server (spec.md §4.7).

pub mod http;
pub mod ws;

pub use http::{HttpForwarder, ProxyRequest, ProxyResponse, UpstreamConfig};
pub use ws::{connect_upstream, pump, UpstreamWs};
