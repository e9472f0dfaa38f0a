//! Client IP address resolution.
//!
//! Uses the socket peer address from `ConnectInfo`. When the server runs
//! behind a trusted reverse proxy, `CF-Connecting-IP`, `X-Real-IP` and
//! `X-Forwarded-For` are consulted first.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{request::Parts, Extensions, HeaderMap, Request};

/// Header priority for IP extraction (highest to lowest).
const IP_HEADERS: &[&str] = &[
    "cf-connecting-ip", // Cloudflare
    "x-real-ip",        // Nginx
    "x-forwarded-for",  // Standard proxy header (first IP in chain)
];

/// Client IP address of the current request, if known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    pub fn from_parts(parts: &Parts, trust_proxy_headers: bool) -> Self {
        Self::resolve(&parts.headers, &parts.extensions, trust_proxy_headers)
    }

    pub fn from_request<B>(req: &Request<B>, trust_proxy_headers: bool) -> Self {
        Self::resolve(req.headers(), req.extensions(), trust_proxy_headers)
    }

    fn resolve(headers: &HeaderMap, extensions: &Extensions, trust_proxy_headers: bool) -> Self {
        if trust_proxy_headers {
            if let Some(ip) = from_proxy_headers(headers) {
                return Self(Some(ip));
            }
        }

        Self(
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip()),
        )
    }

    #[inline]
    pub const fn ip(&self) -> Option<IpAddr> {
        self.0
    }
}

fn from_proxy_headers(headers: &HeaderMap) -> Option<IpAddr> {
    IP_HEADERS.iter().find_map(|header| {
        headers
            .get(*header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .and_then(|ip_str| ip_str.parse::<IpAddr>().ok())
    })
}
